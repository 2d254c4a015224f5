// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Search, filter, sort and paging over an in-memory record set.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::{Field, Record, SortDirection};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub const fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Blank, malformed and NaN bounds are unset.
    pub fn parse(min: &str, max: &str) -> Self {
        Self {
            min: parse_bound(min),
            max: parse_bound(max),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        let min = self.min.unwrap_or(f64::NEG_INFINITY);
        let max = self.max.unwrap_or(f64::INFINITY);
        value >= min && value <= max
    }
}

fn parse_bound(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| !value.is_nan())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Criterion {
    /// Case-insensitive substring.
    Contains(String),
    /// Exact match against the value's string form.
    Equals(String),
    Range(NumericRange),
}

impl Criterion {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Contains(needle) | Self::Equals(needle) => needle.is_empty(),
            Self::Range(range) => range.is_unbounded(),
        }
    }

    pub fn matches(&self, record: &Record, field: Field) -> bool {
        let value = record.value(field);
        match self {
            Self::Contains(needle) => contains_ignore_case(&value.to_string(), needle),
            Self::Equals(expected) => value.to_string() == *expected,
            Self::Range(range) => value.as_number().is_some_and(|n| range.contains(n)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Contains(needle) => format!("~{needle}"),
            Self::Equals(expected) => format!("={expected}"),
            Self::Range(range) => match (range.min, range.max) {
                (Some(min), Some(max)) => format!("{min}..{max}"),
                (Some(min), None) => format!(">={min}"),
                (None, Some(max)) => format!("<={max}"),
                (None, None) => "any".to_owned(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    criteria: BTreeMap<Field, Criterion>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one criterion; an empty criterion removes the field's entry.
    pub fn set(&mut self, field: Field, criterion: Criterion) {
        if criterion.is_empty() {
            self.criteria.remove(&field);
        } else {
            self.criteria.insert(field, criterion);
        }
    }

    pub fn with(mut self, field: Field, criterion: Criterion) -> Self {
        self.set(field, criterion);
        self
    }

    pub fn remove(&mut self, field: Field) -> Option<Criterion> {
        self.criteria.remove(&field)
    }

    pub fn clear(&mut self) {
        self.criteria.clear();
    }

    pub fn get(&self, field: Field) -> Option<&Criterion> {
        self.criteria.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.values().all(Criterion::is_empty)
    }

    pub fn len(&self) -> usize {
        self.active().count()
    }

    pub fn active(&self) -> impl Iterator<Item = (Field, &Criterion)> {
        self.criteria
            .iter()
            .filter(|(_, criterion)| !criterion.is_empty())
            .map(|(field, criterion)| (*field, criterion))
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.active()
            .all(|(field, criterion)| criterion.matches(record, field))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: Field,
    pub direction: SortDirection,
}

impl SortKey {
    pub const fn asc(field: Field) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub const fn desc(field: Field) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    /// Parses `field` or `field:asc|desc`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (field, direction) = match raw.split_once(':') {
            Some((field, direction)) => (field, SortDirection::parse(direction)?),
            None => (raw, SortDirection::Asc),
        };
        Some(Self {
            field: Field::parse(field)?,
            direction,
        })
    }
}

pub type SortSpec = Vec<SortKey>;

/// Header click cycle for a single column: asc, then desc, then unsorted.
pub fn toggle_sort(current: Option<SortKey>, field: Field) -> Option<SortKey> {
    match current {
        Some(key) if key.field == field => match key.direction {
            SortDirection::Asc => Some(SortKey::desc(field)),
            SortDirection::Desc => None,
        },
        _ => Some(SortKey::asc(field)),
    }
}

pub fn matches_search(record: &Record, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    record
        .search_strings()
        .any(|value| value.to_lowercase().contains(&needle))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn filter_records<'a>(
    records: &'a [Record],
    criteria: &FilterCriteria,
    search: &str,
) -> Vec<&'a Record> {
    records
        .iter()
        .filter(|record| criteria.matches(record) && matches_search(record, search))
        .collect()
}

pub fn compare_records(left: &Record, right: &Record, sort: &[SortKey]) -> Ordering {
    for key in sort {
        let order = left.value(key.field).compare(&right.value(key.field));
        let order = match key.direction {
            SortDirection::Asc => order,
            SortDirection::Desc => order.reverse(),
        };
        if order != Ordering::Equal {
            return order;
        }
    }
    Ordering::Equal
}

/// Stable: rows with equal keys keep their relative order.
pub fn sort_records(rows: &mut [&Record], sort: &[SortKey]) {
    if sort.is_empty() {
        return;
    }
    rows.sort_by(|left, right| compare_records(left, right, sort));
}

pub fn apply<'a>(
    records: &'a [Record],
    criteria: &FilterCriteria,
    search: &str,
    sort: &[SortKey],
) -> Vec<&'a Record> {
    let mut rows = filter_records(records, criteria, search);
    sort_records(&mut rows, sort);
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// 1-based, clamped into `1..=total_pages`.
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl PageInfo {
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Index of the first row on this page within the full view.
    pub const fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }
}

pub fn page_info(total: usize, page: usize, page_size: usize) -> PageInfo {
    let page_size = page_size.max(1);
    let total_pages = total.div_ceil(page_size);
    PageInfo {
        page: page.clamp(1, total_pages.max(1)),
        page_size,
        total,
        total_pages,
    }
}

pub fn paginate<T>(view: &[T], page: usize, page_size: usize) -> (&[T], PageInfo) {
    let info = page_info(view.len(), page, page_size);
    let start = info.offset().min(view.len());
    let end = start.saturating_add(info.page_size).min(view.len());
    (&view[start..end], info)
}
