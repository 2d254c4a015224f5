// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashMap;
use time::macros::format_description;

use crate::{Field, FieldValue, Record, Status};

pub trait CellRenderer {
    fn render(&self, field: Field, value: &FieldValue, record: &Record) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl CellRenderer for PlainRenderer {
    fn render(&self, _field: Field, value: &FieldValue, _record: &Record) -> String {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyRenderer;

impl CellRenderer for CurrencyRenderer {
    fn render(&self, _field: Field, value: &FieldValue, _record: &Record) -> String {
        match value.as_number() {
            Some(amount) => format_currency(amount),
            None => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DateRenderer;

impl CellRenderer for DateRenderer {
    fn render(&self, _field: Field, value: &FieldValue, _record: &Record) -> String {
        match value {
            FieldValue::Date(date) => date
                .format(format_description!(
                    "[month repr:short] [day padding:none], [year]"
                ))
                .unwrap_or_else(|_| date.to_string()),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusRenderer;

impl CellRenderer for StatusRenderer {
    fn render(&self, _field: Field, _value: &FieldValue, record: &Record) -> String {
        match record.status {
            Status::Active => format!("● {}", Status::Active.label()),
            Status::Inactive => format!("○ {}", Status::Inactive.label()),
        }
    }
}

/// Per-field renderer lookup; unregistered fields render their plain string.
pub struct RendererTable {
    renderers: HashMap<Field, Box<dyn CellRenderer>>,
    fallback: PlainRenderer,
}

impl RendererTable {
    pub fn new() -> Self {
        Self {
            renderers: HashMap::new(),
            fallback: PlainRenderer,
        }
    }

    pub fn standard() -> Self {
        let mut table = Self::new();
        table.register(Field::Salary, CurrencyRenderer);
        table.register(Field::JoinDate, DateRenderer);
        table.register(Field::Status, StatusRenderer);
        table
    }

    pub fn register(&mut self, field: Field, renderer: impl CellRenderer + 'static) {
        self.renderers.insert(field, Box::new(renderer));
    }

    pub fn renderer_for(&self, field: Field) -> &dyn CellRenderer {
        match self.renderers.get(&field) {
            Some(renderer) => renderer.as_ref(),
            None => &self.fallback,
        }
    }

    pub fn render(&self, field: Field, record: &Record) -> String {
        let value = record.value(field);
        self.renderer_for(field).render(field, &value, record)
    }
}

impl Default for RendererTable {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

#[cfg(test)]
mod tests {
    use super::{CellRenderer, RendererTable, format_currency};
    use crate::{Field, FieldValue, Record, RecordId, Status};
    use time::{Date, Month};

    fn sample() -> Record {
        Record {
            id: RecordId::new(12),
            name: "Lisa Garcia".to_owned(),
            email: "lisa.garcia@company.com".to_owned(),
            role: "DevOps".to_owned(),
            department: "Engineering".to_owned(),
            salary: 1234567.891,
            join_date: Date::from_calendar_date(2023, Month::January, 5).expect("valid date"),
            status: Status::Inactive,
            avatar: None,
        }
    }

    struct Shouting;

    impl CellRenderer for Shouting {
        fn render(&self, _field: Field, value: &FieldValue, _record: &Record) -> String {
            value.to_string().to_uppercase()
        }
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(45000.0), "$45,000.00");
        assert_eq!(format_currency(999.5), "$999.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-1234.5), "-$1,234.50");
    }

    #[test]
    fn standard_table_dispatches_per_field() {
        let table = RendererTable::standard();
        let record = sample();
        assert_eq!(table.render(Field::Salary, &record), "$1,234,567.89");
        assert_eq!(table.render(Field::JoinDate, &record), "Jan 5, 2023");
        assert_eq!(table.render(Field::Status, &record), "○ Inactive");
        assert_eq!(table.render(Field::Name, &record), "Lisa Garcia");
    }

    #[test]
    fn registered_renderer_overrides_fallback() {
        let mut table = RendererTable::new();
        table.register(Field::Name, Shouting);
        assert_eq!(table.render(Field::Name, &sample()), "LISA GARCIA");
        assert_eq!(table.render(Field::Salary, &sample()), "1234567.891");
    }
}
