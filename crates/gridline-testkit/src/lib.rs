// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use gridline_app::{Field, Record, RecordId, Status};
use std::path::PathBuf;
use time::{Date, Duration, Month};

const FIRST_NAMES: [&str; 20] = [
    "John",
    "Jane",
    "Michael",
    "Sarah",
    "David",
    "Lisa",
    "Robert",
    "Emily",
    "James",
    "Jessica",
    "William",
    "Ashley",
    "Richard",
    "Amanda",
    "Joseph",
    "Stephanie",
    "Christopher",
    "Jennifer",
    "Daniel",
    "Nicole",
];
const LAST_NAMES: [&str; 20] = [
    "Smith",
    "Johnson",
    "Williams",
    "Brown",
    "Jones",
    "Garcia",
    "Miller",
    "Davis",
    "Rodriguez",
    "Martinez",
    "Hernandez",
    "Lopez",
    "Gonzalez",
    "Wilson",
    "Anderson",
    "Thomas",
    "Taylor",
    "Moore",
    "Jackson",
    "Martin",
];

const BASE_RECORD_COUNT: usize = 20;
pub const DEMO_RECORD_COUNT: usize = 500;

// Salaries land on whole hundreds between these bounds.
const SALARY_FLOOR: i64 = 40_000;
const SALARY_CEILING: i64 = 150_000;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator for employee-directory records.
#[derive(Debug, Clone)]
pub struct DirectoryFaker {
    rng: DeterministicRng,
}

impl DirectoryFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn record(&mut self, id: i64) -> Record {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let role = self.pick(Field::Role.options());
        let department = self.pick(Field::Department.options());
        let hundreds = (SALARY_CEILING - SALARY_FLOOR) / 100;
        let salary = SALARY_FLOOR + 100 * self.rng.int_n(hundreds as usize + 1) as i64;
        let join_date = reference_date() - Duration::days(self.rng.int_n(365 * 8) as i64);
        let status = if self.rng.int_n(5) == 0 {
            Status::Inactive
        } else {
            Status::Active
        };

        Record {
            id: RecordId::new(id),
            name: format!("{first} {last}"),
            email: email_for(first, last),
            role: role.to_owned(),
            department: department.to_owned(),
            salary: salary as f64,
            join_date,
            status,
            avatar: None,
        }
    }

    /// Records with ids `1..=count`.
    pub fn records(&mut self, count: usize) -> Vec<Record> {
        (1..=count as i64).map(|id| self.record(id)).collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

/// Cycles `base` out to `count` rows with fresh ids and index-derived names, so
/// large demo sets have no duplicate-looking "copy" rows.
pub fn expand_records(base: &[Record], count: usize) -> Vec<Record> {
    if base.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|index| {
            let first = FIRST_NAMES[(index * 7) % FIRST_NAMES.len()];
            let last = LAST_NAMES[(index * 11) % LAST_NAMES.len()];
            Record {
                id: RecordId::new(index as i64 + 1),
                name: format!("{first} {last}"),
                email: email_for(first, last),
                ..base[index % base.len()].clone()
            }
        })
        .collect()
}

/// The dataset behind `--demo`: a seeded base set expanded for virtualization.
pub fn demo_records() -> Vec<Record> {
    let base = DirectoryFaker::new(42).records(BASE_RECORD_COUNT);
    expand_records(&base, DEMO_RECORD_COUNT)
}

/// Writes `records` as a JSON array into a fresh temp dir.
pub fn write_records_json(records: &[Record]) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("records.json");
    let json = serde_json::to_vec_pretty(records).context("encode records")?;
    std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    Ok((dir, path))
}

fn email_for(first: &str, last: &str) -> String {
    format!(
        "{}.{}@company.com",
        first.to_ascii_lowercase(),
        last.to_ascii_lowercase()
    )
}

fn reference_date() -> Date {
    Date::from_calendar_date(2026, Month::January, 1).unwrap_or(Date::MIN)
}

#[cfg(test)]
mod tests {
    use super::{
        DEMO_RECORD_COUNT, DirectoryFaker, demo_records, expand_records, write_records_json,
    };
    use anyhow::Result;
    use gridline_app::{Field, Record, validate_record};
    use std::collections::BTreeSet;

    #[test]
    fn same_seed_same_records() {
        let left = DirectoryFaker::new(7).records(10);
        let right = DirectoryFaker::new(7).records(10);
        assert_eq!(left, right);
    }

    #[test]
    fn generated_records_are_valid() -> Result<()> {
        let mut faker = DirectoryFaker::new(11);
        for record in faker.records(200) {
            validate_record(&record)?;
            assert!(Field::Role.options().contains(&record.role.as_str()));
            assert!(Field::Department.options().contains(&record.department.as_str()));
            assert!((40_000.0..=150_000.0).contains(&record.salary));
        }
        Ok(())
    }

    #[test]
    fn expansion_uses_index_derived_names() {
        let base = DirectoryFaker::new(3).records(4);
        let expanded = expand_records(&base, 25);
        assert_eq!(expanded.len(), 25);
        assert_eq!(expanded[0].name, "John Smith");
        assert_eq!(expanded[1].name, "Emily Lopez");
        assert_eq!(expanded[1].email, "emily.lopez@company.com");
        assert_eq!(expanded[5].role, base[1].role);
        assert_eq!(expanded[24].id.get(), 25);
    }

    #[test]
    fn expansion_of_empty_base_is_empty() {
        assert!(expand_records(&[], 10).is_empty());
    }

    #[test]
    fn demo_ids_are_unique() {
        let records = demo_records();
        assert_eq!(records.len(), DEMO_RECORD_COUNT);
        let ids: BTreeSet<i64> = records.iter().map(|record| record.id.get()).collect();
        assert_eq!(ids.len(), DEMO_RECORD_COUNT);
    }

    #[test]
    fn written_json_reads_back() -> Result<()> {
        let records = DirectoryFaker::new(5).records(3);
        let (_dir, path) = write_records_json(&records)?;
        let decoded: Vec<Record> = serde_json::from_slice(&std::fs::read(path)?)?;
        assert_eq!(decoded, records);
        Ok(())
    }
}
