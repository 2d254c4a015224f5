// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use time::Date;
use time::macros::format_description;

use crate::{Field, Record, Status};

/// Partial update for a record. `None` leaves the field untouched; the id is
/// never patchable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub department: Option<String>,
    pub salary: Option<f64>,
    pub join_date: Option<Date>,
    pub status: Option<Status>,
}

impl RecordPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Builds a single-field patch from inline edit text.
    pub fn parse_field(field: Field, raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let mut patch = Self::default();
        match field {
            Field::Id => bail!("id is not editable"),
            Field::Name => patch.name = Some(raw.to_owned()),
            Field::Email => patch.email = Some(raw.to_owned()),
            Field::Role => patch.role = Some(raw.to_owned()),
            Field::Department => patch.department = Some(raw.to_owned()),
            Field::Salary => {
                let cleaned: String = raw.chars().filter(|ch| !matches!(ch, ',' | '$')).collect();
                let salary: f64 = cleaned
                    .parse()
                    .with_context(|| format!("salary {raw:?} is not a number"))?;
                patch.salary = Some(salary);
            }
            Field::JoinDate => {
                let date = Date::parse(raw, format_description!("[year]-[month]-[day]"))
                    .with_context(|| format!("join date {raw:?} must look like 2024-01-31"))?;
                patch.join_date = Some(date);
            }
            Field::Status => {
                let status = Status::parse(&raw.to_ascii_lowercase()).ok_or_else(|| {
                    anyhow!("status {raw:?} is invalid -- use active or inactive")
                })?;
                patch.status = Some(status);
            }
        }
        Ok(patch)
    }

    pub fn apply_to(&self, record: &Record) -> Record {
        let mut updated = record.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(email) = &self.email {
            updated.email = email.clone();
        }
        if let Some(role) = &self.role {
            updated.role = role.clone();
        }
        if let Some(department) = &self.department {
            updated.department = department.clone();
        }
        if let Some(salary) = self.salary {
            updated.salary = salary;
        }
        if let Some(join_date) = self.join_date {
            updated.join_date = join_date;
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        updated
    }
}

pub fn validate_record(record: &Record) -> Result<()> {
    if record.name.trim().is_empty() {
        bail!("name is required -- enter a name and retry");
    }
    if !looks_like_email(&record.email) {
        bail!("email {:?} is invalid -- use name@domain.tld", record.email);
    }
    if record.role.trim().is_empty() {
        bail!("role is required -- choose a role and retry");
    }
    if record.department.trim().is_empty() {
        bail!("department is required -- enter a department and retry");
    }
    if !record.salary.is_finite() || record.salary < 0.0 {
        bail!("salary must be a non-negative number");
    }
    Ok(())
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
