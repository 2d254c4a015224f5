// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use time::Date;

use crate::ids::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
}

impl Status {
    pub const ALL: [Self; 2] = [Self::Active, Self::Inactive];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Number,
    Text,
    Select,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Id,
    Name,
    Email,
    Role,
    Department,
    Salary,
    JoinDate,
    Status,
}

impl Field {
    pub const ALL: [Self; 8] = [
        Self::Id,
        Self::Name,
        Self::Email,
        Self::Role,
        Self::Department,
        Self::Salary,
        Self::JoinDate,
        Self::Status,
    ];

    /// Key used by the JSON payload and the config file.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::Role => "role",
            Self::Department => "department",
            Self::Salary => "salary",
            Self::JoinDate => "joinDate",
            Self::Status => "status",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.key().eq_ignore_ascii_case(value.trim()))
            .or(match value.trim() {
                "join_date" | "joined" => Some(Self::JoinDate),
                _ => None,
            })
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Role => "Role",
            Self::Department => "Department",
            Self::Salary => "Salary",
            Self::JoinDate => "Join Date",
            Self::Status => "Status",
        }
    }

    pub const fn kind(self) -> FieldKind {
        match self {
            Self::Id | Self::Salary => FieldKind::Number,
            Self::Name | Self::Email | Self::Department => FieldKind::Text,
            Self::Role | Self::Status => FieldKind::Select,
            Self::JoinDate => FieldKind::Date,
        }
    }

    /// Default column width in terminal cells.
    pub const fn default_width(self) -> u16 {
        match self {
            Self::Id => 6,
            Self::Name => 18,
            Self::Email => 28,
            Self::Role => 10,
            Self::Department => 13,
            Self::Salary => 13,
            Self::JoinDate => 13,
            Self::Status => 10,
        }
    }

    pub const fn is_sortable(self) -> bool {
        matches!(self, Self::Name | Self::Role | Self::Salary)
    }

    pub const fn is_editable(self) -> bool {
        !matches!(self, Self::Id)
    }

    pub const fn options(self) -> &'static [&'static str] {
        match self {
            Self::Role => &["Engineer", "Manager", "Designer", "QA", "DevOps"],
            Self::Department => &["Engineering", "Sales", "Marketing", "HR", "Design"],
            Self::Status => &["active", "inactive"],
            _ => &[],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Date(Date),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(value) => value.trim().parse::<f64>().ok().filter(|v| !v.is_nan()),
            Self::Date(_) => None,
        }
    }

    /// Numbers compare numerically; everything else compares as case-sensitive text.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(left), Self::Number(right)) => left.total_cmp(right),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Date(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    pub salary: f64,
    #[serde(with = "join_date")]
    pub join_date: Date,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Record {
    pub fn value(&self, field: Field) -> FieldValue {
        match field {
            Field::Id => FieldValue::Number(self.id.get() as f64),
            Field::Name => FieldValue::Text(self.name.clone()),
            Field::Email => FieldValue::Text(self.email.clone()),
            Field::Role => FieldValue::Text(self.role.clone()),
            Field::Department => FieldValue::Text(self.department.clone()),
            Field::Salary => FieldValue::Number(self.salary),
            Field::JoinDate => FieldValue::Date(self.join_date),
            Field::Status => FieldValue::Text(self.status.as_str().to_owned()),
        }
    }

    /// String forms of every populated field, used by free-text search.
    pub fn search_strings(&self) -> impl Iterator<Item = String> + '_ {
        Field::ALL
            .into_iter()
            .map(|field| self.value(field).to_string())
            .chain(self.avatar.iter().cloned())
    }
}

mod join_date {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use time::Date;
    use time::macros::format_description;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(date)
    }

    // Accepts a bare date or an RFC 3339 timestamp; only the date part is kept.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let date_part = raw.split('T').next().unwrap_or_default();
        Date::parse(date_part, format_description!("[year]-[month]-[day]"))
            .map_err(|error| D::Error::custom(format!("invalid joinDate {raw:?}: {error}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Compact,
    #[default]
    Standard,
    Comfortable,
}

impl Density {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Standard => "standard",
            Self::Comfortable => "comfortable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "compact" => Some(Self::Compact),
            "standard" => Some(Self::Standard),
            "comfortable" => Some(Self::Comfortable),
            _ => None,
        }
    }

    /// Terminal lines per row; doubles as the windowing item extent.
    pub const fn row_height(self) -> u32 {
        match self {
            Self::Compact | Self::Standard => 1,
            Self::Comfortable => 2,
        }
    }

    pub const fn column_spacing(self) -> u16 {
        match self {
            Self::Compact => 1,
            Self::Standard => 2,
            Self::Comfortable => 3,
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Compact => Self::Standard,
            Self::Standard => Self::Comfortable,
            Self::Comfortable => Self::Compact,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    #[default]
    Virtualized,
    Paged,
}
