// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::Date;
use time::macros::format_description;

/// Employee duty. The stored strings are the values the `employee` table's
/// CHECK constraint enumerates; input surfaces must offer exactly these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Duty {
    Frontend,
    Backend,
    DevOps,
    Teamlead,
    Hr,
    Pm,
    Ceo,
}

impl Duty {
    pub const ALL: [Self; 7] = [
        Self::Frontend,
        Self::Backend,
        Self::DevOps,
        Self::Teamlead,
        Self::Hr,
        Self::Pm,
        Self::Ceo,
    ];

    /// Stored values, in the order the CHECK constraint lists them.
    pub const VALUES: [&'static str; 7] = [
        "Frontend", "Backend", "DevOps", "Teamlead", "HR", "PM", "CEO",
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Frontend => "Frontend",
            Self::Backend => "Backend",
            Self::DevOps => "DevOps",
            Self::Teamlead => "Teamlead",
            Self::Hr => "HR",
            Self::Pm => "PM",
            Self::Ceo => "CEO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Frontend" => Some(Self::Frontend),
            "Backend" => Some(Self::Backend),
            "DevOps" => Some(Self::DevOps),
            "Teamlead" => Some(Self::Teamlead),
            "HR" => Some(Self::Hr),
            "PM" => Some(Self::Pm),
            "CEO" => Some(Self::Ceo),
            _ => None,
        }
    }
}

/// Task workflow status. Stored values are the Russian labels the `task`
/// table's CHECK constraint enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    New,
    InProgress,
    ReadyForReview,
    Done,
}

impl TaskStatus {
    pub const ALL: [Self; 4] = [Self::New, Self::InProgress, Self::ReadyForReview, Self::Done];

    /// Stored values, in the order the CHECK constraint lists them.
    pub const VALUES: [&'static str; 4] =
        ["Новая", "В работе", "Можно проверять", "Завершена"];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "Новая",
            Self::InProgress => "В работе",
            Self::ReadyForReview => "Можно проверять",
            Self::Done => "Завершена",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Новая" => Some(Self::New),
            "В работе" => Some(Self::InProgress),
            "Можно проверять" => Some(Self::ReadyForReview),
            "Завершена" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One typed cell. Row caches hold these rather than display strings so a
/// NULL stays distinguishable from an empty text value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i32),
    Text(String),
    Date(Date),
    Bool(bool),
    TextArray(Vec<String>),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn text_array<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::TextArray(values.into_iter().map(Into::into).collect())
    }

    pub const fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Display-layer rendering: NULL becomes the empty string.
    pub fn display(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::Date(value) => value
                .format(&format_description!("[year]-[month]-[day]"))
                .expect("date format is valid"),
            Self::Bool(true) => "true".to_owned(),
            Self::Bool(false) => "false".to_owned(),
            Self::TextArray(values) => values.join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Duty, SortDirection, TaskStatus, Value};
    use time::{Date, Month};

    #[test]
    fn duty_round_trips_through_stored_value() {
        for duty in Duty::ALL {
            assert_eq!(Duty::parse(duty.as_str()), Some(duty));
        }
        assert_eq!(Duty::parse("Designer"), None);
    }

    #[test]
    fn duty_values_match_variant_order() {
        for (duty, value) in Duty::ALL.iter().zip(Duty::VALUES) {
            assert_eq!(duty.as_str(), value);
        }
    }

    #[test]
    fn task_status_round_trips_through_stored_value() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("Отменена"), None);
    }

    #[test]
    fn task_status_values_match_variant_order() {
        for (status, value) in TaskStatus::ALL.iter().zip(TaskStatus::VALUES) {
            assert_eq!(status.as_str(), value);
        }
    }

    #[test]
    fn sort_direction_sql_keywords() {
        assert_eq!(SortDirection::Asc.as_sql(), "ASC");
        assert_eq!(SortDirection::Desc.as_sql(), "DESC");
    }

    #[test]
    fn null_displays_as_empty_string() {
        assert_eq!(Value::Null.display(), "");
    }

    #[test]
    fn typed_values_display_as_text() {
        let date = Date::from_calendar_date(2026, Month::March, 5).expect("valid date");
        assert_eq!(Value::Integer(30).display(), "30");
        assert_eq!(Value::text("Backend").display(), "Backend");
        assert_eq!(Value::Date(date).display(), "2026-03-05");
        assert_eq!(Value::Bool(false).display(), "false");
        assert_eq!(Value::text_array(["SQL", "Python"]).display(), "SQL, Python");
    }
}
