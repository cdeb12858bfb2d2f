// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Pre-insert validation. Pure functions over the schema registry: no
//! statement is ever issued from here, so a rejected write costs zero
//! round-trips. Foreign-key existence is deliberately not checked here;
//! the server verdict at insert time is authoritative and race-free.

use crate::schema::{CheckPredicate, ColumnKind, TableDef};
use outsource_app::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Column-name-keyed field set for one pending row. BTreeMap keeps error
/// reporting in a stable order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    fields: BTreeMap<String, Value>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.fields.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorReason {
    /// Required column absent, NULL, or blank text.
    Missing,
    /// Value present but of the wrong kind for the column.
    WrongKind { expected: ColumnKind },
    /// Value must be strictly positive.
    NotPositive,
    /// Value is not one of the enumerated stored values.
    NotAllowed { allowed: &'static [&'static str] },
    /// The generated primary key cannot be supplied by the caller.
    ReadOnly,
    /// Field names a column the table does not have.
    UnknownColumn,
}

impl fmt::Display for FieldErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("value is required"),
            Self::WrongKind { expected } => {
                write!(f, "expected a {} value", expected.label())
            }
            Self::NotPositive => f.write_str("value must be greater than zero"),
            Self::NotAllowed { allowed } => {
                write!(f, "value must be one of: {}", allowed.join(", "))
            }
            Self::ReadOnly => f.write_str("column is generated and cannot be set"),
            Self::UnknownColumn => f.write_str("no such column in this table"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub column: String,
    pub reason: FieldErrorReason,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.column, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(Vec<FieldError>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Validate `fields` against `table` in two groups: structural problems
/// (unknown or read-only columns, missing required values, wrong kinds)
/// first, check-constraint predicates second. If the first group produces
/// any error the second group never runs, so a blank required field is
/// reported as missing rather than as a failed check. Within a group every
/// failing field is reported, not just the first.
pub fn validate(table: &TableDef, fields: &FieldValues) -> ValidationOutcome {
    let mut errors = Vec::new();

    for (name, _) in fields.iter() {
        if name == table.primary_key {
            errors.push(FieldError {
                column: name.to_owned(),
                reason: FieldErrorReason::ReadOnly,
            });
        } else if table.column(name).is_none() {
            errors.push(FieldError {
                column: name.to_owned(),
                reason: FieldErrorReason::UnknownColumn,
            });
        }
    }

    for column in table.columns {
        if column.name == table.primary_key {
            continue;
        }
        match fields.get(column.name) {
            Some(value) if is_present(value) => {
                if !kind_matches(column.kind, value) {
                    errors.push(FieldError {
                        column: column.name.to_owned(),
                        reason: FieldErrorReason::WrongKind {
                            expected: column.kind,
                        },
                    });
                }
            }
            _ if column.nullable => {}
            _ => errors.push(FieldError {
                column: column.name.to_owned(),
                reason: FieldErrorReason::Missing,
            }),
        }
    }

    if !errors.is_empty() {
        return ValidationOutcome::Invalid(errors);
    }

    for check in table.checks {
        let column = check.predicate.column();
        // SQL CHECK semantics: an absent or NULL value passes the predicate.
        let Some(value) = fields.get(column).filter(|value| is_present(value)) else {
            continue;
        };
        if let Some(reason) = check_failure(&check.predicate, value) {
            errors.push(FieldError {
                column: column.to_owned(),
                reason,
            });
        }
    }

    if errors.is_empty() {
        ValidationOutcome::Valid
    } else {
        ValidationOutcome::Invalid(errors)
    }
}

/// Blank text counts as absent: a whitespace-only entry in a required text
/// field is a missing value, not a value.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Text(text) => !text.trim().is_empty(),
        _ => true,
    }
}

fn kind_matches(kind: ColumnKind, value: &Value) -> bool {
    matches!(
        (kind, value),
        (ColumnKind::Integer, Value::Integer(_))
            | (ColumnKind::Text, Value::Text(_))
            | (ColumnKind::Date, Value::Date(_))
            | (ColumnKind::Boolean, Value::Bool(_))
            | (ColumnKind::TextArray, Value::TextArray(_))
    )
}

fn check_failure(predicate: &CheckPredicate, value: &Value) -> Option<FieldErrorReason> {
    match predicate {
        CheckPredicate::Positive(_) => match value.as_integer() {
            Some(n) if n > 0 => None,
            _ => Some(FieldErrorReason::NotPositive),
        },
        CheckPredicate::OneOf(_, allowed) => match value.as_text() {
            Some(text) if allowed.contains(&text) => None,
            _ => Some(FieldErrorReason::NotAllowed { allowed }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldError, FieldErrorReason, FieldValues, ValidationOutcome, validate};
    use crate::schema::{ColumnKind, EMPLOYEE, PROJECT, PROJECT_TASK, TASK};
    use outsource_app::{Duty, Value};

    fn employee_fields() -> FieldValues {
        FieldValues::new()
            .with("full_name", Value::text("Иванов Иван Иванович"))
            .with("age", Value::Integer(30))
            .with("salary", Value::Integer(100_000))
            .with("duty", Value::text("Backend"))
            .with("skills", Value::text_array(["SQL", "Python"]))
    }

    fn errors(outcome: ValidationOutcome) -> Vec<FieldError> {
        match outcome {
            ValidationOutcome::Invalid(errors) => errors,
            ValidationOutcome::Valid => panic!("expected validation failure"),
        }
    }

    #[test]
    fn complete_employee_row_is_valid() {
        assert!(validate(&EMPLOYEE, &employee_fields()).is_valid());
    }

    #[test]
    fn nullable_column_may_be_omitted() {
        let mut fields = employee_fields();
        fields.set("skills", Value::Null);
        assert!(validate(&EMPLOYEE, &fields).is_valid());
    }

    #[test]
    fn blank_text_in_required_column_is_missing() {
        let fields = employee_fields().with("full_name", Value::text("   "));
        let errors = errors(validate(&EMPLOYEE, &fields));
        assert_eq!(
            errors,
            vec![FieldError {
                column: "full_name".to_owned(),
                reason: FieldErrorReason::Missing,
            }]
        );
    }

    #[test]
    fn every_missing_required_column_is_reported() {
        let errors = errors(validate(&EMPLOYEE, &FieldValues::new()));
        let columns = errors.iter().map(|e| e.column.as_str()).collect::<Vec<_>>();
        assert_eq!(columns, ["full_name", "age", "salary", "duty"]);
        assert!(errors.iter().all(|e| e.reason == FieldErrorReason::Missing));
    }

    #[test]
    fn missing_value_suppresses_check_errors_on_other_columns() {
        // age both missing and (were it present) checked; salary fails its
        // check. Presence errors win the round: the check group never runs.
        let mut fields = employee_fields();
        fields.set("age", Value::Null);
        fields.set("salary", Value::Integer(-1));
        let errors = errors(validate(&EMPLOYEE, &fields));
        assert_eq!(
            errors,
            vec![FieldError {
                column: "age".to_owned(),
                reason: FieldErrorReason::Missing,
            }]
        );
    }

    #[test]
    fn all_check_failures_in_the_group_are_reported() {
        let fields = employee_fields()
            .with("age", Value::Integer(0))
            .with("salary", Value::Integer(-5))
            .with("duty", Value::text("Designer"));
        let errors = errors(validate(&EMPLOYEE, &fields));
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].reason, FieldErrorReason::NotPositive);
        assert_eq!(errors[1].reason, FieldErrorReason::NotPositive);
        assert_eq!(
            errors[2].reason,
            FieldErrorReason::NotAllowed {
                allowed: &Duty::VALUES,
            }
        );
    }

    #[test]
    fn wrong_kind_is_a_structural_error() {
        let fields = employee_fields().with("age", Value::text("thirty"));
        let errors = errors(validate(&EMPLOYEE, &fields));
        assert_eq!(
            errors,
            vec![FieldError {
                column: "age".to_owned(),
                reason: FieldErrorReason::WrongKind {
                    expected: ColumnKind::Integer,
                },
            }]
        );
    }

    #[test]
    fn supplying_the_primary_key_is_rejected() {
        let fields = employee_fields().with("id", Value::Integer(7));
        let errors = errors(validate(&EMPLOYEE, &fields));
        assert!(errors.contains(&FieldError {
            column: "id".to_owned(),
            reason: FieldErrorReason::ReadOnly,
        }));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let fields = employee_fields().with("nickname", Value::text("vanya"));
        let errors = errors(validate(&EMPLOYEE, &fields));
        assert!(errors.contains(&FieldError {
            column: "nickname".to_owned(),
            reason: FieldErrorReason::UnknownColumn,
        }));
    }

    #[test]
    fn foreign_key_existence_is_not_checked_client_side() {
        // employee 999 does not exist anywhere, but validation passes; only
        // the server may reject a dangling reference.
        let fields = FieldValues::new()
            .with("employee_id", Value::Integer(999))
            .with("name", Value::text("Разгром"))
            .with("status", Value::text("Новая"));
        assert!(validate(&TASK, &fields).is_valid());

        let link = FieldValues::new()
            .with("project_id", Value::Integer(999))
            .with("task_id", Value::Integer(999));
        assert!(validate(&PROJECT_TASK, &link).is_valid());
    }

    #[test]
    fn project_prize_must_be_positive() {
        let fields = FieldValues::new()
            .with("name", Value::text("Переезд"))
            .with("prize", Value::Integer(0))
            .with("finished", Value::Bool(false));
        let errors = errors(validate(&PROJECT, &fields));
        assert_eq!(
            errors,
            vec![FieldError {
                column: "prize".to_owned(),
                reason: FieldErrorReason::NotPositive,
            }]
        );
    }

    #[test]
    fn task_status_outside_workflow_is_rejected() {
        let fields = FieldValues::new()
            .with("employee_id", Value::Integer(1))
            .with("name", Value::text("Разгром"))
            .with("status", Value::text("Отменена"));
        let errors = errors(validate(&TASK, &fields));
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0].reason,
            FieldErrorReason::NotAllowed { .. }
        ));
    }
}
