// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Static description of the four tables. This registry is the single source
//! of truth for column order, keys, check constraints and the enumerated
//! duty/status values; input surfaces read allowed values from here instead
//! of carrying their own copies.

use crate::{Database, DbError, describe};
use outsource_app::{Duty, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Text,
    Date,
    Boolean,
    TextArray,
}

impl ColumnKind {
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Date => "DATE",
            Self::Boolean => "BOOLEAN",
            Self::TextArray => "TEXT[]",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Text => "text",
            Self::Date => "date",
            Self::Boolean => "boolean",
            Self::TextArray => "text array",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub has_default: bool,
}

/// Predicates are data, not SQL strings, so the validator can evaluate them
/// client-side and the DDL generator can render them server-side from the
/// same definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPredicate {
    /// Column must be strictly positive.
    Positive(&'static str),
    /// Column must be one of the listed stored values.
    OneOf(&'static str, &'static [&'static str]),
}

impl CheckPredicate {
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Positive(column) | Self::OneOf(column, _) => column,
        }
    }

    pub fn sql(&self) -> String {
        match self {
            Self::Positive(column) => format!("{column} > 0"),
            Self::OneOf(column, allowed) => {
                let quoted = allowed
                    .iter()
                    .map(|value| format!("'{}'", value.replace('\'', "''")))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{column} IN ({quoted})")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckConstraint {
    pub name: &'static str,
    pub predicate: CheckPredicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKeyRef {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    /// Column order is display order.
    pub columns: &'static [ColumnDef],
    pub primary_key: &'static str,
    pub checks: &'static [CheckConstraint],
    pub foreign_keys: &'static [ForeignKeyRef],
}

impl TableDef {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key_index(&self) -> usize {
        self.column_index(self.primary_key)
            .expect("primary key column is listed")
    }

    pub fn create_sql(&self) -> String {
        let mut parts = Vec::new();
        for column in self.columns {
            if column.name == self.primary_key {
                parts.push(format!("  {} SERIAL PRIMARY KEY", column.name));
                continue;
            }
            let mut part = format!("  {} {}", column.name, column.kind.sql_type());
            if !column.nullable {
                part.push_str(" NOT NULL");
            }
            parts.push(part);
        }
        for check in self.checks {
            parts.push(format!(
                "  CONSTRAINT {} CHECK ({})",
                check.name,
                check.predicate.sql()
            ));
        }
        for fk in self.foreign_keys {
            parts.push(format!(
                "  CONSTRAINT {}_{}_fkey FOREIGN KEY ({}) REFERENCES {} ({})",
                self.name, fk.column, fk.column, fk.references_table, fk.references_column
            ));
        }
        format!("CREATE TABLE {} (\n{}\n)", self.name, parts.join(",\n"))
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }
}

pub static EMPLOYEE: TableDef = TableDef {
    name: "employee",
    columns: &[
        ColumnDef {
            name: "id",
            kind: ColumnKind::Integer,
            nullable: false,
            has_default: true,
        },
        ColumnDef {
            name: "full_name",
            kind: ColumnKind::Text,
            nullable: false,
            has_default: false,
        },
        ColumnDef {
            name: "age",
            kind: ColumnKind::Integer,
            nullable: false,
            has_default: false,
        },
        ColumnDef {
            name: "salary",
            kind: ColumnKind::Integer,
            nullable: false,
            has_default: false,
        },
        ColumnDef {
            name: "duty",
            kind: ColumnKind::Text,
            nullable: false,
            has_default: false,
        },
        ColumnDef {
            name: "skills",
            kind: ColumnKind::TextArray,
            nullable: true,
            has_default: false,
        },
    ],
    primary_key: "id",
    checks: &[
        CheckConstraint {
            name: "employee_age_positive",
            predicate: CheckPredicate::Positive("age"),
        },
        CheckConstraint {
            name: "employee_salary_positive",
            predicate: CheckPredicate::Positive("salary"),
        },
        CheckConstraint {
            name: "employee_duty_allowed",
            predicate: CheckPredicate::OneOf("duty", &Duty::VALUES),
        },
    ],
    foreign_keys: &[],
};

pub static TASK: TableDef = TableDef {
    name: "task",
    columns: &[
        ColumnDef {
            name: "id",
            kind: ColumnKind::Integer,
            nullable: false,
            has_default: true,
        },
        ColumnDef {
            name: "employee_id",
            kind: ColumnKind::Integer,
            nullable: false,
            has_default: false,
        },
        ColumnDef {
            name: "name",
            kind: ColumnKind::Text,
            nullable: false,
            has_default: false,
        },
        ColumnDef {
            name: "description",
            kind: ColumnKind::Text,
            nullable: true,
            has_default: false,
        },
        ColumnDef {
            name: "deadline",
            kind: ColumnKind::Date,
            nullable: true,
            has_default: false,
        },
        ColumnDef {
            name: "status",
            kind: ColumnKind::Text,
            nullable: false,
            has_default: false,
        },
    ],
    primary_key: "id",
    checks: &[CheckConstraint {
        name: "task_status_allowed",
        predicate: CheckPredicate::OneOf("status", &TaskStatus::VALUES),
    }],
    foreign_keys: &[ForeignKeyRef {
        column: "employee_id",
        references_table: "employee",
        references_column: "id",
    }],
};

pub static PROJECT: TableDef = TableDef {
    name: "project",
    columns: &[
        ColumnDef {
            name: "id",
            kind: ColumnKind::Integer,
            nullable: false,
            has_default: true,
        },
        ColumnDef {
            name: "name",
            kind: ColumnKind::Text,
            nullable: false,
            has_default: false,
        },
        ColumnDef {
            name: "deadline",
            kind: ColumnKind::Date,
            nullable: true,
            has_default: false,
        },
        ColumnDef {
            name: "prize",
            kind: ColumnKind::Integer,
            nullable: false,
            has_default: false,
        },
        ColumnDef {
            name: "customer",
            kind: ColumnKind::Text,
            nullable: true,
            has_default: false,
        },
        ColumnDef {
            name: "finished",
            kind: ColumnKind::Boolean,
            nullable: false,
            has_default: false,
        },
    ],
    primary_key: "id",
    checks: &[CheckConstraint {
        name: "project_prize_positive",
        predicate: CheckPredicate::Positive("prize"),
    }],
    foreign_keys: &[],
};

pub static PROJECT_TASK: TableDef = TableDef {
    name: "project_task",
    columns: &[
        ColumnDef {
            name: "id",
            kind: ColumnKind::Integer,
            nullable: false,
            has_default: true,
        },
        ColumnDef {
            name: "project_id",
            kind: ColumnKind::Integer,
            nullable: false,
            has_default: false,
        },
        ColumnDef {
            name: "task_id",
            kind: ColumnKind::Integer,
            nullable: false,
            has_default: false,
        },
    ],
    primary_key: "id",
    checks: &[],
    foreign_keys: &[
        ForeignKeyRef {
            column: "project_id",
            references_table: "project",
            references_column: "id",
        },
        ForeignKeyRef {
            column: "task_id",
            references_table: "task",
            references_column: "id",
        },
    ],
};

/// Creation order satisfies FK dependencies; tables are dropped in reverse.
const CREATE_ORDER: [&TableDef; 4] = [&EMPLOYEE, &PROJECT, &TASK, &PROJECT_TASK];
const DROP_ORDER: [&TableDef; 4] = [&PROJECT_TASK, &TASK, &PROJECT, &EMPLOYEE];

pub fn tables() -> [&'static TableDef; 4] {
    CREATE_ORDER
}

pub fn table_def(name: &str) -> Result<&'static TableDef, DbError> {
    CREATE_ORDER
        .into_iter()
        .find(|table| table.name == name)
        .ok_or_else(|| DbError::UnknownTable(name.to_owned()))
}

pub fn create_schema(db: &Database) -> Result<(), DbError> {
    for table in CREATE_ORDER {
        db.batch_execute(&table.create_sql()).map_err(|error| {
            let cause = describe(&error);
            db.log(&format!("create table {} failed: {cause}", table.name));
            DbError::Schema(cause)
        })?;
    }
    Ok(())
}

pub fn drop_schema(db: &Database) -> Result<(), DbError> {
    for table in DROP_ORDER {
        db.batch_execute(&table.drop_sql()).map_err(|error| {
            let cause = describe(&error);
            db.log(&format!("drop table {} failed: {cause}", table.name));
            DbError::Schema(cause)
        })?;
    }
    Ok(())
}

/// Destructive operator action: drop all four tables and recreate them from
/// the registry. Never runs automatically.
pub fn reset_schema(db: &Database) -> Result<(), DbError> {
    drop_schema(db)?;
    create_schema(db)?;
    db.log("schema reset: dropped and recreated all tables");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ColumnKind, EMPLOYEE, PROJECT_TASK, TASK, table_def, tables};
    use crate::DbError;

    #[test]
    fn lookup_finds_all_four_tables() {
        for name in ["employee", "task", "project", "project_task"] {
            let table = table_def(name).expect("table is registered");
            assert_eq!(table.name, name);
        }
    }

    #[test]
    fn lookup_rejects_unknown_table() {
        let error = table_def("vendors").expect_err("not in this schema");
        assert_eq!(error, DbError::UnknownTable("vendors".to_owned()));
    }

    #[test]
    fn every_primary_key_is_a_generated_integer() {
        for table in tables() {
            let pk = table.columns[table.primary_key_index()];
            assert_eq!(pk.kind, ColumnKind::Integer, "table {}", table.name);
            assert!(!pk.nullable, "table {}", table.name);
            assert!(pk.has_default, "table {}", table.name);
        }
    }

    #[test]
    fn employee_ddl_renders_keys_and_checks() {
        let sql = EMPLOYEE.create_sql();
        assert!(sql.starts_with("CREATE TABLE employee ("));
        assert!(sql.contains("id SERIAL PRIMARY KEY"));
        assert!(sql.contains("full_name TEXT NOT NULL"));
        assert!(sql.contains("skills TEXT[]"));
        assert!(!sql.contains("skills TEXT[] NOT NULL"));
        assert!(sql.contains("CONSTRAINT employee_age_positive CHECK (age > 0)"));
        assert!(sql.contains(
            "CHECK (duty IN ('Frontend', 'Backend', 'DevOps', 'Teamlead', 'HR', 'PM', 'CEO'))"
        ));
    }

    #[test]
    fn task_ddl_renders_fk_and_status_check() {
        let sql = TASK.create_sql();
        assert!(sql.contains(
            "CONSTRAINT task_employee_id_fkey FOREIGN KEY (employee_id) REFERENCES employee (id)"
        ));
        assert!(sql.contains("'Новая', 'В работе', 'Можно проверять', 'Завершена'"));
    }

    #[test]
    fn junction_ddl_references_both_parents() {
        let sql = PROJECT_TASK.create_sql();
        assert!(sql.contains("REFERENCES project (id)"));
        assert!(sql.contains("REFERENCES task (id)"));
    }

    #[test]
    fn drop_order_removes_dependents_first() {
        let names = super::DROP_ORDER.map(|table| table.name);
        assert_eq!(names, ["project_task", "task", "project", "employee"]);
    }

    #[test]
    fn drop_sql_is_tolerant_of_missing_tables() {
        assert_eq!(EMPLOYEE.drop_sql(), "DROP TABLE IF EXISTS employee");
    }
}
