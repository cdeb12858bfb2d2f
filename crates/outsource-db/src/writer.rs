// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Insert paths. Every write validates client-side first; a rejected row
//! never reaches the server. Writes that do reach the server run inside a
//! transaction, and the task-with-project-link operation is a single
//! transaction end to end, so a failed link insert also undoes the task.

use crate::model::TabularModel;
use crate::schema::{ColumnKind, TableDef};
use crate::validation::{FieldValues, ValidationOutcome, validate};
use crate::{Database, DbError, describe, write_error};
use outsource_app::{ProjectId, ProjectTaskId, TaskId, Value};
use postgres::types::ToSql;

pub struct RowWriter<'a> {
    db: &'a Database,
}

impl<'a> RowWriter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Validates, inserts, and refreshes the model so the cache reflects the
    /// new row. Returns the server-generated primary key.
    pub fn insert_row(
        &self,
        model: &mut TabularModel,
        fields: &FieldValues,
    ) -> Result<i32, DbError> {
        let table = model.table();
        self.check(table, fields)?;

        let (sql, params) = insert_sql(table, fields);
        self.db.count_statements(1);
        let id: i32 = self
            .db
            .with_transaction(|transaction| {
                transaction
                    .query_one(sql.as_str(), &param_refs(&params))
                    .map(|row| row.get(0))
            })
            .map_err(|error| {
                let mapped = write_error(error);
                self.db
                    .log(&format!("insert into {} failed: {mapped}", table.name));
                mapped
            })?;

        self.db
            .log(&format!("inserted {} row id {id}", table.name));
        model.refresh(self.db)?;
        Ok(id)
    }

    /// Inserts a task and its project link in one transaction. If the link
    /// insert fails (for instance the project id does not exist) the task
    /// insert is rolled back with it; the database never holds a task whose
    /// intended link was lost.
    pub fn insert_task_with_project_link(
        &self,
        task_model: &mut TabularModel,
        link_model: &mut TabularModel,
        task_fields: &FieldValues,
        project_id: ProjectId,
    ) -> Result<(TaskId, ProjectTaskId), DbError> {
        let task_table = task_model.table();
        let link_table = link_model.table();
        if task_table.name != "task" {
            return Err(DbError::UnknownTable(task_table.name.to_owned()));
        }
        if link_table.name != "project_task" {
            return Err(DbError::UnknownTable(link_table.name.to_owned()));
        }
        self.check(task_table, task_fields)?;

        let (task_sql, task_params) = insert_sql(task_table, task_fields);
        let link_sql = format!(
            "INSERT INTO {} (project_id, task_id) VALUES ($1, $2) RETURNING id",
            link_table.name
        );

        self.db.count_statements(2);
        let result = self.db.with_transaction(|transaction| {
            let task_id: i32 = transaction
                .query_one(task_sql.as_str(), &param_refs(&task_params))
                .map(|row| row.get(0))
                .map_err(LinkedInsertError::Task)?;
            let link_id: i32 = transaction
                .query_one(link_sql.as_str(), &[&project_id.get(), &task_id])
                .map(|row| row.get(0))
                .map_err(LinkedInsertError::Link)?;
            Ok::<_, LinkedInsertError>((task_id, link_id))
        });

        let (task_id, link_id) = result.map_err(|error| {
            let mapped = error.into_db_error();
            self.db.log(&format!(
                "task with project {} link failed: {mapped}",
                project_id.get()
            ));
            mapped
        })?;

        self.db.log(&format!(
            "inserted task id {task_id} linked to project {} (link id {link_id})",
            project_id.get()
        ));
        task_model.refresh(self.db)?;
        link_model.refresh(self.db)?;
        Ok((TaskId::new(task_id), ProjectTaskId::new(link_id)))
    }

    fn check(&self, table: &TableDef, fields: &FieldValues) -> Result<(), DbError> {
        match validate(table, fields) {
            ValidationOutcome::Valid => Ok(()),
            ValidationOutcome::Invalid(errors) => {
                let detail = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                self.db
                    .log(&format!("insert into {} rejected: {detail}", table.name));
                Err(DbError::Validation(errors))
            }
        }
    }
}

/// Distinguishes which statement of the linked insert failed. A commit
/// failure is attributed to the link step, the last one the caller asked for.
enum LinkedInsertError {
    Task(postgres::Error),
    Link(postgres::Error),
}

impl From<postgres::Error> for LinkedInsertError {
    fn from(error: postgres::Error) -> Self {
        Self::Link(error)
    }
}

impl LinkedInsertError {
    fn into_db_error(self) -> DbError {
        match self {
            Self::Task(error) => write_error(error),
            Self::Link(error) => {
                if error.is_closed() {
                    DbError::Connection(describe(&error))
                } else {
                    DbError::LinkInsert(describe(&error))
                }
            }
        }
    }
}

/// Builds `INSERT INTO t (a, b) VALUES ($1, $2) RETURNING id` over the
/// supplied fields, in schema column order, skipping the generated key and
/// absent values.
fn insert_sql(
    table: &TableDef,
    fields: &FieldValues,
) -> (String, Vec<Box<dyn ToSql + Sync>>) {
    let mut names = Vec::new();
    let mut params: Vec<Box<dyn ToSql + Sync>> = Vec::new();
    for column in table.columns {
        if column.name == table.primary_key {
            continue;
        }
        let Some(value) = fields.get(column.name) else {
            continue;
        };
        names.push(column.name);
        params.push(sql_param(column.kind, value));
    }
    let placeholders = (1..=params.len())
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table.name,
        names.join(", "),
        placeholders,
        table.primary_key
    );
    (sql, params)
}

fn param_refs(params: &[Box<dyn ToSql + Sync>]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|param| &**param).collect()
}

/// NULL must be bound with the column's wire type, so each kind gets its own
/// typed `None` rather than one untyped null.
fn sql_param(kind: ColumnKind, value: &Value) -> Box<dyn ToSql + Sync> {
    match value {
        Value::Null => match kind {
            ColumnKind::Integer => Box::new(Option::<i32>::None),
            ColumnKind::Text => Box::new(Option::<String>::None),
            ColumnKind::Date => Box::new(Option::<time::Date>::None),
            ColumnKind::Boolean => Box::new(Option::<bool>::None),
            ColumnKind::TextArray => Box::new(Option::<Vec<String>>::None),
        },
        Value::Integer(n) => Box::new(*n),
        Value::Text(text) => Box::new(text.clone()),
        Value::Date(date) => Box::new(*date),
        Value::Bool(flag) => Box::new(*flag),
        Value::TextArray(values) => Box::new(values.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::insert_sql;
    use crate::schema::{EMPLOYEE, PROJECT_TASK, TASK};
    use crate::validation::FieldValues;
    use outsource_app::Value;

    #[test]
    fn insert_sql_follows_schema_column_order() {
        let fields = FieldValues::new()
            .with("duty", Value::text("Backend"))
            .with("age", Value::Integer(30))
            .with("salary", Value::Integer(100_000))
            .with("full_name", Value::text("Иванов Иван Иванович"));
        let (sql, params) = insert_sql(&EMPLOYEE, &fields);
        assert_eq!(
            sql,
            "INSERT INTO employee (full_name, age, salary, duty) \
             VALUES ($1, $2, $3, $4) RETURNING id"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn absent_optional_columns_are_left_to_the_server() {
        let fields = FieldValues::new()
            .with("employee_id", Value::Integer(1))
            .with("name", Value::text("Разгром"))
            .with("status", Value::text("Новая"));
        let (sql, params) = insert_sql(&TASK, &fields);
        assert_eq!(
            sql,
            "INSERT INTO task (employee_id, name, status) \
             VALUES ($1, $2, $3) RETURNING id"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn explicit_null_is_still_bound() {
        let fields = FieldValues::new()
            .with("project_id", Value::Integer(1))
            .with("task_id", Value::Null);
        let (sql, params) = insert_sql(&PROJECT_TASK, &fields);
        assert_eq!(
            sql,
            "INSERT INTO project_task (project_id, task_id) \
             VALUES ($1, $2) RETURNING id"
        );
        assert_eq!(params.len(), 2);
    }
}
