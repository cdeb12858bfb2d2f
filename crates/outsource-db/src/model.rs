// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Read model for one table: a materialized cache of every row, refreshed by
//! re-running the full query. Sorting is delegated to the server so collation
//! of the Russian status labels matches what the database would show anyone
//! else; the client never reorders rows itself.

use crate::schema::{ColumnKind, TableDef};
use crate::{Database, DbError, describe, schema};
use outsource_app::{SortDirection, Value};

/// Read-only view of tabular data, addressed by (row, column) position.
/// Display layers depend on this rather than on `TabularModel` directly.
pub trait TableView {
    fn row_count(&self) -> usize;
    fn column_count(&self) -> usize;
    fn cell_at(&self, row: usize, column: usize) -> Result<String, DbError>;
    fn primary_key_at(&self, row: usize) -> Result<i32, DbError>;
}

#[derive(Debug)]
pub struct TabularModel {
    table: &'static TableDef,
    rows: Vec<Vec<Value>>,
    order_column: usize,
    order_direction: SortDirection,
}

impl TabularModel {
    /// Model over the named table, sorted by primary key ascending until the
    /// first `sort_by`. Starts empty; call `refresh` to populate.
    pub fn new(table_name: &str) -> Result<Self, DbError> {
        Ok(Self::for_table(schema::table_def(table_name)?))
    }

    pub fn for_table(table: &'static TableDef) -> Self {
        Self {
            order_column: table.primary_key_index(),
            order_direction: SortDirection::Asc,
            table,
            rows: Vec::new(),
        }
    }

    pub fn table(&self) -> &'static TableDef {
        self.table
    }

    pub fn column_titles(&self) -> Vec<&'static str> {
        self.table.columns.iter().map(|column| column.name).collect()
    }

    pub fn order(&self) -> (usize, SortDirection) {
        (self.order_column, self.order_direction)
    }

    /// Re-runs the full query under the active ordering and replaces the
    /// cache. On failure the previous cache is kept intact.
    pub fn refresh(&mut self, db: &Database) -> Result<(), DbError> {
        let rows = self.fetch(db, self.order_column, self.order_direction)?;
        self.rows = rows;
        Ok(())
    }

    /// Changes the ordering by re-querying the server, never by reordering
    /// the cache locally. A failed re-query leaves both the cache and the
    /// previously active ordering untouched.
    pub fn sort_by(
        &mut self,
        db: &Database,
        column: usize,
        direction: SortDirection,
    ) -> Result<(), DbError> {
        if column >= self.table.columns.len() {
            return Err(DbError::InvalidColumn {
                index: column,
                len: self.table.columns.len(),
            });
        }
        let rows = self.fetch(db, column, direction)?;
        self.rows = rows;
        self.order_column = column;
        self.order_direction = direction;
        Ok(())
    }

    fn fetch(
        &self,
        db: &Database,
        column: usize,
        direction: SortDirection,
    ) -> Result<Vec<Vec<Value>>, DbError> {
        let sql = self.select_sql(column, direction);
        let rows = db.query(&sql, &[]).map_err(|error| {
            let cause = describe(&error);
            db.log(&format!("query on {} failed: {cause}", self.table.name));
            DbError::Query(cause)
        })?;
        rows.iter().map(|row| self.decode_row(row)).collect()
    }

    fn select_sql(&self, column: usize, direction: SortDirection) -> String {
        let columns = self.column_titles().join(", ");
        format!(
            "SELECT {columns} FROM {} ORDER BY {} {}",
            self.table.name,
            self.table.columns[column].name,
            direction.as_sql()
        )
    }

    fn decode_row(&self, row: &postgres::Row) -> Result<Vec<Value>, DbError> {
        self.table
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| decode_cell(row, index, column.kind))
            .collect()
    }

    /// Cache reads report any out-of-range index, row or column, as
    /// `IndexOutOfRange`; `InvalidColumn` is reserved for `sort_by`.
    pub fn value_at(&self, row: usize, column: usize) -> Result<&Value, DbError> {
        let cells = self.rows.get(row).ok_or(DbError::IndexOutOfRange {
            index: row,
            len: self.rows.len(),
        })?;
        cells.get(column).ok_or(DbError::IndexOutOfRange {
            index: column,
            len: cells.len(),
        })
    }

    #[cfg(test)]
    fn with_rows(table: &'static TableDef, rows: Vec<Vec<Value>>) -> Self {
        let mut model = Self::for_table(table);
        model.rows = rows;
        model
    }
}

impl TableView for TabularModel {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        self.table.columns.len()
    }

    fn cell_at(&self, row: usize, column: usize) -> Result<String, DbError> {
        Ok(self.value_at(row, column)?.display())
    }

    fn primary_key_at(&self, row: usize) -> Result<i32, DbError> {
        let value = self.value_at(row, self.table.primary_key_index())?;
        value.as_integer().ok_or_else(|| {
            DbError::Query(format!(
                "primary key of {} row {row} is not an integer",
                self.table.name
            ))
        })
    }
}

fn decode_cell(row: &postgres::Row, index: usize, kind: ColumnKind) -> Result<Value, DbError> {
    fn get<'a, T>(row: &'a postgres::Row, index: usize) -> Result<Option<T>, DbError>
    where
        T: postgres::types::FromSql<'a>,
    {
        row.try_get(index)
            .map_err(|error| DbError::Query(describe(&error)))
    }

    let value = match kind {
        ColumnKind::Integer => get::<i32>(row, index)?.map(Value::Integer),
        ColumnKind::Text => get::<String>(row, index)?.map(Value::Text),
        ColumnKind::Date => get::<time::Date>(row, index)?.map(Value::Date),
        ColumnKind::Boolean => get::<bool>(row, index)?.map(Value::Bool),
        ColumnKind::TextArray => get::<Vec<String>>(row, index)?.map(Value::TextArray),
    };
    Ok(value.unwrap_or(Value::Null))
}
