//! Volatile row-oriented storage.
//!
//! A [`Database`] owns every [`Table`] by name. Tables keep a fixed
//! [`Schema`] and an append-only vector of rows; rows are validated
//! against the schema before they are stored.

use crate::error::{Error, Result};
use crate::sql::types::{Row, Schema};
use ahash::AHashMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    schema: Schema,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Checks width, nullability and declared type of every value.
    pub fn validate_row(&self, row: &Row) -> Result<()> {
        if row.len() != self.schema.len() {
            return Err(Error::RowWidthMismatch {
                table: self.name.clone(),
                expected: self.schema.len(),
                found: row.len(),
            });
        }

        for (column, value) in self.schema.columns().iter().zip(row) {
            match value.data_type() {
                None if !column.nullable => {
                    return Err(Error::NullConstraintViolation(column.name.clone()));
                }
                Some(found) if found != column.data_type => {
                    return Err(Error::TypeMismatch {
                        column: column.name.clone(),
                        expected: column.data_type,
                        found,
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn insert_row(&mut self, row: Row) -> Result<()> {
        self.validate_row(&row)?;
        self.rows.push(row);
        Ok(())
    }

    /// Appends all rows or none: every row is validated before the first
    /// one is stored.
    pub fn insert_rows(&mut self, rows: Vec<Row>) -> Result<usize> {
        for row in &rows {
            self.validate_row(row)?;
        }
        let count = rows.len();
        self.rows.extend(rows);
        debug!(table = %self.name, rows = count, "Appended rows");
        Ok(count)
    }
}

/// Owner of all tables for one session.
#[derive(Debug, Default)]
pub struct Database {
    tables: AHashMap<String, Table>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&mut self, name: &str, schema: Schema) -> Result<&mut Table> {
        if self.tables.contains_key(name) {
            return Err(Error::TableAlreadyExists(name.to_string()));
        }
        info!(table = %name, columns = schema.len(), "Created table");
        Ok(self
            .tables
            .entry(name.to_string())
            .or_insert_with(|| Table::new(name, schema)))
    }

    /// Removes the table and hands it back, `None` if it did not exist.
    pub fn drop_table(&mut self, name: &str) -> Option<Table> {
        let dropped = self.tables.remove(name);
        if dropped.is_some() {
            info!(table = %name, "Dropped table");
        }
        dropped
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in ascending order.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::types::{Column, DataType, Value};

    fn users_schema() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Integer).not_null(),
            Column::new("name", DataType::Text),
        ])
        .unwrap()
    }

    #[test]
    fn test_insert_and_read_back() {
        let mut table = Table::new("users", users_schema());
        table
            .insert_row(vec![Value::Integer(1), Value::Text("Alice".into())])
            .unwrap();
        table.insert_row(vec![Value::Integer(2), Value::Null]).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[1], vec![Value::Integer(2), Value::Null]);
    }

    #[test]
    fn test_validation_failures() {
        let mut table = Table::new("users", users_schema());

        assert!(matches!(
            table.insert_row(vec![Value::Integer(1)]),
            Err(Error::RowWidthMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
        assert!(matches!(
            table.insert_row(vec![Value::Null, Value::Text("x".into())]),
            Err(Error::NullConstraintViolation(column)) if column == "id"
        ));
        assert!(matches!(
            table.insert_row(vec![Value::Text("1".into()), Value::Null]),
            Err(Error::TypeMismatch {
                expected: DataType::Integer,
                found: DataType::Text,
                ..
            })
        ));
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_insert_rows_is_all_or_nothing() {
        let mut table = Table::new("users", users_schema());
        let rows = vec![
            vec![Value::Integer(1), Value::Text("a".into())],
            vec![Value::Integer(2), Value::Boolean(true)],
        ];

        assert!(table.insert_rows(rows).is_err());
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_database_lifecycle() {
        let mut db = Database::new();
        db.create_table("users", users_schema()).unwrap();
        db.create_table("accounts", users_schema()).unwrap();

        assert!(matches!(
            db.create_table("users", users_schema()),
            Err(Error::TableAlreadyExists(_))
        ));
        assert_eq!(db.table_names(), vec!["accounts".to_string(), "users".to_string()]);

        assert!(db.drop_table("users").is_some());
        assert!(db.drop_table("users").is_none());
        assert!(!db.has_table("users"));
        assert!(matches!(db.table("users"), Err(Error::TableNotFound(_))));
        assert_eq!(db.len(), 1);
    }
}
