//! Operations available to migration handlers.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::condition::Condition;
use crate::config::Pepper;
use crate::ddl::{create_table_statement, validate_identifier};
use crate::error::Error;
use crate::hashing::{self, HashedValue};
use crate::table::Table;

/// A value written by [`MigrationTable::insert_or_ignore`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
    /// Expands into the digest, salt and algorithm columns of a hashed field.
    Hashed(HashedValue),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<HashedValue> for FieldValue {
    fn from(value: HashedValue) -> Self {
        FieldValue::Hashed(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Map logical fields of `table` to physical columns and the values bound to them.
pub(crate) fn physical_columns<K, I>(table: &str, fields: I) -> Vec<(String, Value)>
where
    K: AsRef<str>,
    I: IntoIterator<Item = (K, FieldValue)>,
{
    let mut columns = Vec::new();
    for (field, value) in fields {
        let field = field.as_ref();
        match value {
            FieldValue::Hashed(hashed) => {
                let [digest, salt, algorithm] = Table::hashed_column_names(table, field);
                columns.push((digest, Value::Text(hashed.digest)));
                columns.push((salt, Value::Text(hashed.salt)));
                columns.push((algorithm, Value::Text(hashed.algorithm.as_str().to_string())));
            }
            FieldValue::Integer(n) => {
                columns.push((Table::field_column_name(table, field), Value::Integer(n)))
            }
            FieldValue::Text(s) => {
                columns.push((Table::field_column_name(table, field), Value::Text(s)))
            }
            FieldValue::Null => columns.push((Table::field_column_name(table, field), Value::Null)),
        }
    }
    columns
}

/// The API a migration handler uses to change the schema and seed rows.
///
/// Schema operations are guarded so that replaying a handler is harmless: tables are created
/// with `IF NOT EXISTS`, dropped with `IF EXISTS`, and rows are inserted with `OR IGNORE`.
/// Row deletion is not: `delete_where` on a missing table is an error. Downs run in ascending
/// ordinal order, so a `down` that deletes rows usually runs after a lower ordinal's `down`
/// has dropped the table; check [`MigrationTable::table_exists`] first.
///
/// ```
/// use nitrate_migrate::{FieldValue, MigrationTable, Modifiers, Pepper};
/// use rusqlite::Connection;
///
/// let conn = Connection::open_in_memory().unwrap();
/// let pepper = Pepper::new("pepper");
/// let table = MigrationTable::new(&conn, &pepper);
///
/// table.create_table_if_not_exists("users", |t| {
///     t.primary_key()
///         .text("username", Modifiers::UNIQUE)
///         .hashed("password", Modifiers::NONE)
///         .timestamps();
/// }).unwrap();
///
/// let password = table.hash("hunter2");
/// let inserted = table
///     .insert_or_ignore(
///         "users",
///         [("username", FieldValue::from("admin")), ("password", password.into())],
///     )
///     .unwrap();
/// assert_eq!(inserted, 1);
///
/// let deleted = table
///     .delete_where("users", |c| c.equals(c.column("username"), c.string_literal("admin")))
///     .unwrap();
/// assert_eq!(deleted, 1);
/// ```
pub struct MigrationTable<'a> {
    conn: &'a Connection,
    pepper: &'a Pepper,
}

impl<'a> MigrationTable<'a> {
    pub fn new(conn: &'a Connection, pepper: &'a Pepper) -> Self {
        Self { conn, pepper }
    }

    /// The live connection, for anything the table API does not cover.
    pub fn connection(&self) -> &Connection {
        self.conn
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, Error> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn drop_table_if_exists(&self, name: &str) -> Result<(), Error> {
        validate_identifier("table", name)?;
        self.conn
            .execute(&format!("DROP TABLE IF EXISTS {};", name), [])?;

        #[cfg(feature = "tracing")]
        tracing::info!(table = name, "Dropped table");

        Ok(())
    }

    /// Build the columns of `name` with `build` and create the table unless it already exists.
    pub fn create_table_if_not_exists<F>(&self, name: &str, build: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Table),
    {
        let mut table = Table::new(name);
        build(&mut table);
        let statement = create_table_statement(&table)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(table = name, sql = %statement, "Creating table");

        self.conn.execute(&statement, [])?;

        #[cfg(feature = "tracing")]
        tracing::info!(table = name, "Created table");

        Ok(())
    }

    /// Insert one row, silently skipping it when it conflicts with a primary key or unique
    /// constraint. Returns the number of rows written (0 or 1).
    pub fn insert_or_ignore<K, I>(&self, name: &str, fields: I) -> Result<usize, Error>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, FieldValue)>,
    {
        validate_identifier("table", name)?;
        let columns = physical_columns(name, fields);
        if columns.is_empty() {
            return Err(Error::Config(format!(
                "insert into '{}' needs at least one field",
                name
            )));
        }
        for (column, _) in &columns {
            validate_identifier("column", column)?;
        }

        let names: Vec<&str> = columns.iter().map(|(column, _)| column.as_str()).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let statement = format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({});",
            name,
            names.join(", "),
            placeholders.join(", ")
        );
        let inserted = self
            .conn
            .execute(&statement, params_from_iter(columns.iter().map(|(_, v)| v)))?;

        #[cfg(feature = "tracing")]
        tracing::info!(table = name, inserted = inserted, "Inserted entry");

        Ok(inserted)
    }

    /// Delete the rows of `name` matching the expression built by `condition`.
    /// Returns the number of rows deleted.
    pub fn delete_where<F>(&self, name: &str, condition: F) -> Result<usize, Error>
    where
        F: FnOnce(&Condition<'_>) -> String,
    {
        validate_identifier("table", name)?;
        let expression = condition(&Condition::new(name));
        let deleted = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE ({});", name, expression), [])?;

        #[cfg(feature = "tracing")]
        tracing::info!(table = name, deleted = deleted, "Deleted entries");

        Ok(deleted)
    }

    /// Hash `plaintext` with the configured pepper. See [`hashing`](crate::hashing).
    pub fn hash(&self, plaintext: &str) -> HashedValue {
        hashing::hash(self.pepper, plaintext)
    }
}
