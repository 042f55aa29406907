//! Table DSL - accumulates the columns of one table
//!
//! Column names are derived from the table name so that they stay unique across tables:
//! - primary key: `<table>_id`
//! - regular fields: `<table>__<field>`
//! - hashed fields: `<table>_H_<field>`, `<table>_HS_<field>`, `<table>_HA_<field>`

use crate::column::{Column, ColumnType, DefaultValue, Modifiers};

/// Builder for the columns of a single table.
///
/// A fresh `Table` is handed to the closure passed to
/// [`MigrationTable::create_table_if_not_exists`](crate::MigrationTable::create_table_if_not_exists).
///
/// ```
/// use nitrate_migrate::{Modifiers, Table};
///
/// let mut table = Table::new("users");
/// table
///     .primary_key()
///     .text("username", Modifiers::UNIQUE)
///     .hashed("password", Modifiers::NONE)
///     .timestamps();
///
/// let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
/// assert_eq!(
///     names,
///     vec![
///         "users_id",
///         "users__username",
///         "users_H_password",
///         "users_HS_password",
///         "users_HA_password",
///         "users__created_at",
///         "users__updated_at",
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    primary_key: Option<usize>,
    problems: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            problems: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Index of the primary key column in [`Table::columns`], if one was declared.
    pub fn primary_key_index(&self) -> Option<usize> {
        self.primary_key
    }

    /// Definition errors recorded while building, reported when the table is compiled.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Physical name of a regular field.
    pub fn field_column_name(table: &str, field: &str) -> String {
        format!("{}__{}", table, field)
    }

    /// Physical names of a hashed field: digest, salt and pre-hash algorithm, in that order.
    pub fn hashed_column_names(table: &str, field: &str) -> [String; 3] {
        [
            format!("{}_H_{}", table, field),
            format!("{}_HS_{}", table, field),
            format!("{}_HA_{}", table, field),
        ]
    }

    /// Append the auto-incrementing integer key `<table>_id`.
    /// A table has at most one primary key; declaring a second one is reported on compile.
    pub fn primary_key(&mut self) -> &mut Self {
        if self.primary_key.is_some() {
            self.problems.push(format!(
                "table '{}' declares its primary key more than once",
                self.name
            ));
            return self;
        }
        self.columns.push(Column::new(
            ColumnType::Integer,
            format!("{}_id", self.name),
            Modifiers::AUTO_INCREMENT,
            None,
        ));
        self.primary_key = Some(self.columns.len() - 1);
        self
    }

    pub fn integer(&mut self, field: &str, modifiers: Modifiers) -> &mut Self {
        self.push_field(ColumnType::Integer, field, modifiers, None)
    }

    pub fn integer_with_default(
        &mut self,
        field: &str,
        modifiers: Modifiers,
        default: impl Into<DefaultValue>,
    ) -> &mut Self {
        self.push_field(ColumnType::Integer, field, modifiers, Some(default.into()))
    }

    pub fn text(&mut self, field: &str, modifiers: Modifiers) -> &mut Self {
        self.push_field(ColumnType::Text, field, modifiers, None)
    }

    pub fn text_with_default(
        &mut self,
        field: &str,
        modifiers: Modifiers,
        default: impl Into<DefaultValue>,
    ) -> &mut Self {
        self.push_field(ColumnType::Text, field, modifiers, Some(default.into()))
    }

    pub fn timestamp(&mut self, field: &str, modifiers: Modifiers) -> &mut Self {
        self.push_field(ColumnType::Timestamp, field, modifiers, None)
    }

    pub fn timestamp_with_default(
        &mut self,
        field: &str,
        modifiers: Modifiers,
        default: impl Into<DefaultValue>,
    ) -> &mut Self {
        self.push_field(ColumnType::Timestamp, field, modifiers, Some(default.into()))
    }

    /// Append the three text columns storing a hashed credential.
    pub fn hashed(&mut self, field: &str, modifiers: Modifiers) -> &mut Self {
        self.push_hashed(field, modifiers, None)
    }

    pub fn hashed_with_default(
        &mut self,
        field: &str,
        modifiers: Modifiers,
        default: impl Into<DefaultValue>,
    ) -> &mut Self {
        self.push_hashed(field, modifiers, Some(default.into()))
    }

    /// Append `created_at` and `updated_at`, both filled in by the database on insert.
    pub fn timestamps(&mut self) -> &mut Self {
        self.timestamp_with_default("created_at", Modifiers::NONE, DefaultValue::CurrentTimestamp)
            .timestamp_with_default("updated_at", Modifiers::NONE, DefaultValue::CurrentTimestamp)
    }

    fn push_field(
        &mut self,
        column_type: ColumnType,
        field: &str,
        modifiers: Modifiers,
        default: Option<DefaultValue>,
    ) -> &mut Self {
        self.columns.push(Column::new(
            column_type,
            Self::field_column_name(&self.name, field),
            modifiers,
            default,
        ));
        self
    }

    fn push_hashed(
        &mut self,
        field: &str,
        modifiers: Modifiers,
        default: Option<DefaultValue>,
    ) -> &mut Self {
        for name in Self::hashed_column_names(&self.name, field) {
            self.columns.push(Column::new(
                ColumnType::Text,
                name,
                modifiers,
                default.clone(),
            ));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_key_is_auto_increment_integer() {
        let mut table = Table::new("posts");
        table.text("title", Modifiers::NONE).primary_key();

        assert_eq!(table.primary_key_index(), Some(1));
        let key = &table.columns()[1];
        assert_eq!(key.name(), "posts_id");
        assert_eq!(key.column_type(), ColumnType::Integer);
        assert!(key.modifiers().is_auto_increment());
        assert!(table.problems().is_empty());
    }

    #[test]
    fn second_primary_key_is_recorded_as_problem() {
        let mut table = Table::new("posts");
        table.primary_key().primary_key();

        assert_eq!(table.columns().len(), 1);
        assert_eq!(table.primary_key_index(), Some(0));
        assert_eq!(
            table.problems().to_vec(),
            vec!["table 'posts' declares its primary key more than once".to_string()]
        );
    }

    #[test]
    fn hashed_field_expands_to_three_matching_columns() {
        let mods = Modifiers::UNIQUE | Modifiers::NULLABLE;
        let mut table = Table::new("users");
        table.hashed_with_default("token", mods, "none");

        let columns = table.columns();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name(), "users_H_token");
        assert_eq!(columns[1].name(), "users_HS_token");
        assert_eq!(columns[2].name(), "users_HA_token");
        for column in columns {
            assert_eq!(column.column_type(), ColumnType::Text);
            assert_eq!(column.modifiers(), mods | Modifiers::HAS_DEFAULT);
            assert_eq!(column.default(), Some(&DefaultValue::Text("none".to_string())));
        }
    }

    #[test]
    fn timestamps_default_to_database_now() {
        let mut table = Table::new("users");
        table.timestamps();

        let columns = table.columns();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name(), "users__created_at");
        assert_eq!(columns[1].name(), "users__updated_at");
        for column in columns {
            assert_eq!(column.column_type(), ColumnType::Timestamp);
            assert!(column.modifiers().has_default());
            assert_eq!(column.default(), Some(&DefaultValue::CurrentTimestamp));
        }
    }

    #[test]
    fn supplied_default_forces_has_default() {
        let mut table = Table::new("settings");
        table.integer_with_default("retries", Modifiers::NONE, 3i64);
        assert!(table.columns()[0].modifiers().has_default());
    }
}
