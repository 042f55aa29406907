//! Renders a [`Table`] into SQLite data-definition text.
//!
//! Constraint rules per column, in emission order:
//!
//! | column                         | suffix                          |
//! |--------------------------------|---------------------------------|
//! | the primary key                | `PRIMARY KEY AUTOINCREMENT`, nothing else |
//! | `AUTO_INCREMENT`               | `AUTOINCREMENT`                 |
//! | `UNIQUE`                       | `UNIQUE`                        |
//! | not (`NULLABLE` and `AUTO_INCREMENT`) | `NOT NULL`               |
//! | `HAS_DEFAULT`                  | `DEFAULT <literal>`             |
//!
//! The `NOT NULL` row is literal: a column is only left nullable when it carries both
//! `NULLABLE` and `AUTO_INCREMENT`. `AUTOINCREMENT` on a column other than the primary key
//! is emitted as written and rejected by SQLite when the statement runs.
//!
//! A default must match its column type (see [`DefaultValue::fits`]); anything else is
//! rejected before any text is rendered.

use crate::column::{Column, ColumnType, DefaultValue};
use crate::error::Error;
use crate::table::Table;

/// Check that `name` can be spliced into a statement as a bare identifier.
pub(crate) fn validate_identifier(what: &str, name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("invalid {} name '{}'", what, name)))
    }
}

/// Quote `text` as an SQL string literal.
pub(crate) fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Render the `DEFAULT` literal for `default` stored in a column of `column_type`.
pub fn default_literal(column_type: ColumnType, default: &DefaultValue) -> String {
    match column_type {
        ColumnType::Integer => match default {
            DefaultValue::Integer(n) => n.to_string(),
            other => quote_literal(&other.raw()),
        },
        ColumnType::Text => quote_literal(&default.raw()),
        ColumnType::Timestamp => match default {
            DefaultValue::CurrentTimestamp => default.raw(),
            other => quote_literal(&other.raw()),
        },
    }
}

/// Render one column clause. `is_primary_key` marks the table's key column.
pub fn compile_column(column: &Column, is_primary_key: bool) -> String {
    let mut clause = format!("{} {}", column.name(), column.column_type().sql_name());
    if is_primary_key {
        clause.push_str(" PRIMARY KEY AUTOINCREMENT");
        return clause;
    }

    let mods = column.modifiers();
    if mods.is_auto_increment() {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            column = column.name(),
            "AUTOINCREMENT requested on a column that is not the primary key"
        );
        clause.push_str(" AUTOINCREMENT");
    }
    if mods.is_unique() {
        clause.push_str(" UNIQUE");
    }
    if !(mods.is_nullable() && mods.is_auto_increment()) {
        clause.push_str(" NOT NULL");
    }
    if mods.has_default() {
        if let Some(default) = column.default() {
            clause.push_str(" DEFAULT ");
            clause.push_str(&default_literal(column.column_type(), default));
        }
    }
    clause
}

/// Render the comma-separated column definition list of `table`.
///
/// ```
/// use nitrate_migrate::{compile_column_list, Modifiers, Table};
///
/// let mut table = Table::new("users");
/// table.primary_key().text("username", Modifiers::UNIQUE).timestamps();
///
/// assert_eq!(
///     compile_column_list(&table).unwrap(),
///     "users_id INTEGER PRIMARY KEY AUTOINCREMENT, \
///      users__username TEXT UNIQUE NOT NULL, \
///      users__created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP, \
///      users__updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"
/// );
/// ```
pub fn compile_column_list(table: &Table) -> Result<String, Error> {
    if let Some(problem) = table.problems().first() {
        return Err(Error::Config(problem.clone()));
    }
    validate_identifier("table", table.name())?;
    if table.columns().is_empty() {
        return Err(Error::Config(format!(
            "table '{}' has no columns",
            table.name()
        )));
    }

    let mut clauses = Vec::with_capacity(table.columns().len());
    for (index, column) in table.columns().iter().enumerate() {
        validate_identifier("column", column.name())?;
        if let Some(default) = column.default() {
            if !default.fits(column.column_type()) {
                return Err(Error::Config(format!(
                    "default of column '{}' does not fit its {} type",
                    column.name(),
                    column.column_type().sql_name()
                )));
            }
        }
        clauses.push(compile_column(
            column,
            table.primary_key_index() == Some(index),
        ));
    }
    Ok(clauses.join(", "))
}

/// Render the guarded `CREATE TABLE IF NOT EXISTS` statement for `table`.
pub fn create_table_statement(table: &Table) -> Result<String, Error> {
    let columns = compile_column_list(table)?;
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        table.name(),
        columns
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Modifiers;
    use chrono::NaiveDate;

    fn text_column(modifiers: Modifiers, default: Option<DefaultValue>) -> Column {
        Column::new(ColumnType::Text, "t__f", modifiers, default)
    }

    #[test]
    fn suffix_rule_table() {
        let ai = Modifiers::AUTO_INCREMENT;
        let un = Modifiers::UNIQUE;
        let nu = Modifiers::NULLABLE;
        let cases = [
            (Modifiers::NONE, "t__f TEXT NOT NULL"),
            (un, "t__f TEXT UNIQUE NOT NULL"),
            (nu, "t__f TEXT NOT NULL"),
            (ai, "t__f TEXT AUTOINCREMENT NOT NULL"),
            (ai | nu, "t__f TEXT AUTOINCREMENT"),
            (ai | un, "t__f TEXT AUTOINCREMENT UNIQUE NOT NULL"),
            (ai | un | nu, "t__f TEXT AUTOINCREMENT UNIQUE"),
            (un | nu, "t__f TEXT UNIQUE NOT NULL"),
        ];
        for (mods, expected) in cases {
            assert_eq!(compile_column(&text_column(mods, None), false), expected, "{:?}", mods);
        }
    }

    #[test]
    fn default_suffix_follows_not_null() {
        let column = text_column(Modifiers::UNIQUE, Some("guest".into()));
        assert_eq!(
            compile_column(&column, false),
            "t__f TEXT UNIQUE NOT NULL DEFAULT 'guest'"
        );
    }

    #[test]
    fn nullable_auto_increment_default_through_table() {
        let mut table = Table::new("t");
        table.text_with_default(
            "f",
            Modifiers::AUTO_INCREMENT | Modifiers::NULLABLE,
            "x",
        );
        assert!(table.columns()[0].modifiers().has_default());
        assert_eq!(
            compile_column_list(&table).unwrap(),
            "t__f TEXT AUTOINCREMENT DEFAULT 'x'"
        );
    }

    #[test]
    fn compilation_is_pure() {
        let column = text_column(
            Modifiers::NULLABLE | Modifiers::AUTO_INCREMENT,
            Some("x".into()),
        );
        assert_eq!(compile_column(&column, false), compile_column(&column, false));
    }

    #[test]
    fn default_literals_depend_on_column_type() {
        let ts = NaiveDate::from_ymd_opt(2023, 12, 24)
            .unwrap()
            .and_hms_opt(18, 0, 5)
            .unwrap();
        assert_eq!(
            default_literal(ColumnType::Integer, &DefaultValue::Integer(-7)),
            "-7"
        );
        assert_eq!(
            default_literal(ColumnType::Text, &DefaultValue::Text("it's".into())),
            "'it''s'"
        );
        assert_eq!(
            default_literal(ColumnType::Timestamp, &DefaultValue::CurrentTimestamp),
            "CURRENT_TIMESTAMP"
        );
        assert_eq!(
            default_literal(ColumnType::Timestamp, &DefaultValue::Timestamp(ts)),
            "'2023-12-24 18:00:05'"
        );
        // the sentinel only means "now" on timestamp columns
        assert_eq!(
            default_literal(ColumnType::Text, &DefaultValue::CurrentTimestamp),
            "'CURRENT_TIMESTAMP'"
        );
    }

    #[test]
    fn rejects_defaults_of_another_type() {
        let mut text_into_integer = Table::new("t");
        text_into_integer.integer_with_default("n", Modifiers::NONE, "0, extra TEXT");
        assert_eq!(
            compile_column_list(&text_into_integer),
            Err(Error::Config(
                "default of column 't__n' does not fit its INTEGER type".to_string()
            ))
        );

        let mut now_into_text = Table::new("t");
        now_into_text.text_with_default("s", Modifiers::NONE, DefaultValue::CurrentTimestamp);
        assert!(matches!(
            compile_column_list(&now_into_text),
            Err(Error::Config(_))
        ));

        let mut number_into_timestamp = Table::new("t");
        number_into_timestamp.timestamp_with_default("at", Modifiers::NONE, 0i64);
        assert!(matches!(
            create_table_statement(&number_into_timestamp),
            Err(Error::Config(_))
        ));

        // rendered on its own, a stray value is still quoted
        assert_eq!(
            default_literal(ColumnType::Integer, &"0, extra TEXT".into()),
            "'0, extra TEXT'"
        );
    }

    #[test]
    fn primary_key_takes_no_other_suffix() {
        let column = Column::new(
            ColumnType::Integer,
            "users_id",
            Modifiers::AUTO_INCREMENT | Modifiers::UNIQUE,
            Some(DefaultValue::Integer(1)),
        );
        assert_eq!(
            compile_column(&column, true),
            "users_id INTEGER PRIMARY KEY AUTOINCREMENT"
        );
    }

    #[test]
    fn create_statement_wraps_column_list() {
        let mut table = Table::new("sessions");
        table
            .primary_key()
            .hashed("token", Modifiers::NONE)
            .integer_with_default("hits", Modifiers::NONE, 0i64);
        assert_eq!(
            create_table_statement(&table).unwrap(),
            "CREATE TABLE IF NOT EXISTS sessions (\
             sessions_id INTEGER PRIMARY KEY AUTOINCREMENT, \
             sessions_H_token TEXT NOT NULL, \
             sessions_HS_token TEXT NOT NULL, \
             sessions_HA_token TEXT NOT NULL, \
             sessions__hits INTEGER NOT NULL DEFAULT 0);"
        );
    }

    #[test]
    fn rejects_bad_names_and_duplicate_keys() {
        let mut bad_table = Table::new("users; DROP TABLE x");
        bad_table.primary_key();
        assert_eq!(
            compile_column_list(&bad_table),
            Err(Error::Config(
                "invalid table name 'users; DROP TABLE x'".to_string()
            ))
        );

        let mut bad_field = Table::new("users");
        bad_field.text("user name", Modifiers::NONE);
        assert_eq!(
            compile_column_list(&bad_field),
            Err(Error::Config(
                "invalid column name 'users__user name'".to_string()
            ))
        );

        let mut twice = Table::new("users");
        twice.primary_key().primary_key();
        assert!(matches!(compile_column_list(&twice), Err(Error::Config(_))));

        assert_eq!(
            compile_column_list(&Table::new("empty")),
            Err(Error::Config("table 'empty' has no columns".to_string()))
        );
    }
}
