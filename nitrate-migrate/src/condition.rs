//! Minimal expression builder for `DELETE ... WHERE` clauses.

use crate::ddl::quote_literal;
use crate::table::Table;

/// Builds equality expressions over the columns of one table.
///
/// Only what row deletion in migrations needs: a qualified column, a string literal and `==`.
///
/// ```
/// use nitrate_migrate::Condition;
///
/// let c = Condition::new("users");
/// assert_eq!(
///     c.equals(c.column("username"), c.string_literal("admin")),
///     "users.users__username == 'admin'"
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Condition<'a> {
    table: &'a str,
}

impl<'a> Condition<'a> {
    pub fn new(table: &'a str) -> Self {
        Self { table }
    }

    pub fn equals(&self, left: impl AsRef<str>, right: impl AsRef<str>) -> String {
        format!("{} == {}", left.as_ref(), right.as_ref())
    }

    /// The qualified physical name of a regular field, `<table>.<table>__<field>`.
    pub fn column(&self, field: &str) -> String {
        format!(
            "{}.{}",
            self.table,
            Table::field_column_name(self.table, field)
        )
    }

    pub fn string_literal(&self, text: &str) -> String {
        quote_literal(text)
    }
}
