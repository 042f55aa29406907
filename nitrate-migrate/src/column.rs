//! The column model: types, modifier flags and default values of a single column.

use chrono::NaiveDateTime;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Format used for fixed timestamp defaults.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Timestamp,
}

impl ColumnType {
    /// The type name used in `CREATE TABLE` statements.
    pub fn sql_name(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Timestamp => "DATETIME",
        }
    }
}

/// Set of column modifier flags.
///
/// ```
/// use nitrate_migrate::Modifiers;
///
/// let mods = Modifiers::UNIQUE | Modifiers::NULLABLE;
/// assert!(mods.is_unique());
/// assert!(mods.is_nullable());
/// assert!(!mods.is_auto_increment());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const AUTO_INCREMENT: Modifiers = Modifiers(1 << 0);
    pub const UNIQUE: Modifiers = Modifiers(1 << 1);
    pub const NULLABLE: Modifiers = Modifiers(1 << 2);
    pub const HAS_DEFAULT: Modifiers = Modifiers(1 << 3);

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    pub fn without(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 & !other.0)
    }

    pub fn is_auto_increment(self) -> bool {
        self.contains(Self::AUTO_INCREMENT)
    }

    pub fn is_unique(self) -> bool {
        self.contains(Self::UNIQUE)
    }

    pub fn is_nullable(self) -> bool {
        self.contains(Self::NULLABLE)
    }

    pub fn has_default(self) -> bool {
        self.contains(Self::HAS_DEFAULT)
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        self.with(rhs)
    }
}

impl BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        *self = self.with(rhs);
    }
}

impl fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::AUTO_INCREMENT, "AUTO_INCREMENT"),
            (Self::UNIQUE, "UNIQUE"),
            (Self::NULLABLE, "NULLABLE"),
            (Self::HAS_DEFAULT, "HAS_DEFAULT"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            write!(f, "Modifiers(NONE)")
        } else {
            write!(f, "Modifiers({})", set.join(" | "))
        }
    }
}

/// Default value of a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Integer(i64),
    Text(String),
    Timestamp(NaiveDateTime),
    /// Evaluated by the database when the row is inserted.
    CurrentTimestamp,
}

impl DefaultValue {
    /// The value without any quoting. How it ends up in DDL depends on the column type.
    pub fn raw(&self) -> String {
        match self {
            DefaultValue::Integer(n) => n.to_string(),
            DefaultValue::Text(s) => s.clone(),
            DefaultValue::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        }
    }

    /// Whether this value may be the default of a `column_type` column.
    pub fn fits(&self, column_type: ColumnType) -> bool {
        matches!(
            (column_type, self),
            (ColumnType::Integer, DefaultValue::Integer(_))
                | (ColumnType::Text, DefaultValue::Text(_))
                | (ColumnType::Timestamp, DefaultValue::Timestamp(_))
                | (ColumnType::Timestamp, DefaultValue::CurrentTimestamp)
        )
    }
}

impl From<i64> for DefaultValue {
    fn from(value: i64) -> Self {
        DefaultValue::Integer(value)
    }
}

impl From<&str> for DefaultValue {
    fn from(value: &str) -> Self {
        DefaultValue::Text(value.to_string())
    }
}

impl From<String> for DefaultValue {
    fn from(value: String) -> Self {
        DefaultValue::Text(value)
    }
}

impl From<NaiveDateTime> for DefaultValue {
    fn from(value: NaiveDateTime) -> Self {
        DefaultValue::Timestamp(value)
    }
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    column_type: ColumnType,
    name: String,
    modifiers: Modifiers,
    default: Option<DefaultValue>,
}

impl Column {
    /// The `HAS_DEFAULT` flag always mirrors whether `default` is present.
    pub fn new(
        column_type: ColumnType,
        name: impl Into<String>,
        modifiers: Modifiers,
        default: Option<DefaultValue>,
    ) -> Self {
        let modifiers = match default {
            Some(_) => modifiers.with(Modifiers::HAS_DEFAULT),
            None => modifiers.without(Modifiers::HAS_DEFAULT),
        };
        Self {
            column_type,
            name: name.into(),
            modifiers,
            default,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn default_presence_drives_has_default_flag() {
        let with = Column::new(
            ColumnType::Text,
            "users__role",
            Modifiers::NONE,
            Some("member".into()),
        );
        assert!(with.modifiers().has_default());

        let without = Column::new(
            ColumnType::Text,
            "users__role",
            Modifiers::HAS_DEFAULT | Modifiers::UNIQUE,
            None,
        );
        assert!(!without.modifiers().has_default());
        assert!(without.modifiers().is_unique());
    }

    #[test]
    fn flags_are_independent() {
        let mods = Modifiers::AUTO_INCREMENT | Modifiers::NULLABLE;
        assert!(mods.is_auto_increment());
        assert!(mods.is_nullable());
        assert!(!mods.is_unique());
        assert!(!mods.has_default());
        assert_eq!(mods.bits(), 0b0101);
        assert_eq!(format!("{:?}", mods), "Modifiers(AUTO_INCREMENT | NULLABLE)");
        assert_eq!(format!("{:?}", Modifiers::NONE), "Modifiers(NONE)");
    }

    #[test]
    fn raw_default_values() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(DefaultValue::from(ts).raw(), "2024-01-31 08:30:00");
        assert_eq!(DefaultValue::from(42i64).raw(), "42");
        assert_eq!(DefaultValue::CurrentTimestamp.raw(), "CURRENT_TIMESTAMP");
    }

    #[test]
    fn defaults_fit_their_own_type() {
        assert!(DefaultValue::Integer(0).fits(ColumnType::Integer));
        assert!(!DefaultValue::Text("0".into()).fits(ColumnType::Integer));
        assert!(DefaultValue::Text("x".into()).fits(ColumnType::Text));
        assert!(!DefaultValue::CurrentTimestamp.fits(ColumnType::Text));
        assert!(DefaultValue::CurrentTimestamp.fits(ColumnType::Timestamp));
        assert!(!DefaultValue::Integer(0).fits(ColumnType::Timestamp));
    }
}
