use crate::error::Error;
use crate::migration_table::MigrationTable;
use std::fmt;

/// Which handler of a migration runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// A migration's pair of handlers.
///
/// The ordinal of a migration is not part of the trait: it comes from the name of the
/// migration files on disk, and the [`Registry`](crate::Registry) maps that name to the
/// implementation.
///
/// Handlers may run many times. Every invocation of the runner replays `up` for each ordinal
/// at or below the target and `down` for each one above it, so handlers should stick to the
/// guarded operations of [`MigrationTable`].
///
/// Downs also run in ascending ordinal order: a `down` may run after a lower ordinal's `down`
/// has already dropped the table it touches. A `down` that deletes rows should check
/// [`MigrationTable::table_exists`] first.
///
/// ```
/// use nitrate_migrate::{Error, Migration, MigrationTable, Modifiers};
///
/// struct CreateUsersTable;
///
/// impl Migration for CreateUsersTable {
///     fn up(&self, table: &MigrationTable) -> Result<(), Error> {
///         table.create_table_if_not_exists("users", |t| {
///             t.primary_key().text("username", Modifiers::UNIQUE).timestamps();
///         })
///     }
///
///     fn down(&self, table: &MigrationTable) -> Result<(), Error> {
///         table.drop_table_if_exists("users")
///     }
/// }
/// ```
pub trait Migration {
    /// Optional human-readable description, only used for listing and logs.
    fn description(&self) -> Option<&'static str> {
        None
    }

    /// Apply the migration.
    fn up(&self, table: &MigrationTable) -> Result<(), Error>;

    /// Revert the migration.
    fn down(&self, table: &MigrationTable) -> Result<(), Error>;
}

impl<'a> fmt::Debug for dyn Migration + 'a {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("description", &self.description())
            .finish()
    }
}

/// One handler invocation in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStep {
    pub ordinal: u32,
    pub identifier: String,
    pub direction: Direction,
}

/// A report of the handlers executed by one runner invocation, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub target: i64,
    pub steps: Vec<MigrationStep>,
}

impl MigrationReport {
    /// Ordinals whose `up` handler ran.
    pub fn applied_up(&self) -> Vec<u32> {
        self.ordinals(Direction::Up)
    }

    /// Ordinals whose `down` handler ran.
    pub fn applied_down(&self) -> Vec<u32> {
        self.ordinals(Direction::Down)
    }

    fn ordinals(&self, direction: Direction) -> Vec<u32> {
        self.steps
            .iter()
            .filter(|step| step.direction == direction)
            .map(|step| step.ordinal)
            .collect()
    }
}

/// Adapts a pair of functions to [`Migration`].
pub(crate) struct FnMigration<U, D> {
    pub up: U,
    pub down: D,
}

impl<U, D> Migration for FnMigration<U, D>
where
    U: Fn(&MigrationTable) -> Result<(), Error>,
    D: Fn(&MigrationTable) -> Result<(), Error>,
{
    fn up(&self, table: &MigrationTable) -> Result<(), Error> {
        (self.up)(table)
    }

    fn down(&self, table: &MigrationTable) -> Result<(), Error> {
        (self.down)(table)
    }
}
