//! Testing utilities for migration development.
//!
//! [`TestDatabase`] wraps an in-memory SQLite connection with a fixed pepper and assertion
//! helpers; [`MigrationDir`] is a temporary migrations directory that migration file pairs
//! can be written into.
//!
//! # Example
//!
//! ```
//! # #[cfg(not(feature = "testing"))]
//! # fn main() {}
//! # #[cfg(feature = "testing")]
//! # fn main() {
//! use nitrate_migrate::testing::{MigrationDir, TestDatabase};
//! use nitrate_migrate::{Modifiers, Registry, Runner};
//!
//! let dir = MigrationDir::new().unwrap();
//! dir.write_pair("0_create_users_table").unwrap();
//!
//! let registry = Registry::new().register_fns(
//!     "0_create_users_table",
//!     |table| table.create_table_if_not_exists("users", |t| {
//!         t.primary_key().text("username", Modifiers::UNIQUE);
//!     }),
//!     |table| table.drop_table_if_exists("users"),
//! );
//! let runner = Runner::new(registry, dir.path());
//!
//! let mut db = TestDatabase::new();
//! db.migrate(&runner, 0).unwrap();
//! db.assert_table_exists("users").unwrap();
//!
//! db.migrate(&runner, -1).unwrap();
//! db.assert_table_not_exists("users").unwrap();
//! # }
//! ```

use std::fs;
use std::path::Path;

use rusqlite::types::FromSql;
use rusqlite::Connection;
use tempfile::TempDir;

use crate::config::Pepper;
use crate::core::MigrationReport;
use crate::ddl::validate_identifier;
use crate::error::Error;
use crate::migration_table::MigrationTable;
use crate::runner::Runner;

/// Pepper used by [`TestDatabase::new`].
pub const TEST_PEPPER: &str = "test-pepper";

/// An in-memory database with a fixed pepper and assertion helpers.
pub struct TestDatabase {
    conn: Connection,
    pepper: Pepper,
}

impl TestDatabase {
    pub fn new() -> Self {
        let conn = Connection::open_in_memory().expect("Failed to create in-memory test database");
        Self::with_connection(conn, Pepper::new(TEST_PEPPER))
    }

    /// Use a custom connection, for example a file-based database.
    pub fn with_connection(conn: Connection, pepper: Pepper) -> Self {
        Self { conn, pepper }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn pepper(&self) -> &Pepper {
        &self.pepper
    }

    /// The table API bound to this database, as a migration handler would receive it.
    pub fn table(&self) -> MigrationTable<'_> {
        MigrationTable::new(&self.conn, &self.pepper)
    }

    /// Run `runner` against this database.
    pub fn migrate(&mut self, runner: &Runner, target: i64) -> Result<MigrationReport, Error> {
        runner.migrate(&mut self.conn, &self.pepper, target)
    }

    pub fn execute(&self, sql: &str) -> Result<(), Error> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Query a single value from the first row.
    pub fn query_one<T: FromSql>(&self, sql: &str) -> Result<T, Error> {
        Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool, Error> {
        self.table().table_exists(table_name)
    }

    pub fn assert_table_exists(&self, table_name: &str) -> Result<(), Error> {
        if !self.table_exists(table_name)? {
            return Err(Error::Generic(format!(
                "Expected table '{}' to exist",
                table_name
            )));
        }
        Ok(())
    }

    pub fn assert_table_not_exists(&self, table_name: &str) -> Result<(), Error> {
        if self.table_exists(table_name)? {
            return Err(Error::Generic(format!(
                "Expected table '{}' to not exist",
                table_name
            )));
        }
        Ok(())
    }

    /// Physical column names of `table_name` in definition order.
    pub fn column_names(&self, table_name: &str) -> Result<Vec<String>, Error> {
        validate_identifier("table", table_name)?;
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", table_name))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    pub fn row_count(&self, table_name: &str) -> Result<i64, Error> {
        validate_identifier("table", table_name)?;
        self.query_one(&format!("SELECT COUNT(*) FROM {}", table_name))
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// A temporary migrations directory, removed when dropped.
pub struct MigrationDir {
    dir: TempDir,
}

impl MigrationDir {
    pub fn new() -> Result<Self, Error> {
        let dir = tempfile::tempdir()
            .map_err(|e| Error::io("failed to create temporary migrations directory", e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<identifier>.up.sql` and `<identifier>.down.sql`.
    pub fn write_pair(&self, identifier: &str) -> Result<(), Error> {
        self.write_file(&format!("{}.up.sql", identifier))?;
        self.write_file(&format!("{}.down.sql", identifier))
    }

    /// Write an arbitrary (possibly malformed) file into the directory.
    pub fn write_file(&self, file_name: &str) -> Result<(), Error> {
        let path = self.dir.path().join(file_name);
        fs::write(&path, "")
            .map_err(|e| Error::io(format!("failed to write {}", path.display()), e))
    }
}
