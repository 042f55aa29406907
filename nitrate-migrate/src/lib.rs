//! `nitrate-migrate` is a small schema migration engine for SQLite.
//!
//! Core concepts:
//! - Migrations are pairs of handlers (`up` and `down`) that receive a [`MigrationTable`], a
//!   handle on the live connection with a column DSL for creating tables and helpers for
//!   seeding and deleting rows.
//! - The migrations directory names the migrations: each one is a pair of files
//!   `<ordinal>_<name>.up.<ext>` and `<ordinal>_<name>.down.<ext>`. A [`Registry`] maps the
//!   identifier `<ordinal>_<name>` to its handlers.
//! - A run takes a target ordinal `T` and calls `up` on every migration with `ordinal <= T`
//!   and `down` on every other one, in ascending ordinal order. No state is stored between
//!   runs, so every handler must be safe to replay.
//!
//! # Example
//!
//! ```
//! use nitrate_migrate::{migration, registry, FieldValue, Modifiers, Pepper, Runner};
//! use rusqlite::Connection;
//! # let dir = tempfile::tempdir().unwrap();
//! # std::fs::write(dir.path().join("0_create_users_table.up.sql"), "").unwrap();
//! # std::fs::write(dir.path().join("0_create_users_table.down.sql"), "").unwrap();
//! # std::fs::write(dir.path().join("1_seed_admin.up.sql"), "").unwrap();
//! # std::fs::write(dir.path().join("1_seed_admin.down.sql"), "").unwrap();
//!
//! migration!(CreateUsersTable, "Create users table",
//!     up: |table| {
//!         table.create_table_if_not_exists("users", |t| {
//!             t.primary_key()
//!                 .text("username", Modifiers::UNIQUE)
//!                 .hashed("password", Modifiers::NONE)
//!                 .timestamps();
//!         })
//!     },
//!     down: |table| { table.drop_table_if_exists("users") }
//! );
//!
//! migration!(SeedAdmin, "Seed the admin account",
//!     up: |table| {
//!         let password = table.hash("change-me");
//!         table.insert_or_ignore(
//!             "users",
//!             [("username", FieldValue::from("admin")), ("password", password.into())],
//!         )?;
//!         Ok(())
//!     },
//!     down: |table| {
//!         // with a negative target the users table is already gone
//!         if table.table_exists("users")? {
//!             table.delete_where("users", |c| c.equals(c.column("username"), c.string_literal("admin")))?;
//!         }
//!         Ok(())
//!     }
//! );
//!
//! let runner = Runner::new(
//!     registry! {
//!         "0_create_users_table" => CreateUsersTable,
//!         "1_seed_admin" => SeedAdmin,
//!     },
//!     dir.path(),
//! );
//!
//! let mut conn = Connection::open_in_memory().unwrap();
//! let pepper = Pepper::new("pepper");
//!
//! let report = runner.migrate(&mut conn, &pepper, 1).unwrap();
//! assert_eq!(report.applied_up(), vec![0, 1]);
//!
//! // Target 0 keeps the table but reverts the seed.
//! let report = runner.migrate(&mut conn, &pepper, 0).unwrap();
//! assert_eq!(report.applied_down(), vec![1]);
//! let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0)).unwrap();
//! assert_eq!(users, 0);
//!
//! let report = runner.migrate(&mut conn, &pepper, -1).unwrap();
//! assert_eq!(report.applied_down(), vec![0, 1]);
//! ```
//!
//! # Column naming
//!
//! Physical column names are derived from the table name: the primary key of `users` is
//! `users_id`, a field `username` becomes `users__username`, and a hashed field `password`
//! expands into `users_H_password`, `users_HS_password` and `users_HA_password`. See
//! [`ddl`] for the full set of rules.
//!
//! # Features
//! - `tracing`: structured log events and spans around every run and every statement.
//! - `testing`: the [`testing`] module with an in-memory test database and temporary
//!   migrations directories.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod column;
pub use column::{Column, ColumnType, DefaultValue, Modifiers, TIMESTAMP_FORMAT};

mod condition;
pub use condition::Condition;

mod config;
pub use config::{
    Pepper, Settings, DEFAULT_DATABASE_PATH, DEFAULT_MIGRATIONS_DIR, ENV_FILE, FALLBACK_ENV_FILE,
};

mod core;
pub use core::{Direction, Migration, MigrationReport, MigrationStep};

pub mod ddl;
pub use ddl::{compile_column_list, create_table_statement};

mod error;
pub use error::{Error, ErrorKind};

pub mod hashing;
pub use hashing::{HashedValue, PreHashAlgorithm};

#[macro_use]
mod macros;

mod migration_table;
pub use migration_table::{FieldValue, MigrationTable};

mod registry;
pub use registry::Registry;

mod runner;
pub use runner::{discover, DiscoveredMigration, LoadedMigration, MigrationFileName, Runner};

mod table;
pub use table::Table;

#[cfg(any(test, feature = "testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub mod testing;
