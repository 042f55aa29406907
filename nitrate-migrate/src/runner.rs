//! Discovery of migration files and execution of their handlers against a target ordinal.
//!
//! The migrations directory holds one `<ordinal>_<name>.up.<ext>` and one
//! `<ordinal>_<name>.down.<ext>` file per migration. The files name the migrations; their
//! handlers are looked up by identifier (`<ordinal>_<name>`) in a [`Registry`].
//!
//! A run with target `T` visits every migration in ascending numeric ordinal order and calls
//! `up` when `ordinal <= T`, `down` otherwise. Nothing records which migrations already ran,
//! so every run replays the whole directory.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::Connection;

use crate::config::Pepper;
use crate::core::{Direction, Migration, MigrationReport, MigrationStep};
use crate::error::Error;
use crate::migration_table::MigrationTable;
use crate::registry::Registry;

/// A migration file name split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFileName {
    pub ordinal: u32,
    /// `<ordinal>_<name>`
    pub identifier: String,
    pub direction: Direction,
    pub extension: String,
}

impl MigrationFileName {
    /// Parse `<ordinal>_<name>.<up|down>.<ext>`.
    ///
    /// ```
    /// use nitrate_migrate::{Direction, MigrationFileName};
    ///
    /// let parsed = MigrationFileName::parse("10_add_sessions.down.js").unwrap();
    /// assert_eq!(parsed.ordinal, 10);
    /// assert_eq!(parsed.identifier, "10_add_sessions");
    /// assert_eq!(parsed.direction, Direction::Down);
    ///
    /// assert!(MigrationFileName::parse("abc_something.up.js").is_err());
    /// ```
    pub fn parse(file_name: &str) -> Result<Self, Error> {
        let invalid = |reason: String| Error::InvalidMigrationFile {
            file_name: file_name.to_string(),
            reason,
        };

        let prefix = match file_name.split_once('_') {
            Some((prefix, _)) => prefix,
            None => {
                return Err(invalid(
                    "expected <ordinal>_<name>.<up|down>.<ext>".to_string(),
                ))
            }
        };
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!("ordinal prefix '{}' is not a number", prefix)));
        }
        let ordinal = prefix
            .parse::<u32>()
            .map_err(|_| invalid(format!("ordinal prefix '{}' is out of range", prefix)))?;

        let mut parts = file_name.rsplitn(3, '.');
        let (extension, direction, identifier) = match (parts.next(), parts.next(), parts.next()) {
            (Some(ext), Some(direction), Some(identifier)) if !ext.is_empty() => {
                (ext, direction, identifier)
            }
            _ => {
                return Err(invalid(
                    "expected <ordinal>_<name>.<up|down>.<ext>".to_string(),
                ))
            }
        };
        let direction = match direction {
            "up" => Direction::Up,
            "down" => Direction::Down,
            other => {
                return Err(invalid(format!(
                    "direction must be 'up' or 'down', found '{}'",
                    other
                )))
            }
        };
        if identifier.len() <= prefix.len() + 1 {
            return Err(invalid("migration name is empty".to_string()));
        }

        Ok(Self {
            ordinal,
            identifier: identifier.to_string(),
            direction,
            extension: extension.to_string(),
        })
    }
}

/// A migration found on disk with both of its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredMigration {
    pub ordinal: u32,
    pub identifier: String,
    pub up_file: PathBuf,
    pub down_file: PathBuf,
}

/// Scan `dir` and pair up migration files, sorted by ordinal.
///
/// Dotfiles and subdirectories are ignored. Every other entry must be a well-formed migration
/// file name; each identifier needs exactly one up and one down file, and no two identifiers
/// may share an ordinal.
pub fn discover(dir: &Path) -> Result<Vec<DiscoveredMigration>, Error> {
    let entries = fs::read_dir(dir).map_err(|e| {
        Error::io(
            format!("failed to read migrations directory {}", dir.display()),
            e,
        )
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            Error::io(
                format!("failed to read migrations directory {}", dir.display()),
                e,
            )
        })?;
        let file_type = entry.file_type().map_err(|e| {
            Error::io(format!("failed to inspect {}", entry.path().display()), e)
        })?;
        if !file_type.is_file() {
            continue;
        }
        let file_name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                return Err(Error::InvalidMigrationFile {
                    file_name: raw.to_string_lossy().into_owned(),
                    reason: "file name is not valid UTF-8".to_string(),
                })
            }
        };
        if file_name.starts_with('.') {
            continue;
        }
        files.push((file_name, entry.path()));
    }
    // Deterministic error reporting regardless of directory order.
    files.sort();

    let mut by_ordinal: BTreeMap<u32, (String, Option<PathBuf>, Option<PathBuf>)> =
        BTreeMap::new();
    for (file_name, path) in files {
        let parsed = MigrationFileName::parse(&file_name)?;
        let slot = by_ordinal
            .entry(parsed.ordinal)
            .or_insert_with(|| (parsed.identifier.clone(), None, None));
        if slot.0 != parsed.identifier {
            return Err(Error::Config(format!(
                "ordinal {} is used by both '{}' and '{}'",
                parsed.ordinal, slot.0, parsed.identifier
            )));
        }
        let target = match parsed.direction {
            Direction::Up => &mut slot.1,
            Direction::Down => &mut slot.2,
        };
        if target.is_some() {
            return Err(Error::Config(format!(
                "migration '{}' has more than one {} file",
                parsed.identifier, parsed.direction
            )));
        }
        *target = Some(path);
    }

    by_ordinal
        .into_iter()
        .map(|(ordinal, (identifier, up_file, down_file))| match (up_file, down_file) {
            (Some(up_file), Some(down_file)) => Ok(DiscoveredMigration {
                ordinal,
                identifier,
                up_file,
                down_file,
            }),
            (None, _) => Err(Error::Config(format!(
                "migration '{}' has no up file",
                identifier
            ))),
            (_, None) => Err(Error::Config(format!(
                "migration '{}' has no down file",
                identifier
            ))),
        })
        .collect()
}

/// A discovered migration resolved against the registry.
#[derive(Debug)]
pub struct LoadedMigration<'r> {
    pub ordinal: u32,
    pub identifier: String,
    pub migration: &'r dyn Migration,
}

/// Runs the migrations of a directory against a target ordinal.
pub struct Runner {
    registry: Registry,
    migrations_dir: PathBuf,
    on_migration_start: Option<Box<dyn Fn(u32, &str, Direction) + Send + Sync>>,
    on_migration_complete: Option<Box<dyn Fn(u32, &str, Direction, Duration) + Send + Sync>>,
    on_migration_error: Option<Box<dyn Fn(u32, &str, Direction, &Error) + Send + Sync>>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("registry", &self.registry)
            .field("migrations_dir", &self.migrations_dir)
            .field("on_migration_start", &self.on_migration_start.is_some())
            .field(
                "on_migration_complete",
                &self.on_migration_complete.is_some(),
            )
            .field("on_migration_error", &self.on_migration_error.is_some())
            .finish()
    }
}

impl Runner {
    pub fn new(registry: Registry, migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            migrations_dir: migrations_dir.into(),
            on_migration_start: None,
            on_migration_complete: None,
            on_migration_error: None,
        }
    }

    /// Called before each handler runs.
    ///
    /// ```
    /// use nitrate_migrate::{Registry, Runner};
    ///
    /// let runner = Runner::new(Registry::new(), "app/database")
    ///     .on_migration_start(|ordinal, identifier, direction| {
    ///         println!("Running {} ({}) {}", identifier, ordinal, direction);
    ///     });
    /// ```
    pub fn on_migration_start<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32, &str, Direction) + Send + Sync + 'static,
    {
        self.on_migration_start = Some(Box::new(callback));
        self
    }

    /// Called after a handler's transaction commits, with the time the handler took.
    pub fn on_migration_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32, &str, Direction, Duration) + Send + Sync + 'static,
    {
        self.on_migration_complete = Some(Box::new(callback));
        self
    }

    /// Called when a handler fails, before the run is aborted.
    pub fn on_migration_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32, &str, Direction, &Error) + Send + Sync + 'static,
    {
        self.on_migration_error = Some(Box::new(callback));
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Discover the migrations directory and resolve every identifier in the registry.
    pub fn migrations(&self) -> Result<Vec<LoadedMigration<'_>>, Error> {
        discover(&self.migrations_dir)?
            .into_iter()
            .map(|found| {
                let migration = self.registry.get(&found.identifier).ok_or_else(|| {
                    Error::Config(format!(
                        "no handlers registered for migration '{}' ({})",
                        found.identifier,
                        found.up_file.display()
                    ))
                })?;
                Ok(LoadedMigration {
                    ordinal: found.ordinal,
                    identifier: found.identifier,
                    migration,
                })
            })
            .collect()
    }

    /// The handler invocations a run with `target` would perform, without touching a database.
    pub fn plan(&self, target: i64) -> Result<Vec<MigrationStep>, Error> {
        Ok(Self::steps(&self.migrations()?, target)
            .map(|(loaded, direction)| MigrationStep {
                ordinal: loaded.ordinal,
                identifier: loaded.identifier.clone(),
                direction,
            })
            .collect())
    }

    fn steps<'a, 'r>(
        migrations: &'a [LoadedMigration<'r>],
        target: i64,
    ) -> impl Iterator<Item = (&'a LoadedMigration<'r>, Direction)> {
        migrations.iter().map(move |loaded| {
            let direction = if i64::from(loaded.ordinal) <= target {
                Direction::Up
            } else {
                Direction::Down
            };
            (loaded, direction)
        })
    }

    /// Run `up` for every migration at or below `target` and `down` for every one above it.
    ///
    /// Discovery and registry resolution finish before the first handler runs, so a malformed
    /// directory never leaves the database partially migrated. Each handler runs in its own
    /// transaction; the first failing handler is rolled back and aborts the run, while the
    /// handlers before it stay committed.
    ///
    /// Downs run in the same ascending order as ups, so with a target below every ordinal the
    /// lowest migration's `down` runs first and may drop tables that later `down` handlers
    /// refer to.
    pub fn migrate(
        &self,
        conn: &mut Connection,
        pepper: &Pepper,
        target: i64,
    ) -> Result<MigrationReport, Error> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("migrate", target = target).entered();

        let migrations = self.migrations()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            migrations_dir = %self.migrations_dir.display(),
            available_migrations = ?migrations.iter().map(|m| (m.ordinal, m.identifier.as_str())).collect::<Vec<_>>(),
            "Considering migrations to run"
        );

        let mut steps = Vec::with_capacity(migrations.len());
        for (loaded, direction) in Self::steps(&migrations, target) {
            let ordinal = loaded.ordinal;
            let identifier = loaded.identifier.as_str();

            #[cfg(feature = "tracing")]
            let _span = tracing::info_span!(
                "migration",
                ordinal = ordinal,
                identifier = %identifier,
                direction = %direction
            )
            .entered();

            #[cfg(feature = "tracing")]
            tracing::info!("Starting migration");

            if let Some(ref callback) = self.on_migration_start {
                callback(ordinal, identifier, direction);
            }

            let migration_start = Instant::now();
            let result = {
                let tx = conn.transaction()?;
                let table = MigrationTable::new(&tx, pepper);
                let result = match direction {
                    Direction::Up => loaded.migration.up(&table),
                    Direction::Down => loaded.migration.down(&table),
                };
                match result {
                    Ok(()) => tx.commit().map_err(Error::from),
                    // Dropping the transaction rolls it back.
                    Err(e) => Err(e),
                }
            };

            match result {
                Ok(()) => {
                    let duration = migration_start.elapsed();

                    #[cfg(feature = "tracing")]
                    tracing::info!(
                        duration_ms = duration.as_millis(),
                        "Migration completed successfully"
                    );

                    if let Some(ref callback) = self.on_migration_complete {
                        callback(ordinal, identifier, direction, duration);
                    }
                    steps.push(MigrationStep {
                        ordinal,
                        identifier: identifier.to_string(),
                        direction,
                    });
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %e, "Migration failed");

                    if let Some(ref callback) = self.on_migration_error {
                        callback(ordinal, identifier, direction, &e);
                    }
                    return Err(Error::Handler {
                        ordinal,
                        identifier: identifier.to_string(),
                        direction,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(MigrationReport { target, steps })
    }
}
