//! Process configuration read from a `.env`-style file.
//!
//! The project root holds `.env`; when it is missing, `.example-env` is read instead.
//! Keys:
//! - `PASSWORD_PEPPER` (required): secret mixed into every hashed credential.
//! - `DATABASE_PATH` (default `database.sqlite3`)
//! - `MIGRATIONS_DIR` (default `app/database`)
//!
//! Relative paths are resolved against the project root. The process environment is not
//! modified.

use crate::error::Error;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const ENV_FILE: &str = ".env";
pub const FALLBACK_ENV_FILE: &str = ".example-env";
pub const DEFAULT_DATABASE_PATH: &str = "database.sqlite3";
pub const DEFAULT_MIGRATIONS_DIR: &str = "app/database";

/// Server-held secret mixed into credentials before hashing.
#[derive(Clone, PartialEq, Eq)]
pub struct Pepper(String);

impl Pepper {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Pepper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pepper(<redacted>)")
    }
}

/// Settings shared by everything that runs migrations.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub migrations_dir: PathBuf,
    pub pepper: Pepper,
}

impl Settings {
    /// Load settings for the project rooted at `root`.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let primary = root.join(ENV_FILE);
        let source = if primary.is_file() {
            primary
        } else {
            root.join(FALLBACK_ENV_FILE)
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %source.display(), "Loading configuration");

        let values = read_env_file(&source)?;
        Self::from_values(root, &values)
    }

    /// Build settings from already-parsed key/value pairs.
    pub fn from_values(root: &Path, values: &HashMap<String, String>) -> Result<Self, Error> {
        let pepper = values
            .get("PASSWORD_PEPPER")
            .ok_or_else(|| Error::Config("PASSWORD_PEPPER is not set".to_string()))?;

        let resolve = |key: &str, default: &str| -> PathBuf {
            let raw = values.get(key).map(String::as_str).unwrap_or(default);
            let path = Path::new(raw);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            }
        };

        Ok(Self {
            database_path: resolve("DATABASE_PATH", DEFAULT_DATABASE_PATH),
            migrations_dir: resolve("MIGRATIONS_DIR", DEFAULT_MIGRATIONS_DIR),
            pepper: Pepper::new(pepper.clone()),
        })
    }
}

// `from_path_iter` is the only dotenv entry point that leaves the process environment alone.
#[allow(deprecated)]
fn read_env_file(path: &Path) -> Result<HashMap<String, String>, Error> {
    let iter = dotenv::from_path_iter(path).map_err(|e| env_file_error(path, e))?;
    let mut values = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| env_file_error(path, e))?;
        values.insert(key, value);
    }
    Ok(values)
}

fn env_file_error(path: &Path, error: dotenv::Error) -> Error {
    match error {
        dotenv::Error::Io(source) => Error::io(
            format!("failed to read configuration file {}", path.display()),
            source,
        ),
        other => Error::Config(format!("{}: {}", path.display(), other)),
    }
}
