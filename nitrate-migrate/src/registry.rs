//! Explicit mapping from migration identifiers to handler implementations.

use std::collections::BTreeMap;

use crate::core::{FnMigration, Migration};
use crate::error::Error;
use crate::migration_table::MigrationTable;

/// Maps a migration identifier (`<ordinal>_<name>`, the file name without the
/// `.up.<ext>` / `.down.<ext>` suffix) to its handlers.
///
/// ```
/// use nitrate_migrate::Registry;
///
/// let registry = Registry::new().register_fns(
///     "0_create_sessions_table",
///     |table| {
///         table.create_table_if_not_exists("sessions", |t| {
///             t.primary_key().timestamps();
///         })
///     },
///     |table| table.drop_table_if_exists("sessions"),
/// );
/// assert!(registry.get("0_create_sessions_table").is_some());
/// ```
#[derive(Default)]
pub struct Registry {
    migrations: BTreeMap<String, Box<dyn Migration>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `migration` under `identifier`, replacing any earlier registration.
    pub fn register(
        mut self,
        identifier: impl Into<String>,
        migration: impl Migration + 'static,
    ) -> Self {
        self.migrations.insert(identifier.into(), Box::new(migration));
        self
    }

    /// Register a pair of functions as the `up` and `down` handlers of `identifier`.
    pub fn register_fns<U, D>(self, identifier: impl Into<String>, up: U, down: D) -> Self
    where
        U: Fn(&MigrationTable) -> Result<(), Error> + 'static,
        D: Fn(&MigrationTable) -> Result<(), Error> + 'static,
    {
        self.register(identifier, FnMigration { up, down })
    }

    pub fn get(&self, identifier: &str) -> Option<&dyn Migration> {
        self.migrations.get(identifier).map(|m| m.as_ref())
    }

    /// Registered identifiers in lexical order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.migrations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("migrations", &self.migrations.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Migration for Noop {
        fn description(&self) -> Option<&'static str> {
            Some("does nothing")
        }
        fn up(&self, _table: &MigrationTable) -> Result<(), Error> {
            Ok(())
        }
        fn down(&self, _table: &MigrationTable) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let registry = Registry::new()
            .register_fns("1_a", |_| Err("first".into()), |_| Ok(()))
            .register("1_a", Noop)
            .register("0_b", Noop);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.identifiers().collect::<Vec<_>>(), vec!["0_b", "1_a"]);
        assert_eq!(
            registry.get("1_a").and_then(|m| m.description()),
            Some("does nothing")
        );
        assert!(registry.get("2_missing").is_none());
    }
}
