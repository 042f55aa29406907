//! Convenience macros for defining migrations and registries.

/// Define a unit struct implementing [`Migration`](crate::Migration).
///
/// # Basic Usage
///
/// ```
/// use nitrate_migrate::{migration, Modifiers};
///
/// migration!(CreateUsersTable, "Create users table",
///     up: |table| {
///         table.create_table_if_not_exists("users", |t| {
///             t.primary_key().text("username", Modifiers::UNIQUE).timestamps();
///         })
///     },
///     down: |table| { table.drop_table_if_exists("users") }
/// );
/// ```
///
/// The description is optional:
///
/// ```
/// use nitrate_migrate::migration;
///
/// migration!(Noop,
///     up: |_table| { Ok(()) },
///     down: |_table| { Ok(()) }
/// );
/// ```
///
/// For migrations that need state, implement [`Migration`](crate::Migration) directly.
#[macro_export]
macro_rules! migration {
    ($name:ident,
        up: |$up_table:ident| $up_body:block,
        down: |$down_table:ident| $down_body:block $(,)?
    ) => {
        $crate::__migration_impl!($name, None,
            up: |$up_table| $up_body,
            down: |$down_table| $down_body
        );
    };

    ($name:ident, $description:expr,
        up: |$up_table:ident| $up_body:block,
        down: |$down_table:ident| $down_body:block $(,)?
    ) => {
        $crate::__migration_impl!($name, Some($description),
            up: |$up_table| $up_body,
            down: |$down_table| $down_body
        );
    };
}

/// Internal implementation macro.
#[macro_export]
#[doc(hidden)]
macro_rules! __migration_impl {
    ($name:ident, $description:expr,
        up: |$up_table:ident| $up_body:block,
        down: |$down_table:ident| $down_body:block
    ) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $crate::Migration for $name {
            fn description(&self) -> Option<&'static str> {
                $description
            }

            fn up(&self, $up_table: &$crate::MigrationTable) -> Result<(), $crate::Error> {
                $up_body
            }

            fn down(&self, $down_table: &$crate::MigrationTable) -> Result<(), $crate::Error> {
                $down_body
            }
        }
    };
}

/// Build a [`Registry`](crate::Registry) from `identifier => migration` pairs.
///
/// ```
/// use nitrate_migrate::{migration, registry};
///
/// migration!(CreateUsersTable,
///     up: |table| { table.create_table_if_not_exists("users", |t| { t.primary_key(); }) },
///     down: |table| { table.drop_table_if_exists("users") }
/// );
///
/// let registry = registry! {
///     "0_create_users_table" => CreateUsersTable,
/// };
/// assert_eq!(registry.len(), 1);
/// ```
#[macro_export]
macro_rules! registry {
    ($($identifier:expr => $migration:expr),* $(,)?) => {
        $crate::Registry::new()$(.register($identifier, $migration))*
    };
}
