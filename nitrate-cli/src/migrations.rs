//! Migrations shipped with the application.
//!
//! Every identifier registered here needs a matching
//! `<identifier>.up.<ext>` / `<identifier>.down.<ext>` pair in the migrations directory.

use nitrate_migrate::{migration, registry, Modifiers, Registry};

migration!(CreateUsersTable, "Creates the users table with a unique username and a hashed password",
    up: |table| {
        table.create_table_if_not_exists("users", |t| {
            t.primary_key()
                .text("username", Modifiers::UNIQUE)
                .hashed("password", Modifiers::NONE)
                .timestamps();
        })
    },
    down: |table| { table.drop_table_if_exists("users") }
);

pub fn registry() -> Registry {
    registry! {
        "0_create_users_table" => CreateUsersTable,
    }
}
