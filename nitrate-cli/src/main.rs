//! `nitrate` command line runner for database migrations.
//!
//! Reads `.env` (or `.example-env`) from the project root, opens the configured SQLite
//! database and runs the built-in migrations against a target ordinal.

mod migrations;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use nitrate_migrate::{Error, MigrationStep, Runner, Settings};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nitrate", version, about = "Run nitrate database migrations")]
struct Cli {
    /// Project root holding `.env` or `.example-env`
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run `up` for every migration at or below TARGET and `down` for every other one
    Migrate {
        /// Target ordinal; a negative target reverts every migration
        #[arg(allow_negative_numbers = true)]
        target: i64,

        /// Print the steps that would run without opening the database
        #[arg(long)]
        dry_run: bool,
    },
    /// List the migrations found in the migrations directory
    List,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut stdout = io::stdout().lock();
    if let Err(e) = run(&cli, &mut stdout) {
        tracing::debug!(error = ?e, "Command failed");

        eprintln!("Error: {}", e);
        std::process::exit(e.kind().exit_code());
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli, out: &mut impl Write) -> Result<(), Error> {
    let settings = Settings::load(&cli.root)?;
    tracing::debug!(
        database_path = %settings.database_path.display(),
        migrations_dir = %settings.migrations_dir.display(),
        "Loaded settings"
    );
    let runner = Runner::new(migrations::registry(), settings.migrations_dir.clone());

    match cli.command {
        Commands::List => list(&runner, out),
        Commands::Migrate {
            target,
            dry_run: true,
        } => {
            let steps = runner.plan(target)?;
            print_steps(
                out,
                &format!("Would run {} step(s) for target {}", steps.len(), target),
                &steps,
            )
        }
        Commands::Migrate {
            target,
            dry_run: false,
        } => {
            let mut conn = Connection::open(&settings.database_path)?;
            let report = runner.migrate(&mut conn, &settings.pepper, target)?;
            print_steps(
                out,
                &format!("Ran {} step(s) for target {}", report.steps.len(), target),
                &report.steps,
            )
        }
    }
}

fn list(runner: &Runner, out: &mut impl Write) -> Result<(), Error> {
    let migrations = runner.migrations()?;
    let dir = runner.migrations_dir().display();
    if migrations.is_empty() {
        return writeln!(out, "No migrations found in {}.", dir).map_err(output_error);
    }

    writeln!(out, "Migrations in {} ({}):", dir, migrations.len()).map_err(output_error)?;
    for m in &migrations {
        writeln!(out, "  {}: {}", m.ordinal, m.identifier).map_err(output_error)?;
        if let Some(description) = m.migration.description() {
            writeln!(out, "      {}", description).map_err(output_error)?;
        }
    }
    Ok(())
}

fn print_steps(out: &mut impl Write, heading: &str, steps: &[MigrationStep]) -> Result<(), Error> {
    writeln!(out, "{}:", heading).map_err(output_error)?;
    for step in steps {
        writeln!(
            out,
            "  {:>4} {:<5} {}",
            step.ordinal,
            step.direction.to_string(),
            step.identifier
        )
        .map_err(output_error)?;
    }
    Ok(())
}

fn output_error(source: io::Error) -> Error {
    Error::Io {
        context: "failed to write output".to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nitrate_migrate::ErrorKind;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// A project root with an `.env`, the built-in migration pair and a file database.
    fn project() -> TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join(".env"),
            "PASSWORD_PEPPER=secret\nDATABASE_PATH=db.sqlite3\nMIGRATIONS_DIR=migrations\n",
        )
        .unwrap();
        let migrations = root.path().join("migrations");
        fs::create_dir(&migrations).unwrap();
        fs::write(migrations.join("0_create_users_table.up.sql"), "").unwrap();
        fs::write(migrations.join("0_create_users_table.down.sql"), "").unwrap();
        root
    }

    fn run_args(root: &Path, args: &[&str]) -> Result<String, Error> {
        let mut argv = vec!["nitrate", "--root", root.to_str().unwrap()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        run(&cli, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn users_table_exists(root: &Path) -> bool {
        let conn = Connection::open(root.join("db.sqlite3")).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='users'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn migrate_up_and_back_down() {
        let root = project();

        let output = run_args(root.path(), &["migrate", "0"]).unwrap();
        assert_eq!(
            output,
            "Ran 1 step(s) for target 0:\n     0 up    0_create_users_table\n"
        );
        assert!(users_table_exists(root.path()));

        let output = run_args(root.path(), &["migrate", "-1"]).unwrap();
        assert_eq!(
            output,
            "Ran 1 step(s) for target -1:\n     0 down  0_create_users_table\n"
        );
        assert!(!users_table_exists(root.path()));
    }

    #[test]
    fn dry_run_leaves_database_untouched() {
        let root = project();

        let output = run_args(root.path(), &["migrate", "5", "--dry-run"]).unwrap();

        assert_eq!(
            output,
            "Would run 1 step(s) for target 5:\n     0 up    0_create_users_table\n"
        );
        assert!(!root.path().join("db.sqlite3").exists());
    }

    #[test]
    fn lists_migrations_with_descriptions() {
        let root = project();

        let output = run_args(root.path(), &["list"]).unwrap();

        assert!(output.contains("(1):\n  0: 0_create_users_table\n"), "{}", output);
        assert!(output.contains("Creates the users table"), "{}", output);
    }

    #[test]
    fn missing_migrations_directory_is_an_io_error() {
        let root = project();
        fs::remove_dir_all(root.path().join("migrations")).unwrap();

        let err = run_args(root.path(), &["migrate", "0"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.kind().exit_code(), 3);
    }

    #[test]
    fn missing_pepper_is_bad_input() {
        let root = project();
        fs::write(root.path().join(".env"), "DATABASE_PATH=db.sqlite3\n").unwrap();

        let err = run_args(root.path(), &["list"]).unwrap_err();

        assert_eq!(err.kind().exit_code(), 2);
    }

    #[test]
    fn unregistered_migration_file_is_bad_input() {
        let root = project();
        let migrations = root.path().join("migrations");
        fs::write(migrations.join("1_unknown.up.sql"), "").unwrap();
        fs::write(migrations.join("1_unknown.down.sql"), "").unwrap();

        let err = run_args(root.path(), &["migrate", "1"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BadInput);
        assert!(!users_table_exists(root.path()));
    }

    #[test]
    fn parses_arguments() {
        let cli = Cli::try_parse_from(["nitrate", "-v", "migrate", "-3", "--dry-run"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.root, PathBuf::from("."));
        assert!(matches!(
            cli.command,
            Commands::Migrate {
                target: -3,
                dry_run: true
            }
        ));

        assert!(Cli::try_parse_from(["nitrate", "migrate", "latest"]).is_err());
        assert!(Cli::try_parse_from(["nitrate", "migrate"]).is_err());
    }
}
