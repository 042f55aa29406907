use crate::core::Direction;

/// Error type for the nitrate-migrate crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Rusqlite(rusqlite::Error),
    /// A file in the migrations directory does not follow `<ordinal>_<name>.<up|down>.<ext>`.
    #[error("invalid migration file '{file_name}': {reason}")]
    InvalidMigrationFile { file_name: String, reason: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    /// A migration handler failed. Handlers that ran before it in the same invocation stay applied.
    #[error("migration {ordinal} ({identifier}) failed while running {direction}: {source}")]
    Handler {
        ordinal: u32,
        identifier: String,
        direction: Direction,
        #[source]
        source: Box<Error>,
    },
    #[error("{0}")]
    Generic(String),
}

/// Coarse classification used to pick a process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input: bad target, bad file name, missing or invalid configuration.
    BadInput,
    /// The migrations directory or the configuration file could not be read.
    Io,
    /// Statement execution failed, or a handler reported an unclassified failure.
    Database,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Database => 1,
            ErrorKind::BadInput => 2,
            ErrorKind::Io => 3,
        }
    }
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidMigrationFile { .. } | Error::Config(_) => ErrorKind::BadInput,
            Error::Io { .. } => ErrorKind::Io,
            Error::Rusqlite(_) | Error::Generic(_) => ErrorKind::Database,
            Error::Handler { source, .. } => source.kind(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        Self::Rusqlite(value)
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Self::Generic(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Self::Generic(value.to_string())
    }
}

// Manual PartialEq implementation because std::io::Error doesn't implement PartialEq
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Rusqlite(a), Self::Rusqlite(b)) => a == b,
            (
                Self::InvalidMigrationFile {
                    file_name: a,
                    reason: ra,
                },
                Self::InvalidMigrationFile {
                    file_name: b,
                    reason: rb,
                },
            ) => a == b && ra == rb,
            (Self::Config(a), Self::Config(b)) => a == b,
            (
                Self::Io {
                    context: a,
                    source: sa,
                },
                Self::Io {
                    context: b,
                    source: sb,
                },
            ) => a == b && sa.kind() == sb.kind(),
            (
                Self::Handler {
                    ordinal: oa,
                    identifier: ia,
                    direction: da,
                    source: sa,
                },
                Self::Handler {
                    ordinal: ob,
                    identifier: ib,
                    direction: db,
                    source: sb,
                },
            ) => oa == ob && ia == ib && da == db && sa == sb,
            (Self::Generic(a), Self::Generic(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_distinct_exit_codes() {
        let bad = Error::Config("PASSWORD_PEPPER is not set".to_string());
        let io = Error::io(
            "failed to read migrations directory",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        let db = Error::from(rusqlite::Error::InvalidQuery);

        assert_eq!(bad.kind().exit_code(), 2);
        assert_eq!(io.kind().exit_code(), 3);
        assert_eq!(db.kind().exit_code(), 1);
    }

    #[test]
    fn handler_failure_takes_kind_of_source() {
        let err = Error::Handler {
            ordinal: 3,
            identifier: "3_seed_admin".to_string(),
            direction: Direction::Up,
            source: Box::new(Error::Config("invalid table name ''".to_string())),
        };
        assert_eq!(err.kind(), ErrorKind::BadInput);
        assert_eq!(
            err.to_string(),
            "migration 3 (3_seed_admin) failed while running up: configuration error: invalid table name ''"
        );
    }

    #[test]
    fn generic_messages_are_unknown_failures() {
        let err: Error = "handler gave up".into();
        assert_eq!(err.kind(), ErrorKind::Database);
    }
}
