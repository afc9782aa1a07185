use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::fetch::FetchKind;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Instance unreachable, TLS failure or authentication failure.
    #[error("connection to {instance} failed: {message}")]
    Connection {
        instance: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("metadata query on {instance} failed: {message}")]
    Query {
        instance: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("{operation} on {instance} timed out after {after:?}")]
    Timeout {
        instance: String,
        operation: String,
        after: Duration,
    },
}

impl FetchError {
    pub fn connection(instance: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            instance: instance.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn connection_with_source(
        instance: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            instance: instance.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn query(instance: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            instance: instance.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn query_with_source(
        instance: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Query {
            instance: instance.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn timeout(
        instance: impl Into<String>,
        operation: impl Into<String>,
        after: Duration,
    ) -> Self {
        Self::Timeout {
            instance: instance.into(),
            operation: operation.into(),
            after,
        }
    }

    /// SQLSTATE classes `28` (invalid authorization) and `3D` (invalid
    /// catalog name) count as connection errors along with transport and
    /// pool failures.
    pub fn from_sqlx(instance: &str, err: sqlx::Error) -> Self {
        let is_connection = match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => true,
            sqlx::Error::Database(db) => db
                .code()
                .map(|code| code.starts_with("28") || code.starts_with("3D"))
                .unwrap_or(false),
            _ => false,
        };

        let message = err.to_string();
        if is_connection {
            Self::connection_with_source(instance, message, err)
        } else {
            Self::query_with_source(instance, message, err)
        }
    }

    pub fn instance(&self) -> &str {
        match self {
            Self::Connection { instance, .. }
            | Self::Query { instance, .. }
            | Self::Timeout { instance, .. } => instance,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Never fatal: the routine just can't be matched by full name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DdlParseError {
    #[error("no '.' found before the argument list")]
    MissingDot,
    #[error("no '(' found after the schema qualifier")]
    MissingOpenParen,
    #[error("no ')' found after the argument list opens")]
    MissingCloseParen,
}

/// The first fetch failure observed while joining the four metadata fetches.
#[derive(Debug, Error)]
#[error("{kind} failed for {instance}: {source}")]
pub struct JoinFailure {
    pub kind: FetchKind,
    pub instance: String,
    #[source]
    pub source: FetchError,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Join(#[from] JoinFailure),

    #[error("failed to load settings from {}: {source}", path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
