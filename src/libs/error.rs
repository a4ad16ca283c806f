use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use thiserror::Error;

/// Everything that can go wrong between an inbound request and its envelope.
///
/// The `Display` text of each variant is exactly what the client sees in
/// `{"error": ...}`, so database detail stays in the `source` and in the logs.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("unknown table")]
    UnknownTable,

    #[error("unknown method")]
    UnknownRoute,

    #[error("field {0} have invalid type")]
    InvalidFieldType(String),

    #[error("bad request")]
    MalformedBody(#[source] serde_json::Error),

    /// Rendered like a type error on the key column for client compatibility.
    #[error("field {0} have invalid type")]
    PrimaryKeyImmutable(String),

    #[error("record not found")]
    RecordNotFound,

    #[error("db error")]
    Database(#[from] sqlx::Error),

    #[error("db error")]
    DeadlineExceeded,

    /// The insert went through but the engine reported no generated id.
    #[error("db error")]
    MissingInsertId,

    #[error("bad request")]
    UnreadableBody(#[source] BytesRejection),

    #[error("scan error")]
    Scan(#[source] sqlx::Error),

    // -------- startup only --------
    #[error("unsupported database url scheme `{0}`")]
    UnsupportedDatabase(String),

    #[error("cannot connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("schema discovery failed: {0}")]
    Discovery(#[source] sqlx::Error),
}

impl ExplorerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownTable | Self::UnknownRoute | Self::RecordNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::InvalidFieldType(_)
            | Self::MalformedBody(_)
            | Self::UnreadableBody(_)
            | Self::PrimaryKeyImmutable(_) => StatusCode::BAD_REQUEST,
            Self::Database(_)
            | Self::DeadlineExceeded
            | Self::MissingInsertId
            | Self::Scan(_)
            | Self::UnsupportedDatabase(_)
            | Self::Connect(_)
            | Self::Discovery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Errors a caller can see in steady-state traffic without anything being broken.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
