use std::fmt;

use thiserror::Error;

/// Machine-readable cause attached to a [`StoreError::Conflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictCode {
    /// A uniqueness rule was violated: duplicate corpus or dataset name,
    /// document or query id, or qrel `(query, document)` pair.
    DuplicateKey,
    /// A record referenced a corpus, dataset, query, or document that does
    /// not exist.
    MissingReference,
    /// A corpus cannot be removed while it still owns datasets.
    DatasetsAttached,
}

impl fmt::Display for ConflictCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictCode::DuplicateKey => "duplicate key",
            ConflictCode::MissingReference => "missing reference",
            ConflictCode::DatasetsAttached => "datasets attached",
        };
        f.write_str(name)
    }
}

/// Error type for store and search operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("transaction error: {0}")]
    Transaction(String),
    #[error("conflict ({code}) on {entity}")]
    Conflict { entity: String, code: ConflictCode },
    #[error("not found: {key}")]
    NotFound { key: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl StoreError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        StoreError::Connection(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        StoreError::Schema(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        StoreError::Query(msg.into())
    }

    pub fn transaction<T: Into<String>>(msg: T) -> Self {
        StoreError::Transaction(msg.into())
    }

    pub fn conflict<T: Into<String>>(entity: T, code: ConflictCode) -> Self {
        StoreError::Conflict {
            entity: entity.into(),
            code,
        }
    }

    pub fn not_found<T: Into<String>>(key: T) -> Self {
        StoreError::NotFound { key: key.into() }
    }

    pub fn invalid_argument<T: Into<String>>(msg: T) -> Self {
        StoreError::InvalidArgument(msg.into())
    }

    /// Translates an engine failure raised while writing `entity` into the
    /// typed taxonomy: constraint violations become [`StoreError::Conflict`]
    /// carrying the entity context, anything else a plain query error.
    pub(crate) fn on_write(entity: &str, err: rusqlite::Error) -> Self {
        match constraint_code(&err) {
            Some(code) => StoreError::conflict(entity, code),
            None => StoreError::query(err.to_string()),
        }
    }
}

fn constraint_code(err: &rusqlite::Error) -> Option<ConflictCode> {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                Some(ConflictCode::MissingReference)
            } else {
                Some(ConflictCode::DuplicateKey)
            }
        }
        _ => None,
    }
}
