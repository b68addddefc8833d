use thiserror::Error;

/// Failure taxonomy of catalog operations.
///
/// `Conflict` and `NotFound` stay distinguishable all the way to the HTTP
/// layer so clients can branch on them.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

impl From<rusqlite::Error> for CatalogError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                CatalogError::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "Uniqueness constraint violated".to_string()),
                )
            }
            _ => CatalogError::Store(err.into()),
        }
    }
}
