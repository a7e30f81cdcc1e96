use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("places provider request failed: {0}")]
    Provider(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Config(String),
}

/// Coarse classification a request-routing layer can map onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unavailable,
    ProviderError,
    StorageFault,
    Invalid,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Unavailable(_) => ErrorKind::Unavailable,
            AppError::Provider(_) => ErrorKind::ProviderError,
            AppError::Io(_) | AppError::Database(_) | AppError::Json(_) => ErrorKind::StorageFault,
            AppError::Config(_) => ErrorKind::Invalid,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_storage_failures_as_faults() {
        let err = AppError::from(rusqlite::Error::InvalidQuery);
        assert_eq!(err.kind(), ErrorKind::StorageFault);

        let err = AppError::from(io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(err.kind(), ErrorKind::StorageFault);
    }

    #[test]
    fn keeps_user_facing_messages() {
        let err = AppError::not_found("no mapping for listing 'Loft'");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "not found: no mapping for listing 'Loft'");

        let err = AppError::Unavailable("GOOGLE_PLACES_API_KEY not configured".into());
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }
}
