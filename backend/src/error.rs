use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GarageError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("database error: {0}")]
    Database(#[from] DieselError),
    #[error("could not open database: {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),
}

pub type GarageResult<T> = Result<T, GarageError>;

impl GarageError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

/// Turn a unique-constraint failure into a `Conflict` carrying `message`;
/// every other storage error passes through untouched.
pub fn conflict_on_unique(message: &str) -> impl FnOnce(DieselError) -> GarageError + '_ {
    move |err| match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            GarageError::Conflict(message.to_string())
        }
        other => GarageError::Database(other),
    }
}
