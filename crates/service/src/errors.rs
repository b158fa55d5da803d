use sea_orm::DbErr;
use thiserror::Error;

use crate::auth::errors::AuthError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("transient storage error: {0}")]
    Transient(String),
    #[error("database error: {0}")]
    Db(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }

    /// Stable machine-readable category for external mapping/logging.
    pub fn category(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Unauthorized => "unauthorized",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Transient(_) => "transient_storage_error",
            ServiceError::Db(_) => "storage_error",
        }
    }

    /// Map a SeaORM error, splitting transient connection/lock conditions
    /// from fatal ones. Transient errors are the only ones the retry policy
    /// will re-attempt.
    pub fn from_db_err(e: DbErr) -> Self {
        let msg = e.to_string();
        if is_transient_message(&msg) {
            ServiceError::Transient(msg)
        } else {
            ServiceError::Db(msg)
        }
    }
}

fn is_transient_message(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    lower.contains("lock wait")
        || lower.contains("lock timeout")
        || lower.contains("deadlock")
        || lower.contains("timed out")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("temporar")
}

impl From<models::errors::ModelError> for ServiceError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Validation(msg) => ServiceError::Validation(msg),
            models::errors::ModelError::Db(msg) => {
                if is_transient_message(&msg) {
                    ServiceError::Transient(msg)
                } else {
                    ServiceError::Db(msg)
                }
            }
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => ServiceError::Validation(msg),
            AuthError::Conflict => ServiceError::Conflict("account already exists".into()),
            AuthError::NotFound => ServiceError::not_found("user"),
            AuthError::Unauthorized => ServiceError::Unauthorized,
            AuthError::HashError(msg) | AuthError::TokenError(msg) | AuthError::Repository(msg) => {
                ServiceError::Db(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_stable() {
        assert_eq!(ServiceError::Validation("x".into()).category(), "validation_error");
        assert_eq!(ServiceError::not_found("store").category(), "not_found");
        assert_eq!(ServiceError::Conflict("x".into()).category(), "conflict");
        assert_eq!(ServiceError::Unauthorized.category(), "unauthorized");
        assert_eq!(ServiceError::Forbidden("x".into()).category(), "forbidden");
        assert_eq!(ServiceError::Transient("x".into()).category(), "transient_storage_error");
        assert_eq!(ServiceError::Db("x".into()).category(), "storage_error");
    }

    #[test]
    fn lock_and_connection_errors_classify_as_transient() {
        let e = ServiceError::from_db_err(DbErr::Custom("Lock wait timeout exceeded".into()));
        assert!(matches!(e, ServiceError::Transient(_)));

        let e = ServiceError::from_db_err(DbErr::Custom("connection reset by peer".into()));
        assert!(matches!(e, ServiceError::Transient(_)));

        let e = ServiceError::from_db_err(DbErr::Custom("duplicate key value violates unique constraint".into()));
        assert!(matches!(e, ServiceError::Db(_)));
    }
}
