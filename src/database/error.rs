use crate::error::{AppError, AppErrorKind, InfrastructureError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
}

#[derive(Debug, Clone, Error)]
pub enum DatabaseErrorKind {
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("foreign key violated: {message}")]
    ForeignKeyViolation { message: String },

    #[error("connection error: {message}")]
    Connection { message: String },

    #[error("query failed: {message}")]
    Query { message: String },

    #[error("database error: {message}")]
    Unknown { message: String },
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self { kind }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::new(DatabaseErrorKind::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        })
    }

    pub fn from_sqlx(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::RowNotFound => DatabaseErrorKind::NotFound {
                entity: "row".to_string(),
                id: "unknown".to_string(),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseErrorKind::Connection {
                    message: err.to_string(),
                }
            }
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    DatabaseErrorKind::UniqueViolation {
                        constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    }
                } else if db_err.is_foreign_key_violation() {
                    DatabaseErrorKind::ForeignKeyViolation {
                        message: db_err.message().to_string(),
                    }
                } else {
                    DatabaseErrorKind::Query {
                        message: db_err.message().to_string(),
                    }
                }
            }
            _ => DatabaseErrorKind::Unknown {
                message: err.to_string(),
            },
        };
        Self { kind }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::UniqueViolation { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::Connection { .. })
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
            message: err.to_string(),
            is_retryable: err.is_retryable(),
        }))
    }
}
