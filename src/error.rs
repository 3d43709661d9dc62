//! Typed errors and HTTP mapping.

use crate::record::ScanError;
use crate::response::plain_error;
use crate::sql::BuildError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("unsupported database url: {0}")]
    UnsupportedDatabase(String),
}

/// Failures of a repository operation. Surfaced to callers unwrapped.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("sql: no rows in result set")]
    NotFound,
    #[error(transparent)]
    QueryBuild(#[from] BuildError),
    #[error(transparent)]
    Execution(sqlx::Error),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound)
    }

    pub(crate) fn scan(table: &str, column: &str, e: ScanError) -> Self {
        RepoError::TypeMismatch(format!("{}.{}: {}", table, column, e))
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            other => RepoError::Execution(other),
        }
    }
}

/// Request-level errors; each one ends the request.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid json")]
    Decode(#[source] serde_json::Error),
    #[error("invalid param")]
    Param(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Decode(_) | AppError::Param(_) => StatusCode::BAD_REQUEST,
            AppError::Repo(RepoError::NotFound) => StatusCode::NOT_FOUND,
            AppError::Repo(_) => StatusCode::BAD_REQUEST,
        };
        let message = match &self {
            AppError::Repo(RepoError::NotFound) => "resource not found".to_string(),
            other => other.to_string(),
        };
        plain_error(status, &message)
    }
}
