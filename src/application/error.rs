use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::pagination::PaginationError, config::LoadError, infra::error::InfraError,
    infra::http::ApiError,
};

/// Flattened view of an error chain, suitable for logs and terminal output.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    pub fn render(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code for the command-line front-end.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Api(ApiError::Client { .. }) | AppError::Validation(_) => 2,
            AppError::Api(_) => 3,
            AppError::Pagination(_) => 2,
            AppError::Config(_) => 4,
            AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }
}
