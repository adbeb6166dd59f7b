use sea_orm::error::DbErr;
use serde::Serialize;

use crate::models::{Document, Position};

/// Raised by the strict build variant when the assembled document ends up
/// invalid. Carries the saved document and every position the store rejected.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentBuildError {
    pub document: Document,
    pub invalid_positions: Vec<Position>,
}

impl DocumentBuildError {
    pub fn new(document: Document, invalid_positions: Vec<Position>) -> Self {
        Self {
            document,
            invalid_positions,
        }
    }

    /// Messages collected on the document, global and per field.
    pub fn messages(&self) -> Vec<String> {
        self.document
            .errors()
            .messages()
            .map(|m| m.message.clone())
            .collect()
    }
}

impl std::fmt::Display for DocumentBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = self
            .document
            .document_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "untyped".to_string());
        write!(
            f,
            "{} document is invalid ({} invalid positions)",
            kind,
            self.invalid_positions.len()
        )?;
        let messages = self.messages();
        if !messages.is_empty() {
            write!(f, ": {}", messages.join("; "))?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Document build failed: {0}")]
    DocumentBuild(Box<DocumentBuildError>),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<DocumentBuildError> for ServiceError {
    fn from(err: DocumentBuildError) -> Self {
        ServiceError::DocumentBuild(Box::new(err))
    }
}

impl ServiceError {
    /// Argument error for a required builder input.
    pub fn missing_argument(name: &str) -> Self {
        ServiceError::InvalidInput(format!("{} argument is required.", name))
    }

    /// The failed build, when this error came from the strict build variant.
    pub fn as_document_build(&self) -> Option<&DocumentBuildError> {
        match self {
            ServiceError::DocumentBuild(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

pub type AppError = ServiceError;
