pub mod auth;
pub mod block;
pub mod config;
pub mod editor;
pub mod jobs;
pub mod post;
pub mod promotion;
pub mod render;
pub mod storage;
pub mod timestamp;

#[cfg(test)]
mod tests;

#[derive(Debug, thiserror::Error)]
#[error("{context}: {detail}")]
pub struct Error {
    pub context: Box<ErrorContext>,
    pub detail: Box<ErrorDetail>,
}

impl Error {
    /// Message suitable for showing to the admin who triggered the operation.
    pub fn user_message(&self) -> String {
        format!("Error: {}", self.detail)
    }
}

#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub operation: &'static str,
    pub target: Option<String>,
}

impl ErrorContext {
    pub(crate) fn new(operation: &'static str) -> Self {
        Self {
            operation,
            target: None,
        }
    }

    pub(crate) fn with_target(&self, target: impl Into<String>) -> Self {
        Self {
            operation: self.operation,
            target: Some(target.into()),
        }
    }

    pub(crate) fn error(&self, detail: ErrorDetail) -> Error {
        Error {
            context: Box::new(self.clone()),
            detail: Box::new(detail),
        }
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}({target})", self.operation),
            None => f.write_str(self.operation),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorDetail {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Upload failed: {0}")]
    UploadFailed(String),
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),
    #[error("Not signed in")]
    Unauthenticated,
}
