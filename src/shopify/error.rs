use std::fmt;
use thiserror::Error;

/// One error reported by the Admin API, whatever shape it arrived in
/// (top-level `errors`, `userErrors` or `mediaUserErrors`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalApiError {
    pub code: String,
    pub message: String,
    pub field: Option<String>,
}

impl ExternalApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ExternalApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{}] {} ({})", self.code, self.message, field),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("API error: {}", join_errors(.0))]
    Api(Vec<ExternalApiError>),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl PlatformError {
    pub fn api(error: ExternalApiError) -> Self {
        PlatformError::Api(vec![error])
    }
}

fn join_errors(errors: &[ExternalApiError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
