use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of a structured validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub msg: String,
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
}

impl ValidationIssue {
    fn render(&self) -> String {
        let path = self
            .loc
            .iter()
            .map(|segment| match segment {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        if path.is_empty() {
            self.msg.clone()
        } else {
            format!("{path}: {}", self.msg)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Issues(Vec<ValidationIssue>),
}

impl ErrorDetail {
    pub fn to_message(&self) -> String {
        match self {
            Self::Message(message) => message.clone(),
            Self::Issues(issues) => issues
                .iter()
                .map(ValidationIssue::render)
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

/// A non-success response from the checkout server, normalized to one line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Builds the error from a raw response body, falling back to a generic
    /// description of `operation` when the body is not an error document.
    pub fn from_body(status: u16, body: &[u8], operation: &str) -> Self {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .map(|parsed| parsed.detail.to_message())
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| format!("{operation} failed (HTTP {status})"));
        Self { status, message }
    }
}
