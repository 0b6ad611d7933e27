use std::time::Duration;

use shared::error::ApiError;
use thiserror::Error;

use crate::router::{Action, Step};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid server url {0}")]
    InvalidServerUrl(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{message}")]
    ServerValidation { status: u16, message: String },
    #[error("malformed server response: {0}")]
    MalformedResponse(String),
    #[error("{0}")]
    Payment(String),
    /// Cancellation failed server-side. Logged by the controller, never returned.
    #[error("cancellation ignored: {0}")]
    CancelIgnored(String),
    #[error("another checkout request is still in flight")]
    Busy,
    #[error("a checkout session is already in progress")]
    SessionInProgress,
    #[error("no checkout session in progress")]
    NoSession,
    #[error("{action} is not available on the {step} step")]
    StepNotAllowed { action: Action, step: Step },
    #[error("unknown product {0}")]
    UnknownProduct(String),
    #[error("checkout has no shipping method yet")]
    NoShippingMethod,
    #[error("unknown shipping group {0}")]
    UnknownGroup(String),
}

impl CheckoutError {
    /// Errors produced by the completion endpoint are payment rejections.
    pub(crate) fn into_payment(self) -> Self {
        match self {
            Self::ServerValidation { message, .. } => Self::Payment(message),
            other => other,
        }
    }
}

impl From<ApiError> for CheckoutError {
    fn from(value: ApiError) -> Self {
        Self::ServerValidation {
            status: value.status,
            message: value.message,
        }
    }
}

impl From<reqwest::Error> for CheckoutError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::MalformedResponse(value.to_string())
        } else {
            Self::Network(value.to_string())
        }
    }
}

pub type Result<T, E = CheckoutError> = std::result::Result<T, E>;
