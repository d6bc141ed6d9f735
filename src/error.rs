use thiserror::Error;

/// Result type for gateway boundary operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised at the payment gateway boundary.
///
/// `Rejected` is the only variant that represents an explicit refusal by the
/// gateway; the rest are transport-level and are treated as transient while a
/// payment is being verified.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment request rejected: {message}")]
    Rejected { message: String },

    #[error("gateway network error: {message}")]
    Network { message: String },

    #[error("gateway returned an unreadable response: {message}")]
    InvalidResponse { message: String },

    #[error("gateway request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("gateway configuration error: {message}")]
    Config { message: String },
}

impl GatewayError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for an explicit refusal, as opposed to a transport failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::network(format!("Request error: {}", err))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::invalid_response(format!("JSON error: {}", err))
    }
}

/// Result type for checkout-facing payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Errors surfaced to the checkout flow.
///
/// Only `Validation` and `Gateway` reach the cashier as failures; everything
/// else a payment attempt can run into resolves inside the session (transient
/// poll errors are retried, exhausted attempts downgrade to manual entry).
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{message}")]
    Validation { message: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("no payment is awaiting a confirmation code")]
    NotAwaitingCode,

    #[error("another payment is already in progress")]
    PaymentInProgress,
}

impl PaymentError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
