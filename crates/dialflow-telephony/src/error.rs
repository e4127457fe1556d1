//! Adapter-local errors, mapped into `DomainError` at the port boundary

use dialflow::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelephonyError {
    #[error("Invalid phone number: {0}")]
    InvalidNumber(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} rejected request ({status}): {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected {provider} response: {detail}")]
    UnexpectedResponse {
        provider: &'static str,
        detail: String,
    },

    #[error("Invalid callback: {0}")]
    InvalidCallback(String),
}

impl From<TelephonyError> for DomainError {
    fn from(err: TelephonyError) -> Self {
        match err {
            TelephonyError::InvalidNumber(_) | TelephonyError::InvalidCallback(_) => {
                DomainError::Validation(err.to_string())
            }
            TelephonyError::Http(ref e) if e.is_timeout() => DomainError::Timeout(err.to_string()),
            _ => DomainError::ExternalService(err.to_string()),
        }
    }
}
