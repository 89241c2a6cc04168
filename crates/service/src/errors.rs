use thiserror::Error;

use crate::tier::Tier;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("unauthorized: missing or invalid upload key")]
    Unauthorized,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("no data for tier `{0}`")]
    NotFound(Tier),
    #[error("no such slot file `{0}`")]
    UnknownSlot(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl RelayError {
    pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidPayload(msg.into()) }

    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage(format!("{context}: {err}"))
    }

    /// Machine-readable code used in error bodies and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::NotFound(_) | Self::UnknownSlot(_) => "not_found",
            Self::Storage(_) => "internal_error",
        }
    }
}
