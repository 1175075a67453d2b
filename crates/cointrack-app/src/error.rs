// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Failure taxonomy shared by every call that crosses the server boundary.
///
/// `AuthExpired` is checked before any other interpretation of a response, so
/// a 401 never surfaces as a generic network or validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Validation(String),
    #[error("session expired; log in again")]
    AuthExpired,
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl ApiError {
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
