//! Mapping from vault errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use resivault_common::Error;

/// Error returned by handlers.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::VaultNotUnlocked | Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::EntryNotFound(_) | Error::SecretNotFound(_) | Error::RootEntryNotFound => {
                StatusCode::NOT_FOUND
            }
            Error::AlreadyExists(_)
            | Error::SecretLabelAlreadyExists(_)
            | Error::VaultAlreadyInitialized => StatusCode::CONFLICT,
            Error::SchemaViolation(_)
            | Error::InvalidInput(_)
            | Error::Serialization(_)
            | Error::PasswordNotProvided => StatusCode::BAD_REQUEST,
            Error::SecretTypeNotSupported(_) | Error::UsageTypeNotSupported(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::CryptoFailure => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn code(&self) -> &'static str {
        match &self.0 {
            Error::Storage(_) | Error::Io(_) => "StorageError",
            Error::RootEntryNotFound => "RootEntryNotFound",
            Error::RootEntryMalformed(_) => "RootEntryMalformed",
            Error::CryptographyIncompatible(_) => "CryptographyIncompatible",
            Error::CryptoFailure | Error::Crypto(_) => "CryptoError",
            Error::VaultNotUnlocked => "VaultNotUnlocked",
            Error::VaultAlreadyInitialized => "VaultAlreadyInitialized",
            Error::EntryNotFound(_) => "EntryNotFound",
            Error::SecretNotFound(_) => "SecretNotFound",
            Error::SecretTypeNotSupported(_) => "SecretTypeNotSupported",
            Error::UsageTypeNotSupported(_) => "UsageTypeNotSupported",
            Error::SecretLabelAlreadyExists(_) => "SecretLabelAlreadyExists",
            Error::SchemaViolation(_) => "SchemaViolation",
            Error::Serialization(_) => "Serialization",
            Error::InvalidInput(_) => "InvalidInput",
            Error::AlreadyExists(_) => "AlreadyExists",
            Error::Unauthorized => "Unauthorized",
            Error::PasswordNotProvided => "PasswordNotProvided",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        let body = Json(json!({
            "error": self.code(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
