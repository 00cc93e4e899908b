use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Network,
    Validation,
    Unauthorized,
    UnsupportedOperation,
    NotFound,
    Unknown,
}

/// Serializable error shape exchanged with backends that report structured
/// failures.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_snake_case_codes() {
        let err: ApiError =
            serde_json::from_str(r#"{"code": "unsupported_operation", "message": "no endpoint"}"#)
                .expect("decode");
        assert_eq!(err.code, ErrorCode::UnsupportedOperation);
        assert_eq!(err.message, "no endpoint");
    }
}
