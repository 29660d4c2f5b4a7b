// Path: crates/types/src/error/mod.rs
//! Core error types for HyChain.
//!
//! The taxonomy is closed: every failure a public operation can surface maps
//! to exactly one [`ChainError`] variant, and every variant carries a stable
//! `ERR_*` name and a numeric code. The wire representation of a code is the
//! negated absolute value, so peers can treat any negative integer as an
//! error discriminator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A trait for assigning a stable, machine-readable identity to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;

    /// Returns the numeric code assigned to this error variant.
    fn error_code(&self) -> i32;

    /// Returns the wire representation of the code: `-abs(code)`.
    fn wire_code(&self) -> i32 {
        -self.error_code().abs()
    }
}

/// The unified error type for every fallible HyChain operation.
#[derive(Error, Debug)]
pub enum ChainError {
    /// A failure that does not fit any other variant.
    #[error("Unknown error: {0}")]
    Unknown(String),
    /// A chunk of serialized data was malformed or could not be decoded.
    #[error("Invalid chunk: {0}")]
    InvalidChunk(String),
    /// An operation was attempted on a resource after it was disposed.
    #[error("Resource already disposed: {0}")]
    ResourceDisposed(&'static str),
    /// A read was attempted past the end of a byte stream.
    #[error("Unexpected end of stream")]
    EndOfStream,
    /// The operation is not supported for the given input or state.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// The operation is specified but not implemented yet.
    #[error("Not implemented: {0}")]
    NotImplemented(String),
    /// An argument was outside the operation's domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The supplied cancellation token was triggered.
    #[error("Operation was cancelled by its token")]
    TokenCancelled,
    /// The supplied cryptographic key is shorter than the algorithm requires.
    #[error("Crypto key too short: expected at least {expected} bytes, got {got}")]
    CryptoKeyShort {
        /// The minimum number of key bytes the operation requires.
        expected: usize,
        /// The number of key bytes actually supplied.
        got: usize,
    },
    /// An envelope did not start with the expected magic byte sequence.
    #[error("Magic number mismatch")]
    MagicNumberMismatch,
    /// An envelope carried a flag byte outside the defined set.
    #[error("Invalid bit flag: {0}")]
    InvalidBitflag(u8),
    /// A byte stream was closed while an operation still needed it.
    #[error("Stream closed: {0}")]
    StreamClosed(String),
    /// A value had an unexpected or unrepresentable type.
    #[error("Invalid type: {0}")]
    InvalidType(String),
    /// A referenced object could not be located.
    #[error("Missing object: {0}")]
    MissingObject(String),
}

impl ErrorCode for ChainError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unknown(_) => "UNKNOWN_ERROR",
            Self::InvalidChunk(_) => "ERR_INVALID_CHUNK",
            Self::ResourceDisposed(_) => "ERR_RESOURCE_DISPOSED",
            Self::EndOfStream => "ERR_END_OF_STREAM",
            Self::UnsupportedOperation(_) => "ERR_UNSUPPORTED_OPERATION",
            Self::NotImplemented(_) => "ERR_NOT_IMPLEMENTED",
            Self::InvalidArgument(_) => "ERR_INVALID_ARGUMENT",
            Self::TokenCancelled => "ERR_TOKEN_CANCELLED",
            Self::CryptoKeyShort { .. } => "ERR_CRYPTO_KEY_SHORT",
            Self::MagicNumberMismatch => "ERR_MAGIC_NUMBER_MISSMATCH",
            Self::InvalidBitflag(_) => "ERR_INVALID_BITFLAG",
            Self::StreamClosed(_) => "ERR_STREAM_CLOSED",
            Self::InvalidType(_) => "ERR_INVALID_TYPE",
            Self::MissingObject(_) => "ERR_MISSING_OBJECT",
        }
    }

    fn error_code(&self) -> i32 {
        match self {
            Self::Unknown(_) => 1087,
            Self::InvalidChunk(_) => 1083,
            Self::ResourceDisposed(_) => 1043,
            Self::EndOfStream => 10392,
            Self::UnsupportedOperation(_) => 1079,
            Self::NotImplemented(_) => 1078,
            Self::InvalidArgument(_) => 1081,
            Self::TokenCancelled => 1053,
            Self::CryptoKeyShort { .. } => 10382,
            Self::MagicNumberMismatch => 10878,
            Self::InvalidBitflag(_) => 11854,
            Self::StreamClosed(_) => 1123,
            Self::InvalidType(_) => 1185,
            Self::MissingObject(_) => 1179,
        }
    }
}

impl ChainError {
    /// Builds the structured wire record for this error.
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            name: self.code().to_string(),
            code: self.wire_code(),
            message: self.to_string(),
            context: None,
        }
    }

    /// Builds the structured wire record with an attached context value.
    pub fn envelope_with_context(&self, context: serde_json::Value) -> ErrorEnvelope {
        ErrorEnvelope {
            context: Some(context),
            ..self.envelope()
        }
    }
}

/// The structured record an error is reduced to at a process boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The stable `ERR_*` name of the originating variant.
    pub name: String,
    /// The wire code, always negative.
    pub code: i32,
    /// The human-readable message.
    pub message: String,
    /// Optional structured context attached at the failure site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        ChainError::InvalidChunk(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for ChainError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        ChainError::InvalidChunk(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let cases: Vec<(ChainError, &str, i32)> = vec![
            (ChainError::Unknown("x".into()), "UNKNOWN_ERROR", 1087),
            (ChainError::InvalidChunk("x".into()), "ERR_INVALID_CHUNK", 1083),
            (
                ChainError::ResourceDisposed("reader"),
                "ERR_RESOURCE_DISPOSED",
                1043,
            ),
            (ChainError::EndOfStream, "ERR_END_OF_STREAM", 10392),
            (
                ChainError::UnsupportedOperation("x".into()),
                "ERR_UNSUPPORTED_OPERATION",
                1079,
            ),
            (
                ChainError::NotImplemented("x".into()),
                "ERR_NOT_IMPLEMENTED",
                1078,
            ),
            (
                ChainError::InvalidArgument("x".into()),
                "ERR_INVALID_ARGUMENT",
                1081,
            ),
            (ChainError::TokenCancelled, "ERR_TOKEN_CANCELLED", 1053),
            (
                ChainError::CryptoKeyShort {
                    expected: 32,
                    got: 4,
                },
                "ERR_CRYPTO_KEY_SHORT",
                10382,
            ),
            (
                ChainError::MagicNumberMismatch,
                "ERR_MAGIC_NUMBER_MISSMATCH",
                10878,
            ),
            (ChainError::InvalidBitflag(99), "ERR_INVALID_BITFLAG", 11854),
            (
                ChainError::StreamClosed("x".into()),
                "ERR_STREAM_CLOSED",
                1123,
            ),
            (ChainError::InvalidType("x".into()), "ERR_INVALID_TYPE", 1185),
            (
                ChainError::MissingObject("x".into()),
                "ERR_MISSING_OBJECT",
                1179,
            ),
        ];

        for (err, name, code) in cases {
            assert_eq!(err.code(), name);
            assert_eq!(err.error_code(), code);
            assert_eq!(err.wire_code(), -code);
        }
    }

    #[test]
    fn test_envelope_serialization() {
        let err = ChainError::InvalidBitflag(99);
        let envelope = err.envelope();
        assert_eq!(envelope.name, "ERR_INVALID_BITFLAG");
        assert_eq!(envelope.code, -11854);

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["code"], -11854);
        // Context is omitted entirely when absent.
        assert!(json.get("context").is_none());

        let with_ctx = err.envelope_with_context(serde_json::json!({ "flag": 99 }));
        let json = serde_json::to_value(&with_ctx).unwrap();
        assert_eq!(json["context"]["flag"], 99);
    }
}
