//! Error types for order signing and transaction submission.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Typed data error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Signing error: {message}")]
    Signing { message: String },

    #[error("Unsupported signature scheme: 0x{0:02x}")]
    UnsupportedScheme(u8),

    #[error("Invalid signature: {message}")]
    InvalidSignature { message: String },

    #[error("Invalid order: {message}")]
    InvalidOrder { message: String },

    #[error("Cannot build transaction: {message}")]
    CannotBuildTransaction { message: String },

    #[error("Broadcast error: {message}")]
    Broadcast { message: String },

    #[error("Node query error: {message}")]
    NodeQuery { message: String },
}

impl Error {
    pub fn signing(message: impl Into<String>) -> Self {
        Error::Signing {
            message: message.into(),
        }
    }

    pub fn node_query(message: impl Into<String>) -> Self {
        Error::NodeQuery {
            message: message.into(),
        }
    }

    pub fn broadcast(message: impl Into<String>) -> Self {
        Error::Broadcast {
            message: message.into(),
        }
    }

    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Error::InvalidSignature {
            message: message.into(),
        }
    }
}

/// Rejections raised while validating a typed-data schema and message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no entry for type `{0}`")]
    MissingType(String),

    #[error("`{type_name}` is missing field `{field}`")]
    MissingField { type_name: String, field: String },

    #[error("`{type_name}` has undeclared field `{field}`")]
    UnexpectedField { type_name: String, field: String },

    #[error("field `{field}` declares unknown type `{ty}`")]
    UnknownType { field: String, ty: String },

    #[error("field `{field}` expects `{expected}`")]
    TypeMismatch { field: String, expected: String },

    #[error("field `{field}` does not fit in `{ty}`")]
    OutOfRange { field: String, ty: String },
}

pub type Result<T> = std::result::Result<T, Error>;
