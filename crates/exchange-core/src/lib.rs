//! Exchange Core Library
//!
//! Order types, EIP-712 order signing, and the node and gas collaborators
//! used to submit 0x exchange transactions.

pub mod api;
pub mod config;
pub mod error;
pub mod gas;
pub mod signing;
pub mod types;

pub use error::{Error, Result, SchemaError};
