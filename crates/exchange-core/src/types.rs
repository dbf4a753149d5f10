//! Core domain types for order signing and submission.

pub mod order;
pub mod transaction;

pub use order::*;
pub use transaction::*;
