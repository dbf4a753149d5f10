//! 0x v3 order signing and transaction submission.
//!
//! The root crate re-exports the workspace crates for benchmarks and demos.
//! Use the individual crates directly:
//!
//! - `exchange-core`: EIP-712 encoding, order mapping and signing, signature
//!   codec, node client, configuration
//! - `tx-engine`: transaction building, the submission pipeline, receipt and
//!   event watching

pub use exchange_core as core;
pub use tx_engine as engine;
