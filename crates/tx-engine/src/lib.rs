//! Transaction Engine
//!
//! Builds, signs and broadcasts transactions against the 0x exchange, then
//! watches them for a receipt and emitted events.

pub mod builder;
pub mod pipeline;
pub mod watcher;

pub use builder::{ContractInvocation, TransactionBuilder, TxTarget};
pub use pipeline::{
    PipelineBuilder, PipelineRun, PipelineState, Submission, Submitted, TransactionPipeline,
};
pub use watcher::{
    TransactionWatcher, WatchControl, WatchHandle, WatchNotification, WatchObserver, WatchState,
    WatchStatus,
};
