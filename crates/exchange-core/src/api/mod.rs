//! Node collaborators.

pub mod node;
pub mod rpc;

pub use node::{LogStream, NodeClient};
pub use rpc::JsonRpcClient;
