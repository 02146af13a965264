#![deny(clippy::all)]

mod types;

pub use agent_exec_common::error_codes;
pub use types::RpcRequest;
pub use types::RpcResponse;
pub use types::RpcServerError;
