//! JSON-RPC 2.0 protocol for talking to the Floating Dock daemon.
//!
//! - [`protocol`]: message types, error codes, method names and parameters
//! - [`transport`]: length-prefixed codec for message framing
//! - [`client`]: client for connecting to the daemon over its Unix socket
//!
//! # Example
//!
//! ```no_run
//! use dock_rpc::RpcClient;
//!
//! # async fn example() -> Result<(), dock_rpc::ClientError> {
//! let client = RpcClient::connect().await?;
//! let status = client.toggle().await?;
//! println!("dock open: {}", status.window_open);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::{ClientError, RpcClient, dev_socket_path, socket_path};

pub use protocol::{
    DOCK_UNAVAILABLE, INTERNAL_ERROR, INVALID_PARAMS, JSONRPC_VERSION, LaunchParams, LaunchResult,
    METHOD_LAUNCH, METHOD_NOT_FOUND, METHOD_SHUTDOWN, METHOD_STATUS, METHOD_TOGGLE, Message,
    Request, RequestId, Response, RpcError,
};

pub use transport::{CodecError, JsonRpcCodec};

pub use dock_types::{DockEntry, DockStatus};
