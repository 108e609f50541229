//! Client for the Floating Dock daemon socket.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dock_types::DockStatus;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::net::UnixStream;
use tokio::sync::{Mutex, oneshot};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::protocol::{
    LaunchParams, LaunchResult, METHOD_LAUNCH, METHOD_SHUTDOWN, METHOD_STATUS, METHOD_TOGGLE,
    Message, Request, RequestId, Response, RpcError,
};
use crate::transport::{CodecError, JsonRpcCodec};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR").map_or_else(|_| std::env::temp_dir(), PathBuf::from)
}

fn is_dev_socket() -> bool {
    let Ok(exe) = std::env::current_exe() else {
        return false;
    };

    let Some(parent) = exe.parent() else {
        return false;
    };

    if !parent.ends_with("target/debug") {
        return false;
    }

    let Some(name) = exe.file_name().and_then(|file| file.to_str()) else {
        return false;
    };

    matches!(name, "floating-dock" | "floating-dock-daemon")
}

/// Socket path used by debug builds run from `target/debug`.
#[must_use]
pub fn dev_socket_path() -> PathBuf {
    runtime_dir().join("floating-dock-dev.sock")
}

/// Socket path of the daemon: `$XDG_RUNTIME_DIR/floating-dock.sock`, or the
/// temp directory when that is unset.
#[must_use]
pub fn socket_path() -> PathBuf {
    if is_dev_socket() {
        return dev_socket_path();
    }
    runtime_dir().join("floating-dock.sock")
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC error: {code} - {message}")]
    Rpc { code: i32, message: String },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Request timeout")]
    Timeout,

    #[error("Unexpected response type")]
    UnexpectedResponse,
}

impl From<RpcError> for ClientError {
    fn from(e: RpcError) -> Self {
        ClientError::Rpc {
            code: e.code,
            message: e.message,
        }
    }
}

type PendingRequest = oneshot::Sender<Result<Response, ClientError>>;
type PendingMap = Arc<Mutex<HashMap<RequestId, PendingRequest>>>;

pub struct RpcClient {
    sender: Mutex<SplitSink<Framed<UnixStream, JsonRpcCodec>, Message>>,
    pending: PendingMap,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Connect to the daemon at the default socket path.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the socket connection fails.
    pub async fn connect() -> Result<Self, ClientError> {
        Self::connect_to(&socket_path()).await
    }

    /// Connect to the daemon at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the socket connection fails.
    pub async fn connect_to(path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(path).await?;
        let (sink, mut stream) = Framed::new(stream, JsonRpcCodec::new()).split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_pending = pending.clone();

        tokio::spawn(async move {
            while let Some(result) = stream.next().await {
                match result {
                    Ok(Message::Response(resp)) => {
                        if let Some(tx) = reader_pending.lock().await.remove(&resp.id) {
                            let _ = tx.send(Ok(resp));
                        } else {
                            debug!("Response for unknown request {}", resp.id);
                        }
                    }
                    Ok(Message::Request(req)) => {
                        warn!("Ignoring unexpected request from daemon: {}", req.method);
                    }
                    Err(e) => {
                        for (_, tx) in reader_pending.lock().await.drain() {
                            let _ = tx.send(Err(ClientError::Codec(CodecError::Io(
                                std::io::Error::other(e.to_string()),
                            ))));
                        }
                        break;
                    }
                }
            }
            // Dropping the senders fails the waiters with ConnectionClosed
            reader_pending.lock().await.clear();
        });

        Ok(Self {
            sender: Mutex::new(sink),
            pending,
            next_id: AtomicU64::new(1),
        })
    }

    /// Send a request and wait for its result.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails, the connection closes, the daemon
    /// answers with an error, or the result does not deserialize into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<T, ClientError> {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let request = Request::new(method, params, id.clone());

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        self.sender
            .lock()
            .await
            .send(Message::Request(request))
            .await?;

        let response = tokio::time::timeout(REQUEST_TIMEOUT, rx)
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(|_| ClientError::ConnectionClosed)??;

        if let Some(error) = response.error {
            return Err(error.into());
        }

        let result = response.result.ok_or(ClientError::UnexpectedResponse)?;
        Ok(serde_json::from_value(result)?)
    }

    /// Toggle the dock window and return the status after the toggle.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::request`].
    pub async fn toggle(&self) -> Result<DockStatus, ClientError> {
        self.request(METHOD_TOGGLE, None).await
    }

    /// Ask the daemon to launch the application described by `params`.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::request`].
    pub async fn launch(&self, params: LaunchParams) -> Result<LaunchResult, ClientError> {
        self.request(METHOD_LAUNCH, Some(serde_json::to_value(params)?))
            .await
    }

    /// # Errors
    ///
    /// See [`RpcClient::request`].
    pub async fn status(&self) -> Result<DockStatus, ClientError> {
        self.request(METHOD_STATUS, None).await
    }

    /// # Errors
    ///
    /// See [`RpcClient::request`].
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        let _: serde_json::Value = self.request(METHOD_SHUTDOWN, None).await?;
        Ok(())
    }
}
