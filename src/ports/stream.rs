//! Status stream seam.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

/// The stream failed to open. Surfaced as a connection-phase change, not a
/// panic; no automatic reconnect is attempted.
#[derive(Debug)]
pub enum ConnectionError {
    /// The WebSocket handshake failed.
    Handshake(tokio_tungstenite::tungstenite::Error),
    /// The handshake did not complete within the configured timeout.
    Timeout,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Handshake(e) => write!(f, "Stream handshake failed: {}", e),
            ConnectionError::Timeout => write!(f, "Stream handshake timed out"),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::Handshake(e) => Some(e),
            ConnectionError::Timeout => None,
        }
    }
}

/// Opens the status stream for a task.
///
/// Resolves once the subscription is established, yielding the receiving
/// half of a channel of inbound text frames in server send order. The
/// channel closing means the server or the transport ended the stream.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<mpsc::Receiver<String>, ConnectionError>;
}
