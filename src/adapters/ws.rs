//! WebSocket adapter: opens a task's status stream with tokio-tungstenite.

use crate::ports::stream::{ConnectionError, StreamConnector};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const FRAME_CHANNEL_CAPACITY: usize = 64;

/// Connects to `{ws_base}/task/{task_id}` and forwards text frames.
pub struct WsStreamConnector {
    connect_timeout: Duration,
}

impl WsStreamConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl StreamConnector for WsStreamConnector {
    async fn connect(&self, url: &str) -> Result<mpsc::Receiver<String>, ConnectionError> {
        let (socket, _response) = timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| ConnectionError::Timeout)?
            .map_err(ConnectionError::Handshake)?;

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (_write, mut read) = socket.split();

        tokio::spawn(async move {
            while let Some(next) = read.next().await {
                match next {
                    Ok(Message::Text(text)) => {
                        if frame_tx.send(text).await.is_err() {
                            // Subscription released; stop reading
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {} // ping/pong/binary carry no status
                    Err(e) => {
                        tracing::debug!("Status stream ended with error: {}", e);
                        break;
                    }
                }
            }
            // Dropping frame_tx closes the channel; the driver observes the end
        });

        Ok(frame_rx)
    }
}
