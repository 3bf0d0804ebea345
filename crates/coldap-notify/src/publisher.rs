//! Notification transports
//!
//! A publisher hands a single UTF-8 message to an outbound channel. Delivery is
//! fire-and-forget: no acknowledgement is awaited.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{NotifyError, NotifyResult};

/// Maximum UDP message size (65507 bytes = 65535 - 20 IP header - 8 UDP header).
const MAX_UDP_MESSAGE_SIZE: usize = 65507;

/// Outbound channel for change notifications.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish one message.
    async fn publish(&self, message: &str) -> NotifyResult<()>;
}

/// Publishes each message as one UDP datagram.
pub struct UdpPublisher {
    socket: UdpSocket,
    target: String,
}

impl UdpPublisher {
    /// Open a socket connected to `host:port`.
    pub async fn connect(host: &str, port: u16) -> NotifyResult<Self> {
        let target = format!("{host}:{port}");

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| NotifyError::connection_failed(&target, format!("UDP bind failed: {e}")))?;
        socket
            .connect(&target)
            .await
            .map_err(|e| NotifyError::connection_failed(&target, e))?;

        info!(target = %target, "Notification channel opened");
        Ok(Self { socket, target })
    }

    /// The `host:port` this publisher sends to.
    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl Publisher for UdpPublisher {
    async fn publish(&self, message: &str) -> NotifyResult<()> {
        if message.len() > MAX_UDP_MESSAGE_SIZE {
            return Err(NotifyError::MessageTooLarge {
                size: message.len(),
                max: MAX_UDP_MESSAGE_SIZE,
            });
        }

        self.socket.send(message.as_bytes()).await.map_err(|e| {
            NotifyError::SendFailed(format!("UDP send to {} failed: {e}", self.target))
        })?;

        debug!(target = %self.target, message = %message, "Notification sent");
        Ok(())
    }
}

/// Publisher that only logs, used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPublisher;

#[async_trait]
impl Publisher for LoggingPublisher {
    async fn publish(&self, message: &str) -> NotifyResult<()> {
        info!(message = %message, "[dry-run] would publish notification");
        Ok(())
    }
}

/// Publisher that keeps messages in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublisher {
    messages: Arc<RwLock<Vec<String>>>,
    fail: bool,
}

impl InMemoryPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every send fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            messages: Arc::default(),
            fail: true,
        }
    }

    /// Messages published so far.
    pub async fn messages(&self) -> Vec<String> {
        self.messages.read().await.clone()
    }

    /// Forget published messages.
    pub async fn clear(&self) {
        self.messages.write().await.clear();
    }
}

#[async_trait]
impl Publisher for InMemoryPublisher {
    async fn publish(&self, message: &str) -> NotifyResult<()> {
        if self.fail {
            return Err(NotifyError::SendFailed("publisher unavailable".to_string()));
        }
        self.messages.write().await.push(message.to_string());
        Ok(())
    }
}
