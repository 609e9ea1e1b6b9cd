/// Outbound messaging: the [`Messenger`] capability, its HTTP bridge
/// implementation, and the single-channel [`Dispatcher`].
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Default address of the local WhatsApp automation bridge.
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("gateway rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Sends text to a chat channel. Implementations must tolerate concurrent calls.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), DispatchError>;

    /// Releases the messaging session. Called once on shutdown.
    async fn close(&self) -> Result<(), DispatchError> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    chat_id: &'a str,
    message: &'a str,
}

/// Messenger backed by an HTTP bridge that owns the chat session (QR login,
/// reconnects). Messages are posted as JSON to `<gateway_url>/send`.
#[derive(Clone)]
pub struct HttpBridge {
    client: reqwest::Client,
    gateway_url: String,
}

impl HttpBridge {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway_url: gateway_url.into(),
        }
    }

    fn send_url(&self) -> String {
        format!("{}/send", self.gateway_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Messenger for HttpBridge {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(self.send_url())
            .json(&SendRequest {
                chat_id: channel,
                message: text,
            })
            .send()
            .await
            .map_err(|e| DispatchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(channel = %channel, "gateway accepted message");
        Ok(())
    }

    async fn close(&self) -> Result<(), DispatchError> {
        info!(gateway = %self.gateway_url, "messaging bridge released");
        Ok(())
    }
}

/// Sends finished text to the one configured channel. No retry, no batching.
#[derive(Clone)]
pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
    channel: String,
}

impl Dispatcher {
    pub fn new(messenger: Arc<dyn Messenger>, channel: impl Into<String>) -> Self {
        Self {
            messenger,
            channel: channel.into(),
        }
    }

    pub async fn dispatch(&self, text: &str) -> Result<(), DispatchError> {
        self.messenger.send_message(&self.channel, text).await
    }

    pub async fn close(&self) -> Result<(), DispatchError> {
        self.messenger.close().await
    }
}
