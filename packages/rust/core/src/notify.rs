//! Best-effort "stage ran" notifications.
//!
//! The materializer never waits on a notification: [`dispatch`] spawns the
//! send as a detached task and any failure is logged inside that task.
//! Hosts drain outstanding sends before exit with
//! [`Materializer::flush_notifications`](crate::Materializer::flush_notifications).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::SinkExt;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, instrument};
use url::Url;

use materializer_shared::{MaterializerError, NotificationConfig, Result};

/// Receives a signal each time a stage runs.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Signal that `stage` ran.
    async fn notify(&self, stage: &str) -> Result<()>;
}

/// Sink that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn notify(&self, stage: &str) -> Result<()> {
        debug!(stage, "no notification endpoint configured");
        Ok(())
    }
}

/// Opens a WebSocket connection, sends `{"node": <stage>}`, and closes it.
#[derive(Debug, Clone)]
pub struct WebSocketSink {
    endpoint: Url,
    connect_timeout: Duration,
}

impl WebSocketSink {
    /// `http`/`https` endpoints are rewritten to `ws`/`wss`.
    pub fn new(endpoint: Url, connect_timeout: Duration) -> Result<Self> {
        let mut endpoint = endpoint;
        let scheme = match endpoint.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => {
                return Err(MaterializerError::config(format!(
                    "notification endpoint must be ws(s) or http(s), got '{other}'"
                )));
            }
        };
        endpoint.set_scheme(scheme).map_err(|()| {
            MaterializerError::config(format!("cannot use {endpoint} as a WebSocket endpoint"))
        })?;

        Ok(Self {
            endpoint,
            connect_timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl NotificationSink for WebSocketSink {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn notify(&self, stage: &str) -> Result<()> {
        let connect = tokio_tungstenite::connect_async(self.endpoint.as_str());
        let (mut ws, _response) = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| {
                MaterializerError::Notification(format!(
                    "connect timed out after {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| MaterializerError::Notification(format!("connect failed: {e}")))?;

        let payload = serde_json::json!({ "node": stage }).to_string();
        ws.send(Message::text(payload))
            .await
            .map_err(|e| MaterializerError::Notification(format!("send failed: {e}")))?;
        ws.close(None)
            .await
            .map_err(|e| MaterializerError::Notification(format!("close failed: {e}")))?;

        debug!("notification sent");
        Ok(())
    }
}

/// The sink described by `[notification]`: a WebSocket sink when an
/// endpoint is set, otherwise [`NoopSink`].
pub fn sink_from_config(config: &NotificationConfig) -> Result<Arc<dyn NotificationSink>> {
    match &config.endpoint {
        Some(endpoint) => Ok(Arc::new(WebSocketSink::new(
            endpoint.clone(),
            config.connect_timeout(),
        )?)),
        None => Ok(Arc::new(NoopSink)),
    }
}

/// Fire-and-forget: spawn the notification and return immediately.
///
/// Errors are logged, never returned. Awaiting the handle waits for the
/// send to settle; the runtime cancels it on shutdown otherwise.
pub fn dispatch(sink: Arc<dyn NotificationSink>, stage: impl Into<String>) -> JoinHandle<()> {
    let stage = stage.into();
    tokio::spawn(async move {
        if let Err(e) = sink.notify(&stage).await {
            error!(stage = %stage, error = %e, "notification failed");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio::net::TcpListener;

    #[test]
    fn https_endpoint_becomes_wss() {
        let sink = WebSocketSink::new(
            Url::parse("https://notify.example.com/stages").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(sink.endpoint().as_str(), "wss://notify.example.com/stages");
    }

    #[test]
    fn unsupported_scheme_rejected() {
        let err = WebSocketSink::new(
            Url::parse("ftp://notify.example.com").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, MaterializerError::Config { .. }));
    }

    #[tokio::test]
    async fn sends_stage_name_then_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut texts = Vec::new();
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
                texts.push(msg.to_text().unwrap().to_string());
            }
            texts
        });

        let sink = WebSocketSink::new(
            Url::parse(&format!("ws://{addr}/")).unwrap(),
            Duration::from_secs(5),
        )
        .unwrap();
        sink.notify("NodeDown").await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
        assert_eq!(parsed, serde_json::json!({ "node": "NodeDown" }));
    }

    #[tokio::test]
    async fn refused_connection_is_notification_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = WebSocketSink::new(
            Url::parse(&format!("ws://{addr}/")).unwrap(),
            Duration::from_secs(5),
        )
        .unwrap();
        let err = sink.notify("NodeDown").await.unwrap_err();
        assert!(matches!(err, MaterializerError::Notification(_)));
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        struct Failing;

        #[async_trait]
        impl NotificationSink for Failing {
            async fn notify(&self, _stage: &str) -> Result<()> {
                Err(MaterializerError::Notification("boom".into()))
            }
        }

        dispatch(Arc::new(Failing), "NodeDown").await.unwrap();
    }

    #[test]
    fn config_without_endpoint_is_noop() {
        assert!(sink_from_config(&NotificationConfig::default()).is_ok());
    }
}
