//! JSON-RPC websocket transport (`logsSubscribe`)

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::{encode_logs_subscriptions, ClosePolicy, SubscriptionSpec, Transport, TransportError};
use crate::normalizer::RawEvent;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Persistent websocket; subscriptions are re-sent on every open
pub struct WsTransport {
    url: String,
    spec: Arc<SubscriptionSpec>,
    ping_interval: Duration,
    ws: Option<Socket>,
    keepalive: Option<Interval>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, spec: Arc<SubscriptionSpec>, ping_interval: Duration) -> Self {
        Self {
            url: url.into(),
            spec,
            ping_interval,
            ws: None,
            keepalive: None,
        }
    }
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    fn name(&self) -> &'static str {
        "wss"
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        let (ws, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        if !self.ping_interval.is_zero() {
            let mut keepalive =
                interval_at(Instant::now() + self.ping_interval, self.ping_interval);
            keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.keepalive = Some(keepalive);
        }
        self.ws = Some(ws);
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<(), TransportError> {
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| TransportError::Subscribe("socket not open".to_string()))?;

        for request in encode_logs_subscriptions(&self.spec) {
            ws.send(Message::Text(request))
                .await
                .map_err(|e| TransportError::Subscribe(e.to_string()))?;
        }

        tracing::debug!(
            programs = self.spec.entries().len(),
            "logsSubscribe requests sent"
        );
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<RawEvent>, TransportError> {
        loop {
            let ws = self
                .ws
                .as_mut()
                .ok_or_else(|| TransportError::Stream("socket not open".to_string()))?;

            let message = match self.keepalive.as_mut() {
                Some(keepalive) => tokio::select! {
                    _ = keepalive.tick() => {
                        ws.send(Message::Ping(Vec::new()))
                            .await
                            .map_err(|e| TransportError::Stream(format!("keepalive ping failed: {}", e)))?;
                        continue;
                    }
                    message = ws.next() => message,
                },
                None => ws.next().await,
            };

            match message {
                Some(Ok(Message::Text(text))) => return Ok(Some(RawEvent::logs(text))),
                Some(Ok(Message::Ping(payload))) => {
                    ws.send(Message::Pong(payload))
                        .await
                        .map_err(|e| TransportError::Stream(format!("pong failed: {}", e)))?;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "Websocket close frame received");
                    return Ok(None);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Stream(e.to_string())),
                None => return Err(TransportError::StreamEnded),
            }
        }
    }

    async fn close(&mut self) {
        self.keepalive = None;
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                tracing::debug!(error = %e, "Websocket close failed");
            }
        }
    }

    fn close_policy(&self) -> ClosePolicy {
        ClosePolicy::Reconnect
    }
}
