//! Connection driver
//!
//! Owns one [`Transport`] and one [`ConnectionStateMachine`], performs the I/O
//! the machine asks for and forwards every payload to the pipeline.

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::{
    BackoffPolicy, ClosePolicy, ConnectionStateMachine, NextAction, StateChange,
    Transport, TransportError,
};
use crate::normalizer::RawEvent;

/// Why the receive loop stopped
enum ListenExit {
    Shutdown,
    PipelineClosed,
    RemoteClosed,
    Failed(TransportError),
}

/// Drives a transport through connect, listen and reconnect
pub struct ConnectionManager<T: Transport> {
    transport: T,
    machine: ConnectionStateMachine,
    events: broadcast::Sender<StateChange>,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T, policy: BackoffPolicy, events: broadcast::Sender<StateChange>) -> Self {
        Self {
            transport,
            machine: ConnectionStateMachine::new(policy),
            events,
        }
    }

    fn publish(&self, change: Option<StateChange>) {
        if let Some(change) = change {
            // Advisory only; no subscribers is fine
            let _ = self.events.send(change);
        }
    }

    /// Run until shutdown, stream completion or exhausted reconnects
    pub async fn run(
        mut self,
        sink: mpsc::Sender<RawEvent>,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError> {
        loop {
            let change = self.machine.begin_connect();
            self.publish(change);

            let opened = tokio::select! {
                _ = shutdown.cancelled() => {
                    self.disconnect().await;
                    return Ok(());
                }
                opened = self.transport.open() => opened,
            };

            if let Err(e) = opened {
                tracing::warn!(
                    transport = self.transport.name(),
                    error = %e,
                    "Connection attempt failed"
                );
                self.transport.close().await;
                if !self.schedule_reconnect(&shutdown).await? {
                    return Ok(());
                }
                continue;
            }

            let change = self.machine.connected();
            self.publish(change);
            tracing::info!(transport = self.transport.name(), "Connection open");

            let subscribed = tokio::select! {
                _ = shutdown.cancelled() => None,
                subscribed = self.transport.subscribe() => Some(subscribed),
            };

            let exit = match subscribed {
                None => ListenExit::Shutdown,
                Some(Err(e)) => ListenExit::Failed(e),
                Some(Ok(())) => {
                    tracing::info!(transport = self.transport.name(), "Subscription sent");
                    self.listen(&sink, &shutdown).await
                }
            };

            match exit {
                ListenExit::Shutdown => {
                    self.disconnect().await;
                    return Ok(());
                }
                ListenExit::PipelineClosed => {
                    tracing::warn!("Pipeline receiver dropped, closing transport");
                    self.disconnect().await;
                    return Ok(());
                }
                ListenExit::RemoteClosed => {
                    self.transport.close().await;
                    if self.transport.close_policy() == ClosePolicy::Terminate {
                        tracing::info!(
                            transport = self.transport.name(),
                            "Stream completed, closing connection"
                        );
                        let change = self.machine.close();
                        self.publish(change);
                        return Ok(());
                    }

                    tracing::warn!(transport = self.transport.name(), "Remote closed connection");
                    let (action, change) = self.machine.remote_closed();
                    self.publish(change);
                    if !self.follow(action, &shutdown).await? {
                        return Ok(());
                    }
                }
                ListenExit::Failed(e) => {
                    tracing::warn!(
                        transport = self.transport.name(),
                        error = %e,
                        "Transport error, reconnecting"
                    );
                    // Old connection goes away before the retry is scheduled
                    self.transport.close().await;
                    if !self.schedule_reconnect(&shutdown).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Close the connection and move to CLOSED. Idempotent.
    pub async fn disconnect(&mut self) {
        self.machine.request_shutdown();
        self.transport.close().await;
        let change = self.machine.close();
        self.publish(change);
    }

    async fn listen(
        &mut self,
        sink: &mpsc::Sender<RawEvent>,
        shutdown: &CancellationToken,
    ) -> ListenExit {
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => return ListenExit::Shutdown,
                next = self.transport.next_event() => next,
            };

            match next {
                Ok(Some(event)) => {
                    if sink.send(event).await.is_err() {
                        return ListenExit::PipelineClosed;
                    }
                }
                Ok(None) => return ListenExit::RemoteClosed,
                Err(e) => return ListenExit::Failed(e),
            }
        }
    }

    /// Returns `Ok(true)` when the caller should connect again
    async fn schedule_reconnect(&mut self, shutdown: &CancellationToken) -> Result<bool, TransportError> {
        let (action, change) = self.machine.failed();
        self.publish(change);
        self.follow(action, shutdown).await
    }

    async fn follow(
        &mut self,
        action: NextAction,
        shutdown: &CancellationToken,
    ) -> Result<bool, TransportError> {
        match action {
            NextAction::Retry { delay, attempt } => {
                tracing::info!(
                    transport = self.transport.name(),
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Reconnect scheduled"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        self.disconnect().await;
                        Ok(false)
                    }
                    _ = tokio::time::sleep(delay) => Ok(true),
                }
            }
            NextAction::Exhausted { attempts } => {
                tracing::error!(
                    transport = self.transport.name(),
                    attempts = attempts,
                    "Reconnect attempts exhausted"
                );
                Err(TransportError::AttemptsExhausted { attempts })
            }
            NextAction::Stop => Ok(false),
        }
    }
}
