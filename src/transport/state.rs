//! Connection state machine and reconnect backoff
//!
//! Pure transition logic shared by both transports. The I/O driver in
//! `manager.rs` asks the machine what to do next and publishes every
//! [`StateChange`] it returns.
//!
//! ```text
//! DISCONNECTED -> CONNECTING -> CONNECTED
//!                    |  ^          |
//!                    v  |          v
//!                 RECONNECTING <---+
//!
//! any non-CLOSED state -> CLOSED (shutdown or attempts exhausted)
//! ```

use serde::Serialize;
use std::time::Duration;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Terminal; reached on local shutdown or exhausted reconnects
    Closed,
}

impl ConnectionState {
    /// Check whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Disconnected, Connecting) => true,
            (Reconnecting, Connecting) => true,
            (Connecting, Connected) => true,
            (Connecting, Reconnecting) => true,
            (Connected, Reconnecting) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Closed
    }

    /// Numeric encoding for the connection state gauge
    pub fn as_gauge(self) -> i64 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::Reconnecting => 3,
            Self::Closed => 4,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "DISCONNECTED"),
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Connected => write!(f, "CONNECTED"),
            Self::Reconnecting => write!(f, "RECONNECTING"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Published on every state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub from: ConnectionState,
    pub to: ConnectionState,
    /// Reconnect attempt count after the transition
    pub attempt: u32,
}

/// Exponential reconnect backoff: `min(initial * 2^attempt, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
}

impl BackoffPolicy {
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Delay before reconnect attempt number `attempt` (0-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), None)
    }
}

/// What the driver should do after a failure or remote close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    /// Sleep for `delay`, then connect again
    Retry { delay: Duration, attempt: u32 },
    /// Reconnect budget spent; the connection is CLOSED
    Exhausted { attempts: u32 },
    /// Shutdown was requested; the connection is CLOSED
    Stop,
}

/// Transition logic for a single transport connection
#[derive(Debug)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    attempt: u32,
    policy: BackoffPolicy,
    shutdown_requested: bool,
}

impl ConnectionStateMachine {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt: 0,
            policy,
            shutdown_requested: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    fn transition(&mut self, to: ConnectionState) -> Option<StateChange> {
        if !self.state.can_transition_to(to) {
            return None;
        }
        let from = self.state;
        self.state = to;
        Some(StateChange {
            from,
            to,
            attempt: self.attempt,
        })
    }

    /// DISCONNECTED/RECONNECTING -> CONNECTING
    pub fn begin_connect(&mut self) -> Option<StateChange> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Reconnecting => {
                self.transition(ConnectionState::Connecting)
            }
            _ => None,
        }
    }

    /// CONNECTING -> CONNECTED; resets the attempt count
    pub fn connected(&mut self) -> Option<StateChange> {
        if self.state != ConnectionState::Connecting {
            return None;
        }
        self.attempt = 0;
        self.transition(ConnectionState::Connected)
    }

    /// Connect failure or transport error while connected
    pub fn failed(&mut self) -> (NextAction, Option<StateChange>) {
        if self.state.is_terminal() || self.shutdown_requested {
            return (NextAction::Stop, self.close());
        }

        if let Some(max) = self.policy.max_attempts() {
            if self.attempt >= max {
                let change = self.transition(ConnectionState::Closed);
                return (
                    NextAction::Exhausted {
                        attempts: self.attempt,
                    },
                    change,
                );
            }
        }

        let delay = self.policy.delay(self.attempt);
        self.attempt += 1;
        let change = self.transition(ConnectionState::Reconnecting);
        (
            NextAction::Retry {
                delay,
                attempt: self.attempt,
            },
            change,
        )
    }

    /// Clean close initiated by the remote side
    ///
    /// Only terminal when shutdown was requested locally; otherwise handled
    /// exactly like an error.
    pub fn remote_closed(&mut self) -> (NextAction, Option<StateChange>) {
        if self.shutdown_requested {
            return (NextAction::Stop, self.close());
        }
        self.failed()
    }

    /// Record a local shutdown request without changing state yet
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    /// Any non-CLOSED state -> CLOSED. Idempotent.
    pub fn close(&mut self) -> Option<StateChange> {
        self.shutdown_requested = true;
        self.transition(ConnectionState::Closed)
    }
}
