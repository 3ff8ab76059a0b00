//! Connection State Machine Unit Tests
//!
//! Tests the transport lifecycle:
//! - DISCONNECTED->CONNECTING->CONNECTED
//! - Reconnect paths and backoff
//! - Terminal CLOSED state

use pool_sniper::transport::{
    BackoffPolicy, ConnectionState, ConnectionStateMachine, NextAction,
};
use std::time::Duration;

fn policy(max_attempts: Option<u32>) -> BackoffPolicy {
    BackoffPolicy::new(
        Duration::from_millis(250),
        Duration::from_secs(4),
        max_attempts,
    )
}

#[test]
fn test_disconnected_to_connecting_valid() {
    assert!(
        ConnectionState::Disconnected.can_transition_to(ConnectionState::Connecting),
        "DISCONNECTED -> CONNECTING should be valid"
    );
}

#[test]
fn test_connected_to_reconnecting_valid() {
    assert!(
        ConnectionState::Connected.can_transition_to(ConnectionState::Reconnecting),
        "CONNECTED -> RECONNECTING should be valid"
    );
}

#[test]
fn test_any_state_can_close() {
    for state in [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Reconnecting,
    ] {
        assert!(
            state.can_transition_to(ConnectionState::Closed),
            "{} -> CLOSED should be valid",
            state
        );
    }
}

#[test]
fn test_closed_is_terminal() {
    for state in [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Reconnecting,
        ConnectionState::Closed,
    ] {
        assert!(
            !ConnectionState::Closed.can_transition_to(state),
            "CLOSED -> {} should be invalid",
            state
        );
    }
}

#[test]
fn test_connected_to_connecting_invalid() {
    assert!(!ConnectionState::Connected.can_transition_to(ConnectionState::Connecting));
    assert!(!ConnectionState::Disconnected.can_transition_to(ConnectionState::Connected));
}

#[test]
fn test_backoff_sequence_non_decreasing_and_capped() {
    let p = policy(None);
    let delays: Vec<Duration> = (0..12).map(|a| p.delay(a)).collect();

    assert_eq!(delays[0], Duration::from_millis(250));
    assert_eq!(delays[1], Duration::from_millis(500));
    assert_eq!(delays[2], Duration::from_secs(1));
    for pair in delays.windows(2) {
        assert!(pair[0] <= pair[1], "backoff must not decrease");
    }
    assert!(delays.iter().all(|d| *d <= Duration::from_secs(4)));
    assert_eq!(p.delay(u32::MAX), Duration::from_secs(4));
}

#[test]
fn test_attempt_resets_after_successful_connect() {
    let mut machine = ConnectionStateMachine::new(policy(None));
    machine.begin_connect();

    // Two failed attempts
    machine.failed();
    machine.begin_connect();
    machine.failed();
    assert_eq!(machine.attempt(), 2);

    machine.begin_connect();
    let change = machine.connected().expect("connect transition");
    assert_eq!(change.to, ConnectionState::Connected);
    assert_eq!(change.attempt, 0);
    assert_eq!(machine.attempt(), 0);

    // Next drop starts the schedule from the initial delay again
    let (action, _) = machine.failed();
    assert_eq!(
        action,
        NextAction::Retry {
            delay: Duration::from_millis(250),
            attempt: 1
        }
    );
}

#[test]
fn test_exhausted_after_max_attempts() {
    let mut machine = ConnectionStateMachine::new(policy(Some(2)));
    machine.begin_connect();

    let (first, _) = machine.failed();
    assert!(matches!(first, NextAction::Retry { attempt: 1, .. }));
    machine.begin_connect();

    let (second, _) = machine.failed();
    assert!(matches!(second, NextAction::Retry { attempt: 2, .. }));
    machine.begin_connect();

    let (third, change) = machine.failed();
    assert_eq!(third, NextAction::Exhausted { attempts: 2 });
    assert_eq!(change.map(|c| c.to), Some(ConnectionState::Closed));
    assert_eq!(machine.state(), ConnectionState::Closed);
}

#[test]
fn test_remote_close_reconnects_unless_shutting_down() {
    let mut machine = ConnectionStateMachine::new(policy(None));
    machine.begin_connect();
    machine.connected();

    let (action, change) = machine.remote_closed();
    assert!(matches!(action, NextAction::Retry { .. }));
    assert_eq!(change.map(|c| c.to), Some(ConnectionState::Reconnecting));

    machine.begin_connect();
    machine.connected();
    machine.request_shutdown();

    let (action, change) = machine.remote_closed();
    assert_eq!(action, NextAction::Stop);
    assert_eq!(change.map(|c| c.to), Some(ConnectionState::Closed));
}

#[test]
fn test_close_is_idempotent() {
    let mut machine = ConnectionStateMachine::new(policy(None));
    assert!(machine.close().is_some());
    assert!(machine.close().is_none());
    assert!(machine.begin_connect().is_none());
    assert_eq!(machine.state(), ConnectionState::Closed);
}
