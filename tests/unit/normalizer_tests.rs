//! Normalizer unit tests
//!
//! Covers both payload shapes through the public `Normalizer` entry point
//! and the balance-based mint resolution.

use pool_sniper::constants::{programs, BASE_MINT};
use pool_sniper::normalizer::{
    resolve_from_balances, CandidateAsset, Normalized, Normalizer, RawEvent, SkipReason,
    StreamInstruction, StreamUpdate,
};
use pool_sniper::transport::{Commitment, SubscriptionSpec, WatchEntry};
use std::sync::Arc;

const MINT_A: &str = "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R";
const MINT_B: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

fn normalizer() -> Normalizer {
    let spec = SubscriptionSpec::new(
        vec![WatchEntry {
            program_id: programs::RAYDIUM_AMM_V4.to_string(),
            markers: vec!["initialize2".to_string()],
        }],
        Commitment::Processed,
        "pool_creations",
        Some(vec![1]),
    );
    Normalizer::new(Arc::new(spec), BASE_MINT)
}

fn notification(logs: &[&str], err: serde_json::Value) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": "logsNotification",
        "params": {
            "subscription": 7,
            "result": {
                "context": { "slot": 123 },
                "value": {
                    "signature": "5h6xBEauJ3PK6SWCZ1PGjBvj8vDdWG3KpwATGy1ARAXF",
                    "err": err,
                    "logs": logs,
                }
            }
        }
    })
    .to_string()
}

fn stream_update(mints: &[&str]) -> StreamUpdate {
    StreamUpdate {
        filters: vec!["pool_creations".to_string()],
        signature: "5h6xBEauJ3PK6SWCZ1PGjBvj8vDdWG3KpwATGy1ARAXF".to_string(),
        slot: 123,
        log_messages: vec!["Program log: initialize2: InitializeInstruction2".to_string()],
        instructions: vec![StreamInstruction {
            program_id: programs::RAYDIUM_AMM_V4.to_string(),
            data: vec![1, 254, 0],
        }],
        post_token_mints: mints.iter().map(|m| m.to_string()).collect(),
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_resolve_pair_with_base() {
    assert_eq!(
        resolve_from_balances(&owned(&[MINT_A, BASE_MINT]), BASE_MINT),
        Some(MINT_A)
    );
    assert_eq!(
        resolve_from_balances(&owned(&[BASE_MINT, MINT_A]), BASE_MINT),
        Some(MINT_A)
    );
}

#[test]
fn test_resolve_both_base_yields_nothing() {
    assert_eq!(
        resolve_from_balances(&owned(&[BASE_MINT, BASE_MINT]), BASE_MINT),
        None
    );
}

#[test]
fn test_resolve_many_takes_first_non_base() {
    assert_eq!(
        resolve_from_balances(&owned(&[BASE_MINT, MINT_A, MINT_B]), BASE_MINT),
        Some(MINT_A)
    );
}

#[test]
fn test_resolve_single_balance_yields_nothing() {
    assert_eq!(resolve_from_balances(&owned(&[MINT_A]), BASE_MINT), None);
    assert_eq!(resolve_from_balances(&[], BASE_MINT), None);
}

#[test]
fn test_candidate_validation() {
    assert!(CandidateAsset::parse(MINT_A).is_ok());
    assert!(CandidateAsset::parse("").is_err());
    assert!(CandidateAsset::parse("has space").is_err());
    assert!(CandidateAsset::parse("0OIl").is_err());
    assert!(CandidateAsset::parse(&"A".repeat(45)).is_err());
}

#[test]
fn test_logs_notification_yields_signature() {
    let text = notification(
        &[
            "Program 675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8 invoke [1]",
            "Program log: initialize2: InitializeInstruction2 { nonce: 254 }",
        ],
        serde_json::Value::Null,
    );

    assert_eq!(
        normalizer().normalize(&RawEvent::logs(text)),
        Normalized::Signature("5h6xBEauJ3PK6SWCZ1PGjBvj8vDdWG3KpwATGy1ARAXF".to_string())
    );
}

#[test]
fn test_logs_without_marker_skipped() {
    let text = notification(&["Program log: Instruction: SwapBaseIn"], serde_json::Value::Null);
    assert_eq!(
        normalizer().normalize(&RawEvent::logs(text)),
        Normalized::Skip(SkipReason::NoMarker)
    );
}

#[test]
fn test_failed_transaction_skipped() {
    let text = notification(
        &["Program log: initialize2: InitializeInstruction2"],
        serde_json::json!({ "InstructionError": [0, "Custom"] }),
    );
    assert_eq!(
        normalizer().normalize(&RawEvent::logs(text)),
        Normalized::Skip(SkipReason::FailedTransaction)
    );
}

#[test]
fn test_subscription_ack_skipped() {
    let ack = r#"{"jsonrpc":"2.0","result":42,"id":1}"#;
    assert_eq!(
        normalizer().normalize(&RawEvent::logs(ack)),
        Normalized::Skip(SkipReason::Acknowledgement)
    );
}

#[test]
fn test_garbage_frame_skipped() {
    assert_eq!(
        normalizer().normalize(&RawEvent::logs("not json")),
        Normalized::Skip(SkipReason::Malformed)
    );
}

#[test]
fn test_stream_update_yields_asset() {
    let event = RawEvent::stream(stream_update(&[BASE_MINT, MINT_A]));
    assert_eq!(
        normalizer().normalize(&event),
        Normalized::Asset(CandidateAsset::parse(MINT_A).unwrap())
    );
}

#[test]
fn test_stream_update_other_filter_skipped() {
    let mut update = stream_update(&[BASE_MINT, MINT_A]);
    update.filters = vec!["other".to_string()];
    assert_eq!(
        normalizer().normalize(&RawEvent::stream(update)),
        Normalized::Skip(SkipReason::FilterMismatch)
    );
}

#[test]
fn test_stream_update_wrong_discriminator_skipped() {
    let mut update = stream_update(&[BASE_MINT, MINT_A]);
    update.instructions[0].data = vec![9, 9];
    assert_eq!(
        normalizer().normalize(&RawEvent::stream(update)),
        Normalized::Skip(SkipReason::DiscriminatorMismatch)
    );
}

#[test]
fn test_stream_update_only_base_skipped() {
    let event = RawEvent::stream(stream_update(&[BASE_MINT, BASE_MINT]));
    assert_eq!(
        normalizer().normalize(&event),
        Normalized::Skip(SkipReason::NoCandidate)
    );
}
