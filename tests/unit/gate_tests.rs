//! Admission gate unit tests
//!
//! Dedup against the last admitted asset and the in-flight bound.

use pool_sniper::gate::{Admission, AdmissionGate};
use pool_sniper::normalizer::CandidateAsset;
use std::sync::Arc;

fn asset(s: &str) -> CandidateAsset {
    CandidateAsset::parse(s).unwrap()
}

/// Distinct base58 identifiers
fn nth_mint(i: usize) -> String {
    const LETTERS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    format!("Mint{}", LETTERS[i % LETTERS.len()] as char)
}

#[test]
fn test_in_flight_stays_within_limit() {
    let gate = Arc::new(AdmissionGate::new(3));
    let mut permits = Vec::new();

    for i in 0..10 {
        let mint = nth_mint(i);
        if let Admission::Admitted(permit) = gate.try_admit(&asset(&mint)) {
            permits.push(permit);
        }
        assert!(gate.in_flight() <= gate.limit());
    }

    assert_eq!(permits.len(), 3);
    assert_eq!(gate.in_flight(), 3);

    permits.clear();
    assert_eq!(gate.in_flight(), 0);
}

#[test]
fn test_consecutive_duplicate_dropped_while_in_flight() {
    let gate = Arc::new(AdmissionGate::new(5));

    let Admission::Admitted(mut first) = gate.try_admit(&asset("MintX")) else {
        panic!("first admission should succeed");
    };
    assert!(matches!(gate.try_admit(&asset("MintX")), Admission::Duplicate));

    // Finalized with failure: the same identifier can come back
    first.purchase_failed();
    drop(first);
    assert!(matches!(gate.try_admit(&asset("MintX")), Admission::Admitted(_)));
}

#[test]
fn test_failed_purchase_keeps_newer_last_seen() {
    let gate = Arc::new(AdmissionGate::new(5));

    let Admission::Admitted(mut first) = gate.try_admit(&asset("MintA")) else {
        panic!("first admission should succeed");
    };
    let Admission::Admitted(_second) = gate.try_admit(&asset("MintB")) else {
        panic!("second admission should succeed");
    };

    first.purchase_failed();
    drop(first);

    // B is still in flight and keeps its dedup slot
    assert_eq!(gate.last_seen(), Some(asset("MintB")));
    assert!(matches!(gate.try_admit(&asset("MintB")), Admission::Duplicate));
    assert_eq!(gate.in_flight(), 1);
}

#[test]
fn test_dedup_is_single_slot() {
    let gate = Arc::new(AdmissionGate::new(5));
    let _a = gate.try_admit(&asset("MintA"));
    let _b = gate.try_admit(&asset("MintB"));

    // A is no longer the last seen asset
    assert!(matches!(gate.try_admit(&asset("MintA")), Admission::Admitted(_)));
}

#[test]
fn test_concurrent_admissions_respect_limit() {
    let gate = Arc::new(AdmissionGate::new(4));
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || {
                let mint = nth_mint(i);
                match gate.try_admit(&asset(&mint)) {
                    Admission::Admitted(permit) => Some(permit),
                    _ => None,
                }
            })
        })
        .collect();

    let permits: Vec<_> = handles
        .into_iter()
        .filter_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(permits.len(), 4);
    assert_eq!(gate.in_flight(), 4);
    drop(permits);
    assert_eq!(gate.in_flight(), 0);
}
