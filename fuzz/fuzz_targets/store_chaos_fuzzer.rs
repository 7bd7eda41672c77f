//! Fuzz target for state stores under injected failures
//!
//! Runs arbitrary store/update/delete sequences against a ChaoticStateStore
//! wrapping a MemoryStateStore and checks the result against a plain map.
//!
//! # Invariants
//!
//! - Failed operations leave the record unchanged
//! - A present record is never empty
//! - Records for different identifiers never affect each other

#![no_main]

use std::collections::HashMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use relaysms_core::{ChaoticStateStore, MemoryStateStore, StateStore, StorageError};

#[derive(Debug, Arbitrary)]
struct Scenario {
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    operations: Vec<Operation>,
}

#[derive(Debug, Arbitrary)]
enum Operation {
    Store { who: u8, blob: Vec<u8> },
    Update { who: u8, blob: Vec<u8> },
    Delete { who: u8 },
    Retrieve { who: u8 },
}

fn identifier(who: u8) -> String {
    format!("+1555000{:04}", who % 8)
}

fuzz_target!(|scenario: Scenario| {
    let rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let inner = MemoryStateStore::new();
    let store = ChaoticStateStore::with_seed(inner.clone(), rate, scenario.chaos_seed);
    let mut model: HashMap<String, Vec<u8>> = HashMap::new();

    for op in scenario.operations.into_iter().take(256) {
        match op {
            Operation::Store { who, blob } => {
                let id = identifier(who);
                if store.store(&id, &blob).is_ok() {
                    assert!(!blob.is_empty());
                    model.insert(id, blob);
                }
            },
            Operation::Update { who, blob } => {
                let id = identifier(who);
                let expected = model.get(&id).cloned();
                let result = store.update::<(), StorageError, _>(&id, |prior| {
                    assert_eq!(prior, expected);
                    Ok((blob.clone(), ()))
                });
                if result.is_ok() {
                    assert!(!blob.is_empty());
                    model.insert(id, blob);
                }
            },
            Operation::Delete { who } => {
                let id = identifier(who);
                if store.delete(&id).is_ok() {
                    model.remove(&id);
                }
            },
            Operation::Retrieve { who } => {
                let id = identifier(who);
                if let Ok(found) = store.retrieve(&id) {
                    assert_eq!(found.as_ref(), model.get(&id));
                }
            },
        }

        assert_eq!(inner.count().expect("memory store"), model.len());
    }

    for (id, blob) in &model {
        assert_eq!(inner.retrieve(id).expect("memory store").as_ref(), Some(blob));
    }
});
