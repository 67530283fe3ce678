//! Fuzz target for the change log.
//!
//! Applies arbitrary interleavings of field and association writes and checks
//! that every entry stays reachable at the position it was first recorded.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_changes
//! ```

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use grimoire_query::changes::{Change, Changes};
use grimoire_query::filter::FilterValue;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Operation {
    Set(u8, i64),
    Inc(u8),
    Dec(u8),
    Fragment(u8, Vec<i64>),
    SetAssoc(u8, u8),
    SetStale(u8, Option<Vec<i64>>),
}

fn field(n: u8) -> String {
    format!("field_{}", n % 16)
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let Ok(operations) = Vec::<Operation>::arbitrary(&mut unstructured) else {
        return;
    };

    let mut changes = Changes::new();
    let mut order: Vec<String> = Vec::new();
    let mut assoc_order: Vec<String> = Vec::new();

    for op in operations {
        let name = match &op {
            Operation::Set(n, _)
            | Operation::Inc(n)
            | Operation::Dec(n)
            | Operation::Fragment(n, _) => field(*n),
            Operation::SetAssoc(n, _) | Operation::SetStale(n, _) => {
                let name = field(*n);
                if !assoc_order.contains(&name) {
                    assoc_order.push(name.clone());
                }
                name
            }
        };

        match op {
            Operation::Set(_, v) => changes.set(Change::set(name.clone(), v)),
            Operation::Inc(_) => changes.set(Change::inc(name.clone())),
            Operation::Dec(_) => changes.set(Change::dec(name.clone())),
            Operation::Fragment(_, args) => {
                // Fragments key on their expression, which doubles as the field here.
                changes.set(Change::fragment(name.clone(), args))
            }
            Operation::SetAssoc(_, count) => {
                let children = (0..count % 4).map(|_| Changes::new()).collect();
                changes.set_assoc(name, children);
                continue;
            }
            Operation::SetStale(_, ids) => {
                changes.set_stale_assoc(name, ids.map(|ids| ids.into_iter().map(FilterValue::Int).collect()));
                continue;
            }
        }

        if !order.contains(&name) {
            order.push(name);
        }
    }

    assert_eq!(changes.len(), order.len());
    for (i, name) in order.iter().enumerate() {
        assert_eq!(changes.index_of(name), Some(i));
        assert_eq!(changes.get_index(i).map(|c| c.field.as_str()), Some(name.as_str()));
    }
    for (i, name) in assoc_order.iter().enumerate() {
        assert_eq!(changes.assoc_index_of(name), Some(i));
    }
    assert_eq!(changes.is_empty(), order.is_empty());
});
