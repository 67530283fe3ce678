//! Fuzz target for the query descriptor builder.
//!
//! Chains arbitrary builder calls and checks that building never panics and
//! that branches taken from a clone never alias.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_query_builder
//! ```

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use grimoire_query::filter::{Filter, FilterValue};
use grimoire_query::query::Query;
use grimoire_query::types::OrderByField;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Null,
    Bool(bool),
    Int(i64),
    String(String),
}

impl From<FuzzValue> for FilterValue {
    fn from(val: FuzzValue) -> Self {
        match val {
            FuzzValue::Null => FilterValue::Null,
            FuzzValue::Bool(b) => FilterValue::Bool(b),
            FuzzValue::Int(i) => FilterValue::Int(i),
            FuzzValue::String(s) => FilterValue::String(s),
        }
    }
}

#[derive(Debug, Arbitrary)]
enum Step {
    Where(String, FuzzValue),
    OrWhere(String, FuzzValue),
    Join(String),
    Group(String),
    Having(String, FuzzValue),
    Order(String, bool),
    Offset(u64),
    Limit(u64),
    Lock,
    Find(i64),
    Set(String, FuzzValue),
}

fn apply(query: Query, step: Step) -> Query {
    match step {
        Step::Where(c, v) => query.r#where(Filter::eq(c, v)),
        Step::OrWhere(c, v) => query.or_where([Filter::eq(c, v)]),
        Step::Join(c) => query.join(c),
        Step::Group(c) => query.group([c]),
        Step::Having(c, v) => query.having(Filter::eq(c, v)),
        Step::Order(c, true) => query.order([OrderByField::asc(c)]),
        Step::Order(c, false) => query.order([OrderByField::desc(c)]),
        Step::Offset(n) => query.offset(n),
        Step::Limit(n) => query.limit(n),
        Step::Lock => query.lock(),
        Step::Find(id) => query.find(id),
        Step::Set(f, v) => query.set(f, v),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let Ok((collection, steps, branch)) =
        <(String, Vec<Step>, Vec<Step>)>::arbitrary(&mut unstructured)
    else {
        return;
    };

    let base = steps.into_iter().fold(Query::new(collection), apply);
    let snapshot = base.clone();
    let _branched = branch.into_iter().fold(base.clone(), apply);

    assert_eq!(base, snapshot);
    assert!(base.lock.is_none());
});
