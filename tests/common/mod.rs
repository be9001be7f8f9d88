//! Shared fixtures for rxngraph integration tests
//!
//! Provides the reference records used across scenarios, a small mixed
//! corpus for ordering and concurrency checks, and helpers to build and
//! compare graphs.

#![allow(dead_code)]

pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{
    build_graph, diazo_record, empty_record, hemin_record, mixed_corpus, structurally_equal, unresolvable_record,
};
