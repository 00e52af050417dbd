//! Dependency graph between units.
//!
//! This module provides:
//! - Producer → consumer edges over petgraph
//! - Cycle detection with the cycle spelled out in order
//! - Stable topological ordering with source-order tie-break

mod types;

pub use types::{DependencyGraph, UnitId};
