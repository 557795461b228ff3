//!
//! # GdsDb Internal Utilities Crate
//!
//! Shared helpers for the GdsDb crates:
//! serialization to text formats, error-generation helpers for tree-walkers,
//! and dependency-ordering of graph-like data such as cell hierarchies.
//!

pub mod ser;
pub use ser::*;

pub mod error;
pub use error::*;

pub mod dep_order;
pub use dep_order::*;
