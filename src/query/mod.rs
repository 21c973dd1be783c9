//! Read-only views over a committed [`CodeGraph`](crate::graph::CodeGraph).
//!
//! Every function here takes `&CodeGraph` and never mutates it, so queries can run
//! from any number of threads at once.

pub mod calls;
pub mod deps;
pub mod find;
pub mod hierarchy;
pub mod output;
pub mod snippet;
pub mod stats;
pub mod summary;
