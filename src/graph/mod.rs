//! Graph algorithms used during validation.
//!
//! Dependency graphs are arena-indexed and built per validation call.

pub mod dependency;

pub use dependency::DependencyGraph;
