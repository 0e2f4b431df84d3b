//! Dependency resolution engine: one version per package, highest version
//! satisfying every accumulated constraint, chronological backtracking on
//! conflict, provenance tracking, and canonical lock-file emission.

pub mod cache;
pub mod conflict;
pub mod emit;
pub mod graph;
pub mod provenance;
pub mod resolver;

pub use emit::{emit, LockEmitter};
pub use graph::{DependencyGraph, ResolvedPackage};
pub use resolver::{resolve, ResolveError, ResolveOptions, Resolver};
