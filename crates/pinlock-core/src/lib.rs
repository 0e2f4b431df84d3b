//! Core data types for pinlock.
//!
//! This crate defines the values the resolver works with: normalized package
//! names, totally ordered versions, version constraints, the requirement
//! parser, the input-manifest reader, the lock-file pin reader, and global
//! configuration.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod lockfile;
pub mod manifest;
pub mod name;
pub mod requirement;
pub mod specifier;
pub mod version;

pub use name::PackageName;
pub use requirement::Requirement;
pub use specifier::VersionConstraint;
pub use version::Version;
