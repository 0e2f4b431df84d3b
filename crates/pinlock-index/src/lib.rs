//! Package index interface.
//!
//! The resolver never talks to a registry directly. It consumes the
//! [`PackageIndex`] trait, which answers two read-only questions: which
//! versions of a package exist, and what a given version requires.

pub mod memory;

use async_trait::async_trait;
use miette::Diagnostic;
use pinlock_core::requirement::RequirementError;
use pinlock_core::{PackageName, Requirement, Version};
use thiserror::Error;

pub use memory::MemoryIndex;

/// Failure reported by an index.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum IndexError {
    /// The index has no record of the package.
    #[error("package `{0}` was not found in the index")]
    UnknownPackage(PackageName),

    /// A transient failure (I/O, timeout). The whole run may be retried.
    #[error("index unavailable while querying `{name}`: {reason}")]
    Unavailable { name: PackageName, reason: String },

    /// The index returned a version string that does not parse.
    #[error("index lists invalid version `{version}` for `{name}`: {reason}")]
    InvalidVersion {
        name: PackageName,
        version: String,
        reason: String,
    },

    /// The index returned a requirement string that does not parse.
    #[error("`{name}` {version} declares an invalid requirement: {source}")]
    InvalidRequirement {
        name: PackageName,
        version: String,
        source: RequirementError,
    },
}

/// Read-only view of a package index.
///
/// Implementations must be side-effect free from the caller's perspective;
/// the resolver may issue queries for different packages concurrently.
#[async_trait]
pub trait PackageIndex: Send + Sync {
    /// All published versions of `name`, in any order.
    async fn available_versions(&self, name: &PackageName) -> Result<Vec<Version>, IndexError>;

    /// The requirements declared by `name` at `version`.
    async fn declared_requirements(
        &self,
        name: &PackageName,
        version: &Version,
    ) -> Result<Vec<Requirement>, IndexError>;
}
