//! Conflict reporting: the full chain of constraints that could not be met.

use std::fmt;

use pinlock_core::{PackageName, Version, VersionConstraint};

use crate::provenance::Requirer;

/// One constraint placed on the conflicting package, and where it came from.
#[derive(Debug, Clone)]
pub struct ConstraintSource {
    pub requirer: Requirer,
    /// Version of the requirer at the time of the conflict (`None` for root and constraints).
    pub requirer_version: Option<Version>,
    pub constraint: VersionConstraint,
    /// Packages from a root requirement down to the requirer, inclusive.
    pub chain: Vec<PackageName>,
}

/// A package whose accumulated constraints admit no available version, or
/// whose chosen version was invalidated by a later constraint.
#[derive(Debug, Clone)]
pub struct ConflictChain {
    pub package: PackageName,
    /// The version chosen before the conflicting constraint arrived, if any.
    pub chosen: Option<Version>,
    pub sources: Vec<ConstraintSource>,
}

impl ConflictChain {
    /// Names of every package that contributed a constraint.
    pub fn requirers(&self) -> Vec<&PackageName> {
        self.sources
            .iter()
            .filter_map(|s| match &s.requirer {
                Requirer::Package(name) => Some(name),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for ConflictChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chosen {
            Some(v) => write!(
                f,
                "`{}` {v} was selected, but later constraints exclude it and no other version satisfies all of:",
                self.package
            )?,
            None => write!(
                f,
                "no version of `{}` satisfies all of:",
                self.package
            )?,
        }
        for source in &self.sources {
            let constraint = if source.constraint.is_any() {
                "any version".to_string()
            } else {
                source.constraint.to_string()
            };
            match (&source.requirer, &source.requirer_version) {
                (Requirer::Root, _) => {
                    write!(f, "\n  input manifest requires {} {constraint}", self.package)?
                }
                (Requirer::Constraint, _) => {
                    write!(f, "\n  constraints file requires {} {constraint}", self.package)?
                }
                (Requirer::Package(name), Some(v)) => {
                    write!(f, "\n  {name} {v} requires {} {constraint}", self.package)?
                }
                (Requirer::Package(name), None) => {
                    write!(f, "\n  {name} requires {} {constraint}", self.package)?
                }
            }
            if source.chain.len() > 1 {
                let chain: Vec<&str> = source.chain.iter().map(|n| n.as_str()).collect();
                write!(f, " (via {})", chain.join(" -> "))?;
            }
        }
        Ok(())
    }
}
