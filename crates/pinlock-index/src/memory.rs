//! In-memory package index, optionally loaded from a TOML or JSON file.
//!
//! File layout (TOML shown, JSON uses the same shape):
//!
//! ```toml
//! [[package]]
//! name = "a"
//! version = "2.0"
//! requires = ["c>=1.0"]
//! ```
//!
//! Version and requirement strings are kept as written and parsed when
//! queried, so a malformed entry surfaces as an error for that package
//! instead of being skipped at load time.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use pinlock_core::{PackageName, Requirement, Version};
use pinlock_util::errors::PinlockError;
use serde::{Deserialize, Serialize};

use crate::{IndexError, PackageIndex};

/// One published release as it appears in an index file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: PackageName,
    pub version: String,
    #[serde(default)]
    pub requires: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexFile {
    #[serde(default)]
    package: Vec<IndexEntry>,
}

/// A package index held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    packages: BTreeMap<PackageName, Vec<(String, Vec<String>)>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a release. A release listed twice keeps the last requirements.
    pub fn insert(&mut self, name: PackageName, version: impl Into<String>, requires: Vec<String>) {
        let version = version.into();
        let releases = self.packages.entry(name).or_default();
        match releases.iter_mut().find(|(v, _)| *v == version) {
            Some(existing) => existing.1 = requires,
            None => releases.push((version, requires)),
        }
    }

    pub fn from_entries(entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.insert(entry.name, entry.version, entry.requires);
        }
        index
    }

    pub fn from_toml_str(content: &str) -> miette::Result<Self> {
        let file: IndexFile = toml::from_str(content).map_err(|e| PinlockError::Index {
            message: format!("Failed to parse index: {e}"),
        })?;
        Ok(Self::from_entries(file.package))
    }

    pub fn from_json_str(content: &str) -> miette::Result<Self> {
        let file: IndexFile = serde_json::from_str(content).map_err(|e| PinlockError::Index {
            message: format!("Failed to parse index: {e}"),
        })?;
        Ok(Self::from_entries(file.package))
    }

    /// Load an index file; `.json` files are read as JSON, anything else as TOML.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PinlockError::Index {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        let index = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };
        tracing::debug!(
            path = %path.display(),
            packages = index.packages.len(),
            "loaded package index"
        );
        Ok(index)
    }

    /// Number of distinct packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn releases(&self, name: &PackageName) -> Result<&[(String, Vec<String>)], IndexError> {
        self.packages
            .get(name)
            .map(|r| r.as_slice())
            .ok_or_else(|| IndexError::UnknownPackage(name.clone()))
    }
}

#[async_trait]
impl PackageIndex for MemoryIndex {
    async fn available_versions(&self, name: &PackageName) -> Result<Vec<Version>, IndexError> {
        self.releases(name)?
            .iter()
            .map(|(raw, _)| {
                Version::parse(raw).map_err(|e| IndexError::InvalidVersion {
                    name: name.clone(),
                    version: raw.clone(),
                    reason: e.reason,
                })
            })
            .collect()
    }

    async fn declared_requirements(
        &self,
        name: &PackageName,
        version: &Version,
    ) -> Result<Vec<Requirement>, IndexError> {
        let releases = self.releases(name)?;
        let (raw, requires) = releases
            .iter()
            .find(|(raw, _)| {
                Version::parse(raw)
                    .map(|v| v.to_string() == version.to_string())
                    .unwrap_or(false)
            })
            .ok_or_else(|| IndexError::UnknownPackage(name.clone()))?;

        requires
            .iter()
            .map(|text| {
                Requirement::parse(text).map_err(|source| IndexError::InvalidRequirement {
                    name: name.clone(),
                    version: raw.clone(),
                    source,
                })
            })
            .collect()
    }
}
