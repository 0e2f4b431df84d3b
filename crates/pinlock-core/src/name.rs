//! Normalized package names.

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A package name that is not a valid identifier.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
#[error("invalid package name `{0}`")]
#[diagnostic(help(
    "names start and end with a letter or digit and may contain `.`, `-` and `_`"
))]
pub struct InvalidNameError(pub String);

/// A case- and separator-normalized package name.
///
/// `Foo_Bar`, `foo.bar` and `FOO--bar` all normalize to `foo-bar`, so two
/// spellings of the same package compare equal. The normalized form is
/// lowercase, which makes the derived ordering case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    /// Validate and normalize a raw name.
    pub fn new(raw: &str) -> Result<Self, InvalidNameError> {
        if !is_valid(raw) {
            return Err(InvalidNameError(raw.to_string()));
        }
        Ok(Self(normalize(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
        }
        _ => false,
    }
}

/// Lowercase and collapse every run of `-`, `_` and `.` into a single `-`.
fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_separator = false;
    for ch in raw.chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(ch.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageName {
    type Err = InvalidNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PackageName {
    type Error = InvalidNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spellings_compare_equal() {
        let a = PackageName::new("Foo_Bar").unwrap();
        let b = PackageName::new("foo.bar").unwrap();
        let c = PackageName::new("FOO--bar").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "foo-bar");
    }

    #[test]
    fn ordering_is_case_insensitive() {
        let upper = PackageName::new("Zope").unwrap();
        let lower = PackageName::new("attrs").unwrap();
        assert!(lower < upper);
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(PackageName::new("").is_err());
        assert!(PackageName::new("-leading").is_err());
        assert!(PackageName::new("trailing.").is_err());
        assert!(PackageName::new("has space").is_err());
        assert!(PackageName::new("a>b").is_err());
    }

    #[test]
    fn single_character_is_valid() {
        assert_eq!(PackageName::new("A").unwrap().as_str(), "a");
    }
}
