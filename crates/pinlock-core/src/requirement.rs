//! Requirement strings: a package name followed by an optional specifier list.
//!
//! Accepted forms: `name`, `name>=1.0,<2`, `name (>=1.0)`. Extras, environment
//! markers and direct URL references are rejected with the offending token.

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

use crate::name::PackageName;
use crate::specifier::VersionConstraint;

/// A requirement string that could not be parsed.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
#[error("malformed requirement `{input}`: unexpected `{token}` ({reason})")]
pub struct RequirementError {
    pub input: String,
    pub token: String,
    pub reason: String,
}

/// A parsed requirement: which package, and which versions of it are acceptable.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub name: PackageName,
    pub constraint: VersionConstraint,
}

impl Requirement {
    pub fn new(name: PackageName, constraint: VersionConstraint) -> Self {
        Self { name, constraint }
    }

    /// Parse a requirement string. Pure; performs no I/O.
    pub fn parse(input: &str) -> Result<Self, RequirementError> {
        let fail = |token: &str, reason: &str| RequirementError {
            input: input.to_string(),
            token: token.to_string(),
            reason: reason.to_string(),
        };

        let text = input.trim();
        if text.is_empty() {
            return Err(fail("", "empty requirement"));
        }

        let name_len = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
            .unwrap_or(text.len());
        let (raw_name, rest) = text.split_at(name_len);
        if raw_name.is_empty() {
            let token = text.split_whitespace().next().unwrap_or(text);
            return Err(fail(token, "expected a package name"));
        }
        let name = PackageName::new(raw_name).map_err(|_| fail(raw_name, "invalid package name"))?;

        let rest = rest.trim();
        if let Some(first) = rest.chars().next() {
            match first {
                '[' => return Err(fail(until_space(rest), "extras are not supported")),
                ';' => return Err(fail(rest, "environment markers are not supported")),
                '@' => return Err(fail(rest, "direct references are not supported")),
                _ => {}
            }
        }

        let spec_text = match rest.strip_prefix('(') {
            Some(inner) => inner
                .strip_suffix(')')
                .ok_or_else(|| fail(rest, "unclosed parenthesis"))?,
            None => rest,
        };

        let constraint =
            VersionConstraint::parse(spec_text).map_err(|e| fail(&e.token, &e.reason))?;

        Ok(Self { name, constraint })
    }
}

fn until_space(s: &str) -> &str {
    s.split_whitespace().next().unwrap_or(s)
}

impl FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.constraint)
    }
}
