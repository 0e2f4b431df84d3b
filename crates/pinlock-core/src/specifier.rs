//! Version constraints: comma-separated comparator clauses combined with AND.
//!
//! Supported operators: `==`, `!=`, `>=`, `<=`, `>`, `<`, `~=`, plus the
//! prefix forms `==X.Y.*` and `!=X.Y.*`.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use crate::version::Version;

/// A single clause that failed to parse, with the offending token.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
#[error("invalid version clause `{token}`: {reason}")]
pub struct SpecifierError {
    pub token: String,
    pub reason: String,
}

/// Comparison operator of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterEqual,
    LessEqual,
    Greater,
    Less,
    Compatible,
}

impl Operator {
    fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::GreaterEqual => ">=",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::Compatible => "~=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(comparator, version)` pair.
#[derive(Debug, Clone)]
pub struct Clause {
    pub op: Operator,
    pub version: Version,
    /// `==1.2.*` style prefix match. Only valid with `==` and `!=`.
    pub wildcard: bool,
}

impl Clause {
    pub fn new(op: Operator, version: Version) -> Self {
        Self {
            op,
            version,
            wildcard: false,
        }
    }

    /// Whether `candidate` satisfies this clause.
    pub fn matches(&self, candidate: &Version) -> bool {
        let spec = &self.version;
        match self.op {
            Operator::Equal if self.wildcard => {
                candidate.matches_prefix(spec.epoch(), spec.release())
            }
            Operator::NotEqual if self.wildcard => {
                !candidate.matches_prefix(spec.epoch(), spec.release())
            }
            Operator::Equal => equal_ignoring_local(candidate, spec),
            Operator::NotEqual => !equal_ignoring_local(candidate, spec),
            Operator::GreaterEqual => candidate >= spec,
            Operator::LessEqual => candidate.public() <= *spec,
            Operator::Greater => {
                // `>1.7` does not admit `1.7.post1` unless the bound is itself a post release.
                candidate > spec
                    && !(candidate.is_postrelease()
                        && !spec.is_postrelease()
                        && candidate.same_release(spec))
                    && !(candidate.has_local() && candidate.public() == spec.public())
            }
            Operator::Less => {
                // `<2.0` does not admit `2.0rc1` unless the bound is itself a pre-release.
                candidate.public() < *spec
                    && !(candidate.is_prerelease()
                        && !spec.is_prerelease()
                        && candidate.same_release(spec))
            }
            Operator::Compatible => {
                let release = spec.release();
                let prefix = &release[..release.len().saturating_sub(1)];
                candidate >= spec && candidate.matches_prefix(spec.epoch(), prefix)
            }
        }
    }

    fn same_as(&self, other: &Clause) -> bool {
        self.op == other.op
            && self.wildcard == other.wildcard
            && self.version.to_string() == other.version.to_string()
    }
}

fn equal_ignoring_local(candidate: &Version, spec: &Version) -> bool {
    if spec.has_local() {
        candidate == spec
    } else {
        candidate.public() == *spec
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)?;
        if self.wildcard {
            f.write_str(".*")?;
        }
        Ok(())
    }
}

/// An immutable conjunction of clauses. The empty constraint admits every version.
#[derive(Debug, Clone, Default)]
pub struct VersionConstraint {
    clauses: Vec<Clause>,
}

impl VersionConstraint {
    /// The constraint that admits every version.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn from_clauses(clauses: Vec<Clause>) -> Self {
        let mut out = Self::any();
        for clause in clauses {
            out.push_unique(clause);
        }
        out
    }

    /// `==version`
    pub fn exact(version: Version) -> Self {
        Self::from_clauses(vec![Clause::new(Operator::Equal, version)])
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }

    /// AND of both constraints. Duplicate clauses are kept once.
    pub fn intersect(&self, other: &VersionConstraint) -> VersionConstraint {
        let mut out = self.clone();
        for clause in &other.clauses {
            out.push_unique(clause.clone());
        }
        out
    }

    fn push_unique(&mut self, clause: Clause) {
        if !self.clauses.iter().any(|c| c.same_as(&clause)) {
            self.clauses.push(clause);
        }
    }

    pub fn matches(&self, candidate: &Version) -> bool {
        self.clauses.iter().all(|c| c.matches(candidate))
    }

    /// True when a clause names a pre-release explicitly (e.g. `>=2.0b1`),
    /// which opts the package into pre-release candidates.
    pub fn mentions_prerelease(&self) -> bool {
        self.clauses
            .iter()
            .any(|c| c.op != Operator::NotEqual && c.version.is_prerelease())
    }

    /// Parse a comma-separated specifier list such as `>=1.0, <2`.
    pub fn parse(text: &str) -> Result<Self, SpecifierError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::any());
        }
        let mut clauses = Vec::new();
        for raw in trimmed.split(',') {
            clauses.push(parse_clause(raw.trim())?);
        }
        Ok(Self::from_clauses(clauses))
    }
}

fn parse_clause(raw: &str) -> Result<Clause, SpecifierError> {
    let err = |token: &str, reason: &str| SpecifierError {
        token: token.to_string(),
        reason: reason.to_string(),
    };
    if raw.is_empty() {
        return Err(err(",", "empty version clause"));
    }
    if raw.starts_with("===") {
        return Err(err("===", "arbitrary equality is not supported"));
    }

    const OPERATORS: [(&str, Operator); 7] = [
        ("~=", Operator::Compatible),
        ("==", Operator::Equal),
        ("!=", Operator::NotEqual),
        (">=", Operator::GreaterEqual),
        ("<=", Operator::LessEqual),
        (">", Operator::Greater),
        ("<", Operator::Less),
    ];
    let (op, rest) = OPERATORS
        .iter()
        .find_map(|(sym, op)| raw.strip_prefix(sym).map(|rest| (*op, rest.trim())))
        .ok_or_else(|| err(raw, "expected a comparison operator"))?;

    if rest.is_empty() {
        return Err(err(raw, "missing version after operator"));
    }

    let (version_text, wildcard) = match rest.strip_suffix(".*") {
        Some(prefix) => {
            if !matches!(op, Operator::Equal | Operator::NotEqual) {
                return Err(err(raw, "`.*` is only allowed with `==` and `!=`"));
            }
            (prefix, true)
        }
        None => (rest, false),
    };

    let version = Version::parse(version_text).map_err(|e| err(version_text, &e.reason))?;
    if wildcard && (version.has_local() || version.is_prerelease() || version.is_postrelease()) {
        return Err(err(rest, "prefix match must name release numbers only"));
    }
    if op == Operator::Compatible && version.release().len() < 2 {
        return Err(err(raw, "`~=` needs at least two release segments"));
    }
    if version.has_local() && !matches!(op, Operator::Equal | Operator::NotEqual) {
        return Err(err(raw, "local versions are only allowed with `==` and `!=`"));
    }

    Ok(Clause {
        op,
        version,
        wildcard,
    })
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.clauses.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}
