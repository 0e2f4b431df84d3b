//! Package version parsing, comparison, and canonical rendering.
//!
//! Versions follow the public PEP 440 scheme:
//! - An optional epoch (`1!`) followed by dot-separated release numbers
//! - Optional pre-release (`a`, `b`, `rc`), post-release (`.post`), and
//!   dev-release (`.dev`) segments
//! - An optional local label after `+`
//!
//! Ordering: epoch, then release (trailing zeros are insignificant), then
//! `dev` < pre-release < final < post-release, then local labels. A version
//! with a local label sorts above the same public version without one.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use thiserror::Error;

/// A version string that could not be parsed.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
#[error("invalid version `{input}`: {reason}")]
pub struct VersionParseError {
    pub input: String,
    pub reason: String,
}

/// A parsed, totally ordered version.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreKind, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
    local: Vec<LocalSegment>,
}

/// Pre-release phases in ascending order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum PreKind {
    Alpha,
    Beta,
    Rc,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd)]
enum LocalSegment {
    // Declared first: text segments sort below numeric ones.
    Text(String),
    Number(u64),
}

#[derive(Debug, Eq, PartialEq, Ord, PartialOrd)]
enum PhaseKey {
    DevOnly,
    Pre(PreKind, u64),
    Final,
}

#[derive(Debug, Eq, PartialEq, Ord, PartialOrd)]
enum DevKey {
    Dev(u64),
    Release,
}

impl Version {
    /// Build a plain final release from numeric segments.
    pub fn from_release(release: &[u64]) -> Self {
        Self {
            epoch: 0,
            release: release.to_vec(),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True for pre-releases and dev releases.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    pub fn has_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// The same version with its local label removed.
    pub fn public(&self) -> Version {
        Version {
            local: Vec::new(),
            ..self.clone()
        }
    }

    /// True when both versions share epoch and release numbers, ignoring
    /// trailing zeros and all pre/post/dev/local segments.
    pub fn same_release(&self, other: &Version) -> bool {
        self.epoch == other.epoch && trim_zeros(&self.release) == trim_zeros(&other.release)
    }

    /// Prefix match used by `==X.Y.*`: the release, padded with zeros,
    /// starts with `prefix`. Pre, post, dev and local segments are ignored.
    pub fn matches_prefix(&self, epoch: u64, prefix: &[u64]) -> bool {
        if self.epoch != epoch {
            return false;
        }
        prefix
            .iter()
            .enumerate()
            .all(|(i, p)| self.release.get(i).copied().unwrap_or(0) == *p)
    }

    /// Total order used for candidate selection: semantic order first, then
    /// canonical text so that `1.0` and `1.0.0` have a fixed relative order.
    pub fn cmp_exact(&self, other: &Version) -> Ordering {
        self.cmp(other)
            .then_with(|| self.to_string().cmp(&other.to_string()))
    }

    fn phase_key(&self) -> PhaseKey {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => PhaseKey::DevOnly,
            (Some((kind, n)), _, _) => PhaseKey::Pre(kind, n),
            _ => PhaseKey::Final,
        }
    }

    fn dev_key(&self) -> DevKey {
        match self.dev {
            Some(n) => DevKey::Dev(n),
            None => DevKey::Release,
        }
    }
}

fn trim_zeros(release: &[u64]) -> &[u64] {
    let end = release
        .iter()
        .rposition(|&n| n != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    &release[..end]
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| trim_zeros(&self.release).cmp(trim_zeros(&other.release)))
            .then_with(|| self.phase_key().cmp(&other.phase_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        f.write_str(&release.join("."))?;
        if let Some((kind, n)) = self.pre {
            let tag = match kind {
                PreKind::Alpha => "a",
                PreKind::Beta => "b",
                PreKind::Rc => "rc",
            };
            write!(f, "{tag}{n}")?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if !self.local.is_empty() {
            let local: Vec<String> = self
                .local
                .iter()
                .map(|s| match s {
                    LocalSegment::Text(t) => t.clone(),
                    LocalSegment::Number(n) => n.to_string(),
                })
                .collect();
            write!(f, "+{}", local.join("."))?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Version {
    /// Parse a version string into its canonical form.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let fail = |reason: String| VersionParseError {
            input: input.to_string(),
            reason,
        };

        let lowered = input.trim().to_ascii_lowercase();
        let text = lowered.strip_prefix('v').unwrap_or(&lowered);
        if text.is_empty() {
            return Err(fail("empty version".to_string()));
        }

        let (public, local) = match text.split_once('+') {
            Some((p, l)) => (p, Some(l)),
            None => (text, None),
        };

        let (epoch, rest) = match public.split_once('!') {
            Some((e, r)) => {
                let epoch = e
                    .parse::<u64>()
                    .map_err(|_| fail(format!("invalid epoch `{e}`")))?;
                (epoch, r)
            }
            None => (0, public),
        };

        let mut cursor = Cursor { rest };
        let release = cursor.release().map_err(&fail)?;
        let pre = cursor.pre();
        let post = cursor.post();
        let dev = cursor.dev();
        if !cursor.rest.is_empty() {
            return Err(fail(format!("unexpected trailing `{}`", cursor.rest)));
        }

        let local = match local {
            Some(l) => parse_local(l).map_err(&fail)?,
            None => Vec::new(),
        };

        Ok(Version {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }
}

fn parse_local(text: &str) -> Result<Vec<LocalSegment>, String> {
    let mut segments = Vec::new();
    for part in text.split(['.', '-', '_']) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!("invalid local label `{text}`"));
        }
        match part.parse::<u64>() {
            Ok(n) => segments.push(LocalSegment::Number(n)),
            Err(_) => segments.push(LocalSegment::Text(part.to_string())),
        }
    }
    Ok(segments)
}

/// Hand-rolled scanner over the public part of a version.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn digits(&mut self) -> Option<u64> {
        let len = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        if len == 0 {
            return None;
        }
        let (num, rest) = self.rest.split_at(len);
        let n = num.parse::<u64>().ok()?;
        self.rest = rest;
        Some(n)
    }

    fn release(&mut self) -> Result<Vec<u64>, String> {
        let mut release = Vec::new();
        loop {
            match self.digits() {
                Some(n) => release.push(n),
                None => return Err(format!("expected a release number at `{}`", self.rest)),
            }
            let continues = self.rest.starts_with('.')
                && self.rest[1..].starts_with(|c: char| c.is_ascii_digit());
            if !continues {
                return Ok(release);
            }
            self.rest = &self.rest[1..];
        }
    }

    /// Try to consume `[sep]tag[sep][digits]` for any of `tags`. Restores the
    /// cursor when nothing matches.
    fn tagged(&mut self, tags: &[&str]) -> Option<(usize, u64)> {
        let start = self.rest;
        let body = start.strip_prefix(['.', '-', '_']).unwrap_or(start);
        for (i, tag) in tags.iter().enumerate() {
            if let Some(after) = body.strip_prefix(tag) {
                let after_sep = after.strip_prefix(['.', '-', '_']).unwrap_or(after);
                self.rest = after_sep;
                match self.digits() {
                    Some(n) => return Some((i, n)),
                    None => {
                        self.rest = after;
                        return Some((i, 0));
                    }
                }
            }
        }
        self.rest = start;
        None
    }

    fn pre(&mut self) -> Option<(PreKind, u64)> {
        const TAGS: [&str; 8] = ["alpha", "beta", "preview", "pre", "rc", "a", "b", "c"];
        let (i, n) = self.tagged(&TAGS)?;
        let kind = match TAGS[i] {
            "alpha" | "a" => PreKind::Alpha,
            "beta" | "b" => PreKind::Beta,
            _ => PreKind::Rc,
        };
        Some((kind, n))
    }

    fn post(&mut self) -> Option<u64> {
        if let Some((_, n)) = self.tagged(&["post", "rev", "r"]) {
            return Some(n);
        }
        // Implicit post release: `1.0-1`
        let start = self.rest;
        if let Some(after) = start.strip_prefix('-') {
            self.rest = after;
            if let Some(n) = self.digits() {
                return Some(n);
            }
            self.rest = start;
        }
        None
    }

    fn dev(&mut self) -> Option<u64> {
        self.tagged(&["dev"]).map(|(_, n)| n)
    }
}
