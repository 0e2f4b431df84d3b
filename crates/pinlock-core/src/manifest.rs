//! Reader for `requirements.in`-style input manifests.

use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

use crate::requirement::{Requirement, RequirementError};

/// A requirement line that failed to parse.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("line {line}: {source}")]
pub struct ManifestLineError {
    pub line: usize,
    #[source]
    pub source: RequirementError,
}

/// A top-level requirement together with the line it was declared on.
#[derive(Debug, Clone)]
pub struct DeclaredRequirement {
    pub line: usize,
    pub text: String,
}

/// The root requirements declared by the consuming project.
#[derive(Debug, Clone, Default)]
pub struct InputManifest {
    pub requirements: Vec<DeclaredRequirement>,
}

impl InputManifest {
    /// Split manifest text into logical requirement lines.
    ///
    /// `#` starts a comment, blank lines are skipped, and a trailing `\` joins
    /// a line with the next one. Line numbers refer to the first physical line.
    pub fn parse(content: &str) -> Self {
        let mut requirements = Vec::new();
        let mut pending: Option<(usize, String)> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let without_comment = strip_comment(raw);
            let (body, continues) = match without_comment.trim_end().strip_suffix('\\') {
                Some(b) => (b, true),
                None => (without_comment, false),
            };

            let (start, mut text) = pending.take().unwrap_or((line_no, String::new()));
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(body.trim());

            if continues {
                pending = Some((start, text));
            } else if !text.trim().is_empty() {
                requirements.push(DeclaredRequirement {
                    line: start,
                    text: text.trim().to_string(),
                });
            }
        }
        if let Some((start, text)) = pending {
            if !text.trim().is_empty() {
                requirements.push(DeclaredRequirement {
                    line: start,
                    text: text.trim().to_string(),
                });
            }
        }

        Self { requirements }
    }

    /// Load and split a manifest file.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| pinlock_util::errors::PinlockError::Manifest {
                message: format!("Failed to read {}: {e}", path.display()),
            })?;
        Ok(Self::parse(&content))
    }

    /// The raw requirement strings, in declaration order.
    pub fn requirement_strings(&self) -> Vec<String> {
        self.requirements.iter().map(|r| r.text.clone()).collect()
    }

    /// Parse every line, reporting the first failure with its line number.
    pub fn parse_requirements(&self) -> Result<Vec<Requirement>, ManifestLineError> {
        self.requirements
            .iter()
            .map(|r| {
                Requirement::parse(&r.text).map_err(|source| ManifestLineError {
                    line: r.line,
                    source,
                })
            })
            .collect()
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}
