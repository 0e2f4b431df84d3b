//! Reading pins back out of an emitted lock file.
//!
//! Pin lines are the unindented, non-comment lines (`name==version`). Header
//! and `# via` annotation lines are ignored.

use std::path::Path;

use crate::requirement::{Requirement, RequirementError};
use crate::specifier::Operator;

/// Parse every pin of a lock file as an exact `==` requirement.
pub fn read_pins(content: &str) -> Result<Vec<Requirement>, RequirementError> {
    let mut pins = Vec::new();
    for line in content.lines() {
        if line.is_empty() || line.starts_with('#') || line.starts_with(char::is_whitespace) {
            continue;
        }
        let req = Requirement::parse(line)?;
        let is_pin = matches!(req.constraint.clauses(), [c] if c.op == Operator::Equal && !c.wildcard);
        if !is_pin {
            return Err(RequirementError {
                input: line.to_string(),
                token: req.constraint.to_string(),
                reason: "lock entries must be exact `==` pins".to_string(),
            });
        }
        pins.push(req);
    }
    Ok(pins)
}

/// Load the pins of the lock file at `path`.
pub fn read_pins_from_path(path: &Path) -> miette::Result<Vec<Requirement>> {
    let content =
        std::fs::read_to_string(path).map_err(|e| pinlock_util::errors::PinlockError::Generic {
            message: format!("Failed to read lock file {}: {e}", path.display()),
        })?;
    read_pins(&content).map_err(|e| {
        pinlock_util::errors::PinlockError::Manifest {
            message: e.to_string(),
        }
        .into()
    })
}
