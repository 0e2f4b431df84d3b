//! Canonical lock file rendering.
//!
//! ```text
//! #
//! # This file is autogenerated by pinlock
//! # To update, run:
//! #
//! #    pinlock compile requirements.in
//! #
//! certifi==2023.7.22
//!     # via requests
//! idna==3.4
//!     # via
//!     #   -r requirements.in
//!     #   requests
//! requests==2.31.0
//!     # via -r requirements.in
//! ```
//!
//! Output depends only on the graph and the three header strings.

use std::fmt::Write;

use crate::graph::{DependencyGraph, ResolvedPackage};

pub const DEFAULT_TOOL_NAME: &str = "pinlock";
pub const DEFAULT_INPUT_NAME: &str = "requirements.in";

/// Renders a [`DependencyGraph`] as lock file text.
#[derive(Debug, Clone)]
pub struct LockEmitter {
    tool_name: String,
    command: String,
    input_name: String,
}

impl Default for LockEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_NAME, DEFAULT_INPUT_NAME)
    }
}

impl LockEmitter {
    /// Emitter for `tool_name` reading `input_name`. The regeneration command
    /// defaults to `<tool_name> compile <input_name>`.
    pub fn new(tool_name: impl Into<String>, input_name: impl Into<String>) -> Self {
        let tool_name = tool_name.into();
        let input_name = input_name.into();
        Self {
            command: format!("{tool_name} compile {input_name}"),
            tool_name,
            input_name,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn emit(&self, graph: &DependencyGraph) -> String {
        let mut out = String::new();
        out.push_str("#\n");
        let _ = writeln!(out, "# This file is autogenerated by {}", self.tool_name);
        out.push_str("# To update, run:\n");
        out.push_str("#\n");
        let _ = writeln!(out, "#    {}", self.command);
        out.push_str("#\n");

        let mut packages: Vec<&ResolvedPackage> = graph.packages().collect();
        packages.sort_by_cached_key(|p| collation_key(p.name.as_str()));
        for package in packages {
            let _ = writeln!(out, "{}=={}", package.name, package.version);
            self.write_via(&mut out, package);
        }
        out
    }

    fn write_via(&self, out: &mut String, package: &ResolvedPackage) {
        let root = format!("-r {}", self.input_name);
        let mut parents: Vec<&str> = package.parents.iter().map(|p| p.as_str()).collect();
        parents.sort_by_cached_key(|p| collation_key(p));

        let mut lines: Vec<&str> = Vec::with_capacity(parents.len() + 1);
        if package.direct || parents.is_empty() {
            lines.push(&root);
        }
        lines.extend(parents);

        if let [only] = lines.as_slice() {
            let _ = writeln!(out, "    # via {only}");
        } else {
            out.push_str("    # via\n");
            for line in lines {
                let _ = writeln!(out, "    #   {line}");
            }
        }
    }
}

fn collation_key(name: &str) -> (String, String) {
    (name.to_lowercase(), name.to_string())
}

/// Render `graph` with the default header.
pub fn emit(graph: &DependencyGraph) -> String {
    LockEmitter::default().emit(graph)
}
