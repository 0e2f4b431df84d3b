//! Operations: display the resolved dependency tree, or explain why a
//! package is present.

use std::path::PathBuf;

use pinlock_core::config::GlobalConfig;
use pinlock_core::PackageName;
use pinlock_util::errors::PinlockError;
use pinlock_util::fs;
use tokio_util::sync::CancellationToken;

use crate::resolve_input;

/// Options shared by `pinlock tree` and `pinlock why`.
#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub input: PathBuf,
    pub index: PathBuf,
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    pub config: GlobalConfig,
    pub cancel: CancellationToken,
}

impl TreeOptions {
    pub fn new(input: impl Into<PathBuf>, index: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            index: index.into(),
            depth: None,
            config: GlobalConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    fn root_label(&self) -> String {
        fs::relative_display(&self.input)
    }
}

/// Render the dependency tree below the input manifest.
pub async fn tree(opts: &TreeOptions) -> miette::Result<String> {
    let graph = resolve_input(&opts.input, &opts.index, &[], &opts.config, &opts.cancel).await?;
    Ok(graph.print_tree(&opts.root_label(), opts.depth))
}

/// Render the shortest path from the input manifest to `target`, followed by
/// every package that requires it.
pub async fn why(opts: &TreeOptions, target: &str) -> miette::Result<String> {
    let name = PackageName::new(target).map_err(|e| PinlockError::Generic {
        message: e.to_string(),
    })?;
    let graph = resolve_input(&opts.input, &opts.index, &[], &opts.config, &opts.cancel).await?;

    let Some(path) = graph.find_path(&name) else {
        return Ok(format!("Package '{name}' is not in the resolved graph.\n"));
    };

    let root_label = opts.root_label();
    let mut output = format!("Path to {name}:\n{root_label}\n");
    for (i, package) in path.iter().enumerate() {
        let indent = "  ".repeat(i + 1);
        output.push_str(&format!("{indent}{package}\n"));
    }
    output.push('\n');
    output.push_str(&graph.print_inverted_tree(&name, &root_label));
    Ok(output)
}
