//! Operation: resolve an input manifest and write the lock file.

use std::path::PathBuf;

use pinlock_core::config::GlobalConfig;
use pinlock_resolver::LockEmitter;
use pinlock_util::errors::PinlockError;
use pinlock_util::{fs, progress};
use tokio_util::sync::CancellationToken;

use crate::resolve_input;

/// Options for `pinlock compile`.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub input: PathBuf,
    pub index: PathBuf,
    /// Destination file; `-` means stdout. Defaults to the input with a `.txt` extension.
    pub output: Option<PathBuf>,
    /// Resolve and print, never touching disk.
    pub dry_run: bool,
    /// Regeneration command for the header. Defaults to `<tool> compile <input>`.
    pub command: Option<String>,
    /// Lock files whose pins constrain the run, usually the previous output.
    pub constraints: Vec<PathBuf>,
    pub config: GlobalConfig,
    pub cancel: CancellationToken,
}

impl CompileOptions {
    pub fn new(input: impl Into<PathBuf>, index: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            index: index.into(),
            output: None,
            dry_run: false,
            command: None,
            constraints: Vec::new(),
            config: GlobalConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    fn destination(&self) -> Destination {
        if self.dry_run {
            return Destination::Stdout;
        }
        match &self.output {
            Some(path) if path.as_os_str() == "-" => Destination::Stdout,
            Some(path) => Destination::File(path.clone()),
            None => Destination::File(self.input.with_extension("txt")),
        }
    }
}

enum Destination {
    Stdout,
    File(PathBuf),
}

/// What a compile run produced.
#[derive(Debug, Clone)]
pub struct CompileReport {
    /// The rendered lock file.
    pub text: String,
    pub packages: usize,
    /// Where the lock file was written, if anywhere.
    pub written: Option<PathBuf>,
}

/// Resolve `opts.input` and emit the lock file.
///
/// The destination is replaced atomically and only after resolution
/// succeeds; a failed or cancelled run leaves any existing file untouched.
pub async fn compile(opts: &CompileOptions) -> miette::Result<CompileReport> {
    let graph = resolve_input(
        &opts.input,
        &opts.index,
        &opts.constraints,
        &opts.config,
        &opts.cancel,
    )
    .await?;

    let mut emitter = LockEmitter::new(
        &opts.config.output.tool_name,
        fs::relative_display(&opts.input),
    );
    if let Some(command) = &opts.command {
        emitter = emitter.with_command(command);
    }
    let text = emitter.emit(&graph);

    if opts.cancel.is_cancelled() {
        return Err(PinlockError::Cancelled.into());
    }

    let written = match opts.destination() {
        Destination::Stdout => {
            print!("{text}");
            if opts.dry_run {
                progress::status_info("Dry run", "lock file not written");
            }
            None
        }
        Destination::File(path) => {
            fs::write_atomic(&path, text.as_bytes()).map_err(PinlockError::Io)?;
            progress::status(
                "Wrote",
                &format!("{} ({} packages)", path.display(), graph.len()),
            );
            Some(path)
        }
    };

    tracing::debug!(packages = graph.len(), "compile finished");
    Ok(CompileReport {
        text,
        packages: graph.len(),
        written,
    })
}
