//! Command dispatch and handler modules.

mod compile;
mod tree;
mod why;

use miette::Result;
use pinlock_core::config::GlobalConfig;
use pinlock_ops::Overrides;
use pinlock_util::errors::PinlockError;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command, ResolveArgs};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    tracing::debug!(command = ?cli.command, "dispatching");
    match cli.command {
        Command::Compile {
            resolve,
            output,
            dry_run,
            constraints,
        } => compile::exec(&resolve, output, dry_run, constraints),
        Command::Tree { resolve, depth } => tree::exec(&resolve, depth),
        Command::Why { package, resolve } => why::exec(&package, &resolve),
    }
}

fn runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| {
        PinlockError::Generic {
            message: format!("Failed to start async runtime: {e}"),
        }
        .into()
    })
}

/// A token that is cancelled when the user presses Ctrl-C.
fn cancel_on_ctrl_c(rt: &Runtime) -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            pinlock_util::progress::status_warn("Cancelling", "interrupt received");
            trigger.cancel();
        }
    });
    token
}

/// The global config with command-line overrides applied.
fn load_config(args: &ResolveArgs) -> Result<GlobalConfig> {
    let mut config = GlobalConfig::load()?;
    Overrides {
        max_backtracks: args.max_backtracks,
        timeout_secs: args.timeout,
        jobs: args.jobs,
    }
    .apply(&mut config);
    Ok(config)
}
