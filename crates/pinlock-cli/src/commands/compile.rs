//! Handler for `pinlock compile`.

use std::path::PathBuf;

use miette::Result;
use pinlock_ops::ops_compile::{self, CompileOptions};

use crate::cli::ResolveArgs;

pub fn exec(
    args: &ResolveArgs,
    output: Option<PathBuf>,
    dry_run: bool,
    constraints: Vec<PathBuf>,
) -> Result<()> {
    let rt = super::runtime()?;

    let mut opts = CompileOptions::new(&args.input, &args.index);
    opts.output = output;
    opts.dry_run = dry_run;
    opts.constraints = constraints;
    opts.config = super::load_config(args)?;
    opts.cancel = super::cancel_on_ctrl_c(&rt);

    rt.block_on(ops_compile::compile(&opts))?;
    Ok(())
}
