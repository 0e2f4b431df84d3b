//! Handler for `pinlock why`.

use miette::Result;
use pinlock_ops::ops_tree::{self, TreeOptions};

use crate::cli::ResolveArgs;

pub fn exec(package: &str, args: &ResolveArgs) -> Result<()> {
    let rt = super::runtime()?;

    let mut opts = TreeOptions::new(&args.input, &args.index);
    opts.config = super::load_config(args)?;
    opts.cancel = super::cancel_on_ctrl_c(&rt);

    let output = rt.block_on(ops_tree::why(&opts, package))?;
    print!("{output}");
    Ok(())
}
