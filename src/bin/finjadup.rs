//! Re-expand duplicate files in a raw finja stream.

use anyhow::{Context, Result};
use finja::index::Store;
use finja::raw::reduplicate;
use finja::utils::{find_store_root, init_logging};
use std::io::{self, BufWriter};

fn main() -> Result<()> {
    init_logging(true);

    let cwd = std::env::current_dir().context("Cannot access the current directory")?;
    let root = find_store_root(&cwd)?;
    let store = Store::open(&root, false, false)
        .with_context(|| format!("Failed to open index in {}", root.display()))?;

    let stdin = io::stdin();
    let out = BufWriter::new(io::stdout().lock());
    reduplicate(stdin.lock(), out, &store, &root)?;
    Ok(())
}
