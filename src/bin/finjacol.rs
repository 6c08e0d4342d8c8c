//! Turn a raw finja stream into `path:line:text` lines.

use anyhow::{Context, Result};
use finja::raw::colonize;
use std::io::{self, BufRead, BufWriter, Write};

fn main() -> Result<()> {
    let cwd = std::env::current_dir()
        .and_then(|dir| dir.canonicalize())
        .context("Cannot access the current directory")?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = BufWriter::new(io::stdout().lock());
    let mut buf = String::new();

    loop {
        buf.clear();
        if input.read_line(&mut buf)? == 0 {
            break;
        }
        if let Err(e) = out.write_all(colonize(&buf, &cwd).as_bytes()) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                return Ok(());
            }
            return Err(e.into());
        }
    }

    out.flush().or_else(|e| match e.kind() {
        io::ErrorKind::BrokenPipe => Ok(()),
        _ => Err(e),
    })?;
    Ok(())
}
