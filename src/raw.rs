//! Helpers for the NUL-delimited raw output stream.
//!
//! A raw record is `<absolute path>\0<line>\0<text>\n`, one per match,
//! grouped by file.

use crate::error::Result;
use crate::index::store::Store;
use crate::utils::{relative_to, store_key};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// One record of a raw stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub path: &'a str,
    pub line: &'a str,
    /// Matched text, trailing newline included when present
    pub text: &'a str,
}

impl<'a> RawRecord<'a> {
    pub fn parse(record: &'a str) -> Option<Self> {
        let mut parts = record.splitn(3, '\0');
        Some(Self {
            path: parts.next()?,
            line: parts.next()?,
            text: parts.next()?,
        })
    }
}

/// Replace the NUL delimiters of a record by `:` and show the path relative
/// to `cwd`. Lines that are not records are passed through.
pub fn colonize(record: &str, cwd: &Path) -> String {
    match RawRecord::parse(record) {
        Some(rec) => format!(
            "{}:{}:{}",
            relative_to(Path::new(rec.path), cwd).display(),
            rec.line,
            rec.text
        ),
        None => record.to_string(),
    }
}

/// Copy a raw stream from `input` to `out`. After the records of each file,
/// the same records are written again for every file with identical
/// content, as known to the store of `root`.
pub fn reduplicate<R: BufRead, W: Write>(
    mut input: R,
    mut out: W,
    store: &Store,
    root: &Path,
) -> Result<()> {
    let mut current: Option<String> = None;
    let mut group: Vec<(String, String)> = Vec::new();
    let mut buf = String::new();

    loop {
        buf.clear();
        if input.read_line(&mut buf)? == 0 {
            break;
        }

        let Some(rec) = RawRecord::parse(&buf) else {
            out.write_all(buf.as_bytes())?;
            continue;
        };
        // The previous file's duplicates go before the next file's records
        if current.as_deref() != Some(rec.path) {
            if let Some(path) = current.take() {
                emit_duplicates(&mut out, store, root, &path, &group)?;
            }
            group.clear();
            current = Some(rec.path.to_string());
        }
        group.push((rec.line.to_string(), rec.text.to_string()));
        out.write_all(buf.as_bytes())?;
    }

    if let Some(path) = current {
        emit_duplicates(&mut out, store, root, &path, &group)?;
    }
    out.flush()?;
    Ok(())
}

fn emit_duplicates<W: Write>(
    out: &mut W,
    store: &Store,
    root: &Path,
    path: &str,
    group: &[(String, String)],
) -> Result<()> {
    let abs = PathBuf::from(path);
    let key = store_key(&relative_to(&abs, root));
    let Some(record) = store.find_file(&key)? else {
        return Ok(());
    };

    for duplicate in store.duplicates_of(record.id)? {
        let dup_abs = root.join(&duplicate);
        for (line, text) in group {
            write!(out, "{}\0{}\0{}", dup_abs.display(), line, text)?;
        }
    }
    Ok(())
}
