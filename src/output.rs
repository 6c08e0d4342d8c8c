//! Output formatting for search results

use crate::error::Result;
use crate::index::store::Store;
use crate::index::types::FileId;
use crate::query::{FileMatch, LineMatch, SearchResults};
use crate::utils::{decode_with, relative_to, split_lines};
use regex::{Regex, RegexBuilder};
use std::fs;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use termcolor::{Color, ColorChoice, ColorSpec, WriteColor};

const FILE_NOT_FOUND: &str = "!! File not found";
const BAD_ENCODING: &str = "!! Bad encoding";

/// Colors only when writing to a terminal and not in raw mode
pub fn color_choice(raw: bool) -> ColorChoice {
    if !raw && std::io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    /// Lines shown per match; values above one print a window
    pub context: usize,
    /// NUL-delimited records for other tools, no decoration
    pub raw: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            context: 1,
            raw: false,
        }
    }
}

/// Lines of the file currently being printed
enum FileText {
    Lines(Vec<String>),
    Missing,
    BadEncoding,
}

impl FileText {
    fn load(path: &Path, encoding: Option<&str>) -> Self {
        let Ok(bytes) = fs::read(path) else {
            return FileText::Missing;
        };
        match decode_with(&bytes, encoding) {
            Some(text) => FileText::Lines(split_lines(&text).map(str::to_string).collect()),
            None => FileText::BadEncoding,
        }
    }

    fn line(&self, number: i64) -> &str {
        match self {
            FileText::Lines(lines) => usize::try_from(number - 1)
                .ok()
                .and_then(|idx| lines.get(idx))
                .map(String::as_str)
                .unwrap_or(""),
            FileText::Missing => FILE_NOT_FOUND,
            FileText::BadEncoding => BAD_ENCODING,
        }
    }
}

/// Window of `context` lines centred on `line` (1-based), clipped to the
/// file, with blank lines trimmed from both ends.
pub fn context_window(lines: &[String], line: i64, context: usize) -> Vec<&str> {
    let offset = i64::try_from(context / 2).unwrap_or(i64::MAX);
    let first = line.saturating_sub(offset).max(1);
    let last = line
        .saturating_add(offset)
        .min(i64::try_from(lines.len()).unwrap_or(i64::MAX));

    let window: Vec<&str> = (first..=last)
        .filter_map(|n| lines.get((n - 1) as usize).map(String::as_str))
        .collect();

    let start = window
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(window.len());
    let end = window
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(start);

    window[start..end.max(start)].to_vec()
}

/// Case-insensitive pattern matching any of the search terms
pub fn highlighter(terms: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = terms
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| regex::escape(t))
        .collect();
    if alternatives.is_empty() {
        return None;
    }

    RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Renders search results to a color-capable writer
pub struct ResultPrinter<'a, W: WriteColor> {
    out: W,
    store: &'a Store,
    root: &'a Path,
    cwd: &'a Path,
    options: OutputOptions,
    highlight: Option<Regex>,
    current_dir: Option<PathBuf>,
    current_file: Option<(FileId, FileText)>,
}

impl<'a, W: WriteColor> ResultPrinter<'a, W> {
    /// `root` is the indexed tree, `cwd` the directory paths are shown
    /// relative to.
    pub fn new(
        out: W,
        store: &'a Store,
        root: &'a Path,
        cwd: &'a Path,
        terms: &[String],
        options: OutputOptions,
    ) -> Self {
        Self {
            out,
            store,
            root,
            cwd,
            options,
            highlight: highlighter(terms),
            current_dir: None,
            current_file: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn print(&mut self, results: &SearchResults) -> Result<()> {
        match results {
            SearchResults::Files(files) => self.print_files(files),
            SearchResults::Lines(lines) => self.print_lines(lines),
        }
    }

    fn shown(&self, path: &str) -> PathBuf {
        relative_to(&self.root.join(path), self.cwd)
    }

    fn print_files(&mut self, files: &[FileMatch]) -> Result<()> {
        for m in files {
            writeln!(self.out, "{}", self.shown(&m.path).display())?;
            if !self.options.raw {
                self.print_duplicates(m.file_id)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn print_lines(&mut self, lines: &[LineMatch]) -> Result<()> {
        let mut last_file: Option<FileId> = None;

        for m in lines {
            if last_file != Some(m.file_id) {
                if let Some(prev) = last_file {
                    self.print_duplicates(prev)?;
                }
                last_file = Some(m.file_id);
                let text = FileText::load(&self.root.join(&m.path), m.encoding.as_deref());
                self.current_file = Some((m.file_id, text));
            }

            if self.options.raw {
                self.print_raw(m)?;
            } else {
                self.print_grouped(m)?;
            }
        }

        if let Some(prev) = last_file {
            self.print_duplicates(prev)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn current_text(&self) -> &FileText {
        match &self.current_file {
            Some((_, text)) => text,
            None => &FileText::Missing,
        }
    }

    fn print_raw(&mut self, m: &LineMatch) -> Result<()> {
        let abs = self.root.join(&m.path);
        let text = self.current_text().line(m.line).to_string();
        write!(self.out, "{}\0{:5}\0{}\n", abs.display(), m.line, text)?;
        Ok(())
    }

    fn print_grouped(&mut self, m: &LineMatch) -> Result<()> {
        let shown = self.shown(&m.path);

        if matches!(self.current_text(), FileText::Missing) {
            writeln!(self.out, "{}:{:5}:{}", shown.display(), m.line, FILE_NOT_FOUND)?;
            return Ok(());
        }

        let dir = match shown.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if self.current_dir.as_ref() != Some(&dir) {
            self.out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            write!(self.out, "{}", dir.display())?;
            self.out.reset()?;
            writeln!(self.out, ":")?;
            self.current_dir = Some(dir);
        }

        let name = shown
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(self.out, "{name}")?;
        self.out.reset()?;
        write!(self.out, ":")?;
        self.out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(self.out, "{:5}", m.line)?;
        self.out.reset()?;

        if self.options.context <= 1 {
            write!(self.out, ":")?;
            let line = self.current_text().line(m.line).to_string();
            self.print_highlighted(&line)?;
            writeln!(self.out)?;
        } else {
            writeln!(self.out)?;
            let window: Vec<String> = match self.current_text() {
                FileText::Lines(lines) => context_window(lines, m.line, self.options.context)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                other => vec![other.line(m.line).to_string()],
            };
            for line in window {
                writeln!(self.out, "|{line}")?;
            }
        }

        Ok(())
    }

    fn print_highlighted(&mut self, line: &str) -> Result<()> {
        let Some(re) = self.highlight.clone() else {
            write!(self.out, "{line}")?;
            return Ok(());
        };

        let mut pos = 0;
        for found in re.find_iter(line) {
            write!(self.out, "{}", &line[pos..found.start()])?;
            self.out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            write!(self.out, "{}", found.as_str())?;
            self.out.reset()?;
            pos = found.end();
        }
        write!(self.out, "{}", &line[pos..])?;
        Ok(())
    }

    /// Other files with the same content as `file`
    fn print_duplicates(&mut self, file: FileId) -> Result<()> {
        if self.options.raw {
            return Ok(());
        }

        let duplicates = self.store.duplicates_of(file)?;
        if duplicates.is_empty() {
            return Ok(());
        }

        writeln!(self.out, "duplicates:")?;
        for path in duplicates {
            writeln!(self.out, "\t{}", self.shown(&path).display())?;
        }
        Ok(())
    }
}
