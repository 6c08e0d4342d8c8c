use crate::utils::digest128;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::LazyLock;

/// Tokens up to this many characters are stored verbatim (lowercased).
/// Longer tokens are stored as a 128-bit digest to bound key size.
pub const MAX_LITERAL_TOKEN_CHARS: usize = 16;

/// Tokens shorter than this are dropped.
const MIN_TOKEN_CHARS: usize = 2;

const WHITESPACE_SPLIT: &str = " \t\n\r";
const SEMANTIC_SPLIT: &str = "~^$&#%=,:;!?+\"'`´*/\\()<>{}[]|";
const INTERPUNCT_SPLIT: &str = "··᛫•‧∘∙⋅●◦⦁⸰・･𐂧ּ⸱";

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Normalized token as used for index keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKey {
    /// Lowercased token of at most [`MAX_LITERAL_TOKEN_CHARS`] characters
    Text(String),
    /// Digest of a longer lowercased token
    Digest([u8; 16]),
}

impl TokenKey {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TokenKey::Text(s) => Some(s),
            TokenKey::Digest(_) => None,
        }
    }
}

/// Normalize a raw token: trim, drop short tokens, fold case and digest
/// long tokens. Search terms go through the same function as indexed text.
pub fn cleanup(raw: &str) -> Option<TokenKey> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len < MIN_TOKEN_CHARS {
        return None;
    }

    let lower = trimmed.to_lowercase();
    if len <= MAX_LITERAL_TOKEN_CHARS {
        Some(TokenKey::Text(lower))
    } else {
        Some(TokenKey::Digest(digest128(lower.as_bytes())))
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}'
            | '\u{2029}'
    )
}

/// Iterator over the lines of a text, see [`split_lines`]. Lines end at
/// LF, CR, VT, FF, 0x1C-0x1E, NEL, U+2028 or U+2029.
#[derive(Debug, Clone)]
pub struct SplitLines<'a> {
    rest: &'a str,
}

impl<'a> Iterator for SplitLines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }

        let Some((idx, c)) = self.rest.char_indices().find(|&(_, c)| is_line_break(c)) else {
            let line = self.rest;
            self.rest = "";
            return Some(line);
        };

        let line = &self.rest[..idx];
        let mut end = idx + c.len_utf8();
        if c == '\r' && self.rest[end..].starts_with('\n') {
            end += 1;
        }
        self.rest = &self.rest[end..];
        Some(line)
    }
}

/// Split a text into lines without their terminators. CRLF counts as one
/// break and a final terminator does not start an empty line. Indexing
/// and display both use this so line numbers agree.
pub fn split_lines(text: &str) -> SplitLines<'_> {
    SplitLines { rest: text }
}

/// Tokens of a whole text, deduplicated per line.
#[derive(Debug, Default)]
pub struct Tokens {
    /// Distinct (token, 1-based line) pairs
    pub pairs: FxHashSet<(TokenKey, i64)>,
    /// Number of tokens emitted by all passes before deduplication
    pub emitted: usize,
}

/// Splits lines into tokens using one positive pass and several split
/// passes of different granularity. The passes are unioned, so compound
/// identifiers are indexed both whole and in parts.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    splits: Vec<Vec<char>>,
}

impl Tokenizer {
    /// Build the split classes; `interpunct` adds international separators
    /// to every class except plain whitespace.
    pub fn new(interpunct: bool) -> Self {
        let extra = if interpunct { INTERPUNCT_SPLIT } else { "" };
        let class = |chars: &str| -> Vec<char> {
            let mut set: Vec<char> = chars
                .chars()
                .chain(SEMANTIC_SPLIT.chars())
                .chain(WHITESPACE_SPLIT.chars())
                .chain(extra.chars())
                .collect();
            set.sort_unstable();
            set.dedup();
            set
        };

        let splits = vec![
            WHITESPACE_SPLIT.chars().collect(),
            class("._-"),
            class(".-"),
            class("._"),
            class(""),
        ];

        Self { splits }
    }

    /// Emit every normalized token of one line, in pass order. The same
    /// token may be emitted several times.
    pub fn line_tokens(&self, line: &str) -> Vec<TokenKey> {
        let mut out = Vec::new();

        for m in WORD.find_iter(line) {
            if let Some(key) = cleanup(m.as_str()) {
                out.push(key);
            }
        }

        for split in &self.splits {
            for part in line.split(split.as_slice()) {
                if let Some(key) = cleanup(part) {
                    out.push(key);
                }
            }
        }

        out
    }

    /// Tokenize a whole text. Line numbers start at 1 and follow
    /// [`split_lines`], matching how result lines are read back.
    pub fn tokenize(&self, text: &str) -> Tokens {
        let mut tokens = Tokens::default();

        for (idx, line) in split_lines(text).enumerate() {
            let lineno = idx as i64 + 1;
            for key in self.line_tokens(line) {
                tokens.emitted += 1;
                tokens.pairs.insert((key, lineno));
            }
        }

        tokens
    }
}
