use crate::index::types::TokenId;
use rusqlite::types::Value;

/// Search query for a fixed number of terms and path ignores
///
/// The SQL only depends on the counts, never on term or pattern text; values
/// are bound through numbered placeholders by [`SearchPlan::bind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub sql: String,
    pub term_count: usize,
    pub ignore_count: usize,
    pub file_mode: bool,
}

impl SearchPlan {
    /// Build the plan. `term_count` must be at least one.
    pub fn new(term_count: usize, ignore_count: usize, file_mode: bool) -> Self {
        let term_count = term_count.max(1);
        let mut sql = String::new();

        if file_mode {
            sql.push_str("SELECT DISTINCT f.path, f.id");
        } else {
            sql.push_str("SELECT DISTINCT f.path, f.id, p0.line, f.encoding");
        }
        sql.push_str(" FROM posting AS p0 JOIN file AS f ON f.id = p0.file_id");

        // One self-join per additional term
        for n in 1..term_count {
            if file_mode {
                sql.push_str(&format!(
                    " JOIN posting AS p{n} ON p{n}.file_id = p0.file_id AND p{n}.line = -1"
                ));
            } else {
                sql.push_str(&format!(
                    " JOIN posting AS p{n} ON p{n}.file_id = p0.file_id AND p{n}.line = p0.line"
                ));
            }
        }

        if file_mode {
            sql.push_str(" WHERE p0.line = -1");
        } else {
            sql.push_str(" WHERE p0.line != -1");
        }

        for n in 0..term_count {
            sql.push_str(&format!(" AND p{n}.token_id = ?{}", n + 1));
        }
        for n in 0..ignore_count {
            sql.push_str(&format!(" AND f.path NOT LIKE ?{}", term_count + n + 1));
        }

        if file_mode {
            sql.push_str(" ORDER BY f.path");
        } else {
            sql.push_str(" ORDER BY f.path, p0.line");
        }

        Self {
            sql,
            term_count,
            ignore_count,
            file_mode,
        }
    }

    /// Parameters in placeholder order: token ids, then `%pattern%` for
    /// every path ignore.
    pub fn bind(&self, tokens: &[TokenId], ignores: &[String]) -> Vec<Value> {
        tokens
            .iter()
            .map(|&id| Value::Integer(id))
            .chain(ignores.iter().map(|pat| Value::Text(format!("%{pat}%"))))
            .collect()
    }
}
