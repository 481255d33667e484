//! Best-effort SQL table/write auditor (§4.3 "DB access").
//!
//! This is explicitly **not** a SQL parser. It strips comments and elided
//! string literals, then looks for `FROM`/`JOIN`/`INTO`/`UPDATE`/
//! `DELETE FROM` keywords to extract table references, and for mutating
//! keywords to classify writes. Design Note §9 marks it as known-incomplete
//! for deeply nested subqueries; callers must always additionally enforce
//! the manifest's `db.tables` allow-list rather than trust this alone.

use regex::Regex;
use std::sync::OnceLock;

/// The result of auditing one SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlAudit {
    /// Table names referenced by the statement, normalized (final dotted
    /// segment, unquoted). Empty when no table could be extracted, in
    /// which case callers must require wildcard (`"*"`) access.
    pub tables: Vec<String>,
    /// Whether a mutating keyword was found outside comments/literals.
    pub is_write: bool,
    /// Whether the statement contains more than one SQL statement
    /// (semicolon-separated, after stripping a single trailing
    /// semicolon).
    pub is_multi_statement: bool,
}

fn table_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:FROM|JOIN|INTO|UPDATE|DELETE\s+FROM)\s+([`"\[]?[\w.$]+[`"\]]?)"#)
            .expect("static regex is valid")
    })
}

fn write_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(INSERT|UPDATE|DELETE|CREATE|ALTER|DROP|TRUNCATE|REPLACE)\b")
            .expect("static regex is valid")
    })
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][\w$]*$").expect("static regex is valid"))
}

/// Strip `-- line comments`, `/* block comments */`, and elide
/// single-quoted string literal contents (replacing their body with
/// spaces so positions/keyword boundaries outside the literal are
/// unaffected, while nothing inside a literal is ever matched as SQL).
fn normalize(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        match c {
            '-' if matches!(chars.peek(), Some((_, '-'))) => {
                chars.next();
                for (_, c2) in chars.by_ref() {
                    if c2 == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut prev = '\0';
                for (_, c2) in chars.by_ref() {
                    if prev == '*' && c2 == '/' {
                        break;
                    }
                    prev = c2;
                }
                out.push(' ');
            }
            '\'' => {
                out.push(' ');
                for (_, c2) in chars.by_ref() {
                    if c2 == '\'' {
                        break;
                    }
                    out.push(' ');
                }
                out.push(' ');
            }
            other => out.push(other),
        }
    }

    out
}

fn strip_quoting(raw: &str) -> String {
    raw.trim_matches(|c| c == '`' || c == '"' || c == '[' || c == ']')
        .to_string()
}

/// Audit one SQL statement. See the module docs for the auditor's known
/// limitations.
#[must_use]
pub fn audit_sql(sql: &str) -> SqlAudit {
    let normalized = normalize(sql);
    let trimmed = normalized.trim();
    let without_trailing_semicolon = trimmed.strip_suffix(';').unwrap_or(trimmed);
    let is_multi_statement = without_trailing_semicolon
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .count()
        > 1;

    let mut tables = Vec::new();
    for caps in table_regex().captures_iter(&normalized) {
        let raw = caps.get(1).map_or("", |m| m.as_str());
        let last_segment = raw.rsplit('.').next().unwrap_or(raw);
        let unquoted = strip_quoting(last_segment);
        if identifier_regex().is_match(&unquoted) && !tables.contains(&unquoted) {
            tables.push(unquoted);
        }
    }

    let is_write = write_keyword_regex().is_match(&normalized);

    SqlAudit {
        tables,
        is_write,
        is_multi_statement,
    }
}
