//! Raw SQL column-list rewriting.
//!
//! A caller-supplied `SELECT` is checked against the columns a return shape
//! needs. If its column list already matches, it runs verbatim; otherwise
//! only the text between `SELECT [DISTINCT|ALL]` and the top-level `FROM` is
//! replaced and every other clause is kept byte for byte.
//!
//! Statements whose column list cannot be located with certainty are
//! rejected before reaching SQLite. That includes compound selects, where
//! only the first arm's column list would be rewritten.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::QueryError;
use crate::types::ReturnShape;

/// Columns a raw records query must yield, in order.
pub const RECORD_COLUMNS: &[&str] = &["doc_key", "snapshot", "class_name", "created_at"];

/// Columns a raw keys query must yield.
pub const KEY_COLUMNS: &[&str] = &["doc_key"];

static SELECT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*SELECT(?:\s+(?:DISTINCT|ALL))?\b\s*").expect("valid SELECT pattern")
});

static WITH_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*WITH\b").expect("valid WITH pattern"));

static SUBQUERY_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\(\s*SELECT\b").expect("valid subquery pattern"));

/// Returns the columns required for a return shape.
pub fn required_columns(shape: ReturnShape) -> &'static [&'static str] {
    match shape {
        ReturnShape::Records => RECORD_COLUMNS,
        ReturnShape::Keys => KEY_COLUMNS,
    }
}

/// Rewrites `sql` so that it selects exactly the columns `shape` needs.
pub fn rewrite_select(sql: &str, shape: ReturnShape) -> Result<String, QueryError> {
    let malformed = |message: &str| QueryError::MalformedQuery {
        sql: sql.to_string(),
        message: message.to_string(),
    };

    if sql.trim().is_empty() {
        return Err(malformed("empty statement"));
    }
    let classes = classify(sql).map_err(malformed)?;

    if WITH_PREFIX.is_match(sql) {
        return Err(malformed("common table expressions are not supported"));
    }
    let prefix = SELECT_PREFIX
        .find(sql)
        .ok_or_else(|| malformed("not a SELECT statement"))?;
    let list_start = prefix.end();

    let from = find_top_level_keyword(sql, &classes, list_start, "FROM")
        .ok_or_else(|| malformed("no top-level FROM clause"))?;

    if ["UNION", "INTERSECT", "EXCEPT"]
        .iter()
        .any(|keyword| find_top_level_keyword(sql, &classes, from, keyword).is_some())
    {
        return Err(malformed("compound SELECT statements are not supported"));
    }

    let bytes = sql.as_bytes();
    for i in list_start..from {
        if bytes[i] == b'(' && !classes[i].quoted && SUBQUERY_START.is_match(&sql[i..]) {
            return Err(malformed("subquery in the column list"));
        }
    }

    let required = required_columns(shape);
    let columns = split_top_level(sql, &classes, list_start, from);
    if columns_match(&columns, required) {
        return Ok(sql.to_string());
    }

    Ok(format!(
        "{}{} {}",
        &sql[..list_start],
        required.join(", "),
        &sql[from..]
    ))
}

#[derive(Debug, Clone, Copy)]
struct ByteClass {
    depth: u32,
    quoted: bool,
}

/// Classifies every byte by parenthesis depth and whether it sits inside a
/// quoted string, quoted identifier or comment.
fn classify(sql: &str) -> Result<Vec<ByteClass>, &'static str> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut out = Vec::with_capacity(len);
    let mut depth: u32 = 0;
    let mut i = 0;

    while i < len {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                let start = i;
                i += 1;
                loop {
                    if i >= len {
                        return Err("unterminated quoted string");
                    }
                    if bytes[i] == quote {
                        if i + 1 < len && bytes[i + 1] == quote {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                mark_quoted(&mut out, start, i, depth);
            }
            b'[' => {
                let start = i;
                let end = sql[i..]
                    .find(']')
                    .ok_or("unterminated bracketed identifier")?;
                i += end + 1;
                mark_quoted(&mut out, start, i, depth);
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let start = i;
                i = sql[i..].find('\n').map_or(len, |end| i + end);
                mark_quoted(&mut out, start, i, depth);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                let end = sql[i + 2..].find("*/").ok_or("unterminated comment")?;
                i += end + 4;
                mark_quoted(&mut out, start, i, depth);
            }
            b'(' => {
                depth += 1;
                out.push(ByteClass {
                    depth,
                    quoted: false,
                });
                i += 1;
            }
            b')' => {
                if depth == 0 {
                    return Err("unbalanced parentheses");
                }
                out.push(ByteClass {
                    depth,
                    quoted: false,
                });
                depth -= 1;
                i += 1;
            }
            _ => {
                out.push(ByteClass {
                    depth,
                    quoted: false,
                });
                i += 1;
            }
        }
    }

    if depth != 0 {
        return Err("unbalanced parentheses");
    }
    Ok(out)
}

fn mark_quoted(out: &mut Vec<ByteClass>, from: usize, to: usize, depth: u32) {
    out.extend((from..to).map(|_| ByteClass {
        depth,
        quoted: true,
    }));
}

fn is_top_level(class: &ByteClass) -> bool {
    class.depth == 0 && !class.quoted
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn find_top_level_keyword(
    sql: &str,
    classes: &[ByteClass],
    start: usize,
    keyword: &str,
) -> Option<usize> {
    let bytes = sql.as_bytes();
    let k = keyword.len();
    (start..bytes.len().saturating_sub(k - 1)).find(|&i| {
        is_top_level(&classes[i])
            && bytes[i..i + k].eq_ignore_ascii_case(keyword.as_bytes())
            && (i == 0 || !is_ident_byte(bytes[i - 1]))
            && bytes.get(i + k).is_none_or(|b| !is_ident_byte(*b))
    })
}

fn split_top_level<'s>(
    sql: &'s str,
    classes: &[ByteClass],
    start: usize,
    end: usize,
) -> Vec<&'s str> {
    let bytes = sql.as_bytes();
    let mut parts = Vec::new();
    let mut part_start = start;
    for i in start..end {
        if bytes[i] == b',' && is_top_level(&classes[i]) {
            parts.push(sql[part_start..i].trim());
            part_start = i + 1;
        }
    }
    parts.push(sql[part_start..end].trim());
    parts
}

fn columns_match(columns: &[&str], required: &[&str]) -> bool {
    columns.len() == required.len()
        && columns.iter().zip(required).all(|(column, required)| {
            let name = column.rsplit('.').next().unwrap_or(column);
            name.eq_ignore_ascii_case(required)
        })
}
