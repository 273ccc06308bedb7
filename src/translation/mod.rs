//! Named-placeholder rewriting for `PostgreSQL`.
//!
//! Statements are written with `:name` placeholders across all backends.
//! `SQLite` binds those natively; Postgres only understands positional `$n`,
//! so this scanner rewrites `:name` to `$n` and reports the positional bind
//! order. String literals, quoted identifiers, line and block comments,
//! dollar-quoted strings, and `::type` casts are passed through untouched.

use std::collections::HashMap;

use crate::error::DalError;
use crate::types::BoundParam;

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

// Try to read a dollar-quote delimiter ($tag$ or $$) starting at `start`.
fn scan_dollar_tag(sql: &str, start: usize) -> Option<&str> {
    let rest = &sql[start + 1..];
    let mut end = 0;
    for c in rest.chars() {
        if c == '$' {
            return Some(&sql[start..start + 1 + end + 1]);
        }
        if end == 0 && !is_ident_start(c) {
            return None;
        }
        if end > 0 && !is_ident_char(c) {
            return None;
        }
        end += c.len_utf8();
    }
    None
}

/// Rewrite `:name` placeholders to `$n` and compute the positional bind
/// order as indices into `params`. A placeholder reused in the statement
/// maps to the same `$n`.
///
/// # Errors
/// Returns [`DalError::BindError`] for a placeholder with no bound value,
/// or a bound value whose placeholder never appears in the statement.
pub(crate) fn rewrite_named_placeholders(
    sql: &str,
    params: &[BoundParam],
) -> Result<(String, Vec<usize>), DalError> {
    let by_name: HashMap<&str, usize> = params
        .iter()
        .enumerate()
        .map(|(idx, param)| (param.bare_name(), idx))
        .collect();

    let mut out = String::with_capacity(sql.len() + 8);
    let mut order: Vec<usize> = Vec::with_capacity(params.len());
    let mut positions: HashMap<&str, usize> = HashMap::new();

    let mut state = State::Normal;
    let mut chars = sql.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match &state {
            State::Normal => match c {
                '\'' => {
                    out.push(c);
                    state = State::SingleQuoted;
                }
                '"' => {
                    out.push(c);
                    state = State::DoubleQuoted;
                }
                '-' if matches!(chars.peek(), Some((_, '-'))) => {
                    out.push(c);
                    let (_, dash) = chars.next().unwrap_or((idx, '-'));
                    out.push(dash);
                    state = State::LineComment;
                }
                '/' if matches!(chars.peek(), Some((_, '*'))) => {
                    out.push(c);
                    let (_, star) = chars.next().unwrap_or((idx, '*'));
                    out.push(star);
                    state = State::BlockComment(1);
                }
                '$' => {
                    if let Some(tag) = scan_dollar_tag(sql, idx) {
                        out.push_str(tag);
                        for _ in 0..tag.len() - 1 {
                            chars.next();
                        }
                        state = State::DollarQuoted(tag.to_string());
                    } else {
                        out.push(c);
                    }
                }
                ':' => {
                    if matches!(chars.peek(), Some((_, ':'))) {
                        // A `::type` cast, not a placeholder.
                        out.push(':');
                        let (_, colon) = chars.next().unwrap_or((idx, ':'));
                        out.push(colon);
                    } else if matches!(chars.peek(), Some((_, next)) if is_ident_start(*next)) {
                        let mut name = String::new();
                        while let Some(&(_, next)) = chars.peek() {
                            if is_ident_char(next) {
                                name.push(next);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        let param_idx = *by_name.get(name.as_str()).ok_or_else(|| {
                            DalError::BindError {
                                parameter: format!(":{name}"),
                                detail: "no value bound for this parameter".to_string(),
                            }
                        })?;
                        let position = *positions.entry(params[param_idx].bare_name()).or_insert_with(|| {
                            order.push(param_idx);
                            order.len()
                        });
                        out.push('$');
                        out.push_str(&position.to_string());
                    } else {
                        out.push(c);
                    }
                }
                _ => out.push(c),
            },
            State::SingleQuoted => {
                out.push(c);
                if c == '\'' {
                    // A doubled quote stays inside the literal.
                    if matches!(chars.peek(), Some((_, '\''))) {
                        let (_, quote) = chars.next().unwrap_or((idx, '\''));
                        out.push(quote);
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                out.push(c);
                if c == '"' {
                    if matches!(chars.peek(), Some((_, '"'))) {
                        let (_, quote) = chars.next().unwrap_or((idx, '"'));
                        out.push(quote);
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                out.push(c);
                if c == '\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                let depth = *depth;
                out.push(c);
                if c == '/' && matches!(chars.peek(), Some((_, '*'))) {
                    let (_, star) = chars.next().unwrap_or((idx, '*'));
                    out.push(star);
                    state = State::BlockComment(depth + 1);
                } else if c == '*' && matches!(chars.peek(), Some((_, '/'))) {
                    let (_, slash) = chars.next().unwrap_or((idx, '/'));
                    out.push(slash);
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                }
            }
            State::DollarQuoted(tag) => {
                let tag = tag.clone();
                if c == '$' && sql[idx..].starts_with(tag.as_str()) {
                    out.push_str(&tag);
                    for _ in 0..tag.len() - 1 {
                        chars.next();
                    }
                    state = State::Normal;
                } else {
                    out.push(c);
                }
            }
        }
    }

    for param in params {
        if !positions.contains_key(param.bare_name()) {
            return Err(DalError::BindError {
                parameter: param.name.clone(),
                detail: "statement has no such parameter".to_string(),
            });
        }
    }

    Ok((out, order))
}
