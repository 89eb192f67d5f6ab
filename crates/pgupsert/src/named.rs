//! Named placeholder compilation.
//!
//! Upsert statements are synthesized with `:column` placeholders. PostgreSQL
//! only understands positional `$n` parameters, so [`compile`] rewrites the text
//! and records which name each position stands for. Repeated names share one
//! position.
//!
//! Not treated as placeholders:
//! - `::type` casts
//! - anything inside `'string literals'` or `"quoted identifiers"`
//! - a `:` not followed by a letter or `_`
//!
//! Names may contain any Unicode letter or digit, matching what a name mapper
//! can produce from a Rust field identifier.

/// SQL rewritten to positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalSql {
    /// SQL text using `$1..$n`.
    pub sql: String,
    /// Placeholder name for each position (`names[0]` is `$1`).
    pub names: Vec<String>,
}

/// Rewrite `:name` placeholders in `sql` to `$n`.
pub fn compile(sql: &str) -> PositionalSql {
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push(c);
                // Doubled quote characters escape themselves and simply
                // re-enter the quoted state on the next iteration.
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                out.push_str("::");
            }
            ':' if chars
                .peek()
                .is_some_and(|n| n.is_alphabetic() || *n == '_') =>
            {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n.is_alphanumeric() || n == '_' {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let position = match names.iter().position(|existing| *existing == name) {
                    Some(idx) => idx + 1,
                    None => {
                        names.push(name);
                        names.len()
                    }
                };
                out.push('$');
                out.push_str(&position.to_string());
            }
            _ => out.push(c),
        }
    }

    PositionalSql { sql: out, names }
}
