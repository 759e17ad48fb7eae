//! Line-level text passes run before a statement is dispatched.
//!
//! | Sequence  | Meaning                                                    |
//! |-----------|------------------------------------------------------------|
//! | `{...}`   | Inline comment, removed (shortest match)                   |
//! | `${expr}` | Evaluate `expr` and substitute its display form            |
//!
//! A `{` immediately preceded by `$` opens an interpolation, never a comment.
//! Interpolated expressions cannot contain braces themselves.

use std::sync::LazyLock;

use regex::Regex;

use super::env::Environment;
use super::expr::evaluate;

static INTERPOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}]*?)\}").expect("interpolation pattern"));

/// Upper bound on substitutions per line, so a value that expands to its own
/// `${...}` reference cannot spin forever.
const MAX_SUBSTITUTIONS: usize = 1024;

/// Remove every `{...}` comment not preceded by `$`.
///
/// Matches are non-overlapping and scanned left to right; the `$` check looks
/// at the original text, so `${a}` survives while `{a}` is dropped.  A `{`
/// with no closing `}` is kept verbatim.
pub fn strip_comments(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut prev: Option<char> = None;
    let mut rest = line;

    while let Some(open) = rest.find('{') {
        let before = &rest[..open];
        let escaped = before.chars().next_back().or(prev) == Some('$');
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if !escaped => {
                out.push_str(before);
                prev = Some('}');
                rest = &after[close + 1..];
            }
            _ => {
                out.push_str(before);
                out.push('{');
                prev = Some('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Interpolation stopped at an expression that failed to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialInterpolation {
    /// The line with every substitution made before the failure.
    pub text: String,
    /// The expression that could not be evaluated.
    pub expr: String,
}

/// Expand `${expr}` occurrences in `line`, leftmost first, re-scanning the
/// updated line after every substitution.
pub fn interpolate(line: &str, env: &Environment) -> Result<String, PartialInterpolation> {
    let mut line = line.to_owned();
    let mut rounds = 0;

    while let Some((range, expr)) = next_sequence(&line) {
        rounds += 1;
        let value = if rounds > MAX_SUBSTITUTIONS {
            None
        } else {
            evaluate(&expr, env)
        };
        let Some(value) = value else {
            return Err(PartialInterpolation { text: line, expr });
        };
        line.replace_range(range, &value.to_string());
    }
    Ok(line)
}

/// Byte range and inner text of the leftmost `${...}` in `line`.
fn next_sequence(line: &str) -> Option<(std::ops::Range<usize>, String)> {
    let caps = INTERPOLATION.captures(line)?;
    Some((caps.get(0)?.range(), caps.get(1)?.as_str().to_owned()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
