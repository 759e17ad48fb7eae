//! MSlash statement shapes and block structure.
//!
//! A script is a sequence of lines, one statement per line.  Lines are kept
//! raw (unstripped) in blueprints and blocks; each is comment-stripped and
//! trimmed only when it is scanned or dispatched.  [`Stmt::parse`] classifies
//! a cleaned line by shape, in dispatch priority order; [`find_block`] locates
//! the closer of an `if`/`loop` by depth alone.

use std::sync::LazyLock;

use regex::Regex;

use super::expand::strip_comments;

/// A raw source line and its 1-based line number in the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

impl SourceLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        SourceLine {
            number,
            text: text.into(),
        }
    }

    /// Comment-stripped, trimmed text.
    pub fn clean(&self) -> String {
        strip_comments(&self.text).trim().to_owned()
    }
}

/// Split a source file into numbered lines.
pub fn source_lines(src: &str) -> Vec<SourceLine> {
    src.lines()
        .enumerate()
        .map(|(i, text)| SourceLine::new(i + 1, text))
        .collect()
}

// ── Block keywords ────────────────────────────────────────────────────────────

/// Keywords that open a nested block.
pub const OPENERS: &[&str] = &["if", "loop", "func", "class"];
/// Keywords that close a block, matched by depth only.
pub const CLOSERS: &[&str] = &["endif", "endloop", "endfunc", "endclass"];

/// How a cleaned line affects block nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKeyword {
    Opener,
    Closer,
    Else,
    None,
}

/// Classify a cleaned line for nesting purposes.
pub fn block_keyword(clean: &str) -> BlockKeyword {
    if clean == "else" {
        BlockKeyword::Else
    } else if CLOSERS.contains(&clean) {
        BlockKeyword::Closer
    } else if starts_with_keyword(clean, OPENERS) {
        BlockKeyword::Opener
    } else {
        BlockKeyword::None
    }
}

/// True if `clean` is one keyword from `words` followed by a space.
fn starts_with_keyword(clean: &str, words: &[&str]) -> bool {
    words.iter().any(|w| {
        clean
            .strip_prefix(w)
            .is_some_and(|rest| rest.starts_with(' '))
    })
}

/// Positions of the structural lines of one block, relative to the slice
/// passed to [`find_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBounds {
    /// Same-depth `else`; the last one wins if several appear.
    pub else_at: Option<usize>,
    /// The closer that ends the block.
    pub end: usize,
}

/// Scan forward from `start` (the line after the opener) to the first closer
/// at depth zero.  Any opener deepens, any closer shallows, regardless of
/// kind.  Returns `None` if the block is never closed.
pub fn find_block(lines: &[SourceLine], start: usize, track_else: bool) -> Option<BlockBounds> {
    let mut depth = 0usize;
    let mut else_at = None;
    for (i, line) in lines.iter().enumerate().skip(start) {
        match block_keyword(&line.clean()) {
            BlockKeyword::Opener => depth += 1,
            BlockKeyword::Closer if depth == 0 => return Some(BlockBounds { else_at, end: i }),
            BlockKeyword::Closer => depth -= 1,
            BlockKeyword::Else if track_else && depth == 0 => else_at = Some(i),
            BlockKeyword::Else | BlockKeyword::None => {}
        }
    }
    None
}

// ── Statement shapes ──────────────────────────────────────────────────────────

static STEAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^steal\s+([a-zA-Z_][a-zA-Z0-9_]*)\s+from\s+(\S+)$").expect("steal pattern")
});
static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z_][a-zA-Z0-9_]*)\((.*)\)$").expect("call pattern")
});
static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*)\.([a-zA-Z_][a-zA-Z0-9_]*)\((.*)\)$").expect("method pattern")
});
static NEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^new\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*\((.*)\)$").expect("new pattern")
});

/// Where an assignment stores its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// A variable in the current environment.
    Var(&'a str),
    /// An attribute of the bound receiver (`var this.ATTR = ...`).
    Attr(&'a str),
}

/// One classified statement.  Argument fields hold the raw text between the
/// call parentheses; expression fields hold uninterpolated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt<'a> {
    /// `steal SYMBOL from PATH`
    Steal { symbol: &'a str, path: &'a str },
    /// A `steal ` line that does not fit the shape.
    InvalidSteal,
    /// `NAME(args)` where NAME is a known function.
    Call { name: &'a str, args: &'a str },
    /// `var TARGET = new CLASS(args)`
    New {
        target: Target<'a>,
        class: &'a str,
        args: &'a str,
    },
    /// `var TARGET = new ...` that does not fit the shape.
    InvalidNew,
    /// `EXPR.METHOD(args)`
    MethodCall {
        target: &'a str,
        method: &'a str,
        args: &'a str,
    },
    /// `var this.ATTR = EXPR`
    SetAttr { attr: &'a str, expr: &'a str },
    InvalidSetAttr,
    /// `var NAME = FUNC(args)` where FUNC is a known function.
    AssignCall {
        name: &'a str,
        func: &'a str,
        args: &'a str,
    },
    /// `var NAME = EXPR`
    Assign { name: &'a str, expr: &'a str },
    InvalidAssign,
    Say(&'a str),
    Input(&'a str),
    InvalidInput,
    Math(&'a str),
    EmptyLine(&'a str),
    Pause,
    Break,
    /// `return EXPR` (a bare `return` carries an empty expression).
    Return(&'a str),
    If(&'a str),
    Loop(&'a str),
    Help,
    /// `else` or a closer reaching the dispatcher; ignored.
    Closer,
    Unknown,
}

impl<'a> Stmt<'a> {
    /// Classify a cleaned (comment-stripped, trimmed, non-empty) line.
    ///
    /// `is_function` tells whether a name is a registered function, which
    /// decides between a call statement and other shapes.
    pub fn parse(line: &'a str, is_function: impl Fn(&str) -> bool) -> Stmt<'a> {
        if line.starts_with("steal ") {
            return match STEAL_RE.captures(line) {
                Some(c) => match (c.get(1), c.get(2)) {
                    (Some(symbol), Some(path)) => Stmt::Steal {
                        symbol: symbol.as_str(),
                        path: path.as_str(),
                    },
                    _ => Stmt::InvalidSteal,
                },
                None => Stmt::InvalidSteal,
            };
        }

        if let Some((name, args)) = match_call(line) {
            if is_function(name) {
                return Stmt::Call { name, args };
            }
        }

        let assignment = line.strip_prefix("var ").map(|rest| rest.split_once('='));

        if let Some(Some((lhs, rhs))) = assignment {
            let rhs = rhs.trim();
            if is_new_expr(rhs) {
                let Some(target) = parse_target(lhs.trim()) else {
                    return Stmt::InvalidAssign;
                };
                return match NEW_RE.captures(rhs) {
                    Some(c) => match (c.get(1), c.get(2)) {
                        (Some(class), Some(args)) => Stmt::New {
                            target,
                            class: class.as_str(),
                            args: args.as_str(),
                        },
                        _ => Stmt::InvalidNew,
                    },
                    None => Stmt::InvalidNew,
                };
            }
        }

        if let Some(c) = METHOD_RE.captures(line) {
            if let (Some(target), Some(method), Some(args)) = (c.get(1), c.get(2), c.get(3)) {
                return Stmt::MethodCall {
                    target: target.as_str().trim(),
                    method: method.as_str(),
                    args: args.as_str(),
                };
            }
        }

        if let Some(assignment) = assignment {
            if line.starts_with("var this.") {
                let Some((lhs, rhs)) = assignment else {
                    return Stmt::InvalidSetAttr;
                };
                return match parse_target(lhs.trim()) {
                    Some(Target::Attr(attr)) => Stmt::SetAttr {
                        attr,
                        expr: rhs.trim(),
                    },
                    _ => Stmt::InvalidSetAttr,
                };
            }
            let Some((lhs, rhs)) = assignment else {
                return Stmt::InvalidAssign;
            };
            let name = lhs.trim();
            if !is_ident(name) {
                return Stmt::InvalidAssign;
            }
            let rhs = rhs.trim();
            if let Some((func, args)) = match_call(rhs) {
                if is_function(func) {
                    return Stmt::AssignCall { name, func, args };
                }
            }
            return Stmt::Assign { name, expr: rhs };
        }

        if let Some(rest) = line.strip_prefix("say ") {
            return Stmt::Say(rest.trim());
        }
        if let Some(rest) = line.strip_prefix("input ") {
            return match rest.split_whitespace().next() {
                Some(name) if is_ident(name) => Stmt::Input(name),
                _ => Stmt::InvalidInput,
            };
        }
        if let Some(rest) = line.strip_prefix("math ") {
            return Stmt::Math(rest.trim());
        }
        if let Some(rest) = line.strip_prefix("emptyline ") {
            return Stmt::EmptyLine(rest.trim());
        }
        match line {
            "pause" => return Stmt::Pause,
            "break" => return Stmt::Break,
            "return" => return Stmt::Return(""),
            "help" => return Stmt::Help,
            _ => {}
        }
        if let Some(rest) = line.strip_prefix("return ") {
            return Stmt::Return(rest.trim());
        }
        if let Some(rest) = line.strip_prefix("if ") {
            return Stmt::If(rest.trim());
        }
        if let Some(rest) = line.strip_prefix("loop ") {
            return Stmt::Loop(rest.trim());
        }
        if matches!(block_keyword(line), BlockKeyword::Closer | BlockKeyword::Else) {
            return Stmt::Closer;
        }
        Stmt::Unknown
    }
}

/// `NAME(args)` spanning the whole text.
pub fn match_call(text: &str) -> Option<(&str, &str)> {
    let c = CALL_RE.captures(text)?;
    Some((c.get(1)?.as_str(), c.get(2)?.as_str()))
}

fn is_new_expr(rhs: &str) -> bool {
    rhs.strip_prefix("new")
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

fn parse_target(lhs: &str) -> Option<Target<'_>> {
    match lhs.strip_prefix("this.") {
        Some(attr) if is_ident(attr.trim()) => Some(Target::Attr(attr.trim())),
        Some(_) => None,
        None if is_ident(lhs) => Some(Target::Var(lhs)),
        None => None,
    }
}

/// ASCII identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a raw argument or parameter list on every comma.
///
/// Not nesting-aware: `f([1, 2])` yields two pieces.  Whitespace-only text
/// is an empty list.
pub fn split_args(text: &str) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(',').map(str::trim).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
