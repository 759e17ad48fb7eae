//! First pass over a script: extract `func` and `class` definitions.
//!
//! Definitions may only begin at the top level.  Once one is open, every
//! opener deepens and every closer shallows the capture, whatever its kind,
//! so a function body with nested `if`/`loop` blocks finds its own
//! `endfunc`.  Lines outside any definition are returned, in order, as the
//! main program.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::error::ScriptError;
use super::stmt::{block_keyword, is_ident, split_args, BlockKeyword, SourceLine};

static FUNC_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^func\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*\((.*)\)").expect("func pattern")
});

/// A stored function or method definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBlueprint {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<SourceLine>,
}

/// A stored class definition: its methods by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassBlueprint {
    pub name: String,
    pub methods: HashMap<String, Rc<FunctionBlueprint>>,
}

impl ClassBlueprint {
    pub fn method(&self, name: &str) -> Option<&Rc<FunctionBlueprint>> {
        self.methods.get(name)
    }
}

/// Result of [`preprocess`].
#[derive(Debug, Default)]
pub struct Preprocessed {
    /// Top-level lines outside every definition.
    pub main: Vec<SourceLine>,
    pub functions: HashMap<String, Rc<FunctionBlueprint>>,
    pub classes: HashMap<String, Rc<ClassBlueprint>>,
    /// Non-fatal problems found while scanning, in source order.
    pub diagnostics: Vec<ScriptError>,
}

/// Parse the `func NAME(params)` header of a cleaned line.
fn parse_func_header(clean: &str) -> Option<(String, Vec<String>)> {
    let c = FUNC_DEF_RE.captures(clean)?;
    let name = c.get(1)?.as_str().to_owned();
    let params = split_args(c.get(2)?.as_str())
        .into_iter()
        .map(str::to_owned)
        .collect();
    Some((name, params))
}

/// The definition currently being captured.
enum Capture {
    Func {
        header: Option<(String, Vec<String>)>,
        line: usize,
    },
    Class {
        name: Option<String>,
        line: usize,
    },
}

/// Split a script into its main lines and its definition blueprints.
pub fn preprocess(lines: &[SourceLine]) -> Preprocessed {
    let mut out = Preprocessed::default();
    let mut capture: Option<Capture> = None;
    let mut body: Vec<SourceLine> = Vec::new();
    let mut depth = 0usize;

    for line in lines {
        let clean = line.clean();

        let own_closer = match &capture {
            Some(Capture::Func { .. }) => "endfunc",
            Some(Capture::Class { .. }) => "endclass",
            None => {
                top_level_line(line, &clean, &mut out, &mut capture);
                if capture.is_some() {
                    body.clear();
                    depth = 0;
                }
                continue;
            }
        };

        if clean == own_closer && depth == 0 {
            let finished = std::mem::take(&mut body);
            match capture.take() {
                Some(Capture::Func {
                    header: Some((name, params)),
                    ..
                }) => {
                    debug!(func = %name, params = params.len(), "registered function");
                    out.functions.insert(
                        name.clone(),
                        Rc::new(FunctionBlueprint {
                            name,
                            params,
                            body: finished,
                        }),
                    );
                }
                Some(Capture::Class {
                    name: Some(name), ..
                }) => {
                    let class = parse_class_body(&name, &finished, &mut out.diagnostics);
                    debug!(class = %name, methods = class.methods.len(), "registered class");
                    out.classes.insert(name, Rc::new(class));
                }
                // Malformed header: already reported, body discarded.
                _ => {}
            }
            continue;
        }

        match block_keyword(&clean) {
            BlockKeyword::Opener => depth += 1,
            BlockKeyword::Closer => depth = depth.saturating_sub(1),
            BlockKeyword::Else | BlockKeyword::None => {}
        }
        body.push(line.clone());
    }

    if let Some(open) = capture {
        out.diagnostics.push(match open {
            Capture::Func { header, line } => ScriptError::UnterminatedDefinition {
                opener: "func",
                closer: "endfunc",
                name: header.map(|(n, _)| n).unwrap_or_default(),
                line,
            },
            Capture::Class { name, line } => ScriptError::UnterminatedDefinition {
                opener: "class",
                closer: "endclass",
                name: name.unwrap_or_default(),
                line,
            },
        });
    }

    out
}

/// Handle a line seen while no definition is open.
fn top_level_line(
    line: &SourceLine,
    clean: &str,
    out: &mut Preprocessed,
    capture: &mut Option<Capture>,
) {
    if let Some(rest) = clean.strip_prefix("class ") {
        let name = rest.split_whitespace().next().filter(|n| is_ident(n));
        if name.is_none() {
            out.diagnostics
                .push(ScriptError::InvalidClassDef { line: line.number });
        }
        *capture = Some(Capture::Class {
            name: name.map(str::to_owned),
            line: line.number,
        });
    } else if clean.starts_with("func ") {
        let header = parse_func_header(clean);
        if header.is_none() {
            out.diagnostics
                .push(ScriptError::InvalidFunctionDef { line: line.number });
        }
        *capture = Some(Capture::Func {
            header,
            line: line.number,
        });
    } else if clean == "endclass" {
        out.diagnostics.push(ScriptError::StrayCloser {
            closer: "endclass",
            opener: "class",
        });
    } else if clean == "endfunc" {
        out.diagnostics.push(ScriptError::StrayCloser {
            closer: "endfunc",
            opener: "func",
        });
    } else {
        out.main.push(line.clone());
    }
}

/// Extract the methods of one captured class body.
///
/// Only `func`/`endfunc` pairs matter; `if`/`loop` inside a method are
/// counted so their closers do not end it.  Lines between methods are
/// ignored.
pub fn parse_class_body(
    class_name: &str,
    lines: &[SourceLine],
    diagnostics: &mut Vec<ScriptError>,
) -> ClassBlueprint {
    let mut class = ClassBlueprint {
        name: class_name.to_owned(),
        methods: HashMap::new(),
    };
    let mut open: Option<(Option<(String, Vec<String>)>, usize)> = None;
    let mut body: Vec<SourceLine> = Vec::new();
    let mut depth = 0usize;

    for line in lines {
        let clean = line.clean();
        if open.is_none() {
            if clean.starts_with("func ") {
                let header = parse_func_header(&clean);
                if header.is_none() {
                    diagnostics.push(ScriptError::InvalidFunctionDef { line: line.number });
                }
                open = Some((header, line.number));
                body.clear();
                depth = 0;
            }
            continue;
        }

        if clean == "endfunc" && depth == 0 {
            if let Some((Some((name, params)), _)) = open.take() {
                debug!(class = class_name, method = %name, "registered method");
                class.methods.insert(
                    name.clone(),
                    Rc::new(FunctionBlueprint {
                        name,
                        params,
                        body: std::mem::take(&mut body),
                    }),
                );
            }
            continue;
        }

        match block_keyword(&clean) {
            BlockKeyword::Opener => depth += 1,
            BlockKeyword::Closer => depth = depth.saturating_sub(1),
            BlockKeyword::Else | BlockKeyword::None => {}
        }
        body.push(line.clone());
    }

    if let Some((header, line)) = open {
        diagnostics.push(ScriptError::UnterminatedDefinition {
            opener: "func",
            closer: "endfunc",
            name: header.map(|(n, _)| n).unwrap_or_default(),
            line,
        });
    }

    class
}

// ── Tests ─────────────────────────────────────────────────────────────────────
