//! Error types for the MSlash interpreter.
//!
//! Two layers:
//!
//! - [`EvalError`] is internal to the expression evaluator.  It never escapes
//!   [`evaluate`](super::expr::evaluate); callers only ever see `None`.
//! - [`ScriptError`] is a diagnostic the executor reports.  Its `Display`
//!   text is exactly the line printed to the console.  Only
//!   [`ScriptError::Io`] and [`ScriptError::InputClosed`] are fatal and
//!   propagate out of [`Interpreter::execute`](super::interp::Interpreter::execute).

use std::io;

use thiserror::Error;

/// A failure inside the expression evaluator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("name '{0}' is not defined")]
    UnknownName(String),
    #[error("'{0}' is not callable")]
    NotCallable(String),
    #[error("unsupported operand type(s) for {op}: '{lhs}' and '{rhs}'")]
    BadOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("bad operand type for {op}: '{operand}'")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
    #[error("index out of range")]
    IndexOutOfRange,
    #[error("key {0} not found")]
    KeyNotFound(String),
    #[error("attribute '{0}' not found")]
    AttributeNotFound(String),
    #[error("{0}")]
    Type(String),
    #[error("{0}")]
    Value(String),
}

/// A diagnostic produced while preprocessing or executing a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    // ── Preprocessing ────────────────────────────────────────────────────────
    #[error("Syntax Error: '{closer}' without matching '{opener}'.")]
    StrayCloser {
        closer: &'static str,
        opener: &'static str,
    },
    #[error("Syntax Error on line {line}: Invalid function definition.")]
    InvalidFunctionDef { line: usize },
    #[error("Syntax Error on line {line}: Invalid class definition.")]
    InvalidClassDef { line: usize },
    #[error("Syntax Error: '{opener} {name}' on line {line} has no matching '{closer}'.")]
    UnterminatedDefinition {
        opener: &'static str,
        closer: &'static str,
        name: String,
        line: usize,
    },

    // ── Interpolation ────────────────────────────────────────────────────────
    #[error("Warning: Could not evaluate nested expression '${expr}'.")]
    Interpolation { expr: String },

    // ── Import ───────────────────────────────────────────────────────────────
    #[error("Syntax Error on line {line}: Invalid steal syntax.")]
    InvalidSteal { line: usize },
    #[error("Import Error on line {line}: '{symbol}' not found in {path}.")]
    SymbolNotFound {
        line: usize,
        symbol: String,
        path: String,
    },
    #[error("Import Error on line {line}: Module file '{path}' not found.")]
    ModuleNotFound { line: usize, path: String },
    #[error("Import Error on line {line}: Module '{path}' is already being loaded.")]
    CircularImport { line: usize, path: String },
    #[error("Import Error on line {line}: {source}")]
    ModuleIo {
        line: usize,
        #[source]
        source: io::Error,
    },

    // ── Calls and objects ────────────────────────────────────────────────────
    #[error("Error: Function '{name}' expects {expected} arguments, but got {got}.")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Error: Class '{name}' is not defined.")]
    UndefinedClass { name: String },
    #[error("Syntax Error on line {line}: Invalid 'new' statement.")]
    InvalidNew { line: usize },
    #[error("Error: Method '{method}' not found on object.")]
    MethodNotFound { method: String },
    #[error("Error: '{expr}' did not evaluate to an object.")]
    NotAnObject { expr: String },
    #[error("Error: 'this' can only be used inside a class method.")]
    ThisOutsideMethod,

    // ── Statements ───────────────────────────────────────────────────────────
    #[error("Syntax Error on line {line}: Invalid variable assignment.")]
    InvalidAssignment { line: usize },
    #[error("Syntax Error on line {line}: Invalid attribute assignment.")]
    InvalidAttributeAssignment { line: usize },
    #[error("Syntax Error or invalid value for variable '{name}' on line {line}.")]
    InvalidValue { name: String, line: usize },
    #[error("Syntax Error on line {line}: Invalid input syntax.")]
    InvalidInput { line: usize },
    #[error("Invalid number for emptyline on line {line}")]
    InvalidEmptyLine { line: usize },
    #[error("Syntax Error on line {line}: Invalid loop syntax.")]
    InvalidLoop { line: usize },
    #[error("Syntax Error: 'if' on line {line} has no matching 'endif'.")]
    UnmatchedIf { line: usize },
    #[error("Syntax Error: 'loop' on line {line}: No matching 'endloop'.")]
    UnmatchedLoop { line: usize },
    #[error("Unknown command or syntax error on line {line}: '{text}'")]
    UnknownStatement { line: usize, text: String },

    // ── Host ─────────────────────────────────────────────────────────────────
    #[error("Error: File '{path}' not found.")]
    ScriptNotFound { path: String },
    #[error("input stream closed")]
    InputClosed,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ScriptError {
    /// Fatal errors end the whole run instead of being reported and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScriptError::Io(_) | ScriptError::InputClosed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
