//! MSlash scripting language.
//!
//! A line-oriented interpreter in two passes:
//!
//! - [`preprocess`] pulls `func` and `class` definitions out of the source
//!   into blueprints and leaves the main lines.
//! - [`Interpreter::execute`] walks those lines, dispatching on statement
//!   shape and recursing into blocks and calls.
//!
//! Expressions use a small closed grammar ([`expr`]) evaluated fail-soft:
//! any error is simply "no value".
//!
//! # Quick start
//!
//! ```rust
//! use mslash::console::BufferConsole;
//! use mslash::script::Interpreter;
//!
//! let mut interp = Interpreter::with_console(BufferConsole::new());
//! interp.exec_source("var x = 6\nsay ${x * 7}").unwrap();
//! assert_eq!(interp.console().lines(), vec!["42"]);
//! ```

pub mod builtins;
pub mod env;
pub mod error;
pub mod expand;
pub mod expr;
pub mod interp;
pub mod module;
pub mod object;
pub mod preprocess;
pub mod stmt;
pub mod value;

// Re-exports for convenience.
pub use env::Environment;
pub use error::{EvalError, ScriptError};
pub use expr::{evaluate, EvalContext};
pub use interp::{ControlFlow, ExecOutcome, FileLoader, Interpreter, Namespace};
pub use module::ModuleExports;
pub use object::{Instance, InstanceRef};
pub use preprocess::{preprocess, ClassBlueprint, FunctionBlueprint};
pub use stmt::SourceLine;
pub use value::Value;
