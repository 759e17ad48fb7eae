//! Module loading and `steal`.
//!
//! A module is another script file run to completion in an isolated
//! namespace: the caller's registries are swapped out for empty ones while
//! the module is preprocessed and executed, and swapped back afterwards on
//! every path.  `steal` then copies exactly one symbol across.

use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use tracing::debug;

use super::env::Environment;
use super::error::ScriptError;
use super::interp::{ControlFlow, Interpreter, Namespace};
use super::preprocess::{ClassBlueprint, FunctionBlueprint};
use crate::console::Console;

/// Everything a module defined.
#[derive(Debug, Default)]
pub struct ModuleExports {
    /// The module's top-level variables after execution.
    pub vars: Environment,
    pub functions: HashMap<String, Rc<FunctionBlueprint>>,
    pub classes: HashMap<String, Rc<ClassBlueprint>>,
    /// The module executed `break`.
    pub terminated: bool,
}

impl<C: Console> Interpreter<C> {
    /// Read and run the module at `path` in a fresh namespace.
    pub fn load_module(&mut self, path: &str) -> Result<ModuleExports, ScriptError> {
        let src = (self.file_loader)(path)?;
        self.load_module_source(path, &src)
    }

    /// Run already-read module source in a fresh namespace, restoring the
    /// caller's registries afterwards whether or not it succeeded.
    pub fn load_module_source(
        &mut self,
        path: &str,
        src: &str,
    ) -> Result<ModuleExports, ScriptError> {
        debug!(path, "loading module");
        let saved = self.replace_namespace(Namespace::default());
        self.loading.push(path.to_owned());
        let result = self.exec_source(src);
        self.loading.pop();
        let module_ns = self.replace_namespace(saved);

        let outcome = result?;
        Ok(ModuleExports {
            terminated: outcome.terminated(),
            vars: outcome.env,
            functions: module_ns.functions,
            classes: module_ns.classes,
        })
    }

    /// `steal SYMBOL from PATH`: import one variable, function, or class.
    ///
    /// Variables are checked first, then functions, then classes.
    pub(super) fn exec_steal(
        &mut self,
        symbol: &str,
        path: &str,
        line: usize,
        env: &mut Environment,
    ) -> Result<Option<ControlFlow>, ScriptError> {
        if self.loading.iter().any(|p| p == path) {
            self.report(ScriptError::CircularImport {
                line,
                path: path.to_owned(),
            })?;
            return Ok(None);
        }

        let src = match (self.file_loader)(path) {
            Ok(src) => src,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.report(ScriptError::ModuleNotFound {
                    line,
                    path: path.to_owned(),
                })?;
                return Ok(None);
            }
            Err(source) => {
                self.report(ScriptError::ModuleIo { line, source })?;
                return Ok(None);
            }
        };

        let mut exports = self.load_module_source(path, &src)?;
        if exports.terminated {
            return Ok(Some(ControlFlow::Terminate));
        }

        if let Some(value) = exports.vars.get(symbol) {
            debug!(symbol, path, "steal var");
            env.set(symbol, value.clone());
        } else if let Some(func) = exports.functions.remove(symbol) {
            debug!(symbol, path, "steal func");
            self.namespace_mut().functions.insert(symbol.to_owned(), func);
        } else if let Some(class) = exports.classes.remove(symbol) {
            debug!(symbol, path, "steal class");
            self.namespace_mut().classes.insert(symbol.to_owned(), class);
        } else {
            self.report(ScriptError::SymbolNotFound {
                line,
                symbol: symbol.to_owned(),
                path: path.to_owned(),
            })?;
        }
        Ok(None)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use crate::script::value::Value;
    use std::sync::Arc;

    /// An interpreter whose file loader serves the given in-memory files.
    fn interp_with(files: &[(&str, &str)]) -> Interpreter<BufferConsole> {
        let files: HashMap<String, String> = files
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        let mut interp = Interpreter::with_console(BufferConsole::new());
        interp.set_file_loader(Arc::new(move |path: &str| {
            files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_owned()))
        }));
        interp
    }

    fn output(interp: &Interpreter<BufferConsole>) -> Vec<String> {
        interp.console().lines().into_iter().map(str::to_owned).collect()
    }

    const LIB: &str = "var pi = 3\nfunc double(x)\nreturn ${x * 2}\nendfunc\n\
                       func helper()\nsay helping\nendfunc\n\
                       class Dog\nfunc speak()\nsay Woof\nendfunc\nendclass";

    #[test]
    fn steal_variable() {
        let mut interp = interp_with(&[("lib.mslash", LIB)]);
        interp.exec_source("steal pi from lib.mslash\nsay ${pi + 1}").unwrap();
        assert_eq!(output(&interp), vec!["4"]);
    }

    #[test]
    fn steal_function_only_copies_that_symbol() {
        let mut interp = interp_with(&[("lib.mslash", LIB)]);
        interp
            .exec_source("steal double from lib.mslash\nvar r = double(21)\nsay r\nhelper()")
            .unwrap();
        assert_eq!(
            output(&interp),
            vec!["42", "Unknown command or syntax error on line 4: 'helper()'"]
        );
        assert!(interp.namespace().functions.contains_key("double"));
        assert!(!interp.namespace().classes.contains_key("Dog"));
    }

    #[test]
    fn steal_class() {
        let mut interp = interp_with(&[("lib.mslash", LIB)]);
        interp
            .exec_source("steal Dog from lib.mslash\nvar d = new Dog()\nd.speak()")
            .unwrap();
        assert_eq!(output(&interp), vec!["Woof"]);
    }

    #[test]
    fn existing_function_survives_unrelated_steal() {
        let mut interp = interp_with(&[("lib.mslash", LIB)]);
        let src = "func double(x)\nreturn 0\nendfunc\nsteal pi from lib.mslash\nvar r = double(5)\nsay r";
        interp.exec_source(src).unwrap();
        assert_eq!(output(&interp), vec!["0"]);
    }

    #[test]
    fn variables_win_over_functions() {
        let lib = "var f = 'var'\nfunc f()\nreturn 1\nendfunc";
        let mut interp = interp_with(&[("m.mslash", lib)]);
        interp.exec_source("steal f from m.mslash\nsay f").unwrap();
        assert_eq!(output(&interp), vec!["var"]);
        assert!(!interp.namespace().functions.contains_key("f"));
    }

    #[test]
    fn module_output_is_visible() {
        let mut interp = interp_with(&[("noisy.mslash", "say loading\nvar x = 1")]);
        interp.exec_source("steal x from noisy.mslash\nsay x").unwrap();
        assert_eq!(output(&interp), vec!["loading", "1"]);
    }

    #[test]
    fn missing_symbol_and_file() {
        let mut interp = interp_with(&[("lib.mslash", LIB)]);
        interp
            .exec_source("steal nope from lib.mslash\nsteal x from gone.mslash\nsteal x of y")
            .unwrap();
        assert_eq!(
            output(&interp),
            vec![
                "Import Error on line 1: 'nope' not found in lib.mslash.",
                "Import Error on line 2: Module file 'gone.mslash' not found.",
                "Syntax Error on line 3: Invalid steal syntax.",
            ]
        );
    }

    #[test]
    fn module_does_not_see_importer_registries() {
        let lib = "var r = shared(1)";
        let mut interp = interp_with(&[("m.mslash", lib)]);
        let src = "func shared(a)\nreturn a\nendfunc\nsteal r from m.mslash\nsay ${r}";
        interp.exec_source(src).unwrap();
        assert_eq!(
            output(&interp),
            vec!["Syntax Error or invalid value for variable 'r' on line 1.", "Import Error on line 4: 'r' not found in m.mslash.", "Warning: Could not evaluate nested expression '$r'.", "${r}"]
        );
        assert!(interp.namespace().functions.contains_key("shared"));
    }

    #[test]
    fn registries_restored_after_module_failure() {
        let mut interp = interp_with(&[("m.mslash", "input x")]);
        interp.exec_source("func keep()\nsay kept\nendfunc").unwrap();
        let err = interp.exec_source("steal x from m.mslash").unwrap_err();
        assert!(err.is_fatal());
        assert!(interp.namespace().functions.contains_key("keep"));
    }

    #[test]
    fn circular_import_is_reported() {
        let mut interp = interp_with(&[("a.mslash", "steal y from a.mslash\nvar y = 1")]);
        interp.exec_source("steal y from a.mslash\nsay y").unwrap();
        assert_eq!(
            output(&interp),
            vec!["Import Error on line 1: Module 'a.mslash' is already being loaded.", "1"]
        );
    }

    #[test]
    fn break_in_module_terminates_importer() {
        let mut interp = interp_with(&[("m.mslash", "var x = 1\nbreak")]);
        let outcome = interp.exec_source("steal x from m.mslash\nsay x").unwrap();
        assert!(outcome.terminated());
        assert!(outcome.env.get("x").is_none());
    }

    #[test]
    fn load_module_returns_everything() {
        let mut interp = interp_with(&[("lib.mslash", LIB)]);
        let exports = interp.load_module("lib.mslash").unwrap();
        assert_eq!(exports.vars.get("pi"), Some(&Value::Int(3)));
        assert_eq!(exports.functions.len(), 2);
        assert!(exports.classes.contains_key("Dog"));
        assert!(interp.namespace().functions.is_empty());
    }
}
