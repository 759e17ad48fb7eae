//! MSlash statement executor.
//!
//! The [`Interpreter`] owns the function and class registries (the
//! [`Namespace`]) and the console, and executes numbered source lines against
//! an [`Environment`].  Blocks and calls recurse into [`Interpreter::execute`]
//! over line slices; `return` and `break` unwind as [`ControlFlow`] values.

use std::collections::HashMap;
use std::io;
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use super::{
    env::Environment,
    error::ScriptError,
    expand::interpolate,
    expr::evaluate,
    object::{Instance, InstanceRef},
    preprocess::{preprocess, ClassBlueprint, FunctionBlueprint},
    stmt::{find_block, source_lines, split_args, SourceLine, Stmt, Target},
    value::Value,
};
use crate::console::{Console, StdConsole};

// ── File loader callback ──────────────────────────────────────────────────────

/// Resolves a script or module path to the file's contents.
///
/// The default reads from the file system relative to the working directory.
pub type FileLoader = Arc<dyn Fn(&str) -> io::Result<String> + Send + Sync>;

fn default_file_loader() -> FileLoader {
    Arc::new(|path: &str| std::fs::read_to_string(path))
}

// ── Namespace ─────────────────────────────────────────────────────────────────

/// The function and class registries visible to executing code.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    pub functions: HashMap<String, Rc<FunctionBlueprint>>,
    pub classes: HashMap<String, Rc<ClassBlueprint>>,
}

// ── ControlFlow ───────────────────────────────────────────────────────────────

/// Non-error signals that unwind executor invocations.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    /// `return`: ends the current function or method body with a value.
    Return(Value),
    /// `break`: ends the whole program.
    Terminate,
}

/// Result of running a whole source text.
#[derive(Debug)]
pub struct ExecOutcome {
    /// The top-level environment after execution.
    pub env: Environment,
    pub flow: Option<ControlFlow>,
}

impl ExecOutcome {
    pub fn terminated(&self) -> bool {
        matches!(self.flow, Some(ControlFlow::Terminate))
    }
}

pub const HELP_TEXT: &[&str] = &[
    "--- MSlash Help ---",
    "steal <symbol> from <file>.mslash - Import a variable/function/class from another file.",
    "my_func(args)            - Calls a global function.",
    "class <name> / endclass  - Defines a class.",
    "func <name>(args) / endfunc - Defines a function or method.",
    "return <value>           - Returns a value from a function/method.",
    "{ comment }              - An inline comment.",
    "var <name> = <value>     - Assigns a value. Supports var x = myFunc(...).",
    "say <message>            - Prints a message to the console.",
    "input <var_name>         - Prompts for user input.",
    "math <expression>        - Evaluates a mathematical expression.",
    "if <condition>           - Starts a conditional block.",
    "else / endif             - Used for conditional logic.",
    "loop <number> / endloop  - Starts a loop block.",
    "emptyline <number>       - Prints a number of empty lines.",
    "pause                    - Pauses execution until Enter is pressed.",
    "break                    - Terminates the script immediately.",
    "",
    "--- Data Types ---",
    "List: [item1, item2, ...]",
    "Vata (Dictionary): (\"key1\":\"value1\", ...)",
    "---------------------",
];

pub const BREAK_MESSAGE: &str = "--- Script terminated by break ---";
pub const PAUSE_PROMPT: &str = "Press Enter to continue...";

/// Largest count `emptyline` accepts.
pub const MAX_EMPTY_LINES: i64 = 1 << 20;

// ── Interpreter ───────────────────────────────────────────────────────────────

/// The MSlash interpreter.
pub struct Interpreter<C: Console = StdConsole> {
    namespace: Namespace,
    console: C,
    pub(super) file_loader: FileLoader,
    /// Paths of modules currently being loaded, outermost first.
    pub(super) loading: Vec<String>,
}

impl Default for Interpreter<StdConsole> {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter<StdConsole> {
    pub fn new() -> Self {
        Self::with_console(StdConsole)
    }
}

impl<C: Console> Interpreter<C> {
    pub fn with_console(console: C) -> Self {
        Interpreter {
            namespace: Namespace::default(),
            console,
            file_loader: default_file_loader(),
            loading: Vec::new(),
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    /// Replace the callback used to read scripts and modules.
    pub fn set_file_loader(&mut self, loader: FileLoader) {
        self.file_loader = loader;
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn namespace_mut(&mut self) -> &mut Namespace {
        &mut self.namespace
    }

    /// Swap in `ns`, returning the registries that were active.
    pub fn replace_namespace(&mut self, ns: Namespace) -> Namespace {
        std::mem::replace(&mut self.namespace, ns)
    }

    pub fn function(&self, name: &str) -> Option<Rc<FunctionBlueprint>> {
        self.namespace.functions.get(name).cloned()
    }

    pub fn class(&self, name: &str) -> Option<Rc<ClassBlueprint>> {
        self.namespace.classes.get(name).cloned()
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    /// Preprocess `src`, register its definitions, report any definition
    /// errors, and return the main lines.
    pub fn load_source(&mut self, src: &str) -> Result<Vec<SourceLine>, ScriptError> {
        let pre = preprocess(&source_lines(src));
        debug!(
            functions = pre.functions.len(),
            classes = pre.classes.len(),
            main_lines = pre.main.len(),
            "preprocessed"
        );
        self.namespace.functions.extend(pre.functions);
        self.namespace.classes.extend(pre.classes);
        for diag in pre.diagnostics {
            self.report(diag)?;
        }
        Ok(pre.main)
    }

    /// Load and run `src` as a program with a fresh top-level environment.
    pub fn exec_source(&mut self, src: &str) -> Result<ExecOutcome, ScriptError> {
        let main = self.load_source(src)?;
        let mut env = Environment::new();
        debug!("executing main");
        let flow = self.execute(&main, &mut env)?;
        Ok(ExecOutcome { env, flow })
    }

    /// Read and run a script file.
    pub fn run_file(&mut self, path: &str) -> Result<ExecOutcome, ScriptError> {
        let src = (self.file_loader)(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ScriptError::ScriptNotFound {
                path: path.to_owned(),
            },
            _ => ScriptError::Io(e),
        })?;
        debug!(path, "loaded script");
        self.exec_source(&src)
    }

    // ── Output ────────────────────────────────────────────────────────────────

    /// Print a diagnostic and keep going.
    ///
    /// The console line is the user-facing copy; the trace event only shows
    /// up under `--debug`.
    pub(super) fn report(&mut self, err: ScriptError) -> Result<(), ScriptError> {
        debug!(diagnostic = %err, "reported");
        self.console.write_line(&err.to_string())?;
        Ok(())
    }

    fn say(&mut self, text: &str) -> Result<(), ScriptError> {
        self.console.write_line(text)?;
        Ok(())
    }

    // ── Expression helpers ────────────────────────────────────────────────────

    /// Interpolate `text`; on failure report it and keep the partial line.
    fn expand(&mut self, text: &str, env: &Environment) -> Result<String, ScriptError> {
        match interpolate(text, env) {
            Ok(line) => Ok(line),
            Err(partial) => {
                self.report(ScriptError::Interpolation { expr: partial.expr })?;
                Ok(partial.text)
            }
        }
    }

    /// Interpolate then evaluate.
    fn eval_text(&mut self, text: &str, env: &Environment) -> Result<Option<Value>, ScriptError> {
        let expanded = self.expand(text, env)?;
        Ok(evaluate(&expanded, env))
    }

    /// Evaluate a raw argument list in the caller's environment.
    ///
    /// Returns `None` (after reporting) when the count does not match
    /// `params`.  An argument that fails to evaluate binds `None`.
    fn bind_args(
        &mut self,
        name: &str,
        params: &[String],
        args: &str,
        env: &Environment,
    ) -> Result<Option<Vec<Value>>, ScriptError> {
        let raw = split_args(args);
        if raw.len() != params.len() {
            self.report(ScriptError::ArityMismatch {
                name: name.to_owned(),
                expected: params.len(),
                got: raw.len(),
            })?;
            return Ok(None);
        }
        let mut values = Vec::with_capacity(raw.len());
        for arg in raw {
            values.push(self.eval_text(arg, env)?.unwrap_or_default());
        }
        Ok(Some(values))
    }

    // ── Calls ─────────────────────────────────────────────────────────────────

    /// Run a function body in a fresh environment holding only `args`.
    pub fn call_function(
        &mut self,
        func: &FunctionBlueprint,
        args: Vec<Value>,
    ) -> Result<Option<ControlFlow>, ScriptError> {
        debug!(func = %func.name, args = %join_values(&args), "call");
        let mut frame = Environment::with_args(&func.params, args);
        let flow = self.execute(&func.body, &mut frame)?;
        debug!(func = %func.name, ?flow, "return");
        Ok(flow)
    }

    /// Run a method body with `receiver` bound as `this`.
    pub fn call_method(
        &mut self,
        receiver: InstanceRef,
        method: &FunctionBlueprint,
        args: Vec<Value>,
    ) -> Result<Option<ControlFlow>, ScriptError> {
        debug!(method = %method.name, args = %join_values(&args), "call method");
        let mut frame = Environment::for_method(receiver, &method.params, args);
        let flow = self.execute(&method.body, &mut frame)?;
        debug!(method = %method.name, ?flow, "return");
        Ok(flow)
    }

    /// Build an instance of `class_name`, running `init` if the class has one.
    ///
    /// `Ok(Err(flow))` means `init` executed `break`.
    fn instantiate(
        &mut self,
        class_name: &str,
        args: &str,
        env: &Environment,
    ) -> Result<Option<Result<InstanceRef, ControlFlow>>, ScriptError> {
        let Some(class) = self.class(class_name) else {
            self.report(ScriptError::UndefinedClass {
                name: class_name.to_owned(),
            })?;
            return Ok(None);
        };
        let instance = Instance::new_ref(class_name);
        if let Some(init) = class.method("init") {
            let Some(values) = self.bind_args(&init.name, &init.params, args, env)? else {
                return Ok(None);
            };
            debug!(class = class_name, "new: calling init");
            if let Some(ControlFlow::Terminate) =
                self.call_method(Rc::clone(&instance), init, values)?
            {
                return Ok(Some(Err(ControlFlow::Terminate)));
            }
        }
        Ok(Some(Ok(instance)))
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    /// Execute `lines` against `env`.
    ///
    /// Returns `Some(ControlFlow)` if a `return` or `break` was reached,
    /// `None` if execution fell off the end or stopped at an unmatched block.
    pub fn execute(
        &mut self,
        lines: &[SourceLine],
        env: &mut Environment,
    ) -> Result<Option<ControlFlow>, ScriptError> {
        let mut pc = 0;
        while pc < lines.len() {
            let line = &lines[pc];
            let clean = line.clean();
            if clean.is_empty() {
                pc += 1;
                continue;
            }
            debug!(line = line.number, raw = line.text.trim_end(), parsed = %clean, "exec");

            let functions = &self.namespace.functions;
            let stmt = Stmt::parse(&clean, |name| functions.contains_key(name));
            let n = line.number;

            match stmt {
                Stmt::Steal { symbol, path } => {
                    if let Some(flow) = self.exec_steal(symbol, path, n, env)? {
                        return Ok(Some(flow));
                    }
                }
                Stmt::InvalidSteal => self.report(ScriptError::InvalidSteal { line: n })?,

                Stmt::Call { name, args } => {
                    if let Some(func) = self.function(name) {
                        if let Some(values) = self.bind_args(name, &func.params, args, env)? {
                            if let Some(ControlFlow::Terminate) = self.call_function(&func, values)? {
                                return Ok(Some(ControlFlow::Terminate));
                            }
                        }
                    }
                }

                Stmt::New {
                    target,
                    class,
                    args,
                } => {
                    if let Target::Attr(_) = target {
                        if env.receiver().is_none() {
                            self.report(ScriptError::ThisOutsideMethod)?;
                            pc += 1;
                            continue;
                        }
                    }
                    match self.instantiate(class, args, env)? {
                        None => {}
                        Some(Err(flow)) => return Ok(Some(flow)),
                        Some(Ok(instance)) => {
                            let value = Value::Instance(instance);
                            match target {
                                Target::Var(name) => {
                                    debug!(var = name, %value, "set");
                                    env.set(name, value);
                                }
                                Target::Attr(attr) => {
                                    if let Some(this) = env.receiver() {
                                        debug!(attr, %value, "set this");
                                        this.borrow_mut().set_attr(attr, value);
                                    }
                                }
                            }
                        }
                    }
                }
                Stmt::InvalidNew => self.report(ScriptError::InvalidNew { line: n })?,

                Stmt::MethodCall {
                    target,
                    method,
                    args,
                } => {
                    if let Some(flow) = self.exec_method_call(target, method, args, env)? {
                        if flow == ControlFlow::Terminate {
                            return Ok(Some(flow));
                        }
                    }
                }

                Stmt::SetAttr { attr, expr } => {
                    let Some(this) = env.receiver().cloned() else {
                        self.report(ScriptError::ThisOutsideMethod)?;
                        pc += 1;
                        continue;
                    };
                    let value = self.eval_text(expr, env)?.unwrap_or_default();
                    debug!(attr, %value, "set this");
                    this.borrow_mut().set_attr(attr, value);
                }
                Stmt::InvalidSetAttr => {
                    let err = if env.receiver().is_some() {
                        ScriptError::InvalidAttributeAssignment { line: n }
                    } else {
                        ScriptError::ThisOutsideMethod
                    };
                    self.report(err)?;
                }

                Stmt::AssignCall { name, func, args } => {
                    let Some(blueprint) = self.function(func) else {
                        pc += 1;
                        continue;
                    };
                    let value = match self.bind_args(func, &blueprint.params, args, env)? {
                        None => Value::Null,
                        Some(values) => match self.call_function(&blueprint, values)? {
                            Some(ControlFlow::Terminate) => return Ok(Some(ControlFlow::Terminate)),
                            Some(ControlFlow::Return(v)) => v,
                            None => Value::Null,
                        },
                    };
                    debug!(var = name, %value, "set");
                    env.set(name, value);
                }

                Stmt::Assign { name, expr } => {
                    let expanded = self.expand(expr, env)?;
                    let source = map_display(&expanded);
                    match evaluate(&source, env) {
                        Some(value) => {
                            debug!(var = name, %value, "set");
                            env.set(name, value);
                        }
                        None => self.report(ScriptError::InvalidValue {
                            name: name.to_owned(),
                            line: n,
                        })?,
                    }
                }
                Stmt::InvalidAssign => self.report(ScriptError::InvalidAssignment { line: n })?,

                Stmt::Say(text) => {
                    let expanded = self.expand(text, env)?;
                    match evaluate(&expanded, env) {
                        Some(value) => self.say(&value.to_string())?,
                        None => self.say(&expanded)?,
                    }
                }

                Stmt::Input(name) => {
                    let typed = self.console.read_line()?.ok_or(ScriptError::InputClosed)?;
                    let value = match evaluate(&typed, &Environment::new()) {
                        Some(v @ (Value::Int(_) | Value::Float(_) | Value::Bool(_))) => v,
                        _ => Value::Str(typed),
                    };
                    debug!(var = name, %value, "input");
                    env.set(name, value);
                }
                Stmt::InvalidInput => self.report(ScriptError::InvalidInput { line: n })?,

                Stmt::Math(text) => {
                    if let Some(value) = self.eval_text(text, env)? {
                        self.say(&value.to_string())?;
                    }
                }

                Stmt::EmptyLine(text) => {
                    let expanded = self.expand(text, env)?;
                    match parse_count(&expanded, env) {
                        Some(count) if count <= MAX_EMPTY_LINES => {
                            if count > 1 {
                                let blank = "\n".repeat((count - 1) as usize);
                                self.console.write(&blank)?;
                            }
                        }
                        _ => self.report(ScriptError::InvalidEmptyLine { line: n })?,
                    }
                }

                Stmt::Pause => {
                    self.console.write(PAUSE_PROMPT)?;
                    self.console.read_line()?.ok_or(ScriptError::InputClosed)?;
                }

                Stmt::Break => {
                    self.say(BREAK_MESSAGE)?;
                    debug!(line = n, "break");
                    return Ok(Some(ControlFlow::Terminate));
                }

                Stmt::Return(expr) => {
                    let value = self.eval_text(expr, env)?.unwrap_or_default();
                    debug!(%value, "return");
                    return Ok(Some(ControlFlow::Return(value)));
                }

                Stmt::If(cond) => {
                    let truthy = self
                        .eval_text(cond, env)?
                        .is_some_and(|v| v.is_truthy());
                    let Some(bounds) = find_block(lines, pc + 1, true) else {
                        self.report(ScriptError::UnmatchedIf { line: n })?;
                        return Ok(None);
                    };
                    debug!(line = n, cond, truthy, "if");
                    let branch = if truthy {
                        Some(&lines[pc + 1..bounds.else_at.unwrap_or(bounds.end)])
                    } else {
                        bounds.else_at.map(|e| &lines[e + 1..bounds.end])
                    };
                    if let Some(branch) = branch {
                        if let Some(flow) = self.execute(branch, env)? {
                            return Ok(Some(flow));
                        }
                    }
                    pc = bounds.end;
                }

                Stmt::Loop(count_text) => {
                    let expanded = self.expand(count_text, env)?;
                    let Some(times) = parse_count(&expanded, env) else {
                        self.report(ScriptError::InvalidLoop { line: n })?;
                        pc += 1;
                        continue;
                    };
                    let Some(bounds) = find_block(lines, pc + 1, false) else {
                        self.report(ScriptError::UnmatchedLoop { line: n })?;
                        return Ok(None);
                    };
                    let body = &lines[pc + 1..bounds.end];
                    debug!(line = n, times, body_lines = body.len(), "loop");
                    for _ in 0..times.max(0) {
                        let mut iteration = env.clone();
                        if let Some(flow) = self.execute(body, &mut iteration)? {
                            return Ok(Some(flow));
                        }
                    }
                    pc = bounds.end;
                }

                Stmt::Help => {
                    for text in HELP_TEXT {
                        self.say(text)?;
                    }
                }

                Stmt::Closer => {}

                Stmt::Unknown => self.report(ScriptError::UnknownStatement {
                    line: n,
                    text: clean.clone(),
                })?,
            }
            pc += 1;
        }
        Ok(None)
    }

    fn exec_method_call(
        &mut self,
        target: &str,
        method: &str,
        args: &str,
        env: &Environment,
    ) -> Result<Option<ControlFlow>, ScriptError> {
        let Some(Value::Instance(receiver)) = self.eval_text(target, env)? else {
            self.report(ScriptError::NotAnObject {
                expr: target.to_owned(),
            })?;
            return Ok(None);
        };
        let class_name = receiver.borrow().class_name().to_owned();
        let Some(blueprint) = self
            .class(&class_name)
            .and_then(|class| class.method(method).cloned())
        else {
            self.report(ScriptError::MethodNotFound {
                method: method.to_owned(),
            })?;
            return Ok(None);
        };
        let Some(values) = self.bind_args(method, &blueprint.params, args, env)? else {
            return Ok(None);
        };
        self.call_method(receiver, &blueprint, values)
    }
}

/// `("k": v, ...)` is the source spelling of a map display.
///
/// Parenthesised text is rewritten to braces only when it is empty or holds
/// a `:`, so a plain grouped expression like `(a + b)` still evaluates.
fn map_display(text: &str) -> String {
    match text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) if inner.trim().is_empty() || inner.contains(':') => format!("{{{inner}}}"),
        _ => text.to_owned(),
    }
}

/// Integer count for `loop`/`emptyline`: the first word as an integer
/// literal, else the whole text evaluated to an integer.
fn parse_count(text: &str, env: &Environment) -> Option<i64> {
    if let Some(n) = text
        .split_whitespace()
        .next()
        .and_then(|w| w.parse::<i64>().ok())
    {
        return Some(n);
    }
    match evaluate(text, env)? {
        Value::Int(n) => Some(n),
        Value::Bool(b) => Some(i64::from(b)),
        _ => None,
    }
}

fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;

    fn run_with_input(src: &str, input: &[&str]) -> (Vec<String>, ExecOutcome) {
        let mut interp = Interpreter::with_console(BufferConsole::with_input(input.iter().copied()));
        let outcome = interp.exec_source(src).expect("script failed");
        let lines = interp
            .console()
            .lines()
            .into_iter()
            .map(str::to_owned)
            .collect();
        (lines, outcome)
    }

    fn run(src: &str) -> Vec<String> {
        run_with_input(src, &[]).0
    }

    #[test]
    fn say_evaluates_or_echoes() {
        assert_eq!(run("say 1 + 2\nsay Hello World"), vec!["3", "Hello World"]);
    }

    #[test]
    fn interpolated_assignment() {
        assert_eq!(run("var x = ${1+1}\nsay x"), vec!["2"]);
    }

    #[test]
    fn say_interpolates_strings_raw() {
        assert_eq!(run("var name = 'Bob'\nsay Hello ${name}!"), vec!["Hello Bob!"]);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        assert_eq!(run("{header}\n\n   \nsay 1 {trailing}\n{ }"), vec!["1"]);
    }

    #[test]
    fn if_branch_shares_environment() {
        let out = run("if 1 == 1\nvar x = 5\nendif\nsay x");
        assert_eq!(out, vec!["5"]);
    }

    #[test]
    fn else_branch_runs_when_false() {
        let out = run("var a = 3\nif a > 5\nsay big\nelse\nsay small\nendif\nsay done");
        assert_eq!(out, vec!["small", "done"]);
    }

    #[test]
    fn failed_condition_is_false() {
        assert_eq!(run("if nope\nsay a\nelse\nsay b\nendif"), vec!["b"]);
    }

    #[test]
    fn loop_iterations_are_isolated() {
        let out = run("var n = 0\nloop 3\nvar n = n + 1\nsay n\nvar c = 1\nendloop\nsay n\nsay c");
        assert_eq!(out, vec!["1", "1", "1", "0", "c"]);
    }

    #[test]
    fn loop_count_is_interpolated() {
        let out = run("var k = 2\nloop ${k}\nsay hi\nendloop");
        assert_eq!(out, vec!["hi", "hi"]);
    }

    #[test]
    fn invalid_loop_count_reports_and_continues() {
        let out = run("loop many\nsay body\nendloop");
        assert_eq!(
            out,
            vec!["Syntax Error on line 1: Invalid loop syntax.", "body"]
        );
    }

    #[test]
    fn nested_mixed_blocks() {
        let src = "var a = 1\nif a == 1\nloop 2\nif a == 1\nsay in\nelse\nsay out\nendif\nendloop\nelse\nsay never\nendif\nsay end";
        assert_eq!(run(src), vec!["in", "in", "end"]);
    }

    #[test]
    fn unmatched_if_halts_invocation() {
        let out = run("say a\nif 1\nsay b");
        assert_eq!(
            out,
            vec!["a", "Syntax Error: 'if' on line 2 has no matching 'endif'."]
        );
    }

    #[test]
    fn unmatched_loop_halts_invocation() {
        let out = run("loop 2\nsay b");
        assert_eq!(
            out,
            vec!["Syntax Error: 'loop' on line 1: No matching 'endloop'."]
        );
    }

    #[test]
    fn function_call_and_return() {
        let out = run("func add(a, b)\nreturn ${a+b}\nendfunc\nvar r = add(2, 3)\nsay r");
        assert_eq!(out, vec!["5"]);
    }

    #[test]
    fn functions_do_not_see_caller_variables() {
        let out = run("var secret = 1\nfunc peek()\nsay ${secret}\nendfunc\npeek()");
        assert_eq!(
            out,
            vec![
                "Warning: Could not evaluate nested expression '$secret'.",
                "${secret}"
            ]
        );
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let out = run("func f(a)\nsay a\nendfunc\nf(1, 2)\nvar r = f()\nsay r");
        assert_eq!(
            out,
            vec![
                "Error: Function 'f' expects 1 arguments, but got 2.",
                "Error: Function 'f' expects 1 arguments, but got 0.",
                "None"
            ]
        );
    }

    #[test]
    fn return_inside_if_is_forwarded() {
        let src = "func sign(x)\nif x < 0\nreturn 'neg'\nendif\nreturn 'pos'\nendfunc\n\
                   var a = sign(-1)\nvar b = sign(1)\nsay ${a} ${b}";
        assert_eq!(run(src), vec!["neg pos"]);
    }

    #[test]
    fn function_without_return_binds_none() {
        let out = run("func f()\nvar x = 1\nendfunc\nvar r = f()\nsay ${r}");
        assert_eq!(out, vec!["None"]);
    }

    #[test]
    fn classes_and_methods() {
        let src = "class Point\nfunc init(x, y)\nvar this.x = x\nvar this.y = y\nendfunc\n\
                   func show()\nsay (${x}, ${y})\nendfunc\nfunc move(dx)\nvar this.x = x + dx\nendfunc\n\
                   endclass\nvar p = new Point(3, 4)\np.show()\np.move(10)\np.show()\nsay ${p.x}";
        assert_eq!(run(src), vec!["(3, 4)", "(13, 4)", "13"]);
    }

    #[test]
    fn instances_are_shared_by_reference() {
        let src = "class Box\nfunc init()\nvar this.v = 0\nendfunc\nfunc set(v)\nvar this.v = v\nendfunc\nendclass\n\
                   var b = new Box()\nfunc poke(box)\nbox.set(7)\nendfunc\npoke(b)\nsay ${b.v}";
        assert_eq!(run(src), vec!["7"]);
    }

    #[test]
    fn object_errors() {
        let src = "class A\nfunc init()\nendfunc\nendclass\nvar a = new A()\na.missing()\n\
                   var n = 1\nn.go()\nvar z = new Zed()\nvar this.q = 1";
        assert_eq!(
            run(src),
            vec![
                "Error: Method 'missing' not found on object.",
                "Error: 'n' did not evaluate to an object.",
                "Error: Class 'Zed' is not defined.",
                "Error: 'this' can only be used inside a class method.",
            ]
        );
    }

    #[test]
    fn init_arity_mismatch_skips_binding() {
        let src = "class A\nfunc init(v)\nendfunc\nendclass\nvar a = new A()\nsay ${a}";
        let out = run(src);
        assert_eq!(out[0], "Error: Function 'init' expects 1 arguments, but got 0.");
        assert_eq!(out[1], "Warning: Could not evaluate nested expression '$a'.");
    }

    #[test]
    fn paren_map_display_is_rewritten() {
        let out = run("var m = (\"k\": \"v\", \"n\": 2)\nsay ${m['n']}\nvar g = (1 + 2) * 2\nsay g");
        assert_eq!(out, vec!["2", "6"]);
    }

    #[test]
    fn invalid_value_is_reported_and_skipped() {
        let out = run("var x = 1\nvar x = 1 +\nsay x");
        assert_eq!(
            out,
            vec!["Syntax Error or invalid value for variable 'x' on line 2.", "1"]
        );
    }

    #[test]
    fn math_prints_only_on_success() {
        assert_eq!(run("math 2 ** 10\nmath oops"), vec!["1024"]);
    }

    #[test]
    fn emptyline_prints_n_minus_one() {
        let mut interp = Interpreter::with_console(BufferConsole::new());
        interp.exec_source("say a\nemptyline 3\nsay b\nemptyline 0\nemptyline x").unwrap();
        assert_eq!(
            interp.console().output(),
            "a\n\n\nb\nInvalid number for emptyline on line 5\n"
        );
    }

    #[test]
    fn emptyline_rejects_huge_counts() {
        let mut interp = Interpreter::with_console(BufferConsole::new());
        interp
            .exec_source("emptyline 1000000000000000000\nsay ${'ab' * 10**18}\nsay [1] * 10**18\nsay after")
            .unwrap();
        assert_eq!(
            interp.console().lines(),
            vec![
                "Invalid number for emptyline on line 1",
                "Warning: Could not evaluate nested expression '$'ab' * 10**18'.",
                "${'ab' * 10**18}",
                "[1] * 10**18",
                "after",
            ]
        );
    }

    #[test]
    fn return_inside_loop_ends_the_function() {
        let src = "func f()\nloop 3\nsay tick\nreturn 1\nendloop\nsay unreachable\nendfunc\nvar r = f()\nsay r";
        assert_eq!(run(src), vec!["tick", "1"]);
    }

    #[test]
    fn leading_zero_literals_echo_raw_text() {
        assert_eq!(
            run("say 007\nsay 2024-01-05\nvar x = 007"),
            vec![
                "007",
                "2024-01-05",
                "Syntax Error or invalid value for variable 'x' on line 3.",
            ]
        );
    }

    #[test]
    fn input_parses_numbers() {
        let (out, outcome) = run_with_input("input a\ninput b\nsay ${a + 1}\nsay b", &["41", "hello there"]);
        assert_eq!(out, vec!["42", "hello there"]);
        assert_eq!(outcome.env.get("b"), Some(&Value::Str("hello there".into())));
    }

    #[test]
    fn input_at_eof_is_fatal() {
        let mut interp = Interpreter::with_console(BufferConsole::new());
        let err = interp.exec_source("input a").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn pause_prompts_and_waits() {
        let mut interp = Interpreter::with_console(BufferConsole::with_input([""]));
        interp.exec_source("pause\nsay go").unwrap();
        assert_eq!(interp.console().output(), "Press Enter to continue...go\n");
    }

    #[test]
    fn break_terminates_through_frames() {
        let src = "func stop()\nloop 3\nif 1\nbreak\nendif\nendloop\nendfunc\nsay before\nstop()\nsay after";
        let (out, outcome) = run_with_input(src, &[]);
        assert_eq!(out, vec!["before", BREAK_MESSAGE]);
        assert!(outcome.terminated());
    }

    #[test]
    fn unknown_statement_reports_line() {
        assert_eq!(
            run("\nprint 1\nendif"),
            vec!["Unknown command or syntax error on line 2: 'print 1'"]
        );
    }

    #[test]
    fn help_lists_statements() {
        let out = run("help");
        assert_eq!(out.first().map(String::as_str), Some("--- MSlash Help ---"));
        assert_eq!(out.len(), HELP_TEXT.len());
    }

    #[test]
    fn preprocess_diagnostics_are_reported_first() {
        assert_eq!(
            run("say a\nendfunc"),
            vec!["Syntax Error: 'endfunc' without matching 'func'.", "a"]
        );
    }

    #[test]
    fn run_file_reports_missing_script() {
        let mut interp = Interpreter::with_console(BufferConsole::new());
        let err = interp.run_file("/definitely/not/here.mslash").unwrap_err();
        assert_eq!(err.to_string(), "Error: File '/definitely/not/here.mslash' not found.");
    }

    #[test]
    fn map_display_rewrite_rules() {
        assert_eq!(map_display("('a': 1)"), "{'a': 1}");
        assert_eq!(map_display("()"), "{}");
        assert_eq!(map_display("(1 + 2)"), "(1 + 2)");
        assert_eq!(map_display("[1, 2]"), "[1, 2]");
    }

    #[test]
    fn counts() {
        let env = Environment::new();
        assert_eq!(parse_count("3 times", &env), Some(3));
        assert_eq!(parse_count("1 + 1", &env), Some(1));
        assert_eq!(parse_count("(1 + 1)", &env), Some(2));
        assert_eq!(parse_count("x", &env), None);
    }
}
