use std::process::ExitCode;

use mslash::cli::{self, LOG_ENV, USAGE};
use mslash::console::{Console, StdConsole};
use mslash::script::{Interpreter, ScriptError};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const FILE_PROMPT: &str = "Enter the name and file extension of the target file (e.g., demo.mslash): ";

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("mslash: {e}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };
    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    install_tracing(args.debug);

    let path = match args.file {
        Some(p) => p.to_string_lossy().into_owned(),
        None => match prompt_for_file() {
            Ok(p) => p,
            Err(e) => return report_fatal(e),
        },
    };

    let mut interp = Interpreter::new();
    match interp.run_file(&path) {
        Ok(outcome) => {
            debug!(path = %path, terminated = outcome.terminated(), "finished");
            ExitCode::SUCCESS
        }
        Err(e) => report_fatal(e),
    }
}

/// Logs go to stderr so they never interleave with script output on stdout.
fn install_tracing(debug: bool) {
    let mut filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("mslash=warn"));
    if debug {
        if let Ok(directive) = "mslash=debug".parse() {
            filter = filter.add_directive(directive);
        }
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn prompt_for_file() -> Result<String, ScriptError> {
    let mut console = StdConsole;
    console.write(FILE_PROMPT)?;
    let line = console.read_line()?.ok_or(ScriptError::InputClosed)?;
    Ok(line.trim().to_owned())
}

/// A missing script is reported and the run simply ends; anything else is
/// an unexpected failure.
fn report_fatal(err: ScriptError) -> ExitCode {
    match err {
        ScriptError::ScriptNotFound { .. } => {
            println!("{err}");
            ExitCode::SUCCESS
        }
        _ => {
            println!("An unexpected error occurred: {err}");
            ExitCode::FAILURE
        }
    }
}
