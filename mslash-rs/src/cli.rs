//! Command-line argument parsing.
//!
//! Usage:
//!   mslash [-d|--debug] [-h|--help] [<file>]
//!
//! The first non-flag argument names the script.  Unknown flags and extra
//! positional arguments are ignored.

use std::path::PathBuf;

pub const USAGE: &str = "Usage: mslash [-d|--debug] [-h|--help] [<file>]";

/// Environment variable holding tracing filter directives.
pub const LOG_ENV: &str = "MSLASH_LOG";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Script to run; prompt for one when absent.
    pub file: Option<PathBuf>,
    /// Debug tracing (`-d` / `--debug`).
    pub debug: bool,
    /// Print usage and exit (`-h` / `--help`).
    pub help: bool,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            if args.file.is_none() {
                args.file = argv.get(i + 1).map(PathBuf::from);
            }
            break;
        }

        match arg {
            "--debug" => args.debug = true,
            "--help" => args.help = true,
            _ if arg.starts_with("--") => {}
            // Bundled short flags: `-dh`.
            _ if arg.starts_with('-') && arg.len() > 1 => {
                for c in arg[1..].chars() {
                    match c {
                        'd' => args.debug = true,
                        'h' => args.help = true,
                        _ => {}
                    }
                }
            }
            _ => {
                if args.file.is_none() {
                    args.file = Some(PathBuf::from(arg));
                }
            }
        }
        i += 1;
    }

    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
