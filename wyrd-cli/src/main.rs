//! Wyrd CLI - Command-line REPL and script runner
//!
//! This is a thin wrapper around wyrd-core that builds the executable.
//! Hosts that want their own builtins can use wyrd-core directly and
//! register them before evaluating anything.
//!
//! ```text
//! wyrd [--no-prelude] [--quiet] [SCRIPT]
//! ```
//!
//! Logging goes to stderr and is controlled with `WYRD_LOG`, using the
//! usual filter syntax (`WYRD_LOG=wyrd_core=debug`).

mod repl;

use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use wyrd_core::{Interpreter, InterpreterConfig, StdoutOutput};

const USAGE: &str = "usage: wyrd [--no-prelude] [--quiet] [SCRIPT]";

#[derive(Debug, Default)]
struct Options {
    no_prelude: bool,
    quiet: bool,
    script: Option<PathBuf>,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options::default();
    for arg in args {
        match arg.as_str() {
            "--no-prelude" => options.no_prelude = true,
            "--quiet" | "-q" => options.quiet = true,
            "--help" | "-h" => return Err(USAGE.to_string()),
            flag if flag.starts_with('-') => return Err(format!("unknown option {flag}\n{USAGE}")),
            path if options.script.is_none() => options.script = Some(PathBuf::from(path)),
            _ => return Err(USAGE.to_string()),
        }
    }
    Ok(options)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WYRD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn run_script(interp: &mut Interpreter, path: PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("wyrd: {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };
    info!(path = %path.display(), "running script");
    interp.set_script_path(path);
    match interp.eval_str(&source) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            warn!(error = %e, "script stopped on an unhandled error");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };
    init_tracing();

    let mut interp = Interpreter::with_config(InterpreterConfig {
        load_prelude: !options.no_prelude,
        ..InterpreterConfig::default()
    });
    interp.set_output(Box::new(StdoutOutput::new()));

    match options.script {
        Some(path) => run_script(&mut interp, path),
        None => match repl::run_repl(&mut interp, options.quiet) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("wyrd: {e}");
                ExitCode::FAILURE
            }
        },
    }
}
