pub mod commands;
pub mod progress;
pub mod summary;

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// A parsed command line that can run itself.
pub trait Command: Parser {
    fn verbose(&self) -> bool;
    fn run(&self) -> anyhow::Result<()>;
}

/// Parse the process arguments as `C`, set up logging and run.
///
/// Help and version requests exit 0; usage errors and run failures exit 1.
/// Run failures are reported on standard output.
pub fn run_main<C: Command>() -> ExitCode {
    let cli = match C::try_parse_from(legacy_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    init_tracing(cli.verbose());

    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = report_error(&mut std::io::stdout(), &e);
            ExitCode::FAILURE
        }
    }
}

pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Write `Error: <message>` with the full context chain.
pub fn report_error<W: Write>(out: &mut W, err: &anyhow::Error) -> std::io::Result<()> {
    writeln!(out, "Error: {err:#}")?;
    out.flush()
}

/// Accept the single-dash `-ref` spelling as `--ref`.
pub fn legacy_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|a| if a == "-ref" { OsString::from("--ref") } else { a })
        .collect()
}
