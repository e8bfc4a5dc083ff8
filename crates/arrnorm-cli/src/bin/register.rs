use std::process::ExitCode;

use arrnorm_cli::commands::register::RegisterCli;

fn main() -> ExitCode {
    arrnorm_cli::run_main::<RegisterCli>()
}
