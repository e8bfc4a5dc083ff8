use std::process::ExitCode;

use arrnorm_cli::commands::normalize::ArrnormCli;

fn main() -> ExitCode {
    arrnorm_cli::run_main::<ArrnormCli>()
}
