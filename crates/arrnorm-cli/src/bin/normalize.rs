use std::process::ExitCode;

use arrnorm_cli::commands::normalize::NormalizeCli;

fn main() -> ExitCode {
    arrnorm_cli::run_main::<NormalizeCli>()
}
