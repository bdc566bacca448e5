use std::process::ExitCode;

fn main() -> ExitCode {
    pb_cli::cli::run()
}
