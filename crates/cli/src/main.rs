use std::process::ExitCode;

fn main() -> ExitCode {
    agebot_cli::run()
}
