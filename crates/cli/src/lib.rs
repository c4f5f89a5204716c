pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "agebot",
    about = "Agebot operator CLI",
    long_about = "Compute ages offline exactly as the Slack bot would, inspect configuration, and check readiness.",
    after_help = "Examples:\n  agebot age 1990-05-15\n  agebot age \"is 1990-05-15\" --catch-all --on 2024-05-15\n  agebot doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Answer a date of birth with the bot's reply")]
    Age {
        #[arg(help = "YYYY-MM-DD date, or a whole message with --catch-all")]
        text: String,
        #[arg(long, value_name = "YYYY-MM-DD", help = "Reference date instead of today")]
        on: Option<String>,
        #[arg(long, help = "Treat the input as a message whose second word is the date")]
        catch_all: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack token readiness, and the age calculator")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Age { text, on, catch_all } => {
            commands::age::run(&text, on.as_deref(), catch_all)
        }
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
