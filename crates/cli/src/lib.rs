pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::input::EvaluateArgs;

#[derive(Debug, Parser)]
#[command(
    name = "homequote",
    about = "Homequote operator CLI",
    long_about = "Inspect configuration, check backend readiness, and run the pricing engine against catalog snapshots.",
    after_help = "Examples:\n  homequote doctor --json\n  homequote config\n  homequote quote --snapshot catalog.json --draft draft.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and booking backend reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Price a booking draft against a catalog snapshot")]
    Quote(EvaluateArgs),
    #[command(about = "List the options a booking draft may select and repair the draft")]
    Eligibility(EvaluateArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Quote(args) => commands::quote::run(&args),
        Command::Eligibility(args) => commands::eligibility::run(&args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
