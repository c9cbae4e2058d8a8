pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "enquiry",
    about = "Enquiry operator CLI",
    long_about = "Inspect configuration, check character registry readiness, scan text against guardrails, and preview composed prompts.",
    after_help = "Examples:\n  enquiry doctor --json\n  enquiry config\n  enquiry scan \"It costs ₹45,000\"\n  enquiry prompt solar_services"
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
    #[command(about = "Validate config, character registry and service coverage")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Scan text for guardrail violations and print the report as JSON")]
    Scan {
        #[arg(help = "Text to scan")]
        text: String,
        #[arg(long, help = "Treat the text as a system prompt and run preflight checks")]
        prompt: bool,
    },
    #[command(about = "Compose the enquiry system prompt for a service")]
    Prompt {
        #[arg(help = "Service id, for example solar_services")]
        service: String,
        #[arg(long, help = "Character registry path (defaults to registry.characters_path)")]
        registry: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::CommandResult::text(0, commands::config::run()),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Scan { text, prompt } => commands::scan::run(&text, prompt),
        Command::Prompt { service, registry } => commands::prompt::run(&service, registry),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
