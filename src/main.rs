// Entrypoint for the CLI application.
// - With no subcommand it only loads configuration and prints a banner.
// - `parse`, `interactive` and `serve` hand off to the library.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use findoc::config::{Settings, API_KEY_VAR};
use findoc::ui::main_menu;

use commands::{parse, serve};

/// Financial Document Extractor - send documents to LandingAI ADE and show the result
#[derive(Parser)]
#[command(name = "findoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a single document and print the extracted content
    Parse(parse::ParseArgs),

    /// Keyboard-driven menu
    Interactive,

    /// Start the web upload UI
    Serve(serve::ServeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::from_env().context("Failed to load configuration")?;

    match cli.command {
        None => {
            print_banner(&settings);
            Ok(())
        }
        Some(Commands::Parse(args)) => parse::run(args, settings),
        Some(Commands::Interactive) => main_menu(settings),
        Some(Commands::Serve(args)) => serve::run(args, settings),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_banner(settings: &Settings) {
    println!("{}", style("Financial Document Extractor PoC").bold());
    println!("Forwards PNG, JPG and PDF documents to LandingAI's ADE API.");
    println!();
    if settings.has_api_key() {
        println!("{} LandingAI API key configured", style("✓").green());
    } else {
        println!(
            "{} No LandingAI API key found. Export {} or add it to .env",
            style("!").yellow(),
            API_KEY_VAR
        );
    }
    println!();
    println!("Run `findoc --help` to see the available commands.");
}
