// UI layer: a simple interactive menu using `dialoguer`. Each step is small
// and synchronous so the flow is easy to follow: pick a document, send it
// to LandingAI, print what came back.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::api::LandingAiClient;
use crate::config::{save_api_key, Settings};
use crate::document::{load_pages, DocumentKind};
use crate::report::{build_pages, render_text};

/// Main interactive menu. Runs a select loop until the user chooses "Exit".
/// Errors from a single analysis are printed and the loop continues.
pub fn main_menu(mut settings: Settings) -> Result<()> {
    println!("{}", style("Financial Document Extractor").bold());
    if !settings.has_api_key() {
        println!("No API key configured yet. Choose \"Set API key\" first.");
    }

    loop {
        let items = vec!["Analyze a document", "Set API key", "Show configuration", "Exit"];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => {
                if let Err(e) = handle_analyze(&settings) {
                    println!("{} {:#}", style("Analysis failed:").red(), e);
                }
            }
            1 => {
                if let Some(key) = handle_set_key()? {
                    settings = settings.with_api_key(Some(key.as_str()));
                }
            }
            2 => println!("{settings:#?}"),
            3 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Ask for a path, send it to LandingAI and print the per-page report.
fn handle_analyze(settings: &Settings) -> Result<()> {
    let path: String = Input::new()
        .with_prompt("Document path (png, jpg, jpeg, pdf)")
        .interact_text()?;
    let path = PathBuf::from(path.trim());

    let kind = DocumentKind::from_path(&path)?;
    let bytes = std::fs::read(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string();

    let previews = load_pages(&bytes, kind).unwrap_or_else(|e| {
        warn!("Could not render preview: {}", e);
        Vec::new()
    });

    let client = LandingAiClient::new(settings)?;

    let spinner = spinner("Contacting LandingAI (parse)...");
    let result = client.parse_document(&bytes, &filename);
    spinner.finish_and_clear();

    let response = result?;
    let pages = build_pages(&response, &previews);
    println!("{}", render_text(&pages));
    Ok(())
}

/// Prompt for a key with hidden input, optionally remembering it on disk.
fn handle_set_key() -> Result<Option<String>> {
    let key: String = Password::new()
        .with_prompt("LandingAI API key")
        .allow_empty_password(true)
        .interact()?;
    if key.trim().is_empty() {
        println!("No key entered, keeping the current one.");
        return Ok(None);
    }

    let remember = Confirm::new()
        .with_prompt("Remember this key for later runs?")
        .default(false)
        .interact()?;
    if remember {
        let path = save_api_key(&key)?;
        println!("{} Saved to {}", style("✓").green(), path.display());
    }
    Ok(Some(key))
}

/// Steady spinner shown while waiting on LandingAI.
pub fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
