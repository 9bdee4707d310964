// Parse command: send one document to LandingAI and print the result.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::{debug, info, warn};

use findoc::api::{LandingAiClient, ParseResponse};
use findoc::config::Settings;
use findoc::document::{load_pages, DocumentKind};
use findoc::report::{
    build_pages, flatten_fields, render_fields, render_json, render_markdown, render_text,
};
use findoc::ui::spinner;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Input document (png, jpg, jpeg or pdf)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Write annotated page previews (page-N.png) into this directory
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// LandingAI API key (overrides LANDINGAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown per page
    Text,
    /// Whole-document markdown
    Markdown,
    /// Raw LandingAI response
    Json,
    /// Flattened key: value lines
    Fields,
}

pub fn run(args: ParseArgs, settings: Settings) -> anyhow::Result<()> {
    let start = Instant::now();

    let kind = DocumentKind::from_path(&args.input)?;
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let settings = settings.with_api_key(args.api_key.as_deref());
    let client = LandingAiClient::new(&settings)?;

    let bytes = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let filename = args
        .input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string();
    info!("Processing file: {}", args.input.display());

    let spinner = spinner("Contacting LandingAI (parse)...");
    let result = client.parse_raw(&bytes, &filename);
    spinner.finish_and_clear();
    let raw = result?;
    let response = ParseResponse::from_value(raw.clone())?;
    debug!("Response has {} chunks", response.chunks.len());

    let output = match args.format {
        OutputFormat::Text => {
            let previews = load_pages(&bytes, kind).unwrap_or_else(|e| {
                warn!("Could not render preview: {}", e);
                Vec::new()
            });
            render_text(&build_pages(&response, &previews))
        }
        OutputFormat::Markdown => render_markdown(&response),
        OutputFormat::Json => render_json(&raw)?,
        OutputFormat::Fields => render_fields(&flatten_fields(&raw)),
    };

    if let Some(dir) = &args.annotate {
        write_annotations(dir, &bytes, kind, &response)?;
    }

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

fn write_annotations(
    dir: &Path,
    bytes: &[u8],
    kind: DocumentKind,
    response: &ParseResponse,
) -> anyhow::Result<()> {
    let previews = load_pages(bytes, kind).context("Could not render preview")?;
    fs::create_dir_all(dir)?;

    let mut written = 0;
    for page in build_pages(response, &previews) {
        if let Some(image) = &page.annotated {
            let path = dir.join(format!("page-{}.png", page.index + 1));
            image
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += 1;
        }
    }

    eprintln!(
        "{} Wrote {} annotated page(s) to {}",
        style("✓").green(),
        written,
        dir.display()
    );
    Ok(())
}
