// Serve command: run the web upload UI.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Args;
use console::style;

use findoc::config::Settings;
use findoc::web;

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (overrides FINDOC_ADDR)
    #[arg(short, long)]
    addr: Option<SocketAddr>,
}

pub fn run(args: ServeArgs, mut settings: Settings) -> anyhow::Result<()> {
    if let Some(addr) = args.addr {
        settings.addr = addr;
    }

    println!(
        "{} Upload UI on http://{}",
        style("ℹ").blue(),
        settings.addr
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime
        .block_on(web::serve(settings))
        .context("Server error")?;
    Ok(())
}
