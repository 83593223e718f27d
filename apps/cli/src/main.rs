//! sitebrief CLI — compile a client website into a voice-agent prompt.
//!
//! Crawls a site within explicit bounds, distills its content into fact
//! units, and packs them under a hard token ceiling.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
