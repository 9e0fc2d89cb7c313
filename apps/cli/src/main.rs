//! poemday CLI: daily poem extractor.
//!
//! Fetches the poem-of-the-day page, isolates the poem from the site chrome,
//! and keeps `poem.json` current without ever overwriting a good record
//! with a failed extraction.

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
