//! vowpath CLI entry point.

use clap::Parser;
use vp_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    vp_cli::run(cli).await
}
