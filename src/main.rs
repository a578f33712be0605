use anyhow::Result;
use clap::Parser;
use job_scout::cli::{self, Cli};
use job_scout::logging;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init()?;

    let cli = Cli::parse();
    cli::run(cli).await
}
