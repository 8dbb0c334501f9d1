use anyhow::Result;
use nearby::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
