use anyhow::Result;
use clap::Parser;
use netradio_listener_lib::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    netradio_listener_lib::logger::init();

    let cli = Cli::parse();
    netradio_listener_lib::run(cli).await?;
    Ok(())
}
