pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod utils;

use crate::cli::{Cli, Command};
use crate::commands::Trigger;
use crate::error::Result;
use crate::session::SESSION;

pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.listener_config()?;

    match cli.command {
        Command::Listen(_) => {
            let trigger = if config.auto_start {
                Trigger::Immediate
            } else {
                Trigger::Enter
            };
            let summary = commands::listen(&config, SESSION.clone(), trigger).await?;
            if summary.connected {
                println!(
                    "received {} packets ({} bytes)",
                    summary.packets, summary.bytes
                );
            } else {
                println!("never connected");
            }
        }
        Command::Offer { .. } => {
            let body = commands::offer(&config, SESSION.clone()).await?;
            println!("{body}");
        }
        Command::CheckIce => {
            for (server, ok) in commands::check_ice(&config).await? {
                let verdict = if ok { "ok" } else { "FAILED" };
                println!("{:<6} {:<4} {}", verdict, server.r#type, server.url);
            }
        }
    }
    Ok(())
}
