use crate::config::{
    load_ice_servers, ListenerConfig, DEFAULT_CHANNEL, DEFAULT_SIGNALING_URL,
};
use crate::error::Result;
use crate::peer::ServerConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "netradio-listener")]
#[command(about = "Listen to a netradio channel over WebRTC", version)]
pub struct Cli {
    #[command(flatten)]
    pub ice: IceArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Negotiate with the channel and play its audio
    Listen(ListenArgs),

    /// Gather an offer and print the connect request body
    Offer {
        /// Seconds to wait for ICE gathering
        #[arg(long, default_value_t = 30)]
        gather_timeout: u64,
    },

    /// Check that the configured STUN/TURN servers answer
    CheckIce,
}

#[derive(Args, Debug, Default)]
pub struct IceArgs {
    /// JSON file with a list of ICE servers
    #[arg(long, global = true)]
    pub ice_servers: Option<PathBuf>,

    /// Extra STUN server (repeatable)
    #[arg(long = "stun", global = true)]
    pub stun: Vec<String>,

    /// TURN server URL, e.g. turn:relay.metered.ca:443
    #[arg(long, env = "NETRADIO_TURN_URL", global = true)]
    pub turn_url: Option<String>,

    #[arg(long, env = "NETRADIO_TURN_USERNAME", global = true)]
    pub turn_username: Option<String>,

    #[arg(long, env = "NETRADIO_TURN_CREDENTIAL", global = true, hide_env_values = true)]
    pub turn_credential: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Base URL of the signaling server
    #[arg(long, env = "NETRADIO_SIGNALING_URL", default_value = DEFAULT_SIGNALING_URL)]
    pub signaling_url: String,

    /// Channel to connect to
    #[arg(short, long, env = "NETRADIO_CHANNEL", default_value_t = DEFAULT_CHANNEL)]
    pub channel: u32,

    /// Start the session as soon as the offer is ready instead of waiting for Enter
    #[arg(long)]
    pub auto: bool,

    /// Write received Opus audio to this Ogg file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Drain the track without writing audio
    #[arg(long)]
    pub muted: bool,

    /// Seconds to wait for ICE gathering
    #[arg(long, default_value_t = 30)]
    pub gather_timeout: u64,
}

impl IceArgs {
    /// `None` when nothing was given, so the default STUN servers apply.
    pub fn servers(&self) -> Result<Option<Vec<ServerConfig>>> {
        let mut servers = match &self.ice_servers {
            Some(path) => load_ice_servers(path)?,
            None => Vec::new(),
        };
        servers.extend(self.stun.iter().map(ServerConfig::stun));

        if let Some(url) = &self.turn_url {
            let mut turn = ServerConfig::turn(url.clone(), "", "");
            turn.username = self.turn_username.clone();
            turn.credential = self.turn_credential.clone();
            servers.push(turn);
        }

        if servers.is_empty() {
            Ok(None)
        } else {
            Ok(Some(servers))
        }
    }
}

impl Cli {
    pub fn listener_config(&self) -> Result<ListenerConfig> {
        let mut config = ListenerConfig::default();
        if let Some(servers) = self.ice.servers()? {
            config.push_ice_servers(servers);
        }

        match &self.command {
            Command::Listen(args) => {
                config.signaling_url = args.signaling_url.clone();
                config.channel = args.channel;
                config.auto_start = args.auto;
                config.output = args.output.clone();
                config.duration = args.duration.map(Duration::from_secs);
                config.muted = args.muted;
                config.gather_timeout = Duration::from_secs(args.gather_timeout);
            }
            Command::Offer { gather_timeout } => {
                config.gather_timeout = Duration::from_secs(*gather_timeout);
            }
            Command::CheckIce => {}
        }
        Ok(config)
    }
}
