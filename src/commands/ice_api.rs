use crate::config::{ListenerConfig, DEFAULT_STUN_SERVERS};
use crate::error::Result;
use crate::peer::ice::check_ice_server_availability;
use crate::peer::ServerConfig;

/// Checks every configured ICE server (or the default STUN pair).
pub async fn check_ice(config: &ListenerConfig) -> Result<Vec<(ServerConfig, bool)>> {
    let servers = config.ice_servers.clone().unwrap_or_else(|| {
        DEFAULT_STUN_SERVERS
            .iter()
            .map(|url| ServerConfig::stun(*url))
            .collect()
    });

    let mut results = Vec::with_capacity(servers.len());
    for server in servers {
        tracing::info!("Checking {} server {}", server.r#type, server.url);
        let ok = check_ice_server_availability(&server).await?;
        tracing::info!("{} -> {}", server.url, if ok { "reachable" } else { "unreachable" });
        results.push((server, ok));
    }
    Ok(results)
}
