use crate::config::{DEFAULT_STUN_SERVERS, ICE_CANDIDATE_POOL_SIZE};
use crate::error::{ListenerError, Result};
use crate::peer::connection::build_api;
use crate::peer::types::{CandidateSummary, ServerConfig};
use crate::session::Session;
use crate::utils::add_ice_url_scheme;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use webrtc::ice_transport::{ice_gatherer_state::RTCIceGathererState, ice_server::RTCIceServer};
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::{configuration::RTCConfiguration, RTCPeerConnection};
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

/// Создает конфигурацию для peer connection
pub fn rtc_config(custom_servers: Option<&[ServerConfig]>) -> Result<RTCConfiguration> {
    let ice_servers = match custom_servers {
        // Используем пользовательские серверы
        Some(servers) => {
            validate_servers(servers)?;
            get_user_ice_servers(servers)
        }
        // Используем дефолтные серверы
        None => vec![RTCIceServer {
            urls: DEFAULT_STUN_SERVERS.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }],
    };

    // unified-plan в webrtc-rs по умолчанию
    Ok(RTCConfiguration {
        ice_servers,
        ice_candidate_pool_size: ICE_CANDIDATE_POOL_SIZE,
        bundle_policy: RTCBundlePolicy::MaxBundle,
        rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
        ..Default::default()
    })
}

/// Проверка серверов перед тем как отдавать их в webrtc
pub fn validate_servers(servers: &[ServerConfig]) -> Result<()> {
    for server in servers {
        if server.url.trim().is_empty() {
            return Err(ListenerError::InvalidIceServer {
                url: server.url.clone(),
                reason: "server URL cannot be empty",
            });
        }

        let has_creds = server.username.as_deref().is_some_and(|u| !u.is_empty())
            && server.credential.as_deref().is_some_and(|c| !c.is_empty());
        if server.is_turn() && !has_creds {
            return Err(ListenerError::InvalidIceServer {
                url: server.url.clone(),
                reason: "TURN servers require username and credential",
            });
        }
    }
    Ok(())
}

pub fn get_user_ice_servers(servers: &[ServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|config| RTCIceServer {
            urls: vec![add_ice_url_scheme(config)],
            username: config.username.clone().unwrap_or_default(),
            credential: config.credential.clone().unwrap_or_default(),
        })
        .collect()
}

/// Waits for the null candidate, then reports what was gathered.
pub async fn wait_for_gathering(
    session: &Session,
    limit: Duration,
) -> Result<RTCSessionDescription> {
    tracing::info!("Waiting for ICE gathering (up to {}s)...", limit.as_secs());
    let desc = timeout(limit, session.wait_local_description())
        .await
        .map_err(|_| ListenerError::GatheringTimeout(limit))?;

    let summary = analyze_candidates(&session.local_candidates());
    tracing::info!("Collected {} ICE candidates", summary.total());
    if summary.total() == 0 {
        tracing::warn!("No ICE candidates gathered, the answer has nothing to reach");
    }
    Ok(desc)
}

pub fn analyze_candidates(candidates: &[String]) -> CandidateSummary {
    let mut summary = CandidateSummary::default();

    for candidate in candidates {
        if candidate.contains("typ host") {
            summary.host += 1;
        } else if candidate.contains("typ srflx") {
            summary.srflx += 1;
        } else if candidate.contains("typ relay") {
            summary.relay += 1;
        }
    }

    tracing::info!(
        "Candidate analysis: {} host, {} srflx, {} relay",
        summary.host,
        summary.srflx,
        summary.relay
    );

    if summary.relay == 0 {
        tracing::warn!("No TURN relay candidates found! Connection through NAT may fail.");
    }
    summary
}

/// Tries one ICE server on its own: a STUN server must yield a `srflx`
/// candidate, a TURN server a `relay` candidate.
pub async fn check_ice_server_availability(config: &ServerConfig) -> Result<bool> {
    validate_servers(std::slice::from_ref(config))?;
    let rtc_config = RTCConfiguration {
        ice_servers: get_user_ice_servers(std::slice::from_ref(config)),
        ..Default::default()
    };
    tracing::debug!(
        "Checking ICE server urls={:?}",
        rtc_config.ice_servers.iter().map(|s| &s.urls).collect::<Vec<_>>()
    );

    let api = build_api()?;
    let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);
    let found = check_via_ice_gathering(&peer_connection, config.is_turn()).await;
    let _ = peer_connection.close().await;
    found
}

async fn check_via_ice_gathering(
    peer_connection: &Arc<RTCPeerConnection>,
    want_relay: bool,
) -> Result<bool> {
    let wanted = if want_relay { "typ relay" } else { "typ srflx" };

    let (state_tx, mut state_rx) = mpsc::channel(10);
    peer_connection.on_ice_gathering_state_change(Box::new(move |state| {
        let tx = state_tx.clone();
        tracing::debug!("ICE gathering state changed to: {:?}", state);
        Box::pin(async move {
            let _ = tx.send(state).await;
        })
    }));

    let (candidate_tx, mut candidate_rx) = mpsc::channel(10);
    peer_connection.on_ice_candidate(Box::new(move |candidate| {
        let tx = candidate_tx.clone();
        Box::pin(async move {
            let Some(c) = candidate else {
                tracing::debug!("Received null candidate (gathering complete)");
                return;
            };
            match c.to_json() {
                Ok(json) if json.candidate.contains(wanted) => {
                    tracing::debug!("Found matching candidate: {}", json.candidate);
                    let _ = tx.send(()).await;
                }
                Ok(json) => tracing::debug!("Candidate ignored: {}", json.candidate),
                Err(e) => tracing::debug!("Failed to get candidate JSON: {:?}", e),
            }
        })
    }));

    // Аудио-трансивер нужен только чтобы в offer была m-секция
    peer_connection
        .add_transceiver_from_kind(RTPCodecType::Audio, None)
        .await?;
    let offer = peer_connection.create_offer(None).await?;
    peer_connection.set_local_description(offer).await?;

    let check_timeout = Duration::from_secs(10);
    let found = tokio::select! {
        result = timeout(check_timeout, candidate_rx.recv()) => matches!(result, Ok(Some(()))),
        // сбор закончился без подходящего кандидата
        _ = async {
            while let Some(state) = state_rx.recv().await {
                if state == RTCIceGathererState::Complete {
                    break;
                }
            }
        } => false,
    };
    // кандидат мог прийти одновременно с Complete
    Ok(found || candidate_rx.try_recv().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_stun_pair() {
        let config = rtc_config(None).unwrap();
        assert_eq!(config.ice_servers.len(), 1);
        assert_eq!(config.ice_servers[0].urls.len(), 2);
        assert_eq!(config.ice_candidate_pool_size, 10);
        assert_eq!(config.bundle_policy, RTCBundlePolicy::MaxBundle);
    }

    #[test]
    fn user_servers_replace_defaults() {
        let servers = vec![ServerConfig::turn("relay.metered.ca:443", "listener", "secret")];
        let config = rtc_config(Some(servers.as_slice())).unwrap();
        assert_eq!(config.ice_servers.len(), 1);
        assert_eq!(config.ice_servers[0].urls, vec!["turn:relay.metered.ca:443"]);
        assert_eq!(config.ice_servers[0].username, "listener");
        assert_eq!(config.ice_servers[0].credential, "secret");
    }

    #[test]
    fn empty_server_list_means_host_only() {
        let config = rtc_config(Some(&[])).unwrap();
        assert!(config.ice_servers.is_empty());
    }

    #[test]
    fn turn_without_credentials_rejected() {
        let mut server = ServerConfig::turn("relay.metered.ca:443", "user", "");
        let err = validate_servers(std::slice::from_ref(&server)).unwrap_err();
        assert!(matches!(err, ListenerError::InvalidIceServer { .. }));

        server.credential = None;
        assert!(rtc_config(Some(&[server])).is_err());
    }

    #[test]
    fn empty_url_rejected() {
        let err = validate_servers(&[ServerConfig::stun("  ")]).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn candidates_counted_by_type() {
        let candidates = vec![
            "candidate:1 1 udp 2130706431 192.168.1.5 50000 typ host".to_string(),
            "candidate:2 1 udp 2130706431 10.0.0.7 50001 typ host".to_string(),
            "candidate:3 1 udp 1694498815 203.0.113.4 50002 typ srflx raddr 0.0.0.0 rport 0"
                .to_string(),
            "candidate:4 1 udp 16777215 198.51.100.9 3478 typ relay raddr 0.0.0.0 rport 0"
                .to_string(),
        ];
        let summary = analyze_candidates(&candidates);
        assert_eq!(
            summary,
            CandidateSummary {
                host: 2,
                srflx: 1,
                relay: 1
            }
        );
        assert_eq!(summary.total(), 4);
    }
}
