use crate::config::GRACE_PERIOD;
use crate::error::{ListenerError, Result};
use crate::logger::{
    dump_candidate, dump_selected_pair, emit_connected, emit_connection_failed,
    emit_connection_problem, emit_connection_recovered, emit_disconnected,
};
use crate::peer::ice::rtc_config;
use crate::peer::types::ServerConfig;
use crate::session::Session;
use crate::utils::lock;
use std::sync::{Arc, Weak};
use tokio::time::sleep;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

/// API с кодеками по умолчанию (Opus среди них) и стандартными интерсепторами
pub fn build_api() -> Result<API> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;
    let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

    Ok(APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build())
}

/// Creates the peer connection and registers the state and candidate
/// observers. The null candidate stores the local description in `session`.
pub async fn new_peer(
    ice_servers: Option<&[ServerConfig]>,
    session: Arc<Session>,
) -> Result<Arc<RTCPeerConnection>> {
    let config = rtc_config(ice_servers)?;
    let api = build_api()?;
    let pc = Arc::new(api.new_peer_connection(config).await?);
    tracing::debug!(session = session.id(), "Peer connection created");

    pc.on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
        tracing::info!("ICE connection state: {}", state);
        Box::pin(async {})
    }));

    pc.on_ice_gathering_state_change(Box::new(move |state| {
        tracing::debug!("ICE gathering state changed to: {:?}", state);
        Box::pin(async {})
    }));

    // Weak, чтобы обработчики не держали peer живым
    let pc_weak = Arc::downgrade(&pc);

    pc.on_ice_candidate(Box::new({
        let session = session.clone();
        let pc_weak = pc_weak.clone();
        move |cand: Option<RTCIceCandidate>| {
            let session = session.clone();
            let pc_weak = pc_weak.clone();
            Box::pin(async move {
                match cand {
                    Some(c) => {
                        dump_candidate("LOCAL", &c);
                        if let Ok(init) = c.to_json() {
                            let count = session.push_candidate(init.candidate);
                            tracing::debug!("Added ICE candidate, total count: {}", count);
                        }
                    }
                    // cand == None означает конец сбора
                    None => store_local_description(&pc_weak, &session).await,
                }
            })
        }
    }));

    pc.on_peer_connection_state_change(Box::new({
        let session = session.clone();
        move |st: RTCPeerConnectionState| {
            on_state_change(st, &session, &pc_weak);
            Box::pin(async {})
        }
    }));

    Ok(pc)
}

async fn store_local_description(pc: &Weak<RTCPeerConnection>, session: &Session) {
    tracing::info!("ICE candidate gathering completed (null candidate received)");
    let Some(pc) = pc.upgrade() else {
        return;
    };
    match pc.local_description().await {
        Some(desc) => {
            tracing::debug!("Local description:\n{}", desc.sdp);
            if !session.set_local_description(desc) {
                tracing::debug!("Local description already stored, keeping the first one");
            }
        }
        None => tracing::warn!("Gathering finished but there is no local description"),
    }
}

fn on_state_change(st: RTCPeerConnectionState, session: &Arc<Session>, pc: &Weak<RTCPeerConnection>) {
    tracing::info!("Peer connection state changed to: {:?}", st);

    match st {
        RTCPeerConnectionState::Connected => {
            // отменяем отложенную проверку, если она ещё ждёт
            if session.cancel_grace() {
                tracing::debug!("Aborted pending disconnect task");
                emit_connection_recovered(session);
            }
            session.mark_connected();
            emit_connected(session);

            if let Some(pc) = pc.upgrade() {
                tokio::spawn(async move { dump_selected_pair(&pc, "CONNECTED").await });
            }
        }

        RTCPeerConnectionState::Disconnected => {
            let mut pending = lock(&session.disconnect_task);
            // уже ожидаем? – ничего не делаем
            if pending.as_ref().is_some_and(|h| !h.is_finished()) {
                return;
            }
            emit_connection_problem(session);

            let Some(pc) = pc.upgrade() else {
                return;
            };
            let session = session.clone();
            *pending = Some(tokio::spawn(async move {
                dump_selected_pair(&pc, "BEFORE-FAIL").await;
                tracing::info!("Grace period started, waiting {} s", GRACE_PERIOD.as_secs());
                sleep(GRACE_PERIOD).await;

                let state_now = pc.connection_state();
                tracing::info!("Grace over ➜ state={:?}", state_now);
                if state_now != RTCPeerConnectionState::Connected {
                    emit_connection_failed(&session);
                    session.end();
                }
                lock(&session.disconnect_task).take();
            }));
        }

        RTCPeerConnectionState::Failed => {
            session.cancel_grace();
            emit_connection_failed(session);
            session.end();
        }

        RTCPeerConnectionState::Closed => {
            session.cancel_grace();
            emit_disconnected(session);
            session.end();
        }

        _ => {}
    }
}

/// Adds the receive-only audio transceiver, creates the offer and sets it
/// as the local description. Gathering starts here.
pub async fn create_local_offer(pc: &RTCPeerConnection) -> Result<()> {
    pc.add_transceiver_from_kind(
        RTPCodecType::Audio,
        Some(RTCRtpTransceiverInit {
            direction: RTCRtpTransceiverDirection::Recvonly,
            send_encodings: vec![],
        }),
    )
    .await?;

    let offer = match pc.create_offer(None).await {
        Ok(offer) => offer,
        Err(e) => {
            tracing::error!("Failed to create offer: {}", e);
            return Err(e.into());
        }
    };
    if let Err(e) = pc.set_local_description(offer).await {
        tracing::error!("Failed to set local description: {}", e);
        return Err(e.into());
    }
    Ok(())
}

pub async fn apply_remote_description(
    pc: &RTCPeerConnection,
    session: &Session,
    answer: RTCSessionDescription,
) -> Result<()> {
    tracing::debug!("Applying remote description ({:?})", answer.sdp_type);
    pc.set_remote_description(answer.clone())
        .await
        .map_err(ListenerError::RemoteDescription)?;
    session.set_remote_description(answer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn offer_has_receive_only_audio() {
        let session = Session::new();
        let pc = new_peer(Some(&[]), session.clone()).await.unwrap();
        create_local_offer(&pc).await.unwrap();

        let desc = tokio::time::timeout(Duration::from_secs(20), session.wait_local_description())
            .await
            .expect("gathering did not complete");
        assert!(desc.sdp.contains("m=audio"));
        assert!(desc.sdp.contains("a=recvonly"));
        assert!(desc.sdp.to_lowercase().contains("opus"));

        pc.close().await.unwrap();
    }

    #[tokio::test]
    async fn garbage_answer_is_rejected() {
        let session = Session::new();
        let pc = new_peer(Some(&[]), session.clone()).await.unwrap();
        create_local_offer(&pc).await.unwrap();

        let mut answer = RTCSessionDescription::default();
        answer.sdp_type = webrtc::peer_connection::sdp::sdp_type::RTCSdpType::Answer;
        answer.sdp = "definitely not sdp".into();

        let err = apply_remote_description(&pc, &session, answer)
            .await
            .unwrap_err();
        assert!(matches!(err, ListenerError::RemoteDescription(_)));
        assert!(session.remote_description().is_none());

        pc.close().await.unwrap();
    }
}
