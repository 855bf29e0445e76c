use crate::config::SINK_FLUSH_TIMEOUT;
use crate::session::Session;
use crate::utils::lock;
use tokio::time::timeout;
use webrtc::peer_connection::RTCPeerConnection;

/// ручное разъединение: закрываем peer и ждём, пока sink допишет данные
pub async fn disconnect(pc: &RTCPeerConnection, session: &Session) {
    // отменяем отложенную проверку, если она была
    if session.cancel_grace() {
        tracing::debug!("Aborted pending disconnect task in manual disconnect");
    }

    if let Err(e) = pc.close().await {
        tracing::warn!("Failed to close peer connection: {}", e);
    }
    session.end();

    // после close чтение трека завершается и sink закрывается
    let tasks: Vec<_> = lock(&session.track_tasks).drain(..).collect();
    for task in tasks {
        match timeout(SINK_FLUSH_TIMEOUT, task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Track task failed: {}", e),
            Err(_) => tracing::warn!("Track task did not finish in {:?}", SINK_FLUSH_TIMEOUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::new_peer;

    #[tokio::test]
    async fn disconnect_ends_session() {
        let session = Session::new();
        let pc = new_peer(Some(&[]), session.clone()).await.unwrap();
        let pending = tokio::spawn(tokio::time::sleep(std::time::Duration::from_secs(60)));
        *lock(&session.disconnect_task) = Some(pending);

        disconnect(&pc, &session).await;
        assert!(session.is_ended());
        assert!(!session.cancel_grace());
    }
}
