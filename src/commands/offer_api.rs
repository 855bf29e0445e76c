use crate::commands::util_api::disconnect;
use crate::config::ListenerConfig;
use crate::error::Result;
use crate::peer::ice::wait_for_gathering;
use crate::peer::{create_local_offer, new_peer, ConnectRequest};
use crate::session::Session;
use std::sync::Arc;

/// Gathers an offer and returns the `{"sdp": ...}` body the connect
/// endpoint expects, without sending it.
pub async fn offer(config: &ListenerConfig, session: Arc<Session>) -> Result<String> {
    let pc = new_peer(config.ice_servers.as_deref(), session.clone()).await?;
    create_local_offer(&pc).await?;

    let gathered = wait_for_gathering(&session, config.gather_timeout).await;
    disconnect(&pc, &session).await;

    let body = ConnectRequest {
        sdp: gathered?.sdp,
    };
    Ok(serde_json::to_string_pretty(&body)?)
}
