use crate::error::{ListenerError, Result};
use crate::peer::types::ConnectRequest;
use crate::utils::connect_url;
use reqwest::header::CONTENT_TYPE;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// HTTP client for `POST /channel/{id}/connect`.
#[derive(Debug, Clone)]
pub struct SignalingClient {
    http: reqwest::Client,
    base_url: String,
}

impl SignalingClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn connect_url(&self, channel: u32) -> String {
        connect_url(&self.base_url, channel)
    }

    /// Sends the local description and returns the answer from the response
    /// body. One request, no retry.
    pub async fn connect(
        &self,
        channel: u32,
        local: &RTCSessionDescription,
    ) -> Result<RTCSessionDescription> {
        let url = self.connect_url(channel);
        let body = ConnectRequest {
            sdp: local.sdp.clone(),
        };

        tracing::info!("POST {} ({} bytes of SDP)", url, local.sdp.len());
        let response = self
            .http
            .post(&url)
            // json() не перезаписывает уже заданный Content-Type
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("Signaling response {}: {}", status, text);

        if !status.is_success() {
            return Err(ListenerError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        parse_answer(&text)
    }
}

/// The response body is used as the remote description as is.
pub fn parse_answer(body: &str) -> Result<RTCSessionDescription> {
    serde_json::from_str(body).map_err(ListenerError::MalformedAnswer)
}
