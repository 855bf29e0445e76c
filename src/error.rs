use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Ошибки слушателя
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("webrtc: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error("signaling request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("signaling endpoint answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed answer from signaling endpoint: {0}")]
    MalformedAnswer(#[source] serde_json::Error),

    #[error("remote description rejected: {0}")]
    RemoteDescription(#[source] webrtc::Error),

    #[error("local description is not ready yet")]
    NoLocalDescription,

    #[error("ICE gathering did not complete within {0:?}")]
    GatheringTimeout(Duration),

    #[error("invalid ICE server {url:?}: {reason}")]
    InvalidIceServer { url: String, reason: &'static str },

    #[error("cannot read ICE servers from {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audio sink: {0}")]
    Sink(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ListenerError>;
