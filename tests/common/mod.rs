//! Mock signaling server for integration tests.
//!
//! Serves `POST /channel/:id/connect`, records every request and answers
//! either with a fixed body or with the answer of a real webrtc peer.

#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use netradio_listener_lib::peer::connection::build_api;
use netradio_listener_lib::peer::ConnectRequest;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

#[derive(Debug, Clone)]
pub struct Hit {
    pub channel: u32,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Clone)]
pub enum Reply {
    /// Fixed status and body
    Fixed(StatusCode, &'static str),
    /// Answer from a broadcaster peer with one Opus track
    Answer,
}

#[derive(Clone)]
struct Mock {
    reply: Reply,
    hits: Arc<Mutex<Vec<Hit>>>,
    // держим answering peers живыми до конца теста
    peers: Arc<Mutex<Vec<Arc<RTCPeerConnection>>>>,
    tracks: Arc<Mutex<Vec<Arc<TrackLocalStaticSample>>>>,
}

pub struct MockSignaling {
    pub addr: SocketAddr,
    hits: Arc<Mutex<Vec<Hit>>>,
    peers: Arc<Mutex<Vec<Arc<RTCPeerConnection>>>>,
    tracks: Arc<Mutex<Vec<Arc<TrackLocalStaticSample>>>>,
}

impl MockSignaling {
    pub async fn start(reply: Reply) -> Self {
        let mock = Mock {
            reply,
            hits: Arc::default(),
            peers: Arc::default(),
            tracks: Arc::default(),
        };
        let hits = mock.hits.clone();
        let peers = mock.peers.clone();
        let tracks = mock.tracks.clone();

        let app = Router::new()
            .route("/channel/:id/connect", post(connect))
            .with_state(mock);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            hits,
            peers,
            tracks,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    /// Opus track of the last answering peer.
    pub fn track(&self) -> Option<Arc<TrackLocalStaticSample>> {
        self.tracks.lock().unwrap().last().cloned()
    }

    pub async fn close(self) {
        let peers: Vec<_> = self.peers.lock().unwrap().drain(..).collect();
        for pc in peers {
            let _ = pc.close().await;
        }
    }
}

async fn connect(
    State(mock): State<Mock>,
    Path(channel): Path<u32>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    mock.hits.lock().unwrap().push(Hit {
        channel,
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.clone(),
    });

    match mock.reply {
        Reply::Fixed(status, text) => (status, text.to_string()),
        Reply::Answer => {
            let request: ConnectRequest = match serde_json::from_str(&body) {
                Ok(r) => r,
                Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()),
            };
            let (pc, track, answer) = answer_offer(request.sdp).await;
            mock.peers.lock().unwrap().push(pc);
            mock.tracks.lock().unwrap().push(track);
            (StatusCode::OK, serde_json::to_string(&answer).unwrap())
        }
    }
}

/// Broadcaster side: one Opus track, answer after full gathering.
pub async fn answer_offer(
    offer_sdp: String,
) -> (
    Arc<RTCPeerConnection>,
    Arc<TrackLocalStaticSample>,
    RTCSessionDescription,
) {
    let api = build_api().unwrap();
    let pc = Arc::new(
        api.new_peer_connection(RTCConfiguration::default())
            .await
            .unwrap(),
    );

    let track = Arc::new(TrackLocalStaticSample::new(
        RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            ..Default::default()
        },
        "audio".to_owned(),
        "netradio".to_owned(),
    ));
    pc.add_track(track.clone() as Arc<dyn TrackLocal + Send + Sync>)
        .await
        .unwrap();

    pc.set_remote_description(RTCSessionDescription::offer(offer_sdp).unwrap())
        .await
        .unwrap();
    let answer = pc.create_answer(None).await.unwrap();
    let mut gathered = pc.gathering_complete_promise().await;
    pc.set_local_description(answer).await.unwrap();
    let _ = gathered.recv().await;

    let local = pc.local_description().await.unwrap();
    (pc, track, local)
}
