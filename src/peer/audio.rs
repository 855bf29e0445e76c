use crate::config::OPUS_SAMPLE_RATE;
use crate::error::{ListenerError, Result};
use crate::logger::emit_track;
use crate::session::Session;
use crate::utils::lock;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use webrtc::media::io::ogg_writer::OggWriter;
use webrtc::media::io::Writer;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp::packet::Packet;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// Where inbound audio ends up.
pub trait AudioSink: Send {
    fn name(&self) -> &str;

    fn write(&mut self, packet: &Packet) -> Result<()>;

    /// Called once when the track ends.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Только считает пакеты, звук никуда не идёт
#[derive(Debug, Default)]
pub struct CountingSink {
    pub packets: u64,
}

impl AudioSink for CountingSink {
    fn name(&self) -> &str {
        "counter"
    }

    fn write(&mut self, _packet: &Packet) -> Result<()> {
        self.packets += 1;
        Ok(())
    }
}

/// Пишет Opus из RTP в Ogg-файл
pub struct OggSink {
    writer: OggWriter<File>,
    closed: bool,
}

impl OggSink {
    pub fn create(path: &Path, channels: u8) -> Result<Self> {
        let file = File::create(path)?;
        let writer = OggWriter::new(file, OPUS_SAMPLE_RATE, channels)
            .map_err(|e| ListenerError::Sink(e.to_string()))?;
        tracing::info!("Writing audio to {}", path.display());
        Ok(Self {
            writer,
            closed: false,
        })
    }
}

impl AudioSink for OggSink {
    fn name(&self) -> &str {
        "ogg"
    }

    fn write(&mut self, packet: &Packet) -> Result<()> {
        self.writer
            .write_rtp(packet)
            .map_err(|e| ListenerError::Sink(e.to_string()))
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.writer
                .close()
                .map_err(|e| ListenerError::Sink(e.to_string()))?;
        }
        Ok(())
    }
}

/// A muted sink still drains the track, but nothing reaches the output.
pub struct Playback {
    sink: Box<dyn AudioSink>,
    muted: bool,
}

impl Playback {
    pub fn new(sink: Box<dyn AudioSink>, muted: bool) -> Self {
        Self { sink, muted }
    }
}

/// Registers the track observer: the first inbound audio track is attached
/// to `playback` and drained by a spawned task until the track ends.
pub fn attach_audio(pc: &RTCPeerConnection, session: Arc<Session>, playback: Playback) {
    let playback = Arc::new(Mutex::new(Some(playback)));

    pc.on_track(Box::new(
        move |track: Arc<TrackRemote>,
              _receiver: Arc<RTCRtpReceiver>,
              _transceiver: Arc<RTCRtpTransceiver>| {
            if track.kind() != RTPCodecType::Audio {
                tracing::warn!("Ignoring {:?} track", track.kind());
                return Box::pin(async {});
            }

            let Some(playback) = lock(&playback).take() else {
                tracing::warn!("Audio already attached, ignoring extra track {}", track.id());
                return Box::pin(async {});
            };

            let codec = track.codec().capability.mime_type;
            tracing::info!(
                "Track received: id={} stream={} codec={}",
                track.id(),
                track.stream_id(),
                codec
            );
            emit_track(&session, &codec);

            let session = session.clone();
            let handle = tokio::spawn(play_track(track, playback, session.clone()));
            lock(&session.track_tasks).push(handle);
            Box::pin(async {})
        },
    ));
}

async fn play_track(track: Arc<TrackRemote>, mut playback: Playback, session: Arc<Session>) {
    tracing::debug!("Playback via {} sink (muted={})", playback.sink.name(), playback.muted);

    loop {
        match track.read_rtp().await {
            Ok((packet, _)) => {
                session.record_packet(packet.payload.len());
                if playback.muted {
                    continue;
                }
                if let Err(e) = playback.sink.write(&packet) {
                    tracing::warn!("Sink write failed: {}", e);
                }
            }
            Err(e) => {
                tracing::debug!("Track {} ended: {}", track.id(), e);
                break;
            }
        }
    }

    if let Err(e) = playback.sink.close() {
        tracing::warn!("Sink close failed: {}", e);
    }
}
