use crate::config::DEFAULT_LOG_LEVEL;
use crate::session::Session;
use std::io::Write;
use tracing_subscriber::{fmt::time::ChronoLocal, EnvFilter};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::peer_connection::RTCPeerConnection;

/// Логирование с временными метками; `RUST_LOG` перекрывает уровень по умолчанию
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    // try_init: в тестах подписчик может быть уже установлен
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Печать ICE-candidate при появлении (Trickle-ICE)
pub fn dump_candidate(label: &str, cand: &RTCIceCandidate) {
    if let Ok(init) = cand.to_json() {
        tracing::debug!(
            "Trickle {label}: candidate={} sdp_mid={:?} sdp_mline_index={:?} username_fragment={:?}",
            init.candidate,
            init.sdp_mid,
            init.sdp_mline_index,
            init.username_fragment
        );
    }
}

/// Быстрый снимок getStats → выбранная пара
pub async fn dump_selected_pair(pc: &RTCPeerConnection, moment: &str) {
    let stats = pc.get_stats().await;
    for (_, v) in stats.reports {
        if let webrtc::stats::StatsReportType::CandidatePair(pair) = v {
            if pair.nominated {
                tracing::info!(
                    "STATS {moment}: {}:{}  type: {:?}  bytes={}/{} state={:?}",
                    pair.local_candidate_id,
                    pair.remote_candidate_id,
                    pair.stats_type,
                    pair.bytes_sent,
                    pair.bytes_received,
                    pair.state
                );
            }
        }
    }
}

// Состояние соединения видно пользователю в stdout
fn emit_state(session: &Session, evt: &str) {
    tracing::debug!(session = session.id(), "emit_state: {}", evt);
    println!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), evt);
}

pub fn emit_connected(session: &Session) {
    emit_state(session, "connected");
}

pub fn emit_disconnected(session: &Session) {
    emit_state(session, "disconnected");
}

pub fn emit_connection_problem(session: &Session) {
    emit_state(session, "connection problem");
}

pub fn emit_connection_recovered(session: &Session) {
    emit_state(session, "connection recovered");
}

pub fn emit_connection_failed(session: &Session) {
    emit_state(session, "connection failed");
}

pub fn emit_track(session: &Session, codec: &str) {
    emit_state(session, &format!("playing {codec}"));
}

/// Visible, framed error message for the operator (stderr in the CLI).
pub fn alert_to<W: Write>(w: &mut W, msg: &str) {
    tracing::error!("{}", msg);
    if let Err(e) = write_frame(w, msg) {
        tracing::warn!("Cannot show alert: {}", e);
    }
}

fn write_frame<W: Write>(w: &mut W, msg: &str) -> std::io::Result<()> {
    let width = msg.lines().map(|l| l.chars().count()).max().unwrap_or(0).max(5) + 4;
    let bar = "!".repeat(width);
    writeln!(w, "{bar}")?;
    writeln!(w, "! {:<inner$} !", "ALERT", inner = width - 4)?;
    for line in msg.lines() {
        writeln!(w, "! {:<inner$} !", line, inner = width - 4)?;
    }
    writeln!(w, "{bar}")?;
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_is_framed() {
        let mut out: Vec<u8> = Vec::new();
        alert_to(&mut out, "malformed answer");
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("ALERT"));
        assert!(lines[2].contains("malformed answer"));
        assert!(lines.iter().all(|l| l.len() == lines[0].len()));
    }

    #[test]
    fn multiline_alert_keeps_every_line() {
        let mut out: Vec<u8> = Vec::new();
        alert_to(&mut out, "first\nsecond line");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("! first"));
        assert!(text.contains("! second line"));
    }
}
