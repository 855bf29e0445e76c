use crate::commands::util_api::disconnect;
use crate::config::ListenerConfig;
use crate::error::{ListenerError, Result};
use crate::logger::alert_to;
use crate::peer::ice::wait_for_gathering;
use crate::peer::{
    apply_remote_description, attach_audio, create_local_offer, new_peer, AudioSink,
    CountingSink, OggSink, Playback, PlaybackSummary,
};
use crate::session::Session;
use crate::signaling::SignalingClient;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use webrtc::peer_connection::RTCPeerConnection;

/// What starts the session once the offer is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Сразу после сбора кандидатов
    Immediate,
    /// Оператор жмёт Enter
    Enter,
}

/// Full listening run: offer, gather, trigger, connect, play until stopped.
pub async fn listen(
    config: &ListenerConfig,
    session: Arc<Session>,
    trigger: Trigger,
) -> Result<PlaybackSummary> {
    tracing::info!(
        session = session.id(),
        "Listening to channel {} via {}",
        config.channel,
        config.signaling_url
    );

    // файл открываем до peer: при ошибке закрывать нечего
    let playback = open_playback(config)?;
    let pc = new_peer(config.ice_servers.as_deref(), session.clone()).await?;
    if let Err(e) = create_local_offer(&pc).await {
        disconnect(&pc, &session).await;
        return Err(e);
    }
    attach_audio(&pc, session.clone(), playback);

    if let Err(e) = wait_for_gathering(&session, config.gather_timeout).await {
        disconnect(&pc, &session).await;
        return Err(e);
    }

    wait_for_trigger(trigger).await?;

    let client = SignalingClient::new(&config.signaling_url);
    let started = start_session(
        &pc,
        &session,
        &client,
        config.channel,
        &mut std::io::stderr(),
    )
    .await;
    if let Err(e) = started {
        if trigger == Trigger::Enter {
            // alert блокирует до подтверждения
            prompt("Press Enter to close").await?;
        }
        disconnect(&pc, &session).await;
        return Err(e);
    }

    wait_until_done(config, &session).await;
    disconnect(&pc, &session).await;

    let summary = session.playback();
    if !summary.connected {
        tracing::warn!("Connection was never established");
    }
    tracing::info!(
        "Session over: {} packets, {} bytes received",
        summary.packets,
        summary.bytes
    );
    Ok(summary)
}

/// The trigger: posts the gathered local description and applies the answer.
/// Every failure here is shown to the operator as an alert written to `alerts`.
pub async fn start_session<W: Write>(
    pc: &RTCPeerConnection,
    session: &Session,
    client: &SignalingClient,
    channel: u32,
    alerts: &mut W,
) -> Result<()> {
    let result: Result<()> = async {
        let local = session
            .local_description()
            .ok_or(ListenerError::NoLocalDescription)?;
        tracing::debug!("Local description for channel {}:\n{}", channel, local.sdp);

        let answer = client.connect(channel, &local).await?;
        apply_remote_description(pc, session, answer).await
    }
    .await;

    if let Err(e) = &result {
        alert_to(alerts, &format!("Cannot start session on channel {channel}:\n{e}"));
    }
    result
}

fn open_playback(config: &ListenerConfig) -> Result<Playback> {
    let sink: Box<dyn AudioSink> = match &config.output {
        Some(path) => Box::new(OggSink::create(path, 2)?),
        None => Box::new(CountingSink::default()),
    };
    Ok(Playback::new(sink, config.muted))
}

async fn wait_for_trigger(trigger: Trigger) -> Result<()> {
    match trigger {
        Trigger::Immediate => Ok(()),
        Trigger::Enter => prompt("Offer ready. Press Enter to start the session").await,
    }
}

async fn prompt(text: &str) -> Result<()> {
    eprintln!("{text}");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(())
}

// Ctrl-C, истекшая длительность или потеря соединения
async fn wait_until_done(config: &ListenerConfig, session: &Session) {
    let duration = async {
        match config.duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
        _ = duration => tracing::info!("Listening time is over"),
        _ = session.wait_ended() => tracing::info!("Connection ended"),
    }
}
