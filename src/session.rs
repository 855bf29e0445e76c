use crate::peer::types::PlaybackSummary;
use crate::utils::{lock, random_id};
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// State of one listening session.
///
/// The local description is written once, from the null-candidate callback,
/// and read when the session is started.
pub struct Session {
    id: String,
    local_description: Mutex<Option<RTCSessionDescription>>,
    remote_description: Mutex<Option<RTCSessionDescription>>,
    local_candidates: Mutex<Vec<String>>,
    gathered: Notify,

    was_connected: AtomicBool,
    ended: AtomicBool,
    ended_notify: Notify,

    /// Отложенная проверка после Disconnected
    pub(crate) disconnect_task: Mutex<Option<JoinHandle<()>>>,
    /// Задачи, читающие входящие треки
    pub(crate) track_tasks: Mutex<Vec<JoinHandle<()>>>,

    packets: AtomicU64,
    bytes: AtomicU64,
}

// Один процесс - одна сессия
pub static SESSION: Lazy<Arc<Session>> = Lazy::new(Session::new);

impl Session {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: random_id(),
            local_description: Mutex::new(None),
            remote_description: Mutex::new(None),
            local_candidates: Mutex::new(Vec::new()),
            gathered: Notify::new(),
            was_connected: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            ended_notify: Notify::new(),
            disconnect_task: Mutex::new(None),
            track_tasks: Mutex::new(Vec::new()),
            packets: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stores the gathered local description. Returns `false` if one was
    /// already stored; the first value wins.
    pub fn set_local_description(&self, desc: RTCSessionDescription) -> bool {
        {
            let mut slot = lock(&self.local_description);
            if slot.is_some() {
                return false;
            }
            *slot = Some(desc);
        }
        self.gathered.notify_waiters();
        true
    }

    pub fn local_description(&self) -> Option<RTCSessionDescription> {
        lock(&self.local_description).clone()
    }

    /// Resolves once gathering is over and the local description is known.
    pub async fn wait_local_description(&self) -> RTCSessionDescription {
        loop {
            // подписываемся до проверки, чтобы не пропустить notify
            let notified = self.gathered.notified();
            if let Some(desc) = self.local_description() {
                return desc;
            }
            notified.await;
        }
    }

    pub fn set_remote_description(&self, desc: RTCSessionDescription) {
        *lock(&self.remote_description) = Some(desc);
    }

    pub fn remote_description(&self) -> Option<RTCSessionDescription> {
        lock(&self.remote_description).clone()
    }

    pub fn push_candidate(&self, candidate: String) -> usize {
        let mut candidates = lock(&self.local_candidates);
        candidates.push(candidate);
        candidates.len()
    }

    pub fn local_candidates(&self) -> Vec<String> {
        lock(&self.local_candidates).clone()
    }

    pub fn mark_connected(&self) {
        self.was_connected.store(true, Ordering::SeqCst);
    }

    /// Reached `Connected` at least once during the session.
    pub fn was_connected(&self) -> bool {
        self.was_connected.load(Ordering::SeqCst)
    }

    /// Aborts the pending grace-period task. Returns `true` only if the task
    /// was still waiting; a finished task is just cleared.
    pub fn cancel_grace(&self) -> bool {
        match lock(&self.disconnect_task).take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Marks the session as over (connection failed or closed).
    pub fn end(&self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            self.ended_notify.notify_waiters();
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    pub async fn wait_ended(&self) {
        loop {
            let notified = self.ended_notify.notified();
            if self.is_ended() {
                return;
            }
            notified.await;
        }
    }

    pub fn record_packet(&self, len: usize) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn playback(&self) -> PlaybackSummary {
        PlaybackSummary {
            packets: self.packets.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            connected: self.was_connected(),
        }
    }
}
