// Конфигурация приложения
// В режиме отладки логирование подробнее, чем в релизе

use crate::error::{ListenerError, Result};
use crate::peer::types::ServerConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: &str = "debug"; // В режиме отладки подробный лог

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: &str = "info"; // В продакшене только важное

/// Адрес сигнального сервера по умолчанию
pub const DEFAULT_SIGNALING_URL: &str = "http://5.159.101.107:8080";

/// Канал по умолчанию
pub const DEFAULT_CHANNEL: u32 = 2;

/// Размер пула ICE кандидатов
pub const ICE_CANDIDATE_POOL_SIZE: u8 = 10;

/// STUN серверы, если пользователь не задал свои
pub const DEFAULT_STUN_SERVERS: [&str; 2] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
];

/// Сколько ждём окончания сбора кандидатов
pub const DEFAULT_GATHER_TIMEOUT: Duration = Duration::from_secs(30);

/// Период ожидания перед тем, как признать соединение потерянным
pub const GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Сколько ждём, пока sink допишет файл после закрытия соединения
pub const SINK_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Opus в WebRTC всегда 48 кГц
pub const OPUS_SAMPLE_RATE: u32 = 48_000;

/// Runtime configuration assembled from the command line.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub signaling_url: String,
    pub channel: u32,
    /// `None` means "use the default STUN servers".
    pub ice_servers: Option<Vec<ServerConfig>>,
    pub gather_timeout: Duration,
    pub output: Option<PathBuf>,
    pub duration: Option<Duration>,
    pub muted: bool,
    pub auto_start: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_string(),
            channel: DEFAULT_CHANNEL,
            ice_servers: None,
            gather_timeout: DEFAULT_GATHER_TIMEOUT,
            output: None,
            duration: None,
            muted: false,
            auto_start: false,
        }
    }
}

impl ListenerConfig {
    /// Adds servers to the configured list, switching off the STUN defaults.
    pub fn push_ice_servers(&mut self, servers: impl IntoIterator<Item = ServerConfig>) {
        self.ice_servers
            .get_or_insert_with(Vec::new)
            .extend(servers);
    }
}

/// Читает список ICE серверов из JSON файла (тот же формат, что и `ServerConfig`)
pub fn load_ice_servers(path: &Path) -> Result<Vec<ServerConfig>> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| ListenerError::Config {
        path: path.to_path_buf(),
        source: e,
    })
}
