use serde::{Deserialize, Serialize};

/// Тело запроса на подключение к каналу
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub sdp: String,
}

/// Конфигурация ICE сервера
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default)]
    pub id: String,
    pub r#type: String, // 'stun' or 'turn'
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl ServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            id: "stun".into(),
            r#type: "stun".into(),
            url: url.into(),
            username: None,
            credential: None,
        }
    }

    pub fn turn(
        url: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            id: "turn".into(),
            r#type: "turn".into(),
            url: url.into(),
            username: Some(username.into()),
            credential: Some(credential.into()),
        }
    }

    pub fn is_turn(&self) -> bool {
        self.r#type == "turn" || self.url.starts_with("turn:") || self.url.starts_with("turns:")
    }
}

/// Разбивка собранных кандидатов по типам
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSummary {
    pub host: usize,
    pub srflx: usize,
    pub relay: usize,
}

impl CandidateSummary {
    pub fn total(&self) -> usize {
        self.host + self.srflx + self.relay
    }
}

/// Итог сессии прослушивания
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub packets: u64,
    pub bytes: u64,
    /// Соединение хотя бы раз было установлено
    pub connected: bool,
}
