use crate::peer::types::ServerConfig;
use rand::Rng;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

/// Захват мьютекса; паника в другом потоке не должна ронять слушателя
pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// Добавляет схему протокола к URL ICE сервера, если она отсутствует
pub fn add_ice_url_scheme(config: &ServerConfig) -> String {
    // Если url уже начинается с "turn:"/"turns:" или "stun:", возвращаем как есть
    if config.url.starts_with("turn:")
        || config.url.starts_with("turns:")
        || config.url.starts_with("stun:")
    {
        config.url.clone()
    } else {
        // В зависимости от типа сервера добавляем нужную схему
        let scheme = if config.is_turn() { "turn:" } else { "stun:" };
        format!("{}{}", scheme, config.url)
    }
}

/// `http://host:8080/` + `2` -> `http://host:8080/channel/2/connect`
pub fn connect_url(base: &str, channel: u32) -> String {
    format!("{}/channel/{}/connect", base.trim_end_matches('/'), channel)
}
