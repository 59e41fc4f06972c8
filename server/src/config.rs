use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

use crate::push::EXPO_PUSH_URL;

pub struct Config {
    pub port: u16,
    /// When set, the member directory lives in Redis instead of process memory.
    pub redis_url: Option<String>,
    pub push_url: String,
    pub burst_spacing_ms: u64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("MEALPING_PORT", "8000"),
            redis_url: var("MEALPING_REDIS_URL").ok(),
            push_url: try_load("MEALPING_PUSH_URL", EXPO_PUSH_URL),
            burst_spacing_ms: try_load("MEALPING_BURST_SPACING_MS", "2000"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
