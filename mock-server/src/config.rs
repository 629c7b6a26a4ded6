use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockUser {
    pub id: u64,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    /// How long a new task stays `processing`. Zero completes it on creation.
    pub completion_delay: Duration,
    pub users: Vec<MockUser>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            completion_delay: Duration::ZERO,
            users: vec![MockUser {
                id: 1,
                username: "admin".to_string(),
                password: "admin".to_string(),
            }],
        }
    }
}

impl ServerConfig {
    /// `PORT` and `MOCK_COMPLETION_DELAY_MS`; the delay defaults to the
    /// backend's five seconds.
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "5000"),
            completion_delay: Duration::from_millis(try_load("MOCK_COMPLETION_DELAY_MS", "5000")),
            ..Self::default()
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
            .parse()
            .map_err(|_| ())
            .expect("Environment misconfigured!")
    })
}
