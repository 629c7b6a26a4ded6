//! Client configuration: base URL and per-call-class timeout budgets.

use std::env;
use std::time::Duration;

use tracing::{info, warn};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

const BASE_URL_VAR: &str = "DETECT_API_BASE_URL";
const TIMEOUT_VAR: &str = "DETECT_API_TIMEOUT_SECS";

/// Groups endpoints that share a timeout budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallClass {
    /// Login, logout and user/menu lookups.
    Interactive,
    /// Task submission.
    Submit,
    /// Task list, task detail, single-round listings.
    Lookup,
    /// Reports and full round listings.
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutBudget {
    pub interactive: Duration,
    pub submit: Duration,
    pub lookup: Duration,
    pub report: Duration,
}

impl TimeoutBudget {
    /// Every class gets the same budget.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            interactive: timeout,
            submit: timeout,
            lookup: timeout,
            report: timeout,
        }
    }

    pub fn for_class(&self, class: CallClass) -> Duration {
        match class {
            CallClass::Interactive => self.interactive,
            CallClass::Submit => self.submit,
            CallClass::Lookup => self.lookup,
            CallClass::Report => self.report,
        }
    }
}

impl Default for TimeoutBudget {
    fn default() -> Self {
        Self {
            interactive: Duration::from_secs(10),
            submit: Duration::from_secs(30),
            lookup: Duration::from_secs(10),
            report: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeouts: TimeoutBudget,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts: TimeoutBudget::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutBudget) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Read `DETECT_API_BASE_URL` and `DETECT_API_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(BASE_URL_VAR).unwrap_or_else(|| {
            info!("{BASE_URL_VAR} not set, using default: {DEFAULT_BASE_URL}");
            DEFAULT_BASE_URL.to_string()
        });
        let mut config = Self::new(&base_url);

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => {
                    config.timeouts = TimeoutBudget::uniform(Duration::from_secs(secs));
                }
                Ok(_) => warn!("{TIMEOUT_VAR} must be positive, keeping default budgets"),
                Err(e) => warn!("Invalid {TIMEOUT_VAR} value {raw:?}: {e}"),
            }
        }
        config
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_lookup(vars(&[]));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeouts, TimeoutBudget::default());
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let config = ClientConfig::from_lookup(vars(&[(BASE_URL_VAR, "http://api.local/")]));
        assert_eq!(config.base_url, "http://api.local");
    }

    #[test]
    fn timeout_override_applies_to_every_class() {
        let config = ClientConfig::from_lookup(vars(&[(TIMEOUT_VAR, "3")]));
        for class in [CallClass::Interactive, CallClass::Submit, CallClass::Lookup, CallClass::Report] {
            assert_eq!(config.timeouts.for_class(class), Duration::from_secs(3));
        }
    }

    #[test]
    fn invalid_timeout_keeps_defaults() {
        let config = ClientConfig::from_lookup(vars(&[(TIMEOUT_VAR, "soon")]));
        assert_eq!(config.timeouts, TimeoutBudget::default());
        let config = ClientConfig::from_lookup(vars(&[(TIMEOUT_VAR, "0")]));
        assert_eq!(config.timeouts, TimeoutBudget::default());
    }
}
