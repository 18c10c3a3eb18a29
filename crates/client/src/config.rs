use std::time::Duration;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Default interval between processing-status polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default pause between reaching `completed` and handing off to the
/// results view.
pub const DEFAULT_HANDOFF_DELAY_MS: u64 = 2000;

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Sign-in credentials read from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, without a trailing slash.
    pub api_url: String,
    pub poll_interval: Duration,
    pub handoff_delay: Duration,
    pub request_timeout: Duration,
    /// Pre-issued bearer token, used instead of signing in.
    pub token: Option<String>,
    pub credentials: Option<Credentials>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            handoff_delay: Duration::from_millis(DEFAULT_HANDOFF_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            token: None,
            credentials: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `SCRIBE_API_URL`              | `http://localhost:5000` |
    /// | `SCRIBE_POLL_INTERVAL_MS`     | `2000`                  |
    /// | `SCRIBE_HANDOFF_DELAY_MS`     | `2000`                  |
    /// | `SCRIBE_REQUEST_TIMEOUT_SECS` | `30`                    |
    /// | `SCRIBE_TOKEN`                | --                      |
    /// | `SCRIBE_EMAIL`                | --                      |
    /// | `SCRIBE_PASSWORD`             | --                      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_url = non_empty("SCRIBE_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let poll_interval_ms =
            parse_u64(&non_empty, "SCRIBE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "SCRIBE_POLL_INTERVAL_MS",
                value: "0".into(),
                reason: "must be greater than zero",
            });
        }
        let handoff_delay_ms =
            parse_u64(&non_empty, "SCRIBE_HANDOFF_DELAY_MS", DEFAULT_HANDOFF_DELAY_MS)?;
        let request_timeout_secs = parse_u64(
            &non_empty,
            "SCRIBE_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let credentials = match (non_empty("SCRIBE_EMAIL"), lookup("SCRIBE_PASSWORD")) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            _ => None,
        };

        Ok(Self {
            api_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            handoff_delay: Duration::from_millis(handoff_delay_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
            token: non_empty("SCRIBE_TOKEN"),
            credentials,
        })
    }
}

fn parse_u64<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be a non-negative integer",
        }),
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}
