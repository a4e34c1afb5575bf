//! Runtime configuration.
//!
//! Every timing and limit constant the services use lives here. Values are
//! layered: compiled defaults, then an optional JSON file, then `READOUT_*`
//! environment variables, then command-line flags (applied by the binary).

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "READOUT_";

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub const fn as_filter_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ConfigError::InvalidValue {
                field: "log_level",
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} ({value} ms) must not exceed {limit_field} ({limit} ms)")]
    Ordering {
        field: &'static str,
        value: u64,
        limit_field: &'static str,
        limit: u64,
    },
}

fn default_restricted_schemes() -> Vec<String> {
    [
        "chrome://",
        "chrome-extension://",
        "chrome-search://",
        "edge://",
        "about:",
        "moz-extension://",
        "view-source:",
        "devtools://",
        "https://chrome.google.com/webstore",
        "https://chromewebstore.google.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn parse_env<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ConfigError> {
    let value = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field,
        value: raw.to_string(),
    })?;
    tracing::debug!(field, value = %raw.trim(), "Config override from environment");
    Ok(value)
}

/// Timings and limits for every runtime service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadoutConfig {
    /// Maximum queued commands before new ones are rejected.
    pub queue_capacity: usize,
    /// Per-command handler timeout. Must cover a replacing start: two
    /// counterpart round-trips plus the restart grace.
    pub command_timeout_ms: u64,
    /// Timeout for a single counterpart message round-trip.
    pub message_timeout_ms: u64,
    /// Pause between stopping an old session and starting a new one.
    pub restart_grace_ms: u64,
    /// Sessions are stopped automatically after this long.
    pub max_session_duration_ms: u64,
    /// Longest accepted text, in characters.
    pub max_text_chars: usize,
    pub sweep_interval_ms: u64,
    pub probe_timeout_ms: u64,
    /// Wait after reinstalling a counterpart before probing again.
    pub reinject_settle_ms: u64,
    pub max_recovery_retries: u32,
    pub max_force_stop_attempts: u32,
    pub volume_debounce_ms: u64,
    pub progress_tick_ms: u64,
    /// Cap on per-origin overrides per store.
    pub override_capacity: usize,
    /// URL prefixes where the counterpart can never be installed.
    pub restricted_schemes: Vec<String>,
    pub log_level: LogLevel,
}

impl Default for ReadoutConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            command_timeout_ms: 10_000,
            message_timeout_ms: 3_000,
            restart_grace_ms: 150,
            max_session_duration_ms: 30 * 60 * 1_000,
            max_text_chars: 100_000,
            sweep_interval_ms: 10_000,
            probe_timeout_ms: 2_000,
            reinject_settle_ms: 500,
            max_recovery_retries: 3,
            max_force_stop_attempts: 3,
            volume_debounce_ms: 300,
            progress_tick_ms: 1_000,
            override_capacity: crate::preferences::DEFAULT_OVERRIDE_CAPACITY,
            restricted_schemes: default_restricted_schemes(),
            log_level: LogLevel::default(),
        }
    }
}

impl ReadoutConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `READOUT_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides using `lookup` to resolve variable names.
    ///
    /// Unknown variables are ignored; malformed values are errors.
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(raw) = get("QUEUE_CAPACITY") {
            self.queue_capacity = parse_env("queue_capacity", &raw)?;
        }
        if let Some(raw) = get("COMMAND_TIMEOUT_MS") {
            self.command_timeout_ms = parse_env("command_timeout_ms", &raw)?;
        }
        if let Some(raw) = get("MESSAGE_TIMEOUT_MS") {
            self.message_timeout_ms = parse_env("message_timeout_ms", &raw)?;
        }
        if let Some(raw) = get("RESTART_GRACE_MS") {
            self.restart_grace_ms = parse_env("restart_grace_ms", &raw)?;
        }
        if let Some(raw) = get("MAX_SESSION_DURATION_MS") {
            self.max_session_duration_ms = parse_env("max_session_duration_ms", &raw)?;
        }
        if let Some(raw) = get("MAX_TEXT_CHARS") {
            self.max_text_chars = parse_env("max_text_chars", &raw)?;
        }
        if let Some(raw) = get("SWEEP_INTERVAL_MS") {
            self.sweep_interval_ms = parse_env("sweep_interval_ms", &raw)?;
        }
        if let Some(raw) = get("PROBE_TIMEOUT_MS") {
            self.probe_timeout_ms = parse_env("probe_timeout_ms", &raw)?;
        }
        if let Some(raw) = get("REINJECT_SETTLE_MS") {
            self.reinject_settle_ms = parse_env("reinject_settle_ms", &raw)?;
        }
        if let Some(raw) = get("MAX_RECOVERY_RETRIES") {
            self.max_recovery_retries = parse_env("max_recovery_retries", &raw)?;
        }
        if let Some(raw) = get("MAX_FORCE_STOP_ATTEMPTS") {
            self.max_force_stop_attempts = parse_env("max_force_stop_attempts", &raw)?;
        }
        if let Some(raw) = get("VOLUME_DEBOUNCE_MS") {
            self.volume_debounce_ms = parse_env("volume_debounce_ms", &raw)?;
        }
        if let Some(raw) = get("PROGRESS_TICK_MS") {
            self.progress_tick_ms = parse_env("progress_tick_ms", &raw)?;
        }
        if let Some(raw) = get("OVERRIDE_CAPACITY") {
            self.override_capacity = parse_env("override_capacity", &raw)?;
        }

        if let Some(raw) = get("RESTRICTED_SCHEMES") {
            let schemes: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if schemes.is_empty() {
                tracing::warn!("READOUT_RESTRICTED_SCHEMES is empty, keeping defaults");
            } else {
                self.restricted_schemes = schemes;
            }
        }

        if let Some(raw) = get("LOG_LEVEL") {
            self.log_level = raw.parse()?;
        }

        Ok(())
    }

    /// Reject values that would make the services misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero: [(&'static str, u64); 9] = [
            ("queue_capacity", self.queue_capacity as u64),
            ("command_timeout_ms", self.command_timeout_ms),
            ("message_timeout_ms", self.message_timeout_ms),
            ("max_session_duration_ms", self.max_session_duration_ms),
            ("max_text_chars", self.max_text_chars as u64),
            ("sweep_interval_ms", self.sweep_interval_ms),
            ("probe_timeout_ms", self.probe_timeout_ms),
            ("progress_tick_ms", self.progress_tick_ms),
            ("override_capacity", self.override_capacity as u64),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if self.max_recovery_retries == 0 {
            return Err(ConfigError::Zero {
                field: "max_recovery_retries",
            });
        }
        if self.max_force_stop_attempts == 0 {
            return Err(ConfigError::Zero {
                field: "max_force_stop_attempts",
            });
        }
        let start_budget = self
            .message_timeout_ms
            .saturating_mul(2)
            .saturating_add(self.restart_grace_ms);
        if start_budget > self.command_timeout_ms {
            return Err(ConfigError::Ordering {
                field: "2 * message_timeout_ms + restart_grace_ms",
                value: start_budget,
                limit_field: "command_timeout_ms",
                limit: self.command_timeout_ms,
            });
        }
        if self.probe_timeout_ms > self.sweep_interval_ms {
            return Err(ConfigError::Ordering {
                field: "probe_timeout_ms",
                value: self.probe_timeout_ms,
                limit_field: "sweep_interval_ms",
                limit: self.sweep_interval_ms,
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    #[must_use]
    pub const fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    #[must_use]
    pub const fn restart_grace(&self) -> Duration {
        Duration::from_millis(self.restart_grace_ms)
    }

    #[must_use]
    pub const fn max_session_duration(&self) -> Duration {
        Duration::from_millis(self.max_session_duration_ms)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// A tab is stale when it has not been heard from for two sweeps.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.saturating_mul(2))
    }

    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    #[must_use]
    pub const fn reinject_settle(&self) -> Duration {
        Duration::from_millis(self.reinject_settle_ms)
    }

    #[must_use]
    pub const fn volume_debounce(&self) -> Duration {
        Duration::from_millis(self.volume_debounce_ms)
    }

    #[must_use]
    pub const fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }
}
