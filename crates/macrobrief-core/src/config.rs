//! Runtime configuration.
//!
//! Secrets come from the environment. Each name is looked up with the
//! `MACROBRIEF_` prefix first, then bare:
//!
//! | Secret | Primary Env Var | Fallback Env Var |
//! |--------|-----------------|------------------|
//! | FRED key | `MACROBRIEF_FRED_API_KEY` | `FRED_API_KEY` |
//! | Telegram bot token | `MACROBRIEF_TELEGRAM_TOKEN` | `TELEGRAM_TOKEN` |
//! | Telegram chat | `MACROBRIEF_CHAT_ID` | `CHAT_ID` |
//!
//! Blank values count as missing.

use std::env;
use std::fmt::{Debug, Formatter};

use crate::data_source::Lookback;
use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::report::{MarkupMode, DEFAULT_MAX_MESSAGE_LEN};
use crate::ConfigError;

pub const ENV_PREFIX: &str = "MACROBRIEF_";

/// String that never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Secret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secrets {
    pub fred_api_key: Secret,
    pub telegram_token: Secret,
    pub chat_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub lookback: Lookback,
    pub timeout_ms: u64,
    pub markup: MarkupMode,
    pub max_message_len: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            lookback: Lookback::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            markup: MarkupMode::default(),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

impl RunSettings {
    pub fn with_lookback_days(mut self, days: u32) -> Result<Self, ConfigError> {
        self.lookback = Lookback::days(days).map_err(|e| ConfigError::InvalidSetting {
            name: "lookback_days",
            reason: e.message().to_owned(),
        })?;
        Ok(self)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "timeout_ms",
                reason: String::from("must be greater than zero"),
            });
        }
        self.timeout_ms = timeout_ms;
        Ok(self)
    }

    pub fn with_markup(mut self, markup: MarkupMode) -> Self {
        self.markup = markup;
        self
    }

    pub fn with_max_message_len(mut self, max_message_len: usize) -> Result<Self, ConfigError> {
        if max_message_len == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "max_message_len",
                reason: String::from("must be greater than zero"),
            });
        }
        self.max_message_len = max_message_len;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub secrets: Secrets,
    pub settings: RunSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolves secrets through `lookup`; fails on the first missing one.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets = Secrets {
            fred_api_key: Secret::new(required(&lookup, "FRED_API_KEY")?),
            telegram_token: Secret::new(required(&lookup, "TELEGRAM_TOKEN")?),
            chat_id: required(&lookup, "CHAT_ID")?,
        };

        Ok(Self {
            secrets,
            settings: RunSettings::default(),
        })
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let prefixed = format!("{ENV_PREFIX}{name}");
    lookup(&prefixed)
        .filter(|value| !value.trim().is_empty())
        .or_else(|| lookup(name).filter(|value| !value.trim().is_empty()))
        .map(|value| value.trim().to_owned())
        .ok_or_else(|| ConfigError::MissingSecret {
            name,
            checked: format!("{prefixed}, {name}"),
        })
}
