use thiserror::Error;

/// Validation and contract errors exposed by `macrobrief-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker must start with an ASCII letter or '^': '{ch}'")]
    TickerInvalidStart { ch: char },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("invalid source '{value}', expected one of fred, yahoo")]
    InvalidSource { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("invalid calendar date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("invalid unix timestamp {value}")]
    InvalidUnixTimestamp { value: i64 },

    #[error("series timestamps must be strictly increasing (index {index})")]
    UnorderedSeries { index: usize },

    #[error("scale divisor must be finite and positive")]
    InvalidScaleDivisor,
    #[error("indicator '{id}' has an empty fallback chain")]
    EmptyFallbackChain { id: String },
    #[error("invalid display mode '{value}', expected live or closed")]
    InvalidDisplayMode { value: String },
    #[error("invalid markup mode '{value}', expected plain or html")]
    InvalidMarkupMode { value: String },
    #[error("unknown report '{value}'")]
    UnknownReport { value: String },
    #[error("duplicate indicator id '{id}'")]
    DuplicateIndicator { id: String },
    #[error("report '{report}' references unknown indicator '{id}'")]
    UnknownIndicator { report: String, id: String },
}

/// Missing or malformed runtime configuration. Always fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required secret '{name}' is not set (checked {checked})")]
    MissingSecret { name: &'static str, checked: String },
    #[error("setting '{name}' is invalid: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

