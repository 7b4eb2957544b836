//! Series source contract and request/error types.
//!
//! Every provider backend implements [`SeriesSource`]. The resolver never
//! branches on the backend; the only per-candidate choice is which
//! [`ValueField`] becomes the observation value.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use time::Duration;

use crate::{Candidate, ProviderId, Series, Ticker, UtcDateTime, ValueField};

/// How far back a fetch should reach, in calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookback {
    days: u32,
}

impl Lookback {
    pub const DEFAULT_DAYS: u32 = 100;

    pub fn days(days: u32) -> Result<Self, SourceError> {
        if days == 0 {
            return Err(SourceError::invalid_request(
                "lookback window must be at least one day",
            ));
        }
        Ok(Self { days })
    }

    pub const fn as_days(self) -> u32 {
        self.days
    }

    /// First date of the window relative to `now`.
    pub fn start_from(self, now: UtcDateTime) -> UtcDateTime {
        let start = now.into_inner() - Duration::days(i64::from(self.days));
        UtcDateTime::from_offset_datetime(start).unwrap_or(now)
    }
}

impl Default for Lookback {
    fn default() -> Self {
        Self {
            days: Self::DEFAULT_DAYS,
        }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Network, auth, status or empty-payload failure.
    Unavailable,
    /// Filtered series too short for the requested horizons.
    InsufficientData,
    InvalidRequest,
    AdapterNotRegistered,
    Internal,
}

/// Structured error for one candidate attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
        }
    }

    pub fn insufficient_data(available: usize, required: usize) -> Self {
        Self {
            kind: SourceErrorKind::InsufficientData,
            message: format!(
                "{available} valid observation(s) available, {required} required"
            ),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
        }
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::AdapterNotRegistered,
            message: format!("source adapter '{provider}' is not registered"),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::InsufficientData => "source.insufficient_data",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::AdapterNotRegistered => "source.adapter_not_registered",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for one series fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub ticker: Ticker,
    pub field: ValueField,
    pub intraday_field: Option<ValueField>,
    pub lookback: Lookback,
}

impl SeriesRequest {
    pub fn new(ticker: Ticker, field: ValueField, lookback: Lookback) -> Self {
        Self {
            ticker,
            field,
            intraday_field: None,
            lookback,
        }
    }

    pub fn for_candidate(candidate: &Candidate, lookback: Lookback) -> Self {
        Self {
            ticker: candidate.ticker.clone(),
            field: candidate.field,
            intraday_field: candidate.intraday_field,
            lookback,
        }
    }

    pub fn with_intraday_field(mut self, field: ValueField) -> Self {
        self.intraday_field = Some(field);
        self
    }
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Series, SourceError>> + Send + 'a>>;

/// Provider backend contract.
///
/// Implementations return a [`Series`] in ascending timestamp order and
/// report empty payloads as [`SourceErrorKind::Unavailable`].
pub trait SeriesSource: Send + Sync {
    /// Returns the backend identifier used by fallback candidates.
    fn id(&self) -> ProviderId;

    /// Fetches the raw series for one ticker.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if:
    /// - the transport fails or the provider answers with a non-success status
    /// - the payload is empty or carries an API error
    /// - the requested value field is not offered by this backend
    fn fetch<'a>(&'a self, req: SeriesRequest) -> FetchFuture<'a>;
}
