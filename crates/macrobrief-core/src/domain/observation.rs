use serde::{Deserialize, Serialize};

use crate::{ProviderId, Ticker, UtcDateTime, ValidationError};

/// One raw provider sample. Missing provider values are carried as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub ts: UtcDateTime,
    /// The indicator's value field (close, open or series value).
    pub value: f64,
    /// Field used as the current value in live display mode.
    pub intraday: Option<f64>,
    pub volume: Option<f64>,
}

impl Observation {
    pub const fn new(ts: UtcDateTime, value: f64) -> Self {
        Self {
            ts,
            value,
            intraday: None,
            volume: None,
        }
    }

    pub const fn with_intraday(mut self, intraday: f64) -> Self {
        self.intraday = Some(intraday);
        self
    }

    pub const fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// Raw series as returned by a provider: ascending timestamps, no duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub ticker: Ticker,
    pub provider: ProviderId,
    observations: Vec<Observation>,
}

impl Series {
    /// Builds a series, rejecting out-of-order or duplicated timestamps.
    pub fn new(
        ticker: Ticker,
        provider: ProviderId,
        observations: Vec<Observation>,
    ) -> Result<Self, ValidationError> {
        if let Some(index) = observations
            .windows(2)
            .position(|pair| pair[0].ts >= pair[1].ts)
        {
            return Err(ValidationError::UnorderedSeries { index: index + 1 });
        }

        Ok(Self {
            ticker,
            provider,
            observations,
        })
    }

    /// Sorts provider rows by timestamp; a repeated timestamp keeps the later row.
    pub fn from_unsorted(
        ticker: Ticker,
        provider: ProviderId,
        mut observations: Vec<Observation>,
    ) -> Self {
        observations.sort_by_key(|observation| observation.ts);

        let mut deduped: Vec<Observation> = Vec::with_capacity(observations.len());
        for observation in observations {
            match deduped.last_mut() {
                Some(previous) if previous.ts == observation.ts => *previous = observation,
                _ => deduped.push(observation),
            }
        }

        Self {
            ticker,
            provider,
            observations: deduped,
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Ticker, ProviderId, Vec<Observation>) {
        (self.ticker, self.provider, self.observations)
    }
}

/// Series with invalid rows removed. Only produced by [`crate::filter::filter`],
/// so its length is the one every horizon lookup is measured against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredSeries {
    pub ticker: Ticker,
    pub provider: ProviderId,
    observations: Vec<Observation>,
    dropped: usize,
}

impl FilteredSeries {
    pub(crate) fn new(
        ticker: Ticker,
        provider: ProviderId,
        observations: Vec<Observation>,
        dropped: usize,
    ) -> Self {
        Self {
            ticker,
            provider,
            observations,
            dropped,
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|obs| obs.value).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Number of raw rows the filter removed.
    pub const fn dropped(&self) -> usize {
        self.dropped
    }
}
