use serde::{Deserialize, Serialize};

use crate::units::Unit;
use crate::{ProviderId, Ticker, ValidationError};

/// Provider field that constitutes "the value" of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueField {
    Close,
    Open,
    /// Single-valued macro series (FRED observation value, percent rates included).
    Value,
}

impl ValueField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Open => "open",
            Self::Value => "value",
        }
    }
}

/// Which raw rows survive filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityRule {
    #[default]
    FiniteOnly,
    /// Also drops rows with zero volume (futures quoted without a real trade).
    VolumeSensitive,
}

/// One (ticker, backend) entry of a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub provider: ProviderId,
    pub ticker: Ticker,
    pub field: ValueField,
    pub intraday_field: Option<ValueField>,
}

impl Candidate {
    pub fn fred(series_id: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            provider: ProviderId::Fred,
            ticker: Ticker::parse(series_id)?,
            field: ValueField::Value,
            intraday_field: None,
        })
    }

    /// Yahoo daily bars valued at the close, with the open as the live-mode value.
    pub fn yahoo(symbol: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            provider: ProviderId::Yahoo,
            ticker: Ticker::parse(symbol)?,
            field: ValueField::Close,
            intraday_field: Some(ValueField::Open),
        })
    }

    pub fn label(&self) -> String {
        format!("{}:{}", self.provider, self.ticker)
    }
}

/// Immutable indicator definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub id: String,
    pub name: String,
    pub unit: Unit,
    pub precision: usize,
    pub validity: ValidityRule,
    pub chain: Vec<Candidate>,
    pub show_volume: bool,
}

impl Indicator {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: Unit,
        chain: Vec<Candidate>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if chain.is_empty() {
            return Err(ValidationError::EmptyFallbackChain { id });
        }

        Ok(Self {
            id,
            name: name.into(),
            unit,
            precision: 2,
            validity: ValidityRule::FiniteOnly,
            chain,
            show_volume: false,
        })
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn volume_sensitive(mut self) -> Self {
        self.validity = ValidityRule::VolumeSensitive;
        self
    }

    pub fn with_volume(mut self) -> Self {
        self.show_volume = true;
        self
    }
}
