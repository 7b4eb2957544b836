use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Provider backends a fallback candidate can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Macro-series provider, keyed by series id.
    Fred,
    /// Market-data provider, keyed by ticker symbol.
    Yahoo,
}

impl ProviderId {
    pub const ALL: [Self; 2] = [Self::Fred, Self::Yahoo];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fred => "fred",
            Self::Yahoo => "yahoo",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fred" => Ok(Self::Fred),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
