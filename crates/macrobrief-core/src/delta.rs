//! Horizon deltas over a filtered series.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

use crate::{FilteredSeries, Observation, ValidationError};

/// Named offset counted back from the last filtered observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Horizon {
    pub name: &'static str,
    /// Compact label used in rendered lines.
    pub label: &'static str,
    pub offset: usize,
}

impl Horizon {
    pub const DAILY: Self = Self {
        name: "daily",
        label: "1D",
        offset: 1,
    };
    pub const WEEKLY: Self = Self {
        name: "weekly",
        label: "1W",
        offset: 5,
    };
    pub const MONTHLY: Self = Self {
        name: "monthly",
        label: "1M",
        offset: 20,
    };

    pub const STANDARD: [Self; 3] = [Self::DAILY, Self::WEEKLY, Self::MONTHLY];

}

/// Which field of the last observation counts as "current".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Session still open: prefer the intraday value of the last bar.
    Live,
    #[default]
    Closed,
}

impl DisplayMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Closed => "closed",
        }
    }
}

impl Display for DisplayMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "closed" => Ok(Self::Closed),
            _ => Err(ValidationError::InvalidDisplayMode {
                value: value.to_owned(),
            }),
        }
    }
}

/// Change against one reference observation, in native units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Delta {
    pub horizon: Horizon,
    pub reference: Observation,
    pub absolute: f64,
    pub percent: f64,
}

/// Day-over-day traded volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeChange {
    pub current: f64,
    pub previous: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub indicator_id: String,
    pub current: Observation,
    pub current_value: f64,
    pub deltas: Vec<Delta>,
    pub volume: Option<VolumeChange>,
}

impl Snapshot {
    pub fn delta(&self, horizon: Horizon) -> Option<&Delta> {
        self.deltas.iter().find(|delta| delta.horizon == horizon)
    }

    /// The first requested horizon drives the trend marker.
    pub fn primary(&self) -> Option<&Delta> {
        self.deltas.first()
    }
}

/// `(current - reference) / reference * 100`; a zero reference yields 0.
pub fn percent_change(current: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        return 0.0;
    }
    (current - reference) / reference * 100.0
}

/// Index of the reference row for `offset`, clamped to the first row.
pub fn reference_index(len: usize, offset: usize) -> usize {
    len.saturating_sub(1).saturating_sub(offset)
}

/// Builds a snapshot. Returns `None` only for an empty series, which the
/// filter never produces.
pub fn compute(
    indicator_id: &str,
    series: &FilteredSeries,
    horizons: &[Horizon],
    mode: DisplayMode,
) -> Option<Snapshot> {
    let observations = series.observations();
    let current = *observations.last()?;
    let current_value = match (mode, current.intraday) {
        (DisplayMode::Live, Some(intraday)) if intraday.is_finite() => intraday,
        _ => current.value,
    };

    let deltas = horizons
        .iter()
        .map(|&horizon| {
            let reference = observations[reference_index(observations.len(), horizon.offset)];
            Delta {
                horizon,
                reference,
                absolute: current_value - reference.value,
                percent: percent_change(current_value, reference.value),
            }
        })
        .collect();

    let volume = volume_change(observations);

    Some(Snapshot {
        indicator_id: indicator_id.to_owned(),
        current,
        current_value,
        deltas,
        volume,
    })
}

fn volume_change(observations: &[Observation]) -> Option<VolumeChange> {
    let [.., previous, current] = observations else {
        return None;
    };
    let current = current.volume?;
    let previous = previous.volume.unwrap_or(0.0);
    let percent = if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    };

    Some(VolumeChange {
        current,
        previous,
        percent,
    })
}
