//! Valid-observation filter.
//!
//! Horizon offsets are counted on the filtered series, so a gap in the
//! provider data shifts every reference point instead of landing on NaN.

use tracing::debug;

use crate::data_source::SourceError;
use crate::delta::Horizon;
use crate::{FilteredSeries, Observation, Series, ValidityRule};

/// Minimum filtered length for a set of horizons: `max(2, largest offset)`.
pub fn required_len(horizons: &[Horizon]) -> usize {
    horizons
        .iter()
        .map(|horizon| horizon.offset)
        .max()
        .unwrap_or(0)
        .max(2)
}

/// Drops non-finite values and, under [`ValidityRule::VolumeSensitive`],
/// rows that traded zero volume.
pub fn filter(
    series: Series,
    rule: ValidityRule,
    required_len: usize,
) -> Result<FilteredSeries, SourceError> {
    let (ticker, provider, observations) = series.into_parts();
    let raw_len = observations.len();

    let kept = observations
        .into_iter()
        .filter(|observation| is_valid(observation, rule))
        .collect::<Vec<_>>();
    let dropped = raw_len - kept.len();

    if dropped > 0 {
        debug!(ticker = %ticker, %provider, dropped, kept = kept.len(), "filtered invalid observations");
    }

    if kept.len() < required_len {
        return Err(SourceError::insufficient_data(kept.len(), required_len));
    }

    Ok(FilteredSeries::new(ticker, provider, kept, dropped))
}

fn is_valid(observation: &Observation, rule: ValidityRule) -> bool {
    if !observation.value.is_finite() {
        return false;
    }

    match rule {
        ValidityRule::FiniteOnly => true,
        ValidityRule::VolumeSensitive => observation.volume != Some(0.0),
    }
}
