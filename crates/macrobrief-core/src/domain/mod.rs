//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated provider key (FRED series id or Yahoo symbol) |
//! | [`UtcDateTime`] | UTC observation timestamp |
//! | [`Observation`] | One provider sample |
//! | [`Series`] | Ordered raw samples for one ticker |
//! | [`FilteredSeries`] | Series after invalid rows were removed |
//! | [`Indicator`] | Registry entry with unit and fallback chain |
//! | [`Candidate`] | One (ticker, backend, field) fallback entry |
//!
//! Constructors validate their invariants; a [`Series`] is always strictly
//! ascending by timestamp.

mod indicator;
mod observation;
mod ticker;
mod timestamp;

pub use indicator::{Candidate, Indicator, ValidityRule, ValueField};
pub use observation::{FilteredSeries, Observation, Series};
pub use ticker::Ticker;
pub use timestamp::UtcDateTime;
