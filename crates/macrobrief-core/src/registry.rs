//! Immutable indicator registry and report layouts.
//!
//! Built once at startup; fallback chains and section membership are plain
//! data here, so adding an indicator never touches the pipeline.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::delta::Horizon;
use crate::units::Unit;
use crate::{Candidate, Indicator, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportKind {
    Liquidity,
    Market,
}

impl ReportKind {
    pub const ALL: [Self; 2] = [Self::Liquidity, Self::Market];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Liquidity => "liquidity",
            Self::Market => "market",
        }
    }
}

impl Display for ReportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "liquidity" => Ok(Self::Liquidity),
            "market" => Ok(Self::Market),
            _ => Err(ValidationError::UnknownReport {
                value: value.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpec {
    pub name: String,
    pub indicator_ids: Vec<String>,
    pub horizons: Vec<Horizon>,
}

impl SectionSpec {
    pub fn new(name: impl Into<String>, indicator_ids: &[&str], horizons: &[Horizon]) -> Self {
        Self {
            name: name.into(),
            indicator_ids: indicator_ids.iter().map(|id| (*id).to_owned()).collect(),
            horizons: horizons.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSpec {
    pub kind: ReportKind,
    pub title: String,
    pub sections: Vec<SectionSpec>,
    pub footer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IndicatorRegistry {
    indicators: BTreeMap<String, Indicator>,
    reports: BTreeMap<ReportKind, ReportSpec>,
}

impl IndicatorRegistry {
    pub fn new(indicators: Vec<Indicator>) -> Result<Self, ValidationError> {
        let mut by_id = BTreeMap::new();
        for indicator in indicators {
            let id = indicator.id.clone();
            if by_id.insert(id.clone(), indicator).is_some() {
                return Err(ValidationError::DuplicateIndicator { id });
            }
        }

        Ok(Self {
            indicators: by_id,
            reports: BTreeMap::new(),
        })
    }

    /// Adds a report layout; every referenced indicator must be registered.
    pub fn with_report(mut self, report: ReportSpec) -> Result<Self, ValidationError> {
        let unknown = report
            .sections
            .iter()
            .flat_map(|section| &section.indicator_ids)
            .find(|id| !self.indicators.contains_key(id.as_str()));
        if let Some(id) = unknown {
            return Err(ValidationError::UnknownIndicator {
                report: report.kind.to_string(),
                id: id.clone(),
            });
        }

        self.reports.insert(report.kind, report);
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&Indicator> {
        self.indicators.get(id)
    }

    pub fn report(&self, kind: ReportKind) -> Option<&ReportSpec> {
        self.reports.get(&kind)
    }
}

/// The liquidity and market-close reports.
pub fn default_registry() -> Result<IndicatorRegistry, ValidationError> {
    let futures = |id: &str, name: &str, symbol: &str| -> Result<Indicator, ValidationError> {
        Ok(Indicator::new(id, name, Unit::plain(), vec![Candidate::yahoo(symbol)?])?
            .volume_sensitive()
            .with_volume())
    };

    let indicators = vec![
        // WTREGEN is reported in millions.
        Indicator::new(
            "tga",
            "TGA Balance",
            Unit::scaled(1_000.0, "B")?,
            vec![Candidate::fred("WTREGEN")?],
        )?
        .with_precision(1),
        Indicator::new(
            "rrp",
            "Reverse Repo (RRP)",
            Unit::scaled(1.0, "B")?,
            vec![Candidate::fred("RRPONTSYD")?],
        )?
        .with_precision(1),
        Indicator::new(
            "mmf",
            "Money Market Funds",
            Unit::scaled(1_000_000.0, "T")?,
            vec![Candidate::fred("WMMNS")?],
        )?,
        futures("nq", "Nasdaq 100 Futures", "NQ=F")?,
        futures("es", "S&P 500 Futures", "ES=F")?,
        futures("ym", "Dow Futures", "YM=F")?,
        futures("gc", "Gold Futures", "GC=F")?,
        Indicator::new(
            "btc",
            "Bitcoin",
            Unit::plain(),
            vec![Candidate::yahoo("BTC-USD")?],
        )?
        .with_volume(),
        Indicator::new(
            "us2y",
            "US 2Y Treasury Yield",
            Unit::Percent,
            vec![Candidate::fred("DGS2")?, Candidate::yahoo("^IRX")?],
        )?
        .with_precision(3),
        Indicator::new(
            "us10y",
            "US 10Y Treasury Yield",
            Unit::Percent,
            vec![Candidate::yahoo("^TNX")?, Candidate::fred("DGS10")?],
        )?
        .with_precision(3),
    ];

    IndicatorRegistry::new(indicators)?
        .with_report(ReportSpec {
            kind: ReportKind::Liquidity,
            title: String::from("📊 Daily Liquidity Report"),
            sections: vec![SectionSpec::new(
                "Liquidity",
                &["tga", "rrp", "mmf"],
                &[Horizon::DAILY],
            )],
            footer: Some(String::from("Figures follow the latest FRED update.")),
        })?
        .with_report(ReportSpec {
            kind: ReportKind::Market,
            title: String::from("🏁 Market Close Report"),
            sections: vec![
                SectionSpec::new(
                    "Futures & Crypto",
                    &["nq", "es", "ym", "gc", "btc"],
                    &Horizon::STANDARD,
                ),
                SectionSpec::new("Treasury Yields", &["us2y", "us10y"], &[Horizon::DAILY]),
            ],
            footer: Some(String::from(
                "Prices from Yahoo Finance daily bars; yields in percent.",
            )),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProviderId, ValidityRule};

    #[test]
    fn default_registry_defines_both_reports() {
        let registry = default_registry().expect("valid registry");

        for kind in ReportKind::ALL {
            let report = registry.report(kind).expect("report registered");
            assert!(!report.sections.is_empty());
            for id in report.sections.iter().flat_map(|s| &s.indicator_ids) {
                assert!(registry.get(id).is_some(), "{id} should be registered");
            }
        }
    }

    #[test]
    fn rate_chains_mix_backends_in_order() {
        let registry = default_registry().expect("valid registry");

        let two_year = registry.get("us2y").expect("us2y");
        let providers = two_year.chain.iter().map(|c| c.provider).collect::<Vec<_>>();
        assert_eq!(providers, vec![ProviderId::Fred, ProviderId::Yahoo]);

        let ten_year = registry.get("us10y").expect("us10y");
        assert_eq!(ten_year.chain[0].ticker.as_str(), "^TNX");
        assert_eq!(ten_year.chain[1].ticker.as_str(), "DGS10");
        assert_eq!(ten_year.precision, 3);
    }

    #[test]
    fn futures_are_volume_sensitive_and_bitcoin_is_not() {
        let registry = default_registry().expect("valid registry");

        for id in ["nq", "es", "ym", "gc"] {
            let indicator = registry.get(id).expect("registered");
            assert_eq!(indicator.validity, ValidityRule::VolumeSensitive);
            assert!(indicator.show_volume);
        }
        let btc = registry.get("btc").expect("registered");
        assert_eq!(btc.validity, ValidityRule::FiniteOnly);
        assert!(btc.show_volume);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let indicator = Indicator::new(
            "dup",
            "Dup",
            Unit::Percent,
            vec![Candidate::fred("DGS2").expect("valid")],
        )
        .expect("valid indicator");

        let error = IndicatorRegistry::new(vec![indicator.clone(), indicator])
            .expect_err("duplicate id");
        assert_eq!(error, ValidationError::DuplicateIndicator { id: String::from("dup") });
    }

    #[test]
    fn reports_must_reference_registered_indicators() {
        let error = IndicatorRegistry::new(Vec::new())
            .expect("empty registry")
            .with_report(ReportSpec {
                kind: ReportKind::Market,
                title: String::from("Market"),
                sections: vec![SectionSpec::new("Rates", &["missing"], &[Horizon::DAILY])],
                footer: None,
            })
            .expect_err("unknown indicator");

        assert_eq!(
            error,
            ValidationError::UnknownIndicator {
                report: String::from("market"),
                id: String::from("missing"),
            }
        );
    }

    #[test]
    fn report_kind_round_trips_through_text() {
        assert_eq!("Market".parse::<ReportKind>(), Ok(ReportKind::Market));
        assert!("weekly".parse::<ReportKind>().is_err());
    }
}
