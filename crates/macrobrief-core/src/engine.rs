//! Per-run orchestration.
//!
//! Indicators are processed one after another. A failed indicator becomes a
//! placeholder line in its section; it never aborts the report.

use tracing::{error, info, warn};

use crate::data_source::SourceError;
use crate::delta::{compute, DisplayMode};
use crate::notify::{DeliveryError, DeliveryStatus, NotificationSink};
use crate::registry::{IndicatorRegistry, ReportKind, ReportSpec, SectionSpec};
use crate::report::{Bulletin, RenderedLine, ReportComposer, Section};
use crate::resolver::{CandidateAttempt, ResolveFailure, TickerFallbackResolver};
use crate::{Candidate, Indicator, RunSettings, ValidationError};

#[derive(Debug, Clone)]
pub enum IndicatorStatus {
    Resolved {
        selected: Candidate,
        warnings: Vec<String>,
    },
    Unavailable {
        failure: ResolveFailure,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorOutcome {
    pub indicator_id: String,
    pub section: String,
    pub status: IndicatorStatus,
}

impl IndicatorOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, IndicatorStatus::Resolved { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub kind: ReportKind,
    pub bulletins: Vec<Bulletin>,
    pub outcomes: Vec<IndicatorOutcome>,
}

impl ReportOutcome {
    pub fn failed(&self) -> impl Iterator<Item = &IndicatorOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_ok())
    }

    pub fn is_degraded(&self) -> bool {
        self.failed().next().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletinFailure {
    pub index: usize,
    pub title: String,
    pub error: DeliveryError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<DeliveryStatus>,
    pub failures: Vec<BulletinFailure>,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BriefingEngine<'a> {
    registry: &'a IndicatorRegistry,
    resolver: TickerFallbackResolver,
    settings: RunSettings,
}

impl<'a> BriefingEngine<'a> {
    pub fn new(
        registry: &'a IndicatorRegistry,
        resolver: TickerFallbackResolver,
        settings: RunSettings,
    ) -> Self {
        Self {
            registry,
            resolver,
            settings,
        }
    }

    /// Resolves every indicator of `kind` and renders the bulletins.
    /// `as_of_label` is appended to the title, e.g. `03/15`.
    pub async fn build_report(
        &self,
        kind: ReportKind,
        mode: DisplayMode,
        as_of_label: &str,
    ) -> Result<ReportOutcome, ValidationError> {
        let spec = self
            .registry
            .report(kind)
            .ok_or_else(|| ValidationError::UnknownReport {
                value: kind.to_string(),
            })?;
        info!(report = %kind, display_mode = %mode, "building report");

        let mut sections = Vec::with_capacity(spec.sections.len());
        let mut outcomes = Vec::new();
        for section_spec in &spec.sections {
            let (section, mut section_outcomes) = self.build_section(spec, section_spec, mode).await?;
            sections.push(section);
            outcomes.append(&mut section_outcomes);
        }

        let title = if as_of_label.is_empty() {
            spec.title.clone()
        } else {
            format!("{} ({as_of_label})", spec.title)
        };
        let composer = ReportComposer::new(self.settings.markup, self.settings.max_message_len);
        let bulletins = composer.compose(&title, sections, spec.footer.clone());

        let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
        info!(
            report = %kind,
            indicators = outcomes.len(),
            failed,
            bulletins = bulletins.len(),
            "report built"
        );

        Ok(ReportOutcome {
            kind,
            bulletins,
            outcomes,
        })
    }

    async fn build_section(
        &self,
        report: &ReportSpec,
        spec: &SectionSpec,
        mode: DisplayMode,
    ) -> Result<(Section, Vec<IndicatorOutcome>), ValidationError> {
        let markup = self.settings.markup;
        let mut lines = Vec::with_capacity(spec.indicator_ids.len());
        let mut outcomes = Vec::with_capacity(spec.indicator_ids.len());

        for id in &spec.indicator_ids {
            let indicator =
                self.registry
                    .get(id)
                    .ok_or_else(|| ValidationError::UnknownIndicator {
                        report: report.kind.to_string(),
                        id: id.clone(),
                    })?;

            let status = match self.snapshot_line(indicator, spec, mode).await {
                Ok((line, selected, warnings)) => {
                    lines.push(line);
                    IndicatorStatus::Resolved { selected, warnings }
                }
                Err(failure) => {
                    warn!(
                        indicator = %indicator.id,
                        attempts = failure.attempts.len(),
                        "indicator unavailable, rendering placeholder: {}",
                        failure
                            .attempts
                            .iter()
                            .map(CandidateAttempt::describe)
                            .collect::<Vec<_>>()
                            .join("; ")
                    );
                    lines.push(RenderedLine::unavailable(indicator, markup));
                    IndicatorStatus::Unavailable { failure }
                }
            };

            outcomes.push(IndicatorOutcome {
                indicator_id: indicator.id.clone(),
                section: spec.name.clone(),
                status,
            });
        }

        Ok((Section::new(spec.name.clone(), lines), outcomes))
    }

    async fn snapshot_line(
        &self,
        indicator: &Indicator,
        spec: &SectionSpec,
        mode: DisplayMode,
    ) -> Result<(RenderedLine, Candidate, Vec<String>), ResolveFailure> {
        let resolution = self
            .resolver
            .resolve(indicator, &spec.horizons, self.settings.lookback)
            .await?;

        let Some(snapshot) = compute(&indicator.id, &resolution.series, &spec.horizons, mode)
        else {
            return Err(ResolveFailure {
                indicator_id: indicator.id.clone(),
                attempts: vec![CandidateAttempt {
                    candidate: resolution.selected,
                    error: SourceError::internal("filtered series is empty"),
                }],
                latency_ms: resolution.latency_ms,
            });
        };

        let line = RenderedLine::from_snapshot(indicator, &snapshot, self.settings.markup);
        Ok((line, resolution.selected, resolution.warnings))
    }

    /// Sends bulletins in order. Failures are collected, never retried.
    pub async fn deliver(
        &self,
        bulletins: &[Bulletin],
        sink: &dyn NotificationSink,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for (index, bulletin) in bulletins.iter().enumerate() {
            let text = bulletin.render();
            match sink.send(&text, bulletin.markup).await {
                Ok(status) => {
                    info!(sink = sink.name(), title = %bulletin.title, status = status.status, "bulletin delivered");
                    report.delivered.push(status);
                }
                Err(delivery_error) => {
                    error!(
                        sink = sink.name(),
                        title = %bulletin.title,
                        status = ?delivery_error.status,
                        "delivery failed: {}",
                        delivery_error.message
                    );
                    report.failures.push(BulletinFailure {
                        index,
                        title: bulletin.title.clone(),
                        error: delivery_error,
                    });
                }
            }
        }

        report
    }
}
