use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use crate::adapters::{FredSource, YahooSource};
use crate::data_source::{Lookback, SeriesRequest, SeriesSource, SourceError};
use crate::delta::Horizon;
use crate::filter::{filter, required_len};
use crate::http_client::{HttpClient, DEFAULT_TIMEOUT_MS};
use crate::{Candidate, FilteredSeries, Indicator, ProviderId};

/// One failed candidate of a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateAttempt {
    pub candidate: Candidate,
    pub error: SourceError,
}

impl CandidateAttempt {
    pub fn describe(&self) -> String {
        format!("{}: {}", self.candidate.label(), self.error)
    }
}

/// Successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub series: FilteredSeries,
    pub selected: Candidate,
    /// Failures of the candidates tried before `selected`.
    pub attempts: Vec<CandidateAttempt>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

/// Every candidate of the chain failed.
#[derive(Debug, Clone, Error)]
#[error("all sources exhausted for '{indicator_id}' after {} attempt(s)", .attempts.len())]
pub struct ResolveFailure {
    pub indicator_id: String,
    pub attempts: Vec<CandidateAttempt>,
    pub latency_ms: u64,
}

impl ResolveFailure {
    pub const fn code(&self) -> &'static str {
        "resolve.all_sources_exhausted"
    }
}

pub type ResolveResult = Result<Resolution, ResolveFailure>;

/// Walks an indicator's fallback chain over the registered backends.
pub struct TickerFallbackResolver {
    sources: HashMap<ProviderId, Arc<dyn SeriesSource>>,
}

impl TickerFallbackResolver {
    pub fn new(sources: Vec<Arc<dyn SeriesSource>>) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.id(), source))
            .collect();
        Self { sources }
    }

    pub fn builder(http_client: Arc<dyn HttpClient>) -> ResolverBuilder {
        ResolverBuilder::new(http_client)
    }

    pub fn registered(&self) -> Vec<ProviderId> {
        let mut providers = self.sources.keys().copied().collect::<Vec<_>>();
        providers.sort();
        providers
    }

    pub async fn resolve(
        &self,
        indicator: &Indicator,
        horizons: &[Horizon],
        lookback: Lookback,
    ) -> ResolveResult {
        let started = Instant::now();
        let required = required_len(horizons);
        let mut attempts = Vec::new();

        for candidate in &indicator.chain {
            match self.try_candidate(indicator, candidate, required, lookback).await {
                Ok(series) => {
                    let mut warnings = Vec::new();
                    if !attempts.is_empty() {
                        let warning = format!(
                            "fallback succeeded with '{}' after {} failed attempt(s)",
                            candidate.label(),
                            attempts.len()
                        );
                        warn!(indicator = %indicator.id, "{warning}");
                        warnings.push(warning);
                    }

                    return Ok(Resolution {
                        series,
                        selected: candidate.clone(),
                        attempts,
                        warnings,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Err(error) => {
                    debug!(
                        indicator = %indicator.id,
                        candidate = %candidate.label(),
                        code = error.code(),
                        "candidate failed: {}",
                        error.message()
                    );
                    attempts.push(CandidateAttempt {
                        candidate: candidate.clone(),
                        error,
                    });
                }
            }
        }

        Err(ResolveFailure {
            indicator_id: indicator.id.clone(),
            attempts,
            latency_ms: elapsed_ms(started),
        })
    }

    async fn try_candidate(
        &self,
        indicator: &Indicator,
        candidate: &Candidate,
        required: usize,
        lookback: Lookback,
    ) -> Result<FilteredSeries, SourceError> {
        let source = self
            .sources
            .get(&candidate.provider)
            .ok_or_else(|| SourceError::adapter_not_registered(candidate.provider))?;

        let series = source
            .fetch(SeriesRequest::for_candidate(candidate, lookback))
            .await?;
        debug!(candidate = %candidate.label(), rows = series.len(), "fetched series");

        filter(series, indicator.validity, required)
    }
}

/// Wires the production backends over one shared HTTP client.
pub struct ResolverBuilder {
    http_client: Arc<dyn HttpClient>,
    fred_api_key: Option<String>,
    timeout_ms: u64,
}

impl ResolverBuilder {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            fred_api_key: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_fred_key(mut self, key: impl Into<String>) -> Self {
        self.fred_api_key = Some(key.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// FRED is registered only when a key was supplied; chains that name it
    /// then fail over with `source.adapter_not_registered`.
    pub fn build(self) -> TickerFallbackResolver {
        let mut sources: Vec<Arc<dyn SeriesSource>> = Vec::new();

        if let Some(key) = self.fred_api_key {
            sources.push(Arc::new(
                FredSource::new(Arc::clone(&self.http_client), key)
                    .with_timeout_ms(self.timeout_ms),
            ));
        }

        sources.push(Arc::new(
            YahooSource::new(Arc::clone(&self.http_client)).with_timeout_ms(self.timeout_ms),
        ));

        TickerFallbackResolver::new(sources)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{FetchFuture, SourceErrorKind};
    use crate::units::Unit;
    use crate::{Observation, Series, UtcDateTime};
    use std::sync::Mutex;

    struct StubSource {
        id: ProviderId,
        values: Option<Vec<f64>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn ok(id: ProviderId, values: &[f64]) -> Arc<Self> {
            Arc::new(Self {
                id,
                values: Some(values.to_vec()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(id: ProviderId) -> Arc<Self> {
            Arc::new(Self {
                id,
                values: None,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl SeriesSource for StubSource {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn fetch<'a>(&'a self, req: SeriesRequest) -> FetchFuture<'a> {
            self.calls
                .lock()
                .expect("calls should not be poisoned")
                .push(req.ticker.to_string());
            Box::pin(async move {
                let Some(values) = &self.values else {
                    return Err(SourceError::unavailable("stub outage"));
                };
                let observations = values
                    .iter()
                    .enumerate()
                    .map(|(day, &value)| {
                        Observation::new(
                            UtcDateTime::from_unix_timestamp(day as i64 * 86_400)
                                .expect("valid timestamp"),
                            value,
                        )
                    })
                    .collect();
                Ok(Series::from_unsorted(req.ticker, self.id, observations))
            })
        }
    }

    fn two_year() -> Indicator {
        Indicator::new(
            "us2y",
            "US 2Y",
            Unit::Percent,
            vec![
                Candidate::fred("DGS2").expect("valid candidate"),
                Candidate::yahoo("^IRX").expect("valid candidate"),
            ],
        )
        .expect("valid indicator")
    }

    #[tokio::test]
    async fn first_healthy_candidate_wins_without_warnings() {
        let resolver = TickerFallbackResolver::new(vec![
            StubSource::ok(ProviderId::Fred, &[4.1, 4.2]),
            StubSource::ok(ProviderId::Yahoo, &[9.0, 9.5]),
        ]);

        let resolution = resolver
            .resolve(&two_year(), &[Horizon::DAILY], Lookback::default())
            .await
            .expect("resolves");

        assert_eq!(resolution.selected.provider, ProviderId::Fred);
        assert!(resolution.attempts.is_empty());
        assert!(resolution.warnings.is_empty());
    }

    #[tokio::test]
    async fn falls_back_after_outage() {
        let yahoo = StubSource::ok(ProviderId::Yahoo, &[4.0, 4.3]);
        let resolver = TickerFallbackResolver::new(vec![
            StubSource::failing(ProviderId::Fred),
            yahoo.clone(),
        ]);

        let resolution = resolver
            .resolve(&two_year(), &[Horizon::DAILY], Lookback::default())
            .await
            .expect("resolves through fallback");

        assert_eq!(resolution.selected.ticker.as_str(), "^IRX");
        assert_eq!(resolution.series.values(), vec![4.0, 4.3]);
        assert_eq!(resolution.attempts.len(), 1);
        assert_eq!(resolution.attempts[0].error.kind(), SourceErrorKind::Unavailable);
        assert_eq!(
            resolution.warnings,
            vec![String::from("fallback succeeded with 'yahoo:^IRX' after 1 failed attempt(s)")]
        );
        assert_eq!(*yahoo.calls.lock().expect("not poisoned"), vec![String::from("^IRX")]);
    }

    #[tokio::test]
    async fn insufficient_data_triggers_fallback() {
        let resolver = TickerFallbackResolver::new(vec![
            StubSource::ok(ProviderId::Fred, &[4.1, f64::NAN, f64::NAN]),
            StubSource::ok(ProviderId::Yahoo, &[4.0, 4.3]),
        ]);

        let resolution = resolver
            .resolve(&two_year(), &[Horizon::DAILY], Lookback::default())
            .await
            .expect("resolves through fallback");

        assert_eq!(resolution.selected.provider, ProviderId::Yahoo);
        assert_eq!(
            resolution.attempts[0].error.kind(),
            SourceErrorKind::InsufficientData
        );
    }

    #[tokio::test]
    async fn unregistered_backend_is_skipped() {
        let resolver =
            TickerFallbackResolver::new(vec![StubSource::ok(ProviderId::Yahoo, &[4.0, 4.3])]);

        let resolution = resolver
            .resolve(&two_year(), &[Horizon::DAILY], Lookback::default())
            .await
            .expect("resolves through fallback");

        assert_eq!(
            resolution.attempts[0].error.code(),
            "source.adapter_not_registered"
        );
    }

    #[tokio::test]
    async fn exhausted_chain_reports_every_attempt() {
        let resolver = TickerFallbackResolver::new(vec![
            StubSource::failing(ProviderId::Fred),
            StubSource::failing(ProviderId::Yahoo),
        ]);

        let failure = resolver
            .resolve(&two_year(), &[Horizon::DAILY], Lookback::default())
            .await
            .expect_err("every candidate fails");

        assert_eq!(failure.indicator_id, "us2y");
        assert_eq!(failure.attempts.len(), 2);
        assert_eq!(failure.code(), "resolve.all_sources_exhausted");
        assert_eq!(
            failure.to_string(),
            "all sources exhausted for 'us2y' after 2 attempt(s)"
        );
    }

    #[test]
    fn builder_registers_fred_only_with_key() {
        let client: Arc<dyn HttpClient> = Arc::new(crate::http_client::ReqwestHttpClient::new());

        let without_key = ResolverBuilder::new(Arc::clone(&client)).build();
        assert_eq!(without_key.registered(), vec![ProviderId::Yahoo]);

        let with_key = ResolverBuilder::new(client).with_fred_key("key").build();
        assert_eq!(
            with_key.registered(),
            vec![ProviderId::Fred, ProviderId::Yahoo]
        );
    }
}
