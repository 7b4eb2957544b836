use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::data_source::{FetchFuture, Lookback, SeriesRequest, SeriesSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::{Observation, ProviderId, Series, UtcDateTime, ValueField};

pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart backend returning daily OHLCV bars.
#[derive(Clone)]
pub struct YahooSource {
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl YahooSource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn build_request(&self, req: &SeriesRequest) -> HttpRequest {
        HttpRequest::get(format!(
            "{}/{}",
            YAHOO_CHART_URL,
            urlencoding::encode(req.ticker.as_str())
        ))
        .with_query("range", chart_range(req.lookback))
        .with_query("interval", "1d")
        .with_query("includePrePost", "false")
        .with_header("referer", "https://finance.yahoo.com/")
        .with_timeout_ms(self.timeout_ms)
    }

    async fn fetch_series(&self, req: SeriesRequest) -> Result<Series, SourceError> {
        for field in std::iter::once(req.field).chain(req.intraday_field) {
            if field == ValueField::Value {
                return Err(SourceError::invalid_request(
                    "yahoo bars have no single value field; request close or open",
                ));
            }
        }

        debug!(symbol = %req.ticker, range = chart_range(req.lookback), "fetching yahoo chart");
        let response = self
            .http_client
            .execute(self.build_request(&req))
            .await
            .map_err(|e| SourceError::unavailable(format!("yahoo transport error: {}", e.message())))?;

        // Unknown symbols answer 404 with a chart error body.
        if !response.is_success() {
            let detail = serde_json::from_str::<YahooChartResponse>(&response.body)
                .ok()
                .and_then(|payload| payload.chart.error)
                .map(|error| error.describe())
                .unwrap_or_default();
            return Err(SourceError::unavailable(
                format!("yahoo returned status {} {}", response.status, detail)
                    .trim_end()
                    .to_owned(),
            ));
        }

        parse_chart(&req, &response.body)
    }
}

impl SeriesSource for YahooSource {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn fetch<'a>(&'a self, req: SeriesRequest) -> FetchFuture<'a> {
        Box::pin(self.fetch_series(req))
    }
}

/// Smallest chart range covering the lookback window.
fn chart_range(lookback: Lookback) -> &'static str {
    match lookback.as_days() {
        0..=5 => "5d",
        6..=31 => "1mo",
        32..=92 => "3mo",
        93..=183 => "6mo",
        184..=366 => "1y",
        _ => "2y",
    }
}

fn parse_chart(req: &SeriesRequest, body: &str) -> Result<Series, SourceError> {
    let payload: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = payload.chart.error {
        return Err(SourceError::unavailable(format!(
            "yahoo chart API error: {}",
            error.describe()
        )));
    }

    let result = payload
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| {
            SourceError::unavailable(format!("yahoo returned no chart data for '{}'", req.ticker))
        })?;

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    if timestamps.is_empty() {
        return Err(SourceError::unavailable(format!(
            "yahoo returned no bars for '{}'",
            req.ticker
        )));
    }

    let mut observations = Vec::with_capacity(timestamps.len());
    for (index, &seconds) in timestamps.iter().enumerate() {
        let ts = UtcDateTime::from_unix_timestamp(seconds)
            .map_err(|e| SourceError::internal(e.to_string()))?;

        let mut observation = Observation::new(ts, quote.field(req.field, index).unwrap_or(f64::NAN));
        observation.intraday = req
            .intraday_field
            .and_then(|field| quote.field(field, index));
        observation.volume = quote.volume.get(index).copied().flatten();
        observations.push(observation);
    }

    Ok(Series::from_unsorted(
        req.ticker.clone(),
        ProviderId::Yahoo,
        observations,
    ))
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl YahooChartError {
    fn describe(&self) -> String {
        match (&self.code, &self.description) {
            (Some(code), Some(description)) => format!("{code}: {description}"),
            (Some(code), None) => code.clone(),
            (None, Some(description)) => description.clone(),
            (None, None) => String::from("unknown error"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl YahooChartQuote {
    fn field(&self, field: ValueField, index: usize) -> Option<f64> {
        let column = match field {
            ValueField::Close => &self.close,
            ValueField::Open => &self.open,
            ValueField::Value => return None,
        };
        column.get(index).copied().flatten()
    }
}
