use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::data_source::{FetchFuture, SeriesRequest, SeriesSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::{Observation, ProviderId, Series, UtcDateTime, ValueField};

pub const FRED_OBSERVATIONS_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// FRED macro-series backend (`series/observations`).
#[derive(Clone)]
pub struct FredSource {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    timeout_ms: u64,
    today: Option<UtcDateTime>,
}

impl FredSource {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            today: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Pins the date the lookback window is measured from.
    pub fn with_today(mut self, today: UtcDateTime) -> Self {
        self.today = Some(today);
        self
    }

    fn build_request(&self, req: &SeriesRequest) -> HttpRequest {
        let today = self.today.unwrap_or_else(UtcDateTime::now);
        let start = req.lookback.start_from(today);

        HttpRequest::get(FRED_OBSERVATIONS_URL)
            .with_query("series_id", req.ticker.as_str())
            .with_query("api_key", self.api_key.as_str())
            .with_query("file_type", "json")
            .with_query("observation_start", start.format_date())
            .with_timeout_ms(self.timeout_ms)
    }

    async fn fetch_series(&self, req: SeriesRequest) -> Result<Series, SourceError> {
        if req.field != ValueField::Value {
            return Err(SourceError::invalid_request(format!(
                "fred series have a single value field, '{}' was requested",
                req.field.as_str()
            )));
        }

        debug!(series_id = %req.ticker, lookback_days = req.lookback.as_days(), "fetching fred series");
        let response = self
            .http_client
            .execute(self.build_request(&req))
            .await
            .map_err(|e| SourceError::unavailable(format!("fred transport error: {}", e.message())))?;

        if !response.is_success() {
            let detail = serde_json::from_str::<FredErrorResponse>(&response.body)
                .ok()
                .and_then(|error| error.error_message)
                .unwrap_or_default();
            return Err(SourceError::unavailable(format!(
                "fred returned status {} {}",
                response.status, detail
            )
            .trim_end()
            .to_owned()));
        }

        parse_observations(&req, &response.body)
    }
}

impl SeriesSource for FredSource {
    fn id(&self) -> ProviderId {
        ProviderId::Fred
    }

    fn fetch<'a>(&'a self, req: SeriesRequest) -> FetchFuture<'a> {
        Box::pin(self.fetch_series(req))
    }
}

fn parse_observations(req: &SeriesRequest, body: &str) -> Result<Series, SourceError> {
    let payload: FredObservationsResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::internal(format!("failed to parse fred response: {e}")))?;

    if payload.observations.is_empty() {
        return Err(SourceError::unavailable(format!(
            "fred returned no observations for '{}'",
            req.ticker
        )));
    }

    let observations = payload
        .observations
        .into_iter()
        .map(|row| {
            let ts = UtcDateTime::parse_date(&row.date)
                .map_err(|e| SourceError::internal(e.to_string()))?;
            Ok(Observation::new(ts, parse_value(&row.value)))
        })
        .collect::<Result<Vec<_>, SourceError>>()?;

    Ok(Series::from_unsorted(
        req.ticker.clone(),
        ProviderId::Fred,
        observations,
    ))
}

/// FRED marks missing observations with `"."`.
fn parse_value(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

#[derive(Debug, Deserialize)]
struct FredObservationsResponse {
    #[serde(default)]
    observations: Vec<FredObservation>,
}

#[derive(Debug, Deserialize)]
struct FredObservation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct FredErrorResponse {
    #[serde(default)]
    error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::{Lookback, SourceErrorKind};
    use crate::http_client::{HttpError, HttpFuture, HttpResponse};
    use crate::Ticker;
    use std::sync::Mutex;

    struct ScriptedHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn new(response: Result<HttpResponse, HttpError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    fn request(field: ValueField) -> SeriesRequest {
        SeriesRequest::new(
            Ticker::parse("WTREGEN").expect("valid ticker"),
            field,
            Lookback::days(30).expect("valid lookback"),
        )
    }

    fn source(client: Arc<ScriptedHttpClient>) -> FredSource {
        FredSource::new(client, "fred-key")
            .with_today(UtcDateTime::parse_date("2024-03-31").expect("valid date"))
    }

    #[tokio::test]
    async fn missing_values_become_nan() {
        let client = ScriptedHttpClient::new(Ok(HttpResponse::ok_json(
            r#"{"observations":[
                {"date":"2024-03-06","value":"750000"},
                {"date":"2024-03-13","value":"."},
                {"date":"2024-03-20","value":"761000.5"}
            ]}"#,
        )));

        let series = source(client)
            .fetch(request(ValueField::Value))
            .await
            .expect("fetch should succeed");

        let values: Vec<f64> = series.observations().iter().map(|o| o.value).collect();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], 750_000.0);
        assert!(values[1].is_nan());
        assert_eq!(values[2], 761_000.5);
        assert_eq!(series.provider, ProviderId::Fred);
    }

    #[tokio::test]
    async fn request_carries_series_key_and_window_start() {
        let client = ScriptedHttpClient::new(Ok(HttpResponse::ok_json(
            r#"{"observations":[{"date":"2024-03-20","value":"1"}]}"#,
        )));

        let _ = source(Arc::clone(&client))
            .fetch(request(ValueField::Value))
            .await;

        let requests = client.requests.lock().expect("not poisoned");
        let sent = &requests[0];
        assert_eq!(sent.url, FRED_OBSERVATIONS_URL);
        assert_eq!(sent.query_value("series_id"), Some("WTREGEN"));
        assert_eq!(sent.query_value("api_key"), Some("fred-key"));
        assert_eq!(sent.query_value("file_type"), Some("json"));
        assert_eq!(sent.query_value("observation_start"), Some("2024-03-01"));
    }

    #[tokio::test]
    async fn empty_payload_is_unavailable() {
        let client = ScriptedHttpClient::new(Ok(HttpResponse::ok_json(r#"{"observations":[]}"#)));

        let error = source(client)
            .fetch(request(ValueField::Value))
            .await
            .expect_err("empty payload must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn error_status_surfaces_api_message() {
        let client = ScriptedHttpClient::new(Ok(HttpResponse::new(
            400,
            r#"{"error_code":400,"error_message":"Bad Request. The value for variable api_key is not registered."}"#,
        )));

        let error = source(client)
            .fetch(request(ValueField::Value))
            .await
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert!(error.message().contains("status 400"));
        assert!(error.message().contains("api_key is not registered"));
    }

    #[tokio::test]
    async fn transport_failure_is_unavailable() {
        let client = ScriptedHttpClient::new(Err(HttpError::new("connection reset")));

        let error = source(client)
            .fetch(request(ValueField::Value))
            .await
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn ohlc_fields_are_rejected() {
        let client = ScriptedHttpClient::new(Ok(HttpResponse::ok_json("{}")));

        let error = source(Arc::clone(&client))
            .fetch(request(ValueField::Close))
            .await
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
        assert!(client.requests.lock().expect("not poisoned").is_empty());
    }
}
