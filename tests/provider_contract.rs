use macrobrief_core::{
    Candidate, FredSource, HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse, Lookback,
    ProviderId, SeriesRequest, SeriesSource, SourceErrorKind, YahooSource,
};
use std::sync::{Arc, Mutex};

struct FixedHttpClient {
    response: Result<HttpResponse, HttpError>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FixedHttpClient {
    fn ok(body: &str) -> Arc<Self> {
        Self::new(Ok(HttpResponse::ok_json(body)))
    }

    fn new(response: Result<HttpResponse, HttpError>) -> Arc<Self> {
        Arc::new(Self {
            response,
            requests: Mutex::new(Vec::new()),
        })
    }
}

impl HttpClient for FixedHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        self.requests.lock().expect("not poisoned").push(request);
        let response = self.response.clone();
        Box::pin(async move { response })
    }
}

fn sources(client: Arc<FixedHttpClient>) -> Vec<Arc<dyn SeriesSource>> {
    vec![
        Arc::new(FredSource::new(client.clone(), "key")),
        Arc::new(YahooSource::new(client)),
    ]
}

fn request_for(provider: ProviderId) -> SeriesRequest {
    let candidate = match provider {
        ProviderId::Fred => Candidate::fred("DGS10"),
        ProviderId::Yahoo => Candidate::yahoo("^TNX"),
    }
    .expect("valid candidate");
    SeriesRequest::for_candidate(&candidate, Lookback::default())
}

#[tokio::test]
async fn test_sources_report_their_provider_ids() {
    let ids = sources(FixedHttpClient::ok("{}"))
        .iter()
        .map(|source| source.id())
        .collect::<Vec<_>>();

    assert_eq!(ids, ProviderId::ALL.to_vec());
}

#[tokio::test]
async fn test_transport_failure_is_unavailable_for_every_source() {
    for source in sources(FixedHttpClient::new(Err(HttpError::new("timed out")))) {
        let error = source
            .fetch(request_for(source.id()))
            .await
            .expect_err("transport failure");

        assert_eq!(error.kind(), SourceErrorKind::Unavailable, "{}", source.id());
        assert_eq!(error.code(), "source.unavailable");
    }
}

#[tokio::test]
async fn test_server_error_is_unavailable_for_every_source() {
    for source in sources(FixedHttpClient::new(Ok(HttpResponse::new(503, "")))) {
        let error = source
            .fetch(request_for(source.id()))
            .await
            .expect_err("server error");

        assert_eq!(error.kind(), SourceErrorKind::Unavailable, "{}", source.id());
        assert!(error.message().contains("503"));
    }
}

#[tokio::test]
async fn test_fred_output_is_sorted_and_deduplicated() {
    let client = FixedHttpClient::ok(
        r#"{"observations":[
            {"date":"2024-03-05","value":"4.20"},
            {"date":"2024-03-04","value":"4.10"},
            {"date":"2024-03-05","value":"4.25"}
        ]}"#,
    );
    let source = FredSource::new(client, "key");

    let series = source
        .fetch(request_for(ProviderId::Fred))
        .await
        .expect("valid payload");

    let values = series
        .observations()
        .iter()
        .map(|obs| obs.value)
        .collect::<Vec<_>>();
    assert_eq!(values, vec![4.10, 4.25]);
    assert_eq!(series.provider, ProviderId::Fred);
}

#[tokio::test]
async fn test_yahoo_output_is_sorted_ascending() {
    let client = FixedHttpClient::ok(
        r#"{"chart":{"result":[{
            "timestamp":[1709337600,1709251200],
            "indicators":{"quote":[{"open":[4.3,4.0],"close":[4.2,4.1],"volume":[null,null]}]}
        }],"error":null}}"#,
    );
    let source = YahooSource::new(client);

    let series = source
        .fetch(request_for(ProviderId::Yahoo))
        .await
        .expect("valid payload");

    let rows = series.observations();
    assert!(rows[0].ts < rows[1].ts);
    assert_eq!(rows[0].value, 4.1);
    assert_eq!(rows[1].intraday, Some(4.3));
    assert_eq!(rows[1].volume, None);
}

#[tokio::test]
async fn test_fred_refuses_ohlc_fields_without_network() {
    let client = FixedHttpClient::ok("{}");
    let source = FredSource::new(client.clone(), "key");
    let yahoo_shaped = request_for(ProviderId::Yahoo);

    let error = source.fetch(yahoo_shaped).await.expect_err("close field");

    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    assert!(client.requests.lock().expect("not poisoned").is_empty());
}

#[tokio::test]
async fn test_requests_respect_configured_timeout() {
    let client = FixedHttpClient::ok("{}");
    let fred = FredSource::new(client.clone(), "key").with_timeout_ms(2_500);
    let yahoo = YahooSource::new(client.clone()).with_timeout_ms(2_500);

    let _ = fred.fetch(request_for(ProviderId::Fred)).await;
    let _ = yahoo.fetch(request_for(ProviderId::Yahoo)).await;

    let requests = client.requests.lock().expect("not poisoned");
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|request| request.timeout_ms == 2_500));
}
