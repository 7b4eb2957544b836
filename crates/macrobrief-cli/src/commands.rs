use std::sync::Arc;

use macrobrief_core::{
    default_registry, AppConfig, BriefingEngine, HttpClient, IndicatorStatus, NotificationSink,
    ReqwestHttpClient, TelegramSink, TickerFallbackResolver, UtcDateTime,
};
use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::CliError;
use crate::output::ConsoleSink;

/// What one invocation did, for the final log line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: usize,
    pub bulletins: usize,
    pub degraded_indicators: usize,
    pub fallback_warnings: Vec<String>,
    pub delivery_failures: usize,
}

/// Builds every selected report and delivers it.
///
/// Secrets are checked before any fetch, also under `--dry-run`.
pub async fn run(cli: &Cli) -> Result<RunSummary, CliError> {
    let settings = cli.settings()?;
    let config = AppConfig::from_env()?.with_settings(settings);
    let registry = default_registry()?;

    let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let resolver = TickerFallbackResolver::builder(Arc::clone(&http_client))
        .with_fred_key(config.secrets.fred_api_key.expose())
        .with_timeout_ms(config.settings.timeout_ms)
        .build();
    let sink: Box<dyn NotificationSink> = if cli.dry_run {
        Box::new(ConsoleSink::new())
    } else {
        Box::new(
            TelegramSink::new(
                Arc::clone(&http_client),
                config.secrets.telegram_token.expose(),
                config.secrets.chat_id.clone(),
            )
            .with_timeout_ms(config.settings.timeout_ms),
        )
    };

    let engine = BriefingEngine::new(&registry, resolver, config.settings);
    let as_of = cli
        .as_of
        .clone()
        .unwrap_or_else(|| UtcDateTime::now().month_day_label());
    let mut summary = RunSummary::default();

    for kind in cli.reports() {
        let outcome = engine
            .build_report(kind, cli.display_mode(), &as_of)
            .await?;

        for indicator in &outcome.outcomes {
            if let IndicatorStatus::Resolved { warnings, .. } = &indicator.status {
                summary.fallback_warnings.extend(warnings.iter().cloned());
            }
        }
        summary.reports += 1;
        summary.bulletins += outcome.bulletins.len();
        summary.degraded_indicators += outcome.failed().count();

        let delivery = engine.deliver(&outcome.bulletins, sink.as_ref()).await;
        summary.delivery_failures += delivery.failures.len();
    }

    if summary.delivery_failures > 0 || summary.degraded_indicators > 0 {
        warn!(
            degraded_indicators = summary.degraded_indicators,
            delivery_failures = summary.delivery_failures,
            "run finished degraded"
        );
    } else {
        info!(
            reports = summary.reports,
            bulletins = summary.bulletins,
            sink = sink.name(),
            "run finished"
        );
    }

    Ok(summary)
}
