//! # Macrobrief Core
//!
//! Snapshot and delta engine behind the `macrobrief` market bulletins.
//!
//! ## Overview
//!
//! One run turns irregular provider series into short, comparable delta
//! statements:
//!
//! - **Series sources** fetch raw observations from FRED or Yahoo Finance
//! - **Filtering** drops missing values before any horizon lookup
//! - **Fallback resolution** walks an indicator's ordered ticker/backend chain
//! - **Deltas** compare the latest value with daily, weekly and monthly references
//! - **Rendering** converts units and packs lines into message-sized bulletins
//! - **Delivery** hands each bulletin to a notification sink (Telegram)
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | FRED and Yahoo chart backends |
//! | [`config`] | Secrets and run settings |
//! | [`data_source`] | Series source trait and request/error types |
//! | [`delta`] | Horizons, snapshots and percentage change |
//! | [`domain`] | Domain models (Ticker, Observation, Series, Indicator) |
//! | [`engine`] | Per-run orchestration and failure isolation |
//! | [`error`] | Core error types |
//! | [`filter`] | Valid-observation filter |
//! | [`http_client`] | HTTP client abstraction |
//! | [`notify`] | Notification sink trait and Telegram sink |
//! | [`registry`] | Indicator registry and report layouts |
//! | [`report`] | Line rendering and bulletin composition |
//! | [`resolver`] | Ticker fallback resolution |
//! | [`source`] | Provider identifiers |
//! | [`units`] | Display units and number formatting |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use macrobrief_core::{
//!     default_registry, AppConfig, BriefingEngine, DisplayMode, ReportKind,
//!     ReqwestHttpClient, TelegramSink, TickerFallbackResolver,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let http = Arc::new(ReqwestHttpClient::new());
//!     let registry = default_registry()?;
//!     let resolver = TickerFallbackResolver::builder(http.clone())
//!         .with_fred_key(config.secrets.fred_api_key.expose())
//!         .build();
//!     let engine = BriefingEngine::new(&registry, resolver, config.settings);
//!
//!     let outcome = engine
//!         .build_report(ReportKind::Liquidity, DisplayMode::Closed, "03/15")
//!         .await?;
//!     let sink = TelegramSink::new(
//!         http,
//!         config.secrets.telegram_token.expose(),
//!         config.secrets.chat_id.clone(),
//!     );
//!     engine.deliver(&outcome.bulletins, &sink).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Candidate failures are structured [`SourceError`] values with stable
//! codes. They never escape an indicator: the resolver collects them and the
//! engine renders a placeholder line instead.
//!
//! ```rust
//! use macrobrief_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::InsufficientData => "too few valid observations",
//!         SourceErrorKind::Unavailable => "backend failed, next candidate",
//!         _ => error.code(),
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - Secrets are read from environment variables only and redact in `Debug`
//! - Transport errors are stripped of URLs before they reach logs

pub mod adapters;
pub mod config;
pub mod data_source;
pub mod delta;
pub mod domain;
pub mod engine;
pub mod error;
pub mod filter;
pub mod http_client;
pub mod notify;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod source;
pub mod units;

// Adapter implementations
pub use adapters::{FredSource, YahooSource};

// Configuration
pub use config::{AppConfig, RunSettings, Secret, Secrets};

// Series source trait and types
pub use data_source::{Lookback, SeriesRequest, SeriesSource, SourceError, SourceErrorKind};

// Deltas
pub use delta::{percent_change, Delta, DisplayMode, Horizon, Snapshot, VolumeChange};

// Domain models
pub use domain::{
    Candidate, FilteredSeries, Indicator, Observation, Series, Ticker, UtcDateTime, ValidityRule,
    ValueField,
};

// Orchestration
pub use engine::{
    BriefingEngine, BulletinFailure, DeliveryReport, IndicatorOutcome, IndicatorStatus,
    ReportOutcome,
};

// Error types
pub use error::{ConfigError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpFuture, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Notification
pub use notify::{DeliveryError, DeliveryStatus, NotificationSink, SendFuture, TelegramSink};

// Registry
pub use registry::{default_registry, IndicatorRegistry, ReportKind, ReportSpec, SectionSpec};

// Rendering
pub use report::{Bulletin, MarkupMode, RenderedLine, ReportComposer, Section};

// Resolution
pub use resolver::{
    CandidateAttempt, Resolution, ResolveFailure, ResolveResult, ResolverBuilder,
    TickerFallbackResolver,
};

// Source identifiers
pub use source::ProviderId;

// Units
pub use units::Unit;
