//! CLI argument definitions for macrobrief.
//!
//! One invocation builds the selected reports once and delivers them.
//! Scheduling (including weekday gating) is left to the caller, e.g. cron.
//!
//! # Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--report` | `all` | Report to build (all, liquidity, market) |
//! | `--display-mode` | `closed` | Current value: last close, or intraday value while the session is live |
//! | `--markup` | `html` | Message markup (plain, html) |
//! | `--lookback-days` | `100` | Calendar days fetched per series |
//! | `--timeout-ms` | `10000` | Per-request HTTP timeout |
//! | `--max-message-len` | `4096` | Split bulletins above this many characters |
//! | `--as-of` | today (UTC, `MM/DD`) | Date label appended to report titles |
//! | `--dry-run` | `false` | Print bulletins to stdout instead of sending |
//!
//! # Examples
//!
//! ```bash
//! # Post both reports to Telegram
//! macrobrief
//!
//! # Preview the market report while markets are open
//! macrobrief --report market --display-mode live --markup plain --dry-run
//! ```

use clap::{Parser, ValueEnum};
use macrobrief_core::{ConfigError, DisplayMode, MarkupMode, ReportKind, RunSettings};

/// Macro liquidity and market-close bulletins.
///
/// Reads FRED_API_KEY, TELEGRAM_TOKEN and CHAT_ID from the environment
/// (MACROBRIEF_-prefixed names take precedence).
#[derive(Debug, Parser)]
#[command(
    name = "macrobrief",
    author,
    version,
    about = "Macro liquidity and market-close bulletins"
)]
pub struct Cli {
    /// Report to build and deliver.
    #[arg(long, value_enum, default_value_t = ReportSelector::All)]
    pub report: ReportSelector,

    /// Which value of the latest bar counts as current.
    #[arg(long, value_enum, default_value_t = DisplayModeArg::Closed)]
    pub display_mode: DisplayModeArg,

    /// Message markup sent to the notification endpoint.
    #[arg(long, value_enum, default_value_t = MarkupArg::Html)]
    pub markup: MarkupArg,

    /// Calendar days of history fetched per series.
    #[arg(long, default_value_t = 100)]
    pub lookback_days: u32,

    /// Per-request HTTP timeout in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Maximum characters per message before a bulletin is split.
    #[arg(long, default_value_t = 4_096)]
    pub max_message_len: usize,

    /// Date label appended to report titles (default: today, MM/DD).
    #[arg(long)]
    pub as_of: Option<String>,

    /// Print bulletins to stdout instead of sending them.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportSelector {
    All,
    Liquidity,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisplayModeArg {
    /// Session open: use the intraday value of the latest bar.
    Live,
    /// Session closed: use the latest close.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MarkupArg {
    Plain,
    Html,
}

impl Cli {
    pub fn reports(&self) -> Vec<ReportKind> {
        match self.report {
            ReportSelector::All => ReportKind::ALL.to_vec(),
            ReportSelector::Liquidity => vec![ReportKind::Liquidity],
            ReportSelector::Market => vec![ReportKind::Market],
        }
    }

    pub fn display_mode(&self) -> DisplayMode {
        match self.display_mode {
            DisplayModeArg::Live => DisplayMode::Live,
            DisplayModeArg::Closed => DisplayMode::Closed,
        }
    }

    pub fn markup(&self) -> MarkupMode {
        match self.markup {
            MarkupArg::Plain => MarkupMode::Plain,
            MarkupArg::Html => MarkupMode::SimpleMarkup,
        }
    }

    pub fn settings(&self) -> Result<RunSettings, ConfigError> {
        Ok(RunSettings::default()
            .with_lookback_days(self.lookback_days)?
            .with_timeout_ms(self.timeout_ms)?
            .with_max_message_len(self.max_message_len)?
            .with_markup(self.markup()))
    }
}
