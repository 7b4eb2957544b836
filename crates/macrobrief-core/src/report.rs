//! Bulletin rendering and message splitting.
//!
//! Every rendered line follows one layout:
//!
//! ```text
//! 🔺 Money Market Funds: 7.00T → 7.05T [+0.05T] (+0.71%)
//!   · 1W (03/08 6.98T): +1.00%
//!   · Vol 1,200 (+33.33%)
//! ```
//!
//! The first requested horizon fills the main line; every further horizon
//! gets a compact entry with its reference date.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use crate::delta::Snapshot;
use crate::units::{format_grouped, format_signed};
use crate::{Indicator, ValidationError};

pub const UP_MARKER: &str = "🔺";
pub const DOWN_MARKER: &str = "🔻";
pub const UNAVAILABLE_TEXT: &str = "data unavailable";
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 4_096;

/// Text markup understood by the notification sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkupMode {
    Plain,
    /// Telegram's HTML subset: `<b>` plus entity escaping.
    #[default]
    SimpleMarkup,
}

impl MarkupMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::SimpleMarkup => "html",
        }
    }

    /// Telegram `parse_mode` value, absent for plain text.
    pub const fn parse_mode(self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::SimpleMarkup => Some("HTML"),
        }
    }

    pub fn escape(self, text: &str) -> String {
        match self {
            Self::Plain => text.to_owned(),
            Self::SimpleMarkup => text
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;"),
        }
    }

    pub fn bold(self, text: &str) -> String {
        match self {
            Self::Plain => text.to_owned(),
            Self::SimpleMarkup => format!("<b>{}</b>", self.escape(text)),
        }
    }

    /// Cuts `text` to at most `max_chars` chars ending in `…`. Under HTML the
    /// cut never splits a tag or an entity and an open `<b>` is closed.
    pub fn truncate(self, text: &str, max_chars: usize) -> String {
        const ELLIPSIS: char = '…';
        const CLOSE_BOLD: &str = "</b>";

        let reserve = match self {
            Self::Plain => 1,
            Self::SimpleMarkup => 1 + CLOSE_BOLD.len(),
        };
        let mut cut: String = text.chars().take(max_chars.saturating_sub(reserve)).collect();

        if self == Self::SimpleMarkup {
            if let Some(open) = cut.rfind('<') {
                if !cut[open..].contains('>') {
                    cut.truncate(open);
                }
            }
            if let Some(amp) = cut.rfind('&') {
                if !cut[amp..].contains(';') {
                    cut.truncate(amp);
                }
            }
        }

        cut.push(ELLIPSIS);
        if self == Self::SimpleMarkup && cut.matches("<b>").count() > cut.matches(CLOSE_BOLD).count() {
            cut.push_str(CLOSE_BOLD);
        }
        cut
    }
}

impl Display for MarkupMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkupMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "html" | "simple" | "simple_markup" => Ok(Self::SimpleMarkup),
            _ => Err(ValidationError::InvalidMarkupMode {
                value: value.to_owned(),
            }),
        }
    }
}

/// Formatted text for one indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedLine {
    pub indicator_id: String,
    pub text: String,
    pub available: bool,
}

impl RenderedLine {
    pub fn from_snapshot(indicator: &Indicator, snapshot: &Snapshot, markup: MarkupMode) -> Self {
        let unit = &indicator.unit;
        let precision = indicator.precision;
        let mut text = String::new();

        match snapshot.primary() {
            Some(primary) => {
                // The marker follows the printed change, which is already rounded.
                let change = unit.render_signed(primary.absolute, precision);
                let marker = if change.starts_with('-') {
                    DOWN_MARKER
                } else {
                    UP_MARKER
                };
                text.push_str(&format!(
                    "{marker} {}: {} → {} [{change}]",
                    markup.bold(&indicator.name),
                    unit.render(primary.reference.value, precision),
                    unit.render(snapshot.current_value, precision),
                ));
                if !unit.is_percent() {
                    text.push_str(&format!(" ({}%)", format_signed(primary.percent, 2)));
                }
            }
            None => text.push_str(&format!(
                "{}: {}",
                markup.bold(&indicator.name),
                unit.render(snapshot.current_value, precision)
            )),
        }

        for delta in snapshot.deltas.iter().skip(1) {
            text.push_str(&format!(
                "\n  · {} ({} {}): {}%",
                delta.horizon.label,
                delta.reference.ts.month_day_label(),
                unit.render(delta.reference.value, precision),
                format_signed(delta.percent, 2),
            ));
        }

        if indicator.show_volume {
            if let Some(volume) = snapshot.volume {
                text.push_str(&format!(
                    "\n  · Vol {} ({}%)",
                    format_grouped(volume.current, 0),
                    format_signed(volume.percent, 2),
                ));
            }
        }

        Self {
            indicator_id: indicator.id.clone(),
            text,
            available: true,
        }
    }

    /// Placeholder kept in the failed indicator's position.
    pub fn unavailable(indicator: &Indicator, markup: MarkupMode) -> Self {
        Self {
            indicator_id: indicator.id.clone(),
            text: format!("{}: {UNAVAILABLE_TEXT}", markup.escape(&indicator.name)),
            available: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub lines: Vec<RenderedLine>,
}

impl Section {
    pub fn new(name: impl Into<String>, lines: Vec<RenderedLine>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    pub fn render(&self, markup: MarkupMode) -> String {
        let mut parts = Vec::with_capacity(self.lines.len() + 1);
        if !self.name.is_empty() {
            parts.push(markup.bold(&self.name));
        }
        parts.extend(self.lines.iter().map(|line| line.text.clone()));
        parts.join("\n")
    }
}

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bulletin {
    pub title: String,
    pub sections: Vec<Section>,
    pub footer: Option<String>,
    pub markup: MarkupMode,
}

impl Bulletin {
    pub fn render(&self) -> String {
        render_parts(&self.title, &self.sections, self.footer.as_deref(), self.markup)
    }
}

fn render_parts(
    title: &str,
    sections: &[Section],
    footer: Option<&str>,
    markup: MarkupMode,
) -> String {
    let mut blocks = Vec::with_capacity(sections.len() + 2);
    blocks.push(markup.bold(title));
    blocks.extend(sections.iter().map(|section| section.render(markup)));
    if let Some(footer) = footer {
        blocks.push(markup.escape(footer));
    }
    blocks.join("\n\n")
}

fn text_len(text: &str) -> usize {
    text.chars().count()
}

/// Groups sections into bulletins that fit the sink's message limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportComposer {
    markup: MarkupMode,
    max_len: usize,
}

impl Default for ReportComposer {
    fn default() -> Self {
        Self::new(MarkupMode::default(), DEFAULT_MAX_MESSAGE_LEN)
    }
}

impl ReportComposer {
    pub const fn new(markup: MarkupMode, max_len: usize) -> Self {
        Self { markup, max_len }
    }

    pub const fn markup(&self) -> MarkupMode {
        self.markup
    }

    /// Spreads sections over `title (i/n)` bulletins when one message would
    /// exceed the limit. The footer goes on the last bulletin only.
    pub fn compose(
        &self,
        title: &str,
        sections: Vec<Section>,
        footer: Option<String>,
    ) -> Vec<Bulletin> {
        if text_len(&render_parts(title, &sections, footer.as_deref(), self.markup)) <= self.max_len
        {
            return vec![Bulletin {
                title: title.to_owned(),
                sections,
                footer,
                markup: self.markup,
            }];
        }

        let sizing_title = format!("{title} (00/00)");
        let measure = |candidate: &[Section]| {
            text_len(&render_parts(
                &sizing_title,
                candidate,
                footer.as_deref(),
                self.markup,
            ))
        };
        let fits = |candidate: &[Section]| measure(candidate) <= self.max_len;

        let mut groups: Vec<Vec<Section>> = Vec::new();
        let mut current: Vec<Section> = Vec::new();
        for section in sections
            .into_iter()
            .flat_map(|section| self.split_section(section, &measure))
        {
            current.push(section);
            if current.len() > 1 && !fits(&current) {
                if let Some(overflow) = current.pop() {
                    groups.push(std::mem::take(&mut current));
                    current.push(overflow);
                }
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }

        let total = groups.len();
        groups
            .into_iter()
            .enumerate()
            .map(|(index, sections)| Bulletin {
                title: format!("{title} ({}/{total})", index + 1),
                sections,
                footer: if index + 1 == total {
                    footer.clone()
                } else {
                    None
                },
                markup: self.markup,
            })
            .collect()
    }

    /// Breaks a section that cannot fit on its own into same-named parts.
    fn split_section(
        &self,
        section: Section,
        measure: &impl Fn(&[Section]) -> usize,
    ) -> Vec<Section> {
        let fits = |candidate: &Section| measure(std::slice::from_ref(candidate)) <= self.max_len;
        if fits(&section) {
            return vec![section];
        }

        let Section { name, lines } = section;
        let mut parts: Vec<Section> = Vec::new();
        let mut current = Section::new(name.clone(), Vec::new());
        for line in lines {
            current.lines.push(self.fit_line(&name, line, measure));
            if current.lines.len() > 1 && !fits(&current) {
                if let Some(overflow) = current.lines.pop() {
                    parts.push(std::mem::replace(
                        &mut current,
                        Section::new(name.clone(), vec![overflow]),
                    ));
                }
            }
        }
        if !current.lines.is_empty() {
            parts.push(current);
        }
        parts
    }

    /// Shortens a line that exceeds the limit even alone in a bulletin.
    fn fit_line(
        &self,
        section_name: &str,
        line: RenderedLine,
        measure: &impl Fn(&[Section]) -> usize,
    ) -> RenderedLine {
        let alone = measure(&[Section::new(section_name, vec![line.clone()])]);
        if alone <= self.max_len {
            return line;
        }

        let budget = text_len(&line.text).saturating_sub(alone - self.max_len);
        warn!(
            indicator = %line.indicator_id,
            length = alone,
            max_len = self.max_len,
            "line exceeds message limit, truncating"
        );
        RenderedLine {
            text: self.markup.truncate(&line.text, budget),
            ..line
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{compute, DisplayMode, Horizon};
    use crate::units::Unit;
    use crate::{Candidate, FilteredSeries, Observation, ProviderId, Ticker, UtcDateTime};

    fn series(values: &[f64]) -> FilteredSeries {
        let observations = values
            .iter()
            .enumerate()
            .map(|(day, &value)| {
                let ts = UtcDateTime::from_unix_timestamp(1_709_251_200 + day as i64 * 86_400)
                    .expect("valid timestamp");
                Observation::new(ts, value)
            })
            .collect();
        FilteredSeries::new(
            Ticker::parse("WMMNS").expect("valid ticker"),
            ProviderId::Fred,
            observations,
            0,
        )
    }

    fn indicator(name: &str, unit: Unit) -> Indicator {
        Indicator::new(
            "ind",
            name,
            unit,
            vec![Candidate::fred("WMMNS").expect("valid candidate")],
        )
        .expect("valid indicator")
    }

    fn line(indicator: &Indicator, values: &[f64], horizons: &[Horizon], markup: MarkupMode) -> String {
        let snapshot = compute(&indicator.id, &series(values), horizons, DisplayMode::Closed)
            .expect("non-empty");
        RenderedLine::from_snapshot(indicator, &snapshot, markup).text
    }

    #[test]
    fn scaled_line_shows_converted_values_and_percent() {
        let mmf = indicator("Money Market Funds", Unit::scaled(1_000_000.0, "T").expect("valid"));

        let text = line(&mmf, &[7_000_000.0, 7_050_000.0], &[Horizon::DAILY], MarkupMode::Plain);

        assert_eq!(text, "🔺 Money Market Funds: 7.00T → 7.05T [+0.05T] (+0.71%)");
    }

    #[test]
    fn percent_line_has_no_extra_percentage() {
        let ten_year = indicator("US 10Y", Unit::Percent);

        let text = line(&ten_year, &[4.10, 4.25], &[Horizon::DAILY], MarkupMode::Plain);

        assert_eq!(text, "🔺 US 10Y: 4.10% → 4.25% [+0.15%]");
    }

    #[test]
    fn negative_delta_uses_down_marker() {
        let ten_year = indicator("US 10Y", Unit::Percent).with_precision(3);

        let text = line(&ten_year, &[4.25, 4.1], &[Horizon::DAILY], MarkupMode::Plain);

        assert!(text.starts_with("🔻 US 10Y: 4.250% → 4.100% [-0.150%]"));
    }

    #[test]
    fn change_rounding_to_zero_uses_up_marker() {
        let ten_year = indicator("US 10Y", Unit::Percent).with_precision(3);

        let text = line(&ten_year, &[4.2500, 4.2496], &[Horizon::DAILY], MarkupMode::Plain);

        assert_eq!(text, "🔺 US 10Y: 4.250% → 4.250% [+0.000%]");
    }

    #[test]
    fn further_horizons_render_compact_entries() {
        let gold = indicator("Gold Futures", Unit::plain());
        let values = (0..25).map(|i| 2_000.0 + f64::from(i)).collect::<Vec<_>>();

        let text = line(&gold, &values, &Horizon::STANDARD, MarkupMode::Plain);
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("🔺 Gold Futures: 2,023.00 → 2,024.00 [+1.00]"));
        assert!(lines[1].starts_with("  · 1W (03/20 2,019.00): +"));
        assert!(lines[2].starts_with("  · 1M (03/05 2,004.00): +"));
    }

    #[test]
    fn html_markup_bolds_and_escapes_names() {
        let spx = indicator("S&P 500 Futures", Unit::plain());

        let text = line(&spx, &[5_000.0, 5_010.0], &[Horizon::DAILY], MarkupMode::SimpleMarkup);
        let placeholder = RenderedLine::unavailable(&spx, MarkupMode::SimpleMarkup);

        assert!(text.contains("<b>S&amp;P 500 Futures</b>"));
        assert_eq!(placeholder.text, "S&amp;P 500 Futures: data unavailable");
        assert!(!placeholder.available);
    }

    #[test]
    fn composing_twice_is_identical() {
        let composer = ReportComposer::new(MarkupMode::SimpleMarkup, DEFAULT_MAX_MESSAGE_LEN);
        let mmf = indicator("MMF", Unit::scaled(1_000_000.0, "T").expect("valid"));
        let sections = vec![Section::new(
            "Liquidity",
            vec![RenderedLine::unavailable(&mmf, MarkupMode::SimpleMarkup)],
        )];

        let first = composer.compose("Report", sections.clone(), Some(String::from("footer")));
        let second = composer.compose("Report", sections, Some(String::from("footer")));

        assert_eq!(first, second);
        assert_eq!(first[0].render(), second[0].render());
    }

    #[test]
    fn sections_are_joined_by_blank_lines() {
        let composer = ReportComposer::new(MarkupMode::Plain, DEFAULT_MAX_MESSAGE_LEN);
        let x = indicator("X", Unit::Percent);
        let bulletins = composer.compose(
            "Title",
            vec![
                Section::new("A", vec![RenderedLine::unavailable(&x, MarkupMode::Plain)]),
                Section::new("B", vec![RenderedLine::unavailable(&x, MarkupMode::Plain)]),
            ],
            Some(String::from("Footer")),
        );

        assert_eq!(bulletins.len(), 1);
        assert_eq!(
            bulletins[0].render(),
            "Title\n\nA\nX: data unavailable\n\nB\nX: data unavailable\n\nFooter"
        );
    }

    #[test]
    fn oversized_report_is_split_with_numbered_titles() {
        let composer = ReportComposer::new(MarkupMode::Plain, 80);
        let x = indicator("Indicator With A Long Name", Unit::Percent);
        let section = |name: &str| {
            Section::new(
                name,
                vec![RenderedLine::unavailable(&x, MarkupMode::Plain)],
            )
        };

        let bulletins = composer.compose(
            "Market Close",
            vec![section("One"), section("Two"), section("Three")],
            Some(String::from("end")),
        );

        assert_eq!(bulletins.len(), 3);
        assert_eq!(bulletins[0].title, "Market Close (1/3)");
        assert_eq!(bulletins[2].title, "Market Close (3/3)");
        assert!(bulletins[0].footer.is_none());
        assert_eq!(bulletins[2].footer.as_deref(), Some("end"));
        for bulletin in &bulletins {
            assert!(bulletin.render().chars().count() <= 80);
        }
    }

    #[test]
    fn oversized_section_is_split_by_lines() {
        let composer = ReportComposer::new(MarkupMode::Plain, 90);
        let x = indicator("Indicator With A Long Name", Unit::Percent);
        let lines = vec![RenderedLine::unavailable(&x, MarkupMode::Plain); 3];

        let bulletins = composer.compose("Rates", vec![Section::new("Yields", lines)], None);

        assert!(bulletins.len() > 1);
        assert!(bulletins.iter().all(|b| b.sections[0].name == "Yields"));
        let total_lines: usize = bulletins.iter().map(|b| b.sections[0].lines.len()).sum();
        assert_eq!(total_lines, 3);
    }

    #[test]
    fn line_longer_than_limit_is_truncated_to_fit() {
        let composer = ReportComposer::new(MarkupMode::SimpleMarkup, 80);
        let x = indicator("Indicator", Unit::Percent);
        let long = RenderedLine {
            indicator_id: String::from("ind"),
            text: format!("{} {}", MarkupMode::SimpleMarkup.bold("Spread"), "9".repeat(200)),
            available: true,
        };
        let short = RenderedLine::unavailable(&x, MarkupMode::SimpleMarkup);

        let bulletins = composer.compose("Rates", vec![Section::new("Yields", vec![long, short])], None);

        assert!(bulletins
            .iter()
            .all(|b| b.render().chars().count() <= 80));
        let first = &bulletins[0].sections[0].lines[0];
        assert!(first.text.starts_with("<b>Spread</b> 999"));
        assert!(first.text.ends_with('…'));
    }

    #[test]
    fn html_truncation_keeps_tags_and_entities_whole() {
        let markup = MarkupMode::SimpleMarkup;

        assert_eq!(markup.truncate("<b>AT&amp;T Corp</b>", 12), "<b>AT…</b>");
        assert_eq!(markup.truncate("<b>Name</b>: 1.00", 14), "<b>Name…</b>");
        assert_eq!(MarkupMode::Plain.truncate("abcdef", 4), "abc…");
    }

    #[test]
    fn markup_mode_parses_cli_names() {
        assert_eq!("html".parse::<MarkupMode>(), Ok(MarkupMode::SimpleMarkup));
        assert_eq!("Plain".parse::<MarkupMode>(), Ok(MarkupMode::Plain));
        assert_eq!(MarkupMode::Plain.parse_mode(), None);
        assert!("markdown".parse::<MarkupMode>().is_err());
    }
}
