//! Display units and number formatting.
//!
//! Conversion is a plain division, applied the same way to current values,
//! reference values and absolute deltas. Percentage changes are always taken
//! on native values (see [`crate::delta::percent_change`]), so rescaling never
//! alters them.

use serde::Serialize;

use crate::ValidationError;

/// Display unit of an indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Unit {
    /// Native provider unit divided by `divisor`, rendered with `suffix` (`B`, `T`, or empty).
    Scaled { divisor: f64, suffix: String },
    /// Percent rate, passed through unchanged and rendered with `%`.
    Percent,
}

impl Unit {
    pub fn scaled(divisor: f64, suffix: impl Into<String>) -> Result<Self, ValidationError> {
        if !divisor.is_finite() || divisor <= 0.0 {
            return Err(ValidationError::InvalidScaleDivisor);
        }
        Ok(Self::Scaled {
            divisor,
            suffix: suffix.into(),
        })
    }

    /// Prices shown in their native unit.
    pub fn plain() -> Self {
        Self::Scaled {
            divisor: 1.0,
            suffix: String::new(),
        }
    }

    pub const fn is_percent(&self) -> bool {
        matches!(self, Self::Percent)
    }

    pub fn suffix(&self) -> &str {
        match self {
            Self::Scaled { suffix, .. } => suffix,
            Self::Percent => "%",
        }
    }

    /// Native → display value.
    pub fn convert(&self, value: f64) -> f64 {
        match self {
            Self::Scaled { divisor, .. } => value / divisor,
            Self::Percent => value,
        }
    }

    /// Formats a native value in display units, e.g. `7.05T` or `18,100.00`.
    pub fn render(&self, native: f64, precision: usize) -> String {
        format!(
            "{}{}",
            format_grouped(self.convert(native), precision),
            self.suffix()
        )
    }

    /// Formats a native delta with an explicit sign, e.g. `+0.05T`.
    pub fn render_signed(&self, native: f64, precision: usize) -> String {
        format!(
            "{}{}",
            format_signed(self.convert(native), precision),
            self.suffix()
        )
    }
}

/// Fixed precision with `,` thousands separators.
pub fn format_grouped(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*}", precision, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(formatted.len() + integer.len() / 3 + 1);
    if value.is_sign_negative() && formatted.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        grouped.push('-');
    }
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

/// Like [`format_grouped`] with a leading `+` for non-negative values.
pub fn format_signed(value: f64, precision: usize) -> String {
    let magnitude = format_grouped(value.abs(), precision);
    let rounds_to_zero = !magnitude.bytes().any(|b| b.is_ascii_digit() && b != b'0');
    if value >= 0.0 || rounds_to_zero {
        format!("+{magnitude}")
    } else {
        format!("-{magnitude}")
    }
}
