use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{format_description, Date, OffsetDateTime, Time, UtcOffset};

use crate::ValidationError;

const DATE_FORMAT: &str = "[year]-[month]-[day]";
const MONTH_DAY_FORMAT: &str = "[month]/[day]";

/// Observation timestamp, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    /// Parses a `YYYY-MM-DD` calendar date (FRED observation dates) as midnight UTC.
    pub fn parse_date(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate {
            value: input.to_owned(),
        };

        let format = format_description::parse(DATE_FORMAT).map_err(|_| invalid())?;
        let date = Date::parse(input.trim(), &format).map_err(|_| invalid())?;
        Ok(Self(date.with_time(Time::MIDNIGHT).assume_utc()))
    }

    /// Converts a unix timestamp in seconds (Yahoo chart timestamps).
    pub fn from_unix_timestamp(seconds: i64) -> Result<Self, ValidationError> {
        OffsetDateTime::from_unix_timestamp(seconds)
            .map(Self)
            .map_err(|_| ValidationError::InvalidUnixTimestamp { value: seconds })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// `YYYY-MM-DD`, the format FRED expects for `observation_start`.
    pub fn format_date(self) -> String {
        self.format_with(DATE_FORMAT)
    }

    /// Short `MM/DD` label used in bulletins.
    pub fn month_day_label(self) -> String {
        self.format_with(MONTH_DAY_FORMAT)
    }

    fn format_with(self, description: &str) -> String {
        format_description::parse(description)
            .ok()
            .and_then(|items| self.0.date().format(&items).ok())
            .unwrap_or_default()
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.format_date())
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}
