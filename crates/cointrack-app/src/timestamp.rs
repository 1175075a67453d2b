// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Timestamp handling for server payloads.
//!
//! The server mixes RFC 3339 strings, naive ISO date-times written by browser
//! inputs, bare dates, and the literal `"N/A"` for "never". Naive values are
//! read as UTC.

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub const ABSENT_MARKER: &str = "N/A";

pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == ABSENT_MARKER {
        return None;
    }

    if let Ok(value) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(value);
    }

    let naive_formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ];
    for format in naive_formats {
        if let Ok(value) = PrimitiveDateTime::parse(trimmed, format) {
            return Some(value.assume_utc());
        }
    }

    parse_date(trimmed).map(|date| date.midnight().assume_utc())
}

pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

pub fn format_timestamp(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

/// Serde adapter for timestamps that must be present.
pub mod required {
    use super::parse_timestamp;
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = value.format(&Rfc3339).map_err(S::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp {raw:?}")))
    }
}

/// Serde adapter for timestamps that may be `null`, missing, `"N/A"`, or
/// unreadable; all of those decode to `None`.
pub mod optional {
    use super::parse_timestamp;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => {
                let formatted = value.format(&Rfc3339).map_err(S::Error::custom)?;
                serializer.serialize_str(&formatted)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::{format_date, parse_date, parse_timestamp};
    use time::macros::{date, datetime};

    #[test]
    fn parses_rfc3339_with_offset_and_fraction() {
        let parsed = parse_timestamp("2025-03-04T05:06:07.123456+00:00").expect("rfc3339");
        assert_eq!(parsed.date(), date!(2025 - 03 - 04));
        assert_eq!(parsed.microsecond(), 123_456);
    }

    #[test]
    fn naive_values_are_read_as_utc() {
        assert_eq!(
            parse_timestamp("2025-03-04T05:06"),
            Some(datetime!(2025-03-04 05:06 UTC))
        );
        assert_eq!(
            parse_timestamp("2025-03-04T05:06:07"),
            Some(datetime!(2025-03-04 05:06:07 UTC))
        );
        assert_eq!(
            parse_timestamp("2025-03-04"),
            Some(datetime!(2025-03-04 00:00 UTC))
        );
    }

    #[test]
    fn absent_marker_and_garbage_are_none() {
        assert_eq!(parse_timestamp("N/A"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("last tuesday"), None);
    }

    #[test]
    fn date_helpers_use_iso_calendar_dates() {
        assert_eq!(parse_date("2024-12-31"), Some(date!(2024 - 12 - 31)));
        assert_eq!(parse_date("12/31/2024"), None);
        assert_eq!(format_date(date!(2024 - 01 - 05)), "2024-01-05");
    }
}
