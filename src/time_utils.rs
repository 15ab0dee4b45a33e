// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
///
/// Sub-second precision is kept only when present, so stored timestamps
/// with millisecond precision survive a round trip through the API.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_whole_seconds() {
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2024-01-15T10:00:00Z");
    }

    #[test]
    fn test_format_keeps_millis() {
        let date = Utc.timestamp_millis_opt(1_705_312_800_250).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2024-01-15T10:00:00.250Z");
    }
}
