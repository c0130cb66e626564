// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time, but strictly later than `previous`.
///
/// Stored timestamps have microsecond precision, so two writes in the same
/// microsecond would otherwise compare equal.
pub fn now_after(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = truncate_micros(Utc::now());
    let floor = truncate_micros(previous) + Duration::microseconds(1);
    now.max(floor)
}

/// Current time at storage precision.
pub fn now() -> DateTime<Utc> {
    truncate_micros(Utc::now())
}

fn truncate_micros(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(t.timestamp_micros()).unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_z_suffix() {
        let t = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(format_utc_rfc3339(t), "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn now_after_is_strictly_later() {
        let future = Utc::now() + Duration::seconds(30);
        let next = now_after(future);
        assert!(next > future);

        let past = Utc::now() - Duration::days(1);
        let next = now_after(past);
        assert!(next > past);
        assert!(next >= now() - Duration::seconds(1));
    }
}
