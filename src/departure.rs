//! Departure time parsing.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Accepted layouts with an explicit offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y%m%dT%H%M%S%z",
];

/// Accepted layouts without an offset; read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%Y%m%dT%H%M",
];

/// Hour-only layouts, parsed after appending `:00`.
const HOUR_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Parse an ISO 8601 timestamp into UTC.
///
/// A trailing `Z`, an explicit offset with or without a colon, or no offset
/// at all (taken as UTC) are accepted. So are basic layouts such as
/// `20250727T170000`, hour-only times and bare dates (midnight UTC).
pub fn parse_departure_time(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    let normalized = match input.strip_suffix('Z').or_else(|| input.strip_suffix('z')) {
        Some(rest) => format!("{}+00:00", rest),
        None => input.to_string(),
    };

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if input.len() == 13 {
        let padded = format!("{}:00", input);
        for format in HOUR_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&padded, format) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y%m%d"))
        .ok()
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// 09:00 UTC three days after `now`.
pub fn default_departure_time(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = (now + Duration::days(3)).date_naive();
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(nine))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_zulu() {
        assert_eq!(
            parse_departure_time("2025-07-27T17:00:00Z"),
            Some(utc(2025, 7, 27, 17, 0, 0))
        );
    }

    #[test]
    fn test_parse_offset_converts_to_utc() {
        assert_eq!(
            parse_departure_time("2025-07-27T17:00:00+05:30"),
            Some(utc(2025, 7, 27, 11, 30, 0))
        );
    }

    #[test]
    fn test_parse_naive_is_utc() {
        assert_eq!(
            parse_departure_time("2025-07-27T17:00:00"),
            Some(utc(2025, 7, 27, 17, 0, 0))
        );
        assert_eq!(
            parse_departure_time("2025-07-27 08:15"),
            Some(utc(2025, 7, 27, 8, 15, 0))
        );
        assert_eq!(
            parse_departure_time("2025-07-27"),
            Some(utc(2025, 7, 27, 0, 0, 0))
        );
    }

    #[test]
    fn test_parse_compact_layouts() {
        assert_eq!(
            parse_departure_time("2025-07-27T17:00:00+0530"),
            Some(utc(2025, 7, 27, 11, 30, 0))
        );
        assert_eq!(
            parse_departure_time("20250727T170000"),
            Some(utc(2025, 7, 27, 17, 0, 0))
        );
        assert_eq!(
            parse_departure_time("20250727T170000Z"),
            Some(utc(2025, 7, 27, 17, 0, 0))
        );
        assert_eq!(
            parse_departure_time("2025-07-27T17"),
            Some(utc(2025, 7, 27, 17, 0, 0))
        );
        assert_eq!(
            parse_departure_time("20250727"),
            Some(utc(2025, 7, 27, 0, 0, 0))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_departure_time("tomorrow at nine"), None);
        assert_eq!(parse_departure_time("2025-13-40T00:00:00Z"), None);
        assert_eq!(parse_departure_time(""), None);
    }

    #[test]
    fn test_default_departure_time() {
        let now = utc(2025, 7, 24, 22, 45, 13);
        assert_eq!(default_departure_time(now), utc(2025, 7, 27, 9, 0, 0));
    }
}
