//! Timestamp helpers.
//!
//! Every timestamp written by this crate comes from [`now`]; nothing is ever
//! rendered from a fixed or placeholder date.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Current UTC time truncated to whole seconds, matching the on-disk format.
pub fn now() -> DateTime<Utc> {
    let t = Utc::now();
    DateTime::from_timestamp(t.timestamp(), 0).unwrap_or(t)
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

/// `2026-10-18T09:30:00Z`
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an ISO-8601 timestamp that must be expressed in UTC (`Z` or
/// `+00:00`). Offsets other than zero are rejected so that files never mix
/// local times into the record.
pub fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let parsed = DateTime::parse_from_rfc3339(s).ok()?;
    if parsed.offset().local_minus_utc() != 0 {
        return None;
    }
    Some(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_has_no_fraction() {
        let ts = now();
        let s = format_ts(&ts);
        assert!(s.ends_with('Z'));
        assert_eq!(s.len(), "2026-10-18T09:30:00Z".len());
        assert_eq!(parse_utc(&s), Some(ts));
    }

    #[test]
    fn parse_accepts_utc_only() {
        assert!(parse_utc("2026-10-18T09:30:00Z").is_some());
        assert!(parse_utc("2026-10-18T09:30:00+00:00").is_some());
        assert!(parse_utc("2026-10-18T09:30:00+02:00").is_none());
        assert!(parse_utc("2026-10-18").is_none());
        assert!(parse_utc("YYYY-MM-DDTHH:MM:SSZ").is_none());
    }
}
