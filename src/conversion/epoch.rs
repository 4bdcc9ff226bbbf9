//! FIT timestamps: whole seconds since 1989-12-31T00:00:00Z.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Unix time of the FIT epoch.
pub const FIT_EPOCH_UNIX: i64 = 631_065_600;

/// Convert a UTC instant to FIT seconds. Instants before the epoch or past
/// the `u32` range have no FIT representation.
pub fn to_fit_seconds(instant: DateTime<Utc>) -> Option<u32> {
    u32::try_from(instant.timestamp() - FIT_EPOCH_UNIX).ok()
}

/// Current time in FIT seconds, clamped to the representable range.
pub fn now_fit_seconds() -> u32 {
    let elapsed = Utc::now().timestamp() - FIT_EPOCH_UNIX;
    elapsed.clamp(0, u32::MAX as i64) as u32
}

/// Parse a document timestamp.
///
/// Accepts RFC 3339 (`2014-03-02T10:00:00Z`, `2014-03-02T10:00:00.250+01:00`)
/// and zone-less `YYYY-MM-DDTHH:MM:SS[.fff]`, which is read as UTC.
/// Fractional seconds are dropped.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// The FIT epoch as a UTC instant.
pub fn fit_epoch() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1989, 12, 31)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}
