//! JST civil-time utilities.
//!
//! Every piece of business logic in this crate reasons about calendar days
//! in one fixed timezone, Asia/Tokyo. Instants are carried as
//! `DateTime<Utc>` internally; this module owns every conversion between an
//! instant and its JST civil representation, so nothing else in the crate
//! (or in callers) needs to touch host-locale or host-timezone behavior.
//!
//! All functions here are pure and total. JST has had a fixed +09:00 offset
//! with no DST for all modern dates, so local-time construction cannot hit
//! an ambiguous or skipped wall-clock time in practice; the fallback paths
//! exist only to keep the functions total.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, YoteiError};

/// The fixed business timezone. All civil-day boundaries, day keys, and wire
/// strings are computed against this zone.
pub const JST: Tz = chrono_tz::Asia::Tokyo;

/// Civil date in JST, formatted `YYYY-MM-DD`.
///
/// This is the sole grouping/equality key for "same calendar day": two
/// instants fall on the same JST day iff their date keys are equal.
pub fn date_key(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&JST).format("%Y-%m-%d").to_string()
}

/// The JST civil date containing `instant`.
pub fn local_date(instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&JST).date_naive()
}

/// Whether two instants fall on the same JST civil day.
pub fn is_same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    local_date(a) == local_date(b)
}

/// Construct the instant at a JST wall-clock time.
///
/// Total: JST has no DST transitions, so the single-result path is always
/// taken for real dates; the gap fallback reconstructs the instant from the
/// zone's fixed +09:00 offset.
pub fn at_local(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = NaiveDateTime::new(date, time);
    match JST.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&(naive - Duration::hours(9))),
    }
}

/// 00:00:00.000 JST of the civil day containing `instant`.
pub fn start_of_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    at_local(local_date(instant), NaiveTime::MIN)
}

/// 23:59:59.999 JST of the civil day containing `instant`.
pub fn end_of_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    at_local(local_date(instant), last)
}

/// JST midnight of the civil date `n` days after the one containing
/// `instant`.
///
/// Works on the civil day number, not on `n * 86400` seconds, so
/// `date_key(add_days(d, n))` always advances by exactly `n` Gregorian days.
pub fn add_days(instant: DateTime<Utc>, n: i64) -> DateTime<Utc> {
    let target = local_date(instant) + Duration::days(n);
    at_local(target, NaiveTime::MIN)
}

/// Serialize an instant as `YYYY-MM-DDTHH:MM:SS+09:00`, the wire format the
/// external calendar expects.
pub fn to_fixed_offset_iso(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&JST)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}

/// Parse an RFC 3339 instant (any offset) into `DateTime<Utc>`.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| YoteiError::InvalidDatetime(format!("'{}': {}", s, e)))
}

/// Round an instant up to the next 15-minute boundary.
///
/// Already-aligned instants are returned unchanged (idempotent).
pub fn round_up_to_quarter_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    const QUARTER: i64 = 15 * 60;
    let mut secs = instant.timestamp();
    if instant.timestamp_subsec_nanos() > 0 {
        secs += 1;
    }
    let rem = secs.rem_euclid(QUARTER);
    let rounded = if rem == 0 { secs } else { secs + (QUARTER - rem) };
    DateTime::<Utc>::from_timestamp(rounded, 0).unwrap_or(instant)
}

/// Serde adapter: `DateTime<Utc>` ↔ fixed-offset JST ISO string.
///
/// Use with `#[serde(with = "crate::civil::jst_instant")]`.
pub mod jst_instant {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&super::to_fixed_offset_iso(*dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(de)?;
        super::parse_instant(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<DateTime<Utc>>`, `null` ↔ `None`.
pub mod jst_instant_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        dt: &Option<DateTime<Utc>>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => ser.serialize_some(&super::to_fixed_offset_iso(*dt)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let s: Option<String> = Option::deserialize(de)?;
        match s {
            Some(s) => super::parse_instant(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
