//! `ICalDateTime` — the date-time value model.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// A date-time value as it can appear in an iCalendar property, tagged by
/// which of the four RFC 5545 forms it takes.
///
/// Invariant: a value never simultaneously carries a named timezone and a
/// UTC flag, and a date-only value never carries time fields — the enum
/// shape itself makes both unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ICalDateTime {
    /// All-day value, `VALUE=DATE`. Serializes as `YYYYMMDD`.
    Date(NaiveDate),
    /// UTC instant. Serializes as `YYYYMMDDTHHMMSSZ`.
    Utc(NaiveDateTime),
    /// Local wall time qualified by a named timezone (`TZID=...`).
    /// Serializes as `YYYYMMDDTHHMMSS` under a `TZID` parameter.
    Local { tzid: String, local: NaiveDateTime },
    /// Floating wall time: no timezone, no UTC flag. Serializes as
    /// `YYYYMMDDTHHMMSS` with no parameter.
    Floating(NaiveDateTime),
}

impl ICalDateTime {
    /// A placeholder floating value used while a component is still being
    /// assembled; callers overwrite it once the real property is seen.
    pub fn epoch_placeholder() -> Self {
        ICalDateTime::Floating(
            NaiveDate::from_ymd_opt(1970, 1, 1)
                .unwrap()
                .and_time(NaiveTime::MIN),
        )
    }

    pub fn is_date_only(&self) -> bool {
        matches!(self, ICalDateTime::Date(_))
    }

    pub fn is_utc(&self) -> bool {
        matches!(self, ICalDateTime::Utc(_))
    }

    pub fn tzid(&self) -> Option<&str> {
        match self {
            ICalDateTime::Local { tzid, .. } => Some(tzid.as_str()),
            _ => None,
        }
    }

    /// The naive (zone-less) date-time, midnight for date-only values.
    pub fn naive(&self) -> NaiveDateTime {
        match self {
            ICalDateTime::Date(d) => d.and_time(NaiveTime::MIN),
            ICalDateTime::Utc(dt) | ICalDateTime::Floating(dt) => *dt,
            ICalDateTime::Local { local, .. } => *local,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.naive().date()
    }

    /// Resolve to an absolute instant for comparison/expansion purposes.
    /// Floating and date-only values are interpreted in `default_tz`; a
    /// `Local` value whose `TZID` isn't a recognized IANA zone name falls
    /// back to `default_tz` as well (the parser records a
    /// `FloatingFallback` diagnostic when this happens during parsing).
    pub fn to_instant(&self, default_tz: Tz) -> Option<DateTime<Tz>> {
        match self {
            ICalDateTime::Utc(dt) => Some(Utc.from_utc_datetime(dt).with_timezone(&Tz::UTC)),
            ICalDateTime::Floating(dt) => default_tz.from_local_datetime(dt).single(),
            ICalDateTime::Date(d) => default_tz
                .from_local_datetime(&d.and_time(NaiveTime::MIN))
                .single(),
            ICalDateTime::Local { tzid, local } => {
                let tz = Tz::from_str(tzid).unwrap_or(default_tz);
                tz.from_local_datetime(local).single()
            }
        }
    }

    /// The named timezone this value resolves to, if any, independent of a
    /// caller-supplied default. Used by the parser to look up an unknown
    /// `TZID` and emit `FloatingFallback`.
    pub fn resolved_tz(&self) -> Option<Tz> {
        match self {
            ICalDateTime::Local { tzid, .. } => Tz::from_str(tzid).ok(),
            ICalDateTime::Utc(_) => Some(Tz::UTC),
            _ => None,
        }
    }

    /// Format as `YYYYMMDD`, `...Z`, or `...` with an accompanying `TZID`
    /// parameter the caller emits separately.
    pub fn format_value(&self) -> String {
        match self {
            ICalDateTime::Date(d) => d.format("%Y%m%d").to_string(),
            ICalDateTime::Utc(dt) => dt.format("%Y%m%dT%H%M%SZ").to_string(),
            ICalDateTime::Local { local, .. } | ICalDateTime::Floating(local) => {
                local.format("%Y%m%dT%H%M%S").to_string()
            }
        }
    }

    /// Parse a `YYYYMMDD[THHMMSS[Z]]` value as it appears after the `:` in a
    /// content line, given the resolved parameters (`VALUE=DATE` and/or
    /// `TZID=...`) that accompanied it.
    pub fn parse(value: &str, is_date_only: bool, tzid: Option<&str>) -> Option<Self> {
        if is_date_only {
            return NaiveDate::parse_from_str(value, "%Y%m%d")
                .ok()
                .map(ICalDateTime::Date);
        }
        if let Some(stripped) = value.strip_suffix('Z') {
            let dt = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S").ok()?;
            return Some(ICalDateTime::Utc(dt));
        }
        let dt = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
        match tzid {
            Some(tzid) => Some(ICalDateTime::Local {
                tzid: tzid.to_string(),
                local: dt,
            }),
            None => {
                // Bare date-only-looking string without time separator falls
                // back to parsing as a date.
                Some(ICalDateTime::Floating(dt))
            }
        }
    }
}

impl PartialOrd for ICalDateTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ICalDateTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.naive().cmp(&other.naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_instant() {
        let dt = ICalDateTime::parse("20240101T120000Z", false, None).unwrap();
        assert!(dt.is_utc());
        assert_eq!(dt.format_value(), "20240101T120000Z");
    }

    #[test]
    fn parses_date_only() {
        let dt = ICalDateTime::parse("20240101", true, None).unwrap();
        assert!(dt.is_date_only());
        assert_eq!(dt.format_value(), "20240101");
    }

    #[test]
    fn parses_local_with_tzid() {
        let dt = ICalDateTime::parse("20240101T090000", false, Some("America/New_York")).unwrap();
        assert_eq!(dt.tzid(), Some("America/New_York"));
        assert_eq!(dt.format_value(), "20240101T090000");
    }

    #[test]
    fn unknown_tzid_falls_back_in_to_instant() {
        let dt = ICalDateTime::parse("20240101T090000", false, Some("Not/AZone")).unwrap();
        assert!(dt.resolved_tz().is_none());
        assert!(dt.to_instant(Tz::UTC).is_some());
    }

    #[test]
    fn ordering_compares_naive_time() {
        let a = ICalDateTime::parse("20240101T090000Z", false, None).unwrap();
        let b = ICalDateTime::parse("20240102T090000Z", false, None).unwrap();
        assert!(a < b);
    }
}
