//! Conversions between stored UTC instants and den-local wall-clock time.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use log::warn;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The zone a den renders its calendar in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenZone {
    Named(Tz),
    HostLocal,
}

impl DenZone {
    pub fn name(&self) -> String {
        match self {
            DenZone::Named(tz) => tz.name().to_string(),
            DenZone::HostLocal => "local".to_string(),
        }
    }
}

/// Unknown or empty zone names fall back to the host zone.
pub fn resolve_zone(name: Option<&str>) -> DenZone {
    let Some(raw) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return DenZone::HostLocal;
    };
    match raw.parse::<Tz>() {
        Ok(tz) => DenZone::Named(tz),
        Err(_) => {
            warn!("Unknown time zone '{}', falling back to host local zone", raw);
            DenZone::HostLocal
        }
    }
}

/// A timestamp as read from storage: either an explicit instant or a naive
/// wall-clock value that already is local time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoredTime {
    Utc(DateTime<Utc>),
    Unspecified(NaiveDateTime),
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

impl StoredTime {
    /// RFC 3339 input with an offset is an instant; input without one is
    /// taken as wall-clock time.
    pub fn parse(raw: &str) -> Option<StoredTime> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(StoredTime::Utc(dt.with_timezone(&Utc)));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(StoredTime::Unspecified)
    }
}

impl From<DateTime<Utc>> for StoredTime {
    fn from(dt: DateTime<Utc>) -> Self {
        StoredTime::Utc(dt)
    }
}

pub fn to_local(time: StoredTime, zone: &DenZone) -> NaiveDateTime {
    match time {
        StoredTime::Unspecified(naive) => naive,
        StoredTime::Utc(instant) => match zone {
            DenZone::Named(tz) => instant.with_timezone(tz).naive_local(),
            DenZone::HostLocal => instant.with_timezone(&Local).naive_local(),
        },
    }
}

pub fn to_utc(local: NaiveDateTime, zone: &DenZone) -> DateTime<Utc> {
    match zone {
        DenZone::Named(tz) => resolve_local(tz, local),
        DenZone::HostLocal => resolve_local(&Local, local),
    }
}

// Ambiguous wall-clock times (DST fall back) take the earlier instant; times
// inside a DST gap are pushed forward by an hour.
fn resolve_local<Z: TimeZone>(zone: &Z, local: NaiveDateTime) -> DateTime<Utc> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(first, second) => {
            let first = first.with_timezone(&Utc);
            let second = second.with_timezone(&Utc);
            first.min(second)
        }
        LocalResult::None => {
            let shifted = local + Duration::hours(1);
            match zone.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
                LocalResult::None => {
                    warn!("Local time {} does not exist, reading it as UTC", local);
                    Utc.from_utc_datetime(&local)
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub enum Meridiem {
    AM,
    PM,
}

impl std::fmt::Display for Meridiem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Meridiem::AM => write!(f, "AM"),
            Meridiem::PM => write!(f, "PM"),
        }
    }
}

/// Any integer hour wraps into 0..24 first, so 25 is 1 AM and -1 is 11 PM.
pub fn convert_to_12_hour(hour24: i64) -> (u32, Meridiem) {
    let hour = hour24.rem_euclid(24) as u32;
    let meridiem = if hour < 12 { Meridiem::AM } else { Meridiem::PM };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    (hour12, meridiem)
}

/// Anything other than a PM marker counts as AM.
pub fn convert_to_24_hour(hour12: u32, am_pm: Option<&str>) -> u32 {
    let is_pm = am_pm
        .map(|m| m.trim().replace('.', "").to_ascii_uppercase())
        .is_some_and(|m| m == "PM" || m == "P");
    let hour = hour12 % 12;
    if is_pm { hour + 12 } else { hour }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub enum HourClock {
    #[serde(rename = "12h")]
    Twelve,
    #[serde(rename = "24h")]
    TwentyFour,
}

pub fn format_local_time(local: NaiveDateTime, clock: HourClock) -> String {
    match clock {
        HourClock::TwentyFour => local.format("%H:%M").to_string(),
        HourClock::Twelve => {
            let (hour, meridiem) = convert_to_12_hour(i64::from(local.hour()));
            format!("{}:{:02} {}", hour, local.minute(), meridiem)
        }
    }
}
