use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Decides which calendar day a stored UTC timestamp belongs to. Syncing,
/// "today" and date range queries must all use the same boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayBoundary {
    /// Time zone of the machine running the computation.
    #[default]
    Local,
    Utc,
    /// Fixed offset east of UTC, in seconds.
    Fixed(i32),
}

impl DayBoundary {
    /// Calendar date of `ts` under this boundary.
    #[must_use]
    pub fn date_of(self, ts: &DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => ts.with_timezone(&Local).date_naive(),
            Self::Utc => ts.date_naive(),
            Self::Fixed(secs) => match FixedOffset::east_opt(secs) {
                Some(offset) => ts.with_timezone(&offset).date_naive(),
                None => ts.date_naive(),
            },
        }
    }

    #[must_use]
    pub fn today(self) -> NaiveDate {
        self.date_of(&Utc::now())
    }

    /// Wall-clock time of `ts` under this boundary.
    #[must_use]
    pub fn time_of(self, ts: &DateTime<Utc>) -> NaiveTime {
        match self {
            Self::Local => ts.with_timezone(&Local).time(),
            Self::Utc => ts.time(),
            Self::Fixed(secs) => match FixedOffset::east_opt(secs) {
                Some(offset) => ts.with_timezone(&offset).time(),
                None => ts.time(),
            },
        }
    }

    /// UTC instant of wall-clock `time` on `date` under this boundary.
    pub fn at(self, date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>> {
        let local = date.and_time(time);
        match self {
            Self::Local => resolve_local(&Local, local),
            Self::Utc => Ok(Utc.from_utc_datetime(&local)),
            Self::Fixed(secs) => {
                let offset = FixedOffset::east_opt(secs)
                    .with_context(|| format!("Invalid UTC offset of {secs} seconds"))?;
                resolve_local(&offset, local)
            }
        }
    }

    /// UTC instant at which `date` starts under this boundary.
    pub fn start_of_day(self, date: NaiveDate) -> Result<DateTime<Utc>> {
        self.at(date, NaiveTime::MIN)
    }

    /// Half-open UTC range `[start, end)` covering `date`.
    pub fn day_range(self, date: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.start_of_day(date)?;
        let end = self.start_of_day(date + Duration::days(1))?;
        Ok((start, end))
    }
}

// A wall-clock time inside a DST gap resolves to the first valid instant an
// hour later. Inside a repeated hour the earlier instant wins.
fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Result<DateTime<Utc>> {
    let resolved = match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt),
        LocalResult::None => tz.from_local_datetime(&(local + Duration::hours(1))).earliest(),
    };
    resolved
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Could not resolve local time {local}"))
}

impl fmt::Display for DayBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Utc => f.write_str("utc"),
            Self::Fixed(secs) => {
                let sign = if *secs < 0 { '-' } else { '+' };
                let abs = secs.unsigned_abs();
                write!(f, "{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
            }
        }
    }
}

impl FromStr for DayBoundary {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "local" => return Ok(Self::Local),
            "utc" | "z" | "+00:00" => return Ok(Self::Utc),
            _ => {}
        }

        let (sign, rest) = match s.chars().next() {
            Some('+') => (1, &s[1..]),
            Some('-') => (-1, &s[1..]),
            _ => bail!("Invalid day boundary '{s}'. Use 'local', 'utc', or an offset like '+05:30'"),
        };
        let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
        let hours: i32 = hours
            .parse()
            .with_context(|| format!("Invalid offset hours in '{s}'"))?;
        let minutes: i32 = minutes
            .parse()
            .with_context(|| format!("Invalid offset minutes in '{s}'"))?;
        if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
            bail!("UTC offset '{s}' is out of range");
        }
        let secs = sign * (hours * 3600 + minutes * 60);
        if secs == 0 {
            return Ok(Self::Utc);
        }
        Ok(Self::Fixed(secs))
    }
}

impl Serialize for DayBoundary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayBoundary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_utc_bucketing() {
        let d = DayBoundary::Utc.date_of(&ts("2024-06-15T23:30:00Z"));
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    }

    #[test]
    fn test_fixed_offset_moves_late_utc_into_next_day() {
        let boundary: DayBoundary = "+02:00".parse().unwrap();
        let d = boundary.date_of(&ts("2024-06-15T23:30:00Z"));
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 6, 16).unwrap());
    }

    #[test]
    fn test_negative_offset_moves_early_utc_into_previous_day() {
        let boundary: DayBoundary = "-08:00".parse().unwrap();
        let d = boundary.date_of(&ts("2024-06-15T03:00:00Z"));
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("local".parse::<DayBoundary>().unwrap(), DayBoundary::Local);
        assert_eq!("UTC".parse::<DayBoundary>().unwrap(), DayBoundary::Utc);
        assert_eq!("+00:00".parse::<DayBoundary>().unwrap(), DayBoundary::Utc);
        let b: DayBoundary = "+05:30".parse().unwrap();
        assert_eq!(b, DayBoundary::Fixed(5 * 3600 + 30 * 60));
        assert_eq!(b.to_string(), "+05:30");
        let b: DayBoundary = "-3".parse().unwrap();
        assert_eq!(b.to_string(), "-03:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("tomorrow".parse::<DayBoundary>().is_err());
        assert!("+25:00".parse::<DayBoundary>().is_err());
        assert!("+05:75".parse::<DayBoundary>().is_err());
    }

    #[test]
    fn test_day_range_fixed_offset() {
        let boundary = DayBoundary::Fixed(3600);
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let (start, end) = boundary.day_range(date).unwrap();
        assert_eq!(start, ts("2024-06-14T23:00:00Z"));
        assert_eq!(end, ts("2024-06-15T23:00:00Z"));
    }

    #[test]
    fn test_day_range_contains_its_own_timestamps() {
        let boundary = DayBoundary::Local;
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let (start, end) = boundary.day_range(date).unwrap();
        assert_eq!(boundary.date_of(&start), date);
        assert_eq!(boundary.date_of(&(end - Duration::seconds(1))), date);
    }

    #[test]
    fn test_at_fixed_offset_round_trips_wall_clock() {
        let boundary = DayBoundary::Fixed(-5 * 3600);
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let stamp = boundary.at(date, noon).unwrap();
        assert_eq!(stamp, ts("2024-06-15T17:00:00Z"));
        assert_eq!(boundary.time_of(&stamp), noon);
        assert_eq!(boundary.date_of(&stamp), date);
    }

    #[test]
    fn test_at_local_keeps_wall_clock_on_dst_change_days() {
        // Spring-forward and fall-back dates in both hemispheres; under a zone
        // without DST these are ordinary days and the assertions still hold.
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let dates = [
            (2024, 3, 10),
            (2024, 3, 31),
            (2024, 4, 7),
            (2024, 10, 27),
            (2024, 11, 3),
        ];
        for (y, m, d) in dates {
            let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
            let stamp = DayBoundary::Local.at(date, noon).unwrap();
            assert_eq!(DayBoundary::Local.time_of(&stamp), noon, "on {date}");
            assert_eq!(DayBoundary::Local.date_of(&stamp), date);
        }
    }
}
