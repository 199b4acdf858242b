//! Local calendar dates and the clock they are read from.
//!
//! Streaks are counted in local calendar days. Every completion derives its
//! `today`/`yesterday` pair exactly once, from a [`Clock`], so tests can pin
//! the date and time zone without touching wall-clock time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar date in normalized `YYYY-MM-DD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StudyDate(NaiveDate);

impl StudyDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parse a strictly normalized date string.
    ///
    /// `field` names the input in the error. Unpadded forms such as
    /// `2024-1-9` are rejected even though chrono would accept them.
    pub fn parse(field: &str, value: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedDate {
            field: field.to_string(),
            value: value.to_string(),
        };
        let bytes = value.as_bytes();
        let shape_ok = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !shape_ok {
            return Err(malformed());
        }
        NaiveDate::parse_from_str(value, DATE_FORMAT)
            .map(Self)
            .map_err(|_| malformed())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The previous calendar day, rolling over months and years.
    pub fn pred(&self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    /// Local date of `instant` as seen at the given UTC offset.
    pub fn from_instant(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self(instant.with_timezone(&offset).date_naive())
    }
}

impl fmt::Display for StudyDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for StudyDate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse("date", s)
    }
}

impl Serialize for StudyDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StudyDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The `today`/`yesterday` pair for one completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudyDays {
    pub today: StudyDate,
    pub yesterday: StudyDate,
}

impl StudyDays {
    /// Pair `today` with the calendar day before it.
    pub fn ending(today: StudyDate) -> Result<Self, ValidationError> {
        let yesterday = today.pred().ok_or_else(|| ValidationError::InvalidValue {
            field: "today".into(),
            message: format!("{today} has no previous day"),
        })?;
        Ok(Self { today, yesterday })
    }

    /// Parse and cross-check caller-supplied strings.
    pub fn parse(today: &str, yesterday: &str) -> Result<Self, ValidationError> {
        let today_date = StudyDate::parse("today", today)?;
        let yesterday_date = StudyDate::parse("yesterday", yesterday)?;
        if today_date.pred() != Some(yesterday_date) {
            return Err(ValidationError::InconsistentDays {
                today: today.to_string(),
                yesterday: yesterday.to_string(),
            });
        }
        Ok(Self {
            today: today_date,
            yesterday: yesterday_date,
        })
    }

    pub fn from_clock(clock: &dyn Clock) -> Result<Self, ValidationError> {
        Self::ending(StudyDate::new(clock.now().date_naive()))
    }
}

/// Source of "now" in the user's local time zone.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the process's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Local noon on `date` at the given offset in seconds east of UTC.
    pub fn at_local_noon(date: NaiveDate, offset_secs: i32) -> Option<Self> {
        let offset = FixedOffset::east_opt(offset_secs)?;
        let naive = date.and_hms_opt(12, 0, 0)?;
        naive.and_local_timezone(offset).single().map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<FixedOffset> {
        (**self).now()
    }
}
