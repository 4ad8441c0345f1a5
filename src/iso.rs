//! ISO calendar date/time value types.
//!
//! These are the collaborator types consumed by the rule engine: plain
//! year-to-millisecond decomposition plus a [`TimeKind`] tag naming the
//! frame an instant is expressed in. The representable range is
//! `0001-01-01T00:00:00.000` through `9999-12-31T23:59:59.999`;
//! arithmetic saturates at the endpoints.

use crate::offset::UtcOffset;
use crate::utils;
use crate::{TimeZoneError, TimeZoneResult};

/// The frame an [`IsoDateTime`] is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeKind {
    /// A wall-clock reading with no declared zone.
    #[default]
    Unspecified,
    /// A UTC instant.
    Utc,
    /// A wall-clock reading in the process-local zone.
    Local,
}

/// Day of the week, `Sunday` through `Saturday`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Weekday {
    Sunday = 0,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// The day number, `0` is Sunday.
    #[inline]
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_number(n: u8) -> TimeZoneResult<Self> {
        Ok(match n {
            0 => Self::Sunday,
            1 => Self::Monday,
            2 => Self::Tuesday,
            3 => Self::Wednesday,
            4 => Self::Thursday,
            5 => Self::Friday,
            6 => Self::Saturday,
            _ => {
                return Err(
                    TimeZoneError::argument().with_message("day of week must be in 0..=6")
                )
            }
        })
    }
}

/// An ISO calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IsoDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl IsoDate {
    /// The first representable date, `0001-01-01`.
    pub const MIN: Self = Self {
        year: 1,
        month: 1,
        day: 1,
    };

    /// The last representable date, `9999-12-31`.
    pub const MAX: Self = Self {
        year: 9999,
        month: 12,
        day: 31,
    };

    /// Create a date, validating the component ranges.
    pub fn try_new(year: i32, month: u8, day: u8) -> TimeZoneResult<Self> {
        if !(1..=9999).contains(&year) {
            return Err(TimeZoneError::argument().with_message("year must be in 1..=9999"));
        }
        if !(1..=12).contains(&month) {
            return Err(TimeZoneError::argument().with_message("month must be in 1..=12"));
        }
        if day < 1 || day > utils::days_in_month(year, month) {
            return Err(TimeZoneError::argument().with_message("day is out of range for month"));
        }
        Ok(Self { year, month, day })
    }

    pub(crate) const fn new_unchecked(year: i32, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Days since 1970-01-01.
    #[inline]
    #[must_use]
    pub fn epoch_days(self) -> i64 {
        utils::epoch_days_from_ymd(self.year, self.month, self.day)
    }

    pub(crate) fn from_epoch_days(epoch_days: i64) -> Self {
        let (year, month, day) = utils::ymd_from_epoch_days(epoch_days);
        Self { year, month, day }
    }

    /// The day of the week this date falls on.
    #[must_use]
    pub fn day_of_week(self) -> Weekday {
        match utils::week_day_from_epoch_days(self.epoch_days()) {
            0 => Weekday::Sunday,
            1 => Weekday::Monday,
            2 => Weekday::Tuesday,
            3 => Weekday::Wednesday,
            4 => Weekday::Thursday,
            5 => Weekday::Friday,
            _ => Weekday::Saturday,
        }
    }

    /// The number of days in this date's month.
    #[inline]
    #[must_use]
    pub fn days_in_month(self) -> u8 {
        utils::days_in_month(self.year, self.month)
    }
}

/// A time of day with millisecond precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct IsoTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl IsoTime {
    /// The last representable time of day, `23:59:59.999`.
    pub const MAX: Self = Self {
        hour: 23,
        minute: 59,
        second: 59,
        millisecond: 999,
    };

    /// Create a time of day, validating the component ranges.
    pub fn try_new(hour: u8, minute: u8, second: u8, millisecond: u16) -> TimeZoneResult<Self> {
        if hour > 23 || minute > 59 || second > 59 || millisecond > 999 {
            return Err(TimeZoneError::argument().with_message("time of day is out of range"));
        }
        Ok(Self {
            hour,
            minute,
            second,
            millisecond,
        })
    }

    pub(crate) const fn new_unchecked(hour: u8, minute: u8, second: u8, millisecond: u16) -> Self {
        Self {
            hour,
            minute,
            second,
            millisecond,
        }
    }

    /// Milliseconds since midnight.
    #[inline]
    #[must_use]
    pub fn ms_of_day(self) -> i64 {
        i64::from(self.hour) * utils::MS_PER_HOUR
            + i64::from(self.minute) * utils::MS_PER_MINUTE
            + i64::from(self.second) * 1000
            + i64::from(self.millisecond)
    }

    pub(crate) fn from_ms_of_day(ms: i64) -> Self {
        debug_assert!((0..utils::MS_PER_DAY).contains(&ms));
        Self {
            hour: (ms / utils::MS_PER_HOUR) as u8,
            minute: (ms % utils::MS_PER_HOUR / utils::MS_PER_MINUTE) as u8,
            second: (ms % utils::MS_PER_MINUTE / 1000) as u8,
            millisecond: (ms % 1000) as u16,
        }
    }
}

/// A calendar date, a time of day, and the frame they are read in.
///
/// Ordering and equality compare the calendar value only; the kind
/// names the frame a value is expressed in and is not part of the
/// value itself.
#[derive(Debug, Clone, Copy)]
pub struct IsoDateTime {
    pub date: IsoDate,
    pub time: IsoTime,
    pub kind: TimeKind,
}

/// Milliseconds since the epoch for `0001-01-01T00:00:00.000`.
pub(crate) const MIN_EPOCH_MS: i64 = -62_135_596_800_000;
/// Milliseconds since the epoch for `9999-12-31T23:59:59.999`.
pub(crate) const MAX_EPOCH_MS: i64 = 253_402_300_799_999;

impl IsoDateTime {
    /// The first representable date-time.
    pub const MIN: Self = Self {
        date: IsoDate::MIN,
        time: IsoTime::new_unchecked(0, 0, 0, 0),
        kind: TimeKind::Unspecified,
    };

    /// The last representable date-time.
    pub const MAX: Self = Self {
        date: IsoDate::MAX,
        time: IsoTime::MAX,
        kind: TimeKind::Unspecified,
    };

    /// Combine a date and a time of day with [`TimeKind::Unspecified`].
    #[inline]
    #[must_use]
    pub const fn new(date: IsoDate, time: IsoTime) -> Self {
        Self {
            date,
            time,
            kind: TimeKind::Unspecified,
        }
    }

    /// This date-time re-tagged with `kind`.
    #[inline]
    #[must_use]
    pub const fn with_kind(mut self, kind: TimeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Milliseconds since 1970-01-01T00:00:00.000 in this value's own
    /// frame.
    #[inline]
    #[must_use]
    pub fn epoch_ms(self) -> i64 {
        self.date.epoch_days() * utils::MS_PER_DAY + self.time.ms_of_day()
    }

    /// Seconds since 1970-01-01T00:00:00 in this value's own frame,
    /// truncated toward negative infinity.
    #[inline]
    #[must_use]
    pub fn epoch_seconds(self) -> i64 {
        self.epoch_ms().div_euclid(1000)
    }

    pub(crate) fn from_epoch_ms(ms: i64, kind: TimeKind) -> Self {
        let ms = ms.clamp(MIN_EPOCH_MS, MAX_EPOCH_MS);
        Self {
            date: IsoDate::from_epoch_days(ms.div_euclid(utils::MS_PER_DAY)),
            time: IsoTime::from_ms_of_day(ms.rem_euclid(utils::MS_PER_DAY)),
            kind,
        }
    }

    pub(crate) fn from_epoch_seconds(seconds: i64, kind: TimeKind) -> Self {
        Self::from_epoch_ms(seconds.saturating_mul(1000), kind)
    }

    /// Add an offset, saturating at [`IsoDateTime::MIN`] and
    /// [`IsoDateTime::MAX`]. The kind is preserved.
    #[must_use]
    pub fn saturating_add(self, offset: UtcOffset) -> Self {
        let ms = self.epoch_ms().saturating_add(offset.milliseconds());
        Self::from_epoch_ms(ms, self.kind)
    }

    /// Subtract an offset, saturating. The kind is preserved.
    #[inline]
    #[must_use]
    pub fn saturating_sub(self, offset: UtcOffset) -> Self {
        self.saturating_add(-offset)
    }
}

impl PartialEq for IsoDateTime {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date && self.time == other.time
    }
}

impl Eq for IsoDateTime {}

impl PartialOrd for IsoDateTime {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IsoDateTime {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        (self.date, self.time).cmp(&(other.date, other.time))
    }
}
