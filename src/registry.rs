//! Registry time zone blob parsing.
//!
//! A registry zone definition is a packed little-endian 44-byte
//! structure: a bias in minutes, a standard transition date, a standard
//! bias, a daylight transition date, and a daylight bias, where each
//! "date" is eight 16-bit fields `(year, month, day_of_week, day, hour,
//! minute, second, millisecond)`. A zero year selects a floating rule
//! with `day` read as the week of the month (`1..=5`, five meaning
//! last); a non-zero year selects a fixed calendar day. A zero month
//! means the zone observes no daylight saving at all.
//!
//! The stored biases are subtracted from UTC to reach local time, so
//! offsets are their negation: the standard offset is
//! `-(bias + standard_bias)` minutes and the daylight delta is
//! `standard_bias - daylight_bias` minutes.
//!
//! The "dynamic" variant supplies one such blob per calendar year over
//! a contiguous range; each maps to one [`AdjustmentRule`] clamped to
//! its year, with the first and last entries extended to the ends of
//! the representable range.

use alloc::vec::Vec;

use crate::iso::{IsoDate, IsoTime, Weekday};
use crate::offset::UtcOffset;
use crate::rule::{validate_rules, AdjustmentRule, TransitionTime};
use crate::zone::TimeZone;
use crate::{TimeZoneError, TimeZoneResult};

pub(crate) const TZI_LEN: usize = 44;

/// A decoded registry blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryTzi {
    pub bias: i32,
    pub standard_bias: i32,
    pub daylight_bias: i32,
    pub standard_date: RegistrySystemTime,
    pub daylight_date: RegistrySystemTime,
}

/// The eight-field 16-bit date structure embedded in a registry blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySystemTime {
    pub year: i16,
    pub month: i16,
    pub day_of_week: i16,
    pub day: i16,
    pub hour: i16,
    pub minute: i16,
    pub second: i16,
    pub millisecond: i16,
}

fn read_le_i32(data: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_le_i16(data: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([data[at], data[at + 1]])
}

fn read_system_time(data: &[u8], at: usize) -> RegistrySystemTime {
    RegistrySystemTime {
        year: read_le_i16(data, at),
        month: read_le_i16(data, at + 2),
        day_of_week: read_le_i16(data, at + 4),
        day: read_le_i16(data, at + 6),
        hour: read_le_i16(data, at + 8),
        minute: read_le_i16(data, at + 10),
        second: read_le_i16(data, at + 12),
        millisecond: read_le_i16(data, at + 14),
    }
}

impl RegistryTzi {
    /// Decode the fixed 44-byte layout.
    pub fn from_bytes(data: &[u8]) -> TimeZoneResult<Self> {
        if data.len() != TZI_LEN {
            return Err(TimeZoneError::corrupt()
                .with_message("registry time zone data must be exactly 44 bytes"));
        }
        Ok(Self {
            bias: read_le_i32(data, 0),
            standard_date: read_system_time(data, 4),
            standard_bias: read_le_i32(data, 20),
            daylight_date: read_system_time(data, 24),
            daylight_bias: read_le_i32(data, 40),
        })
    }

    /// The zone's standard offset: the negated bias, in minutes.
    pub(crate) fn standard_offset(&self) -> UtcOffset {
        UtcOffset::from_minutes(-i64::from(self.bias) - i64::from(self.standard_bias))
    }

    /// The delta added while daylight saving is in effect.
    pub(crate) fn daylight_delta(&self) -> UtcOffset {
        UtcOffset::from_minutes(i64::from(self.standard_bias) - i64::from(self.daylight_bias))
    }

    /// Whether the blob describes any daylight saving.
    pub(crate) fn has_daylight(&self) -> bool {
        self.standard_date.month != 0
            && self.daylight_date.month != 0
            && !self.daylight_delta().is_zero()
    }
}

fn transition_from_system_time(date: &RegistrySystemTime) -> TimeZoneResult<TransitionTime> {
    let month = u8::try_from(date.month)
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| {
            TimeZoneError::corrupt().with_message("registry transition month is out of range")
        })?;
    let time_of_day = IsoTime::try_new(
        u8::try_from(date.hour).map_err(|_| bad_time_of_day())?,
        u8::try_from(date.minute).map_err(|_| bad_time_of_day())?,
        u8::try_from(date.second).map_err(|_| bad_time_of_day())?,
        u16::try_from(date.millisecond).map_err(|_| bad_time_of_day())?,
    )
    .map_err(|_| bad_time_of_day())?;

    if date.year == 0 {
        // Floating rule: `day` is the week of the month.
        let week = u8::try_from(date.day)
            .ok()
            .filter(|w| (1..=5).contains(w))
            .ok_or_else(|| {
                TimeZoneError::corrupt()
                    .with_message("registry transition week must be in 1..=5")
            })?;
        let weekday = u8::try_from(date.day_of_week)
            .map_err(|_| bad_day_of_week())
            .and_then(|n| Weekday::from_number(n).map_err(|_| bad_day_of_week()))?;
        TransitionTime::floating(month, week, weekday, time_of_day)
            .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))
    } else {
        let day = u8::try_from(date.day)
            .ok()
            .filter(|d| (1..=31).contains(d))
            .ok_or_else(|| {
                TimeZoneError::corrupt().with_message("registry transition day is out of range")
            })?;
        TransitionTime::fixed(month, day, time_of_day)
            .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))
    }
}

fn bad_time_of_day() -> TimeZoneError {
    TimeZoneError::corrupt().with_message("registry transition time of day is out of range")
}

fn bad_day_of_week() -> TimeZoneError {
    TimeZoneError::corrupt().with_message("registry transition day of week must be in 0..=6")
}

fn rule_for_span(
    tzi: &RegistryTzi,
    base_offset: UtcOffset,
    date_start: IsoDate,
    date_end: IsoDate,
) -> TimeZoneResult<Option<AdjustmentRule>> {
    let base_delta = tzi.standard_offset() - base_offset;
    if !tzi.has_daylight() {
        if base_delta.is_zero() {
            return Ok(None);
        }
        // Offset-only span: a delta-less rule carrying the base
        // adjustment, bounded by sentinel transitions.
        return Ok(Some(AdjustmentRule::new_unchecked(
            date_start,
            date_end,
            UtcOffset::ZERO,
            TransitionTime::fixed(1, 1, IsoTime::new_unchecked(0, 0, 0, 0))
                .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))?,
            TransitionTime::fixed(12, 31, IsoTime::MAX)
                .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))?,
            base_delta,
        )));
    }

    // The daylight date is the enter-daylight transition and the
    // standard date the enter-standard transition.
    let transition_start = transition_from_system_time(&tzi.daylight_date)?;
    let transition_end = transition_from_system_time(&tzi.standard_date)?;
    if transition_start == transition_end {
        return Err(TimeZoneError::corrupt()
            .with_message("registry transitions describe an empty daylight period"));
    }
    tzi.daylight_delta()
        .check_zone_offset("daylight delta")
        .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))?;
    Ok(Some(AdjustmentRule::new_unchecked(
        date_start,
        date_end,
        tzi.daylight_delta(),
        transition_start,
        transition_end,
        base_delta,
    )))
}

impl TimeZone {
    /// Build a zone from one registry blob; its rule, if any, spans the
    /// whole representable range.
    pub fn from_registry_bytes(
        id: &str,
        display_name: &str,
        standard_name: &str,
        daylight_name: &str,
        data: &[u8],
    ) -> TimeZoneResult<Self> {
        if id.is_empty() {
            return Err(TimeZoneError::argument().with_message("zone id must not be empty"));
        }
        let tzi = RegistryTzi::from_bytes(data)?;
        let base_offset = tzi.standard_offset();
        base_offset
            .check_zone_offset("base offset")
            .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))?;
        let rules = rule_for_span(&tzi, base_offset, IsoDate::MIN, IsoDate::MAX)?
            .into_iter()
            .collect();
        TimeZone::try_new(
            id,
            base_offset,
            display_name,
            standard_name,
            daylight_name,
            rules,
        )
    }

    /// Build a zone from per-year "dynamic" registry blobs covering the
    /// contiguous year range `first_year..=first_year + blobs - 1`. The
    /// base data supplies the zone's current offset; the first and last
    /// years extend to the ends of the representable range.
    pub fn from_registry_dynamic(
        id: &str,
        display_name: &str,
        standard_name: &str,
        daylight_name: &str,
        base: &[u8],
        first_year: i32,
        years: &[&[u8]],
    ) -> TimeZoneResult<Self> {
        if id.is_empty() {
            return Err(TimeZoneError::argument().with_message("zone id must not be empty"));
        }
        if years.is_empty() {
            return Err(TimeZoneError::argument()
                .with_message("dynamic registry data must supply at least one year"));
        }
        let last_year = first_year + years.len() as i32 - 1;
        if first_year < 1 || last_year > 9999 {
            return Err(TimeZoneError::argument()
                .with_message("dynamic registry years must be within 1..=9999"));
        }

        let base_tzi = RegistryTzi::from_bytes(base)?;
        let base_offset = base_tzi.standard_offset();
        base_offset
            .check_zone_offset("base offset")
            .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))?;

        let mut rules = Vec::new();
        for (i, data) in years.iter().enumerate() {
            let year = first_year + i as i32;
            let tzi = RegistryTzi::from_bytes(data)?;
            let date_start = if i == 0 {
                IsoDate::MIN
            } else {
                IsoDate::new_unchecked(year, 1, 1)
            };
            let date_end = if i + 1 == years.len() {
                IsoDate::MAX
            } else {
                IsoDate::new_unchecked(year, 12, 31)
            };
            if let Some(rule) = rule_for_span(&tzi, base_offset, date_start, date_end)? {
                rules.push(rule);
            }
        }
        validate_rules(base_offset, &rules)
            .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))?;
        Ok(TimeZone::from_parts(
            id.into(),
            base_offset,
            display_name.into(),
            standard_name.into(),
            daylight_name.into(),
            rules,
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{RegistrySystemTime, RegistryTzi};
    use crate::iso::{IsoDate, IsoDateTime, IsoTime, Weekday};
    use crate::offset::UtcOffset;
    use crate::rule::TransitionDate;
    use crate::zone::TimeZone;
    use crate::ErrorKind;
    use alloc::vec::Vec;

    fn push_le_i16(buffer: &mut Vec<u8>, value: i16) {
        buffer.extend_from_slice(&value.to_le_bytes());
    }

    fn push_system_time(buffer: &mut Vec<u8>, fields: [i16; 8]) {
        for field in fields {
            push_le_i16(buffer, field);
        }
    }

    /// An Eastern-shaped blob: bias 300 (UTC-5), daylight from the 2nd
    /// Sunday of March 02:00 to the 1st Sunday of November 02:00 with
    /// bias -60.
    fn eastern_blob() -> Vec<u8> {
        let mut buffer = Vec::with_capacity(44);
        buffer.extend_from_slice(&300i32.to_le_bytes());
        // Standard date: month 11, Sunday, week 1, 02:00.
        push_system_time(&mut buffer, [0, 11, 0, 1, 2, 0, 0, 0]);
        buffer.extend_from_slice(&0i32.to_le_bytes());
        // Daylight date: month 3, Sunday, week 2, 02:00.
        push_system_time(&mut buffer, [0, 3, 0, 2, 2, 0, 0, 0]);
        buffer.extend_from_slice(&(-60i32).to_le_bytes());
        buffer
    }

    fn no_dst_blob(bias: i32) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(44);
        buffer.extend_from_slice(&bias.to_le_bytes());
        push_system_time(&mut buffer, [0; 8]);
        buffer.extend_from_slice(&0i32.to_le_bytes());
        push_system_time(&mut buffer, [0; 8]);
        buffer.extend_from_slice(&0i32.to_le_bytes());
        buffer
    }

    fn wall(year: i32, month: u8, day: u8, hour: u8, minute: u8) -> IsoDateTime {
        IsoDateTime::new(
            IsoDate::try_new(year, month, day).unwrap(),
            IsoTime::try_new(hour, minute, 0, 0).unwrap(),
        )
    }

    #[test]
    fn decodes_field_layout() {
        let tzi = RegistryTzi::from_bytes(&eastern_blob()).unwrap();
        assert_eq!(tzi.bias, 300);
        assert_eq!(tzi.standard_bias, 0);
        assert_eq!(tzi.daylight_bias, -60);
        assert_eq!(
            tzi.standard_date,
            RegistrySystemTime {
                year: 0,
                month: 11,
                day_of_week: 0,
                day: 1,
                hour: 2,
                minute: 0,
                second: 0,
                millisecond: 0,
            }
        );
        assert_eq!(tzi.standard_offset(), UtcOffset::from_hours(-5));
        assert_eq!(tzi.daylight_delta(), UtcOffset::from_hours(1));
    }

    #[test]
    fn wrong_length_is_corrupt() {
        let blob = eastern_blob();
        assert_eq!(
            RegistryTzi::from_bytes(&blob[..43]).unwrap_err().kind(),
            ErrorKind::Corrupt
        );
        let mut long = blob.clone();
        long.push(0);
        assert_eq!(
            RegistryTzi::from_bytes(&long).unwrap_err().kind(),
            ErrorKind::Corrupt
        );
    }

    #[test]
    fn registry_zone_resolves_like_rule_model() {
        let zone = TimeZone::from_registry_bytes(
            "Registry/Eastern",
            "Eastern",
            "Eastern Standard Time",
            "Eastern Daylight Time",
            &eastern_blob(),
        )
        .unwrap();
        assert_eq!(zone.base_offset(), UtcOffset::from_hours(-5));
        assert_eq!(zone.adjustment_rules().len(), 1);
        let rule = &zone.adjustment_rules()[0];
        assert_eq!(
            rule.transition_start().date,
            TransitionDate::Floating {
                week: 2,
                weekday: Weekday::Sunday
            }
        );
        assert_eq!(
            zone.utc_offset(wall(2023, 7, 1, 0, 0)),
            UtcOffset::from_hours(-4)
        );
        assert_eq!(
            zone.utc_offset(wall(2023, 1, 15, 0, 0)),
            UtcOffset::from_hours(-5)
        );
        assert!(zone.is_invalid_time(wall(2023, 3, 12, 2, 30)));
        assert!(zone.is_ambiguous_time(wall(2023, 11, 5, 1, 30)));
    }

    #[test]
    fn no_dst_blob_yields_fixed_zone() {
        let zone = TimeZone::from_registry_bytes(
            "Registry/Fixed",
            "Fixed",
            "Fixed",
            "Fixed",
            &no_dst_blob(-330),
        )
        .unwrap();
        assert_eq!(zone.base_offset(), UtcOffset::from_minutes(330));
        assert!(zone.adjustment_rules().is_empty());
        assert!(!zone.supports_daylight_saving_time());
    }

    #[test]
    fn fixed_date_rule_from_non_zero_year() {
        let mut blob = Vec::with_capacity(44);
        blob.extend_from_slice(&(-60i32).to_le_bytes());
        // Fixed standard date: October 20 03:00 of a concrete year.
        push_system_time(&mut blob, [2023, 10, 0, 20, 3, 0, 0, 0]);
        blob.extend_from_slice(&0i32.to_le_bytes());
        // Fixed daylight date: March 25 02:00.
        push_system_time(&mut blob, [2023, 3, 0, 25, 2, 0, 0, 0]);
        blob.extend_from_slice(&(-60i32).to_le_bytes());

        let zone =
            TimeZone::from_registry_bytes("Registry/FixedDate", "F", "F", "F", &blob).unwrap();
        let rule = &zone.adjustment_rules()[0];
        assert_eq!(rule.transition_start().date, TransitionDate::Fixed { day: 25 });
        assert_eq!(rule.transition_end().date, TransitionDate::Fixed { day: 20 });
        assert_eq!(
            zone.utc_offset(wall(2023, 6, 1, 0, 0)),
            UtcOffset::from_hours(2)
        );
        assert_eq!(
            zone.utc_offset(wall(2023, 12, 1, 0, 0)),
            UtcOffset::from_hours(1)
        );
    }

    #[test]
    fn out_of_range_transition_is_corrupt() {
        let mut blob = eastern_blob();
        // Month 13 in the daylight date.
        blob[26] = 13;
        blob[27] = 0;
        assert_eq!(
            TimeZone::from_registry_bytes("Registry/Bad", "B", "B", "B", &blob)
                .unwrap_err()
                .kind(),
            ErrorKind::Corrupt
        );
    }

    #[test]
    fn dynamic_years_clamp_and_extend() {
        // 2006 and earlier: daylight 1st Sunday of April to last Sunday
        // of October. 2007 onwards: the modern pattern.
        let mut old = Vec::with_capacity(44);
        old.extend_from_slice(&300i32.to_le_bytes());
        push_system_time(&mut old, [0, 10, 0, 5, 2, 0, 0, 0]);
        old.extend_from_slice(&0i32.to_le_bytes());
        push_system_time(&mut old, [0, 4, 0, 1, 2, 0, 0, 0]);
        old.extend_from_slice(&(-60i32).to_le_bytes());
        let new = eastern_blob();

        let zone = TimeZone::from_registry_dynamic(
            "Registry/Dynamic",
            "Dynamic",
            "STD",
            "DST",
            &new,
            2006,
            &[&old, &new],
        )
        .unwrap();
        assert_eq!(zone.adjustment_rules().len(), 2);
        let first = &zone.adjustment_rules()[0];
        let second = &zone.adjustment_rules()[1];
        assert_eq!(first.date_start(), IsoDate::MIN);
        assert_eq!(first.date_end(), IsoDate::try_new(2006, 12, 31).unwrap());
        assert_eq!(second.date_start(), IsoDate::try_new(2007, 1, 1).unwrap());
        assert_eq!(second.date_end(), IsoDate::MAX);

        // 2006-03-15 predates that year's April start; 2007-03-15 is
        // past the modern March start.
        assert_eq!(
            zone.utc_offset(wall(2006, 3, 15, 12, 0)),
            UtcOffset::from_hours(-5)
        );
        assert_eq!(
            zone.utc_offset(wall(2007, 3, 15, 12, 0)),
            UtcOffset::from_hours(-4)
        );
    }

    #[test]
    fn dynamic_requires_years() {
        assert_eq!(
            TimeZone::from_registry_dynamic("R", "R", "R", "R", &eastern_blob(), 2006, &[])
                .unwrap_err()
                .kind(),
            ErrorKind::Argument
        );
    }
}
