//! The time zone model and its resolution engine.
//!
//! A [`TimeZone`] is a base UTC offset plus an ordered set of
//! [`AdjustmentRule`]s, and optionally a raw transition table for zones
//! whose observed transitions do not reduce to a clean yearly rule (see
//! [`tzif`][crate::tzif]). Everything here is pure computation over
//! that data: rule selection, daylight classification, gap/fold
//! detection, offset resolution, and conversion between frames.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::iso::{IsoDate, IsoDateTime, TimeKind};
use crate::offset::UtcOffset;
use crate::rule::{validate_rules, AdjustmentRule, TransitionDate, TransitionTime};
use crate::utils;
use crate::{TimeZoneError, TimeZoneResult};

/// One row of a raw transition table: from `at_time` (epoch seconds,
/// UTC) onwards the zone observes `offset` seconds, with `dst` telling
/// whether that period is daylight saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneTransition {
    pub at_time: i64,
    pub offset: i64,
    pub dst: bool,
}

/// The result of resolving a wall-clock reading against a transition
/// table: unique, inside a spring-forward gap, or inside a fall-back
/// fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocalResolution {
    Single(ZoneTransition),
    Gap {
        before: ZoneTransition,
        after: ZoneTransition,
    },
    Ambiguous {
        std: ZoneTransition,
        dst: ZoneTransition,
    },
}

/// An immutable time zone definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeZone {
    id: String,
    base_offset: UtcOffset,
    display_name: String,
    standard_name: String,
    daylight_name: String,
    rules: Vec<AdjustmentRule>,
    transitions: Option<Vec<ZoneTransition>>,
}

impl TimeZone {
    /// Create a zone from its parts, validating the identifier, the
    /// base offset, and the rule set ordering invariants.
    pub fn try_new(
        id: &str,
        base_offset: UtcOffset,
        display_name: &str,
        standard_name: &str,
        daylight_name: &str,
        rules: Vec<AdjustmentRule>,
    ) -> TimeZoneResult<Self> {
        if id.is_empty() {
            return Err(TimeZoneError::argument().with_message("zone id must not be empty"));
        }
        base_offset.check_zone_offset("base offset")?;
        validate_rules(base_offset, &rules)?;
        Ok(Self {
            id: id.to_string(),
            base_offset,
            display_name: display_name.to_string(),
            standard_name: standard_name.to_string(),
            daylight_name: daylight_name.to_string(),
            rules,
            transitions: None,
        })
    }

    /// Create a fixed-offset zone with no daylight saving.
    pub fn fixed(id: &str, base_offset: UtcOffset) -> TimeZoneResult<Self> {
        Self::try_new(id, base_offset, id, id, id, Vec::new())
    }

    /// The UTC zone.
    #[must_use]
    pub fn utc() -> Self {
        Self {
            id: String::from("UTC"),
            base_offset: UtcOffset::ZERO,
            display_name: String::from("UTC"),
            standard_name: String::from("UTC"),
            daylight_name: String::from("UTC"),
            rules: Vec::new(),
            transitions: None,
        }
    }

    /// Loader path; the caller guarantees the invariants hold.
    pub(crate) fn from_parts(
        id: String,
        base_offset: UtcOffset,
        display_name: String,
        standard_name: String,
        daylight_name: String,
        rules: Vec<AdjustmentRule>,
        transitions: Option<Vec<ZoneTransition>>,
    ) -> Self {
        debug_assert!(validate_rules(base_offset, &rules).is_ok());
        Self {
            id,
            base_offset,
            display_name,
            standard_name,
            daylight_name,
            rules,
            transitions,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn base_offset(&self) -> UtcOffset {
        self.base_offset
    }

    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[inline]
    #[must_use]
    pub fn standard_name(&self) -> &str {
        &self.standard_name
    }

    #[inline]
    #[must_use]
    pub fn daylight_name(&self) -> &str {
        &self.daylight_name
    }

    /// The zone's adjustment rules, sorted ascending by start date.
    #[inline]
    #[must_use]
    pub fn adjustment_rules(&self) -> &[AdjustmentRule] {
        &self.rules
    }

    /// The raw transition table, present only for zones whose observed
    /// transitions did not synthesize into clean yearly rules.
    #[inline]
    #[must_use]
    pub fn transitions(&self) -> Option<&[ZoneTransition]> {
        self.transitions.as_deref()
    }

    /// Whether this zone observes daylight saving at all.
    #[must_use]
    pub fn supports_daylight_saving_time(&self) -> bool {
        if let Some(table) = &self.transitions {
            return table.iter().any(|tr| tr.dst);
        }
        self.rules.iter().any(AdjustmentRule::has_daylight)
    }

    /// Structural comparison of resolution behavior: base offset, rule
    /// set, and raw transitions. Identifiers and display names are
    /// ignored.
    #[must_use]
    pub fn has_same_rules(&self, other: &Self) -> bool {
        self.base_offset == other.base_offset
            && self.rules == other.rules
            && self.transitions == other.transitions
    }

    #[inline]
    pub(crate) fn is_utc(&self) -> bool {
        self.base_offset.is_zero()
            && self.rules.is_empty()
            && self.transitions.is_none()
            && self.id == "UTC"
    }
}

// ==== Rule selection & classification ====

impl TimeZone {
    /// Find the rule whose date range contains the instant, reading the
    /// instant as a date in this zone's own calendar. Rules are few, so
    /// a linear scan over the sorted set suffices.
    pub(crate) fn rule_for(&self, instant: IsoDateTime) -> Option<&AdjustmentRule> {
        let local = match instant.kind {
            TimeKind::Utc => instant.saturating_add(self.base_offset),
            _ => instant,
        };
        let date = local.date;
        self.rules.iter().find(|rule| rule.contains(date))
    }

    /// Resolve a yearly transition to a concrete date-time within
    /// `year`.
    pub(crate) fn transition_point(transition: &TransitionTime, year: i32) -> IsoDateTime {
        let month_len = utils::days_in_month(year, transition.month);
        let day = match transition.date {
            // A rule day past the end of a short month (Feb 29 on a
            // common year) clamps to the month's last day.
            TransitionDate::Fixed { day } => day.min(month_len),
            TransitionDate::Floating { week, weekday } => {
                let first = IsoDate::new_unchecked(year, transition.month, 1)
                    .day_of_week()
                    .number() as i16;
                let target = weekday.number() as i16;
                let mut day = 1 + (i16::from(week) - 1) * 7 + (target - first).rem_euclid(7);
                // The fifth occurrence collapses to the fourth when the
                // month only has four.
                if day > i16::from(month_len) {
                    day -= 7;
                }
                day as u8
            }
        };
        IsoDateTime::new(
            IsoDate::new_unchecked(year, transition.month, day),
            transition.time_of_day,
        )
    }

    /// The daylight period boundaries a rule produces for `year`. The
    /// end boundary lands in `year + 1` for rules that cross the new
    /// year (southern-hemisphere daylight saving).
    fn daylight_bounds(rule: &AdjustmentRule, year: i32) -> (IsoDateTime, IsoDateTime) {
        let start = Self::transition_point(rule.transition_start(), year);
        let end_year = if rule.transition_start().month >= rule.transition_end().month {
            year + 1
        } else {
            year
        };
        let end = Self::transition_point(rule.transition_end(), end_year);
        (start, end)
    }

    /// Whether the instant falls inside the daylight period the rule
    /// produces for `year`.
    ///
    /// The start boundary is expressed in the standard frame and the
    /// end boundary in the daylight frame, so the end is de-adjusted by
    /// the delta before comparing; a UTC-kind instant additionally
    /// de-adjusts both boundaries by the rule's effective base offset.
    fn in_daylight_for_year(
        &self,
        rule: &AdjustmentRule,
        instant: IsoDateTime,
        year: i32,
    ) -> bool {
        let (start, end) = Self::daylight_bounds(rule, year);
        let mut start_ms = start.epoch_ms();
        let mut end_ms = end.epoch_ms();
        if instant.kind == TimeKind::Utc {
            let base = (self.base_offset + rule.base_offset_delta()).milliseconds();
            start_ms -= base;
            end_ms -= base;
        }
        end_ms -= rule.daylight_delta().milliseconds();
        let t = instant.epoch_ms();
        start_ms <= t && t < end_ms
    }

    fn in_daylight(&self, rule: &AdjustmentRule, instant: IsoDateTime) -> bool {
        // A daylight period can span two calendar years, so the prior
        // year's rule evaluation must be consulted as well.
        let year = instant.date.year;
        self.in_daylight_for_year(rule, instant, year)
            || self.in_daylight_for_year(rule, instant, year - 1)
    }

    /// Whether the instant is in daylight saving time in this zone.
    ///
    /// Ambiguous wall-clock instants resolve to standard time; both
    /// candidate offsets are available from
    /// [`ambiguous_offsets`][Self::ambiguous_offsets].
    #[must_use]
    pub fn is_daylight_saving_time(&self, instant: IsoDateTime) -> bool {
        if let Some(table) = &self.transitions {
            return match instant.kind {
                TimeKind::Utc => Self::resolve_utc(table, instant.epoch_seconds()).dst,
                _ => match Self::resolve_wall(table, instant.epoch_seconds()) {
                    LocalResolution::Single(record) => record.dst,
                    LocalResolution::Gap { after, .. } => after.dst,
                    LocalResolution::Ambiguous { std, .. } => std.dst,
                },
            };
        }
        match self.rule_for(instant) {
            Some(rule) if rule.has_daylight() => self.in_daylight(rule, instant),
            _ => false,
        }
    }

    /// Whether a wall-clock instant falls inside a spring-forward gap
    /// and therefore never occurred in this zone.
    #[must_use]
    pub fn is_invalid_time(&self, instant: IsoDateTime) -> bool {
        if instant.kind == TimeKind::Utc {
            return false;
        }
        if let Some(table) = &self.transitions {
            return matches!(
                Self::resolve_wall(table, instant.epoch_seconds()),
                LocalResolution::Gap { .. }
            );
        }
        let Some(rule) = self.rule_for(instant) else {
            return false;
        };
        let delta = rule.daylight_delta().milliseconds();
        if delta <= 0 {
            return false;
        }
        let t = instant.epoch_ms();
        let year = instant.date.year;
        [year, year - 1].into_iter().any(|y| {
            let (start, _) = Self::daylight_bounds(rule, y);
            let start_ms = start.epoch_ms();
            start_ms <= t && t < start_ms + delta
        })
    }

    /// Whether a wall-clock instant falls inside a fall-back overlap
    /// and therefore occurred twice in this zone.
    #[must_use]
    pub fn is_ambiguous_time(&self, instant: IsoDateTime) -> bool {
        let local = self.to_wall(instant);
        if let Some(table) = &self.transitions {
            return matches!(
                Self::resolve_wall(table, local.epoch_seconds()),
                LocalResolution::Ambiguous { .. }
            );
        }
        let Some(rule) = self.rule_for(local) else {
            return false;
        };
        let delta = rule.daylight_delta().milliseconds();
        if delta <= 0 {
            return false;
        }
        let t = local.epoch_ms();
        let year = local.date.year;
        [year, year - 1].into_iter().any(|y| {
            let (_, end) = Self::daylight_bounds(rule, y);
            let end_ms = end.epoch_ms();
            end_ms - delta <= t && t < end_ms
        })
    }

    /// Both candidate offsets for an ambiguous instant, standard first.
    pub fn ambiguous_offsets(&self, instant: IsoDateTime) -> TimeZoneResult<[UtcOffset; 2]> {
        let local = self.to_wall(instant);
        if let Some(table) = &self.transitions {
            if let LocalResolution::Ambiguous { std, dst } =
                Self::resolve_wall(table, local.epoch_seconds())
            {
                return Ok([
                    UtcOffset::from_seconds(std.offset),
                    UtcOffset::from_seconds(dst.offset),
                ]);
            }
            return Err(
                TimeZoneError::argument().with_message("instant is not ambiguous in this zone")
            );
        }
        if !self.is_ambiguous_time(local) {
            return Err(
                TimeZoneError::argument().with_message("instant is not ambiguous in this zone")
            );
        }
        // rule_for is present whenever is_ambiguous_time held.
        let rule = self.rule_for(local).ok_or_else(TimeZoneError::assert)?;
        let standard = self.base_offset + rule.base_offset_delta();
        Ok([standard, standard + rule.daylight_delta()])
    }

    /// Shift a UTC-kind instant into this zone's wall clock; any other
    /// kind is already a wall-clock reading here.
    fn to_wall(&self, instant: IsoDateTime) -> IsoDateTime {
        match instant.kind {
            TimeKind::Utc => instant
                .saturating_add(self.utc_offset(instant))
                .with_kind(TimeKind::Unspecified),
            _ => instant,
        }
    }
}

// ==== Offset resolution & conversion ====

impl TimeZone {
    /// The net UTC offset this zone observes at the given instant.
    ///
    /// Exact transition data always wins over synthesized rules when
    /// the zone carries it. Ambiguous wall-clock instants resolve to
    /// the standard offset; instants inside a gap resolve to the offset
    /// in effect after the transition.
    #[must_use]
    pub fn utc_offset(&self, instant: IsoDateTime) -> UtcOffset {
        if let Some(table) = &self.transitions {
            let record = match instant.kind {
                TimeKind::Utc => Self::resolve_utc(table, instant.epoch_seconds()),
                _ => match Self::resolve_wall(table, instant.epoch_seconds()) {
                    LocalResolution::Single(record) => record,
                    LocalResolution::Gap { after, .. } => after,
                    LocalResolution::Ambiguous { std, .. } => std,
                },
            };
            return UtcOffset::from_seconds(record.offset);
        }
        let rule = self.rule_for(instant);
        let base = self.base_offset
            + rule.map_or(UtcOffset::ZERO, AdjustmentRule::base_offset_delta);
        match rule {
            Some(rule) if rule.has_daylight() && self.in_daylight(rule, instant) => {
                base + rule.daylight_delta()
            }
            _ => base,
        }
    }

    /// Convert a wall-clock instant in this zone to UTC.
    ///
    /// A `Utc`-kind instant is only accepted by the UTC zone itself;
    /// instants inside a spring-forward gap are rejected.
    pub fn convert_to_utc(&self, instant: IsoDateTime) -> TimeZoneResult<IsoDateTime> {
        if instant.kind == TimeKind::Utc && !self.is_utc() {
            return Err(TimeZoneError::invalid_instant()
                .with_message("a Utc-kind instant cannot belong to a non-UTC source zone"));
        }
        if self.is_invalid_time(instant) {
            return Err(TimeZoneError::invalid_instant()
                .with_message("instant falls inside a spring-forward gap"));
        }
        let offset = self.utc_offset(instant);
        Ok(instant.saturating_sub(offset).with_kind(TimeKind::Utc))
    }

    /// Convert a UTC instant to this zone's wall clock.
    pub fn convert_from_utc(&self, instant: IsoDateTime) -> TimeZoneResult<IsoDateTime> {
        if instant.kind == TimeKind::Local {
            return Err(TimeZoneError::invalid_instant()
                .with_message("a Local-kind instant is not a UTC instant"));
        }
        let utc = instant.with_kind(TimeKind::Utc);
        let offset = self.utc_offset(utc);
        let kind = if self.is_utc() {
            TimeKind::Utc
        } else {
            TimeKind::Unspecified
        };
        Ok(utc.saturating_add(offset).with_kind(kind))
    }

    /// Convert an instant from `source` to `destination` through UTC.
    pub fn convert(
        instant: IsoDateTime,
        source: &TimeZone,
        destination: &TimeZone,
    ) -> TimeZoneResult<IsoDateTime> {
        let utc = source.convert_to_utc(instant)?;
        destination.convert_from_utc(utc)
    }
}

// ==== Raw transition table resolution ====

impl TimeZone {
    /// The record in effect at a UTC instant. The table always starts
    /// with a sentinel entry at `i64::MIN`, so a governing record
    /// exists for every instant.
    pub(crate) fn resolve_utc(table: &[ZoneTransition], seconds: i64) -> ZoneTransition {
        let idx = table.partition_point(|tr| tr.at_time <= seconds);
        table[idx.saturating_sub(1)]
    }

    /// Resolve a wall-clock reading against the table.
    ///
    /// State `j` begins on the local clock at `at_time[j] + offset[j]`
    /// and the previous state ends at `at_time[j] + offset[j - 1]`;
    /// when the offset shrinks the window between those two instants is
    /// a fold, and when it grows the window is a gap.
    pub(crate) fn resolve_wall(table: &[ZoneTransition], wall: i64) -> LocalResolution {
        let idx = table.partition_point(|tr| tr.at_time.saturating_add(tr.offset) <= wall);
        let cur = idx.saturating_sub(1);

        // Fold with the previous state at this state's own boundary.
        if cur > 0 {
            let prev_end = table[cur].at_time.saturating_add(table[cur - 1].offset);
            if wall < prev_end {
                return LocalResolution::Ambiguous {
                    std: table[cur],
                    dst: table[cur - 1],
                };
            }
        }

        // Gap before the next state's boundary.
        if let Some(next) = table.get(cur + 1) {
            let cur_end = next.at_time.saturating_add(table[cur].offset);
            if cur_end <= wall {
                return LocalResolution::Gap {
                    before: table[cur],
                    after: *next,
                };
            }
        }

        LocalResolution::Single(table[cur])
    }
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::{LocalResolution, TimeZone, ZoneTransition};
    use crate::iso::{IsoDate, IsoDateTime, IsoTime, TimeKind, Weekday};
    use crate::offset::UtcOffset;
    use crate::rule::{AdjustmentRule, TransitionTime};
    use crate::ErrorKind;
    use alloc::vec;
    use alloc::vec::Vec;

    fn at(h: u8, m: u8) -> IsoTime {
        IsoTime::try_new(h, m, 0, 0).unwrap()
    }

    fn wall(year: i32, month: u8, day: u8, hour: u8, minute: u8) -> IsoDateTime {
        IsoDateTime::new(
            IsoDate::try_new(year, month, day).unwrap(),
            IsoTime::try_new(hour, minute, 0, 0).unwrap(),
        )
    }

    /// A northern-hemisphere zone shaped like US Eastern: -5:00 base,
    /// +1:00 between the 2nd Sunday of March 02:00 and the 1st Sunday
    /// of November 02:00.
    fn eastern() -> TimeZone {
        let rule = AdjustmentRule::try_new(
            IsoDate::MIN,
            IsoDate::MAX,
            UtcOffset::from_hours(1),
            TransitionTime::floating(3, 2, Weekday::Sunday, at(2, 0)).unwrap(),
            TransitionTime::floating(11, 1, Weekday::Sunday, at(2, 0)).unwrap(),
        )
        .unwrap();
        TimeZone::try_new(
            "Test/Eastern",
            UtcOffset::from_hours(-5),
            "Eastern Time",
            "Eastern Standard Time",
            "Eastern Daylight Time",
            vec![rule],
        )
        .unwrap()
    }

    /// A southern-hemisphere zone shaped like Sydney: +10:00 base,
    /// +1:00 between the 1st Sunday of October 02:00 and the 1st Sunday
    /// of April 03:00 of the following year.
    fn southern() -> TimeZone {
        let rule = AdjustmentRule::try_new(
            IsoDate::MIN,
            IsoDate::MAX,
            UtcOffset::from_hours(1),
            TransitionTime::floating(10, 1, Weekday::Sunday, at(2, 0)).unwrap(),
            TransitionTime::floating(4, 1, Weekday::Sunday, at(3, 0)).unwrap(),
        )
        .unwrap();
        TimeZone::try_new(
            "Test/Southern",
            UtcOffset::from_hours(10),
            "Southern Time",
            "Southern Standard Time",
            "Southern Daylight Time",
            vec![rule],
        )
        .unwrap()
    }

    #[test]
    fn transition_point_floating() {
        let start = TransitionTime::floating(3, 2, Weekday::Sunday, at(2, 0)).unwrap();
        // 2nd Sunday of March 2023 is the 12th.
        let point = TimeZone::transition_point(&start, 2023);
        assert_eq!(point.date, IsoDate::try_new(2023, 3, 12).unwrap());
        assert_eq!(point.time, at(2, 0));
    }

    #[test]
    fn transition_point_week_five_collapses() {
        // February 2023 has only four Sundays; week 5 falls back to the
        // fourth, the 26th.
        let t = TransitionTime::floating(2, 5, Weekday::Sunday, at(2, 0)).unwrap();
        let point = TimeZone::transition_point(&t, 2023);
        assert_eq!(point.date, IsoDate::try_new(2023, 2, 26).unwrap());

        // October 2023 has five Sundays; week 5 is the 29th.
        let t = TransitionTime::floating(10, 5, Weekday::Sunday, at(2, 0)).unwrap();
        let point = TimeZone::transition_point(&t, 2023);
        assert_eq!(point.date, IsoDate::try_new(2023, 10, 29).unwrap());
    }

    #[test]
    fn transition_point_fixed_day_clamps() {
        let t = TransitionTime::fixed(2, 29, at(0, 0)).unwrap();
        assert_eq!(
            TimeZone::transition_point(&t, 2023).date,
            IsoDate::try_new(2023, 2, 28).unwrap()
        );
        assert_eq!(
            TimeZone::transition_point(&t, 2024).date,
            IsoDate::try_new(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn eastern_summer_and_winter_offsets() {
        let zone = eastern();
        assert_eq!(
            zone.utc_offset(wall(2023, 7, 1, 0, 0)),
            UtcOffset::from_hours(-4)
        );
        assert_eq!(
            zone.utc_offset(wall(2023, 1, 15, 12, 0)),
            UtcOffset::from_hours(-5)
        );
    }

    #[test]
    fn eastern_gap_is_invalid() {
        let zone = eastern();
        let gap = wall(2023, 3, 12, 2, 30);
        assert!(zone.is_invalid_time(gap));
        assert!(!zone.is_ambiguous_time(gap));
        assert!(!zone.is_invalid_time(wall(2023, 3, 12, 1, 59)));
        assert!(!zone.is_invalid_time(wall(2023, 3, 12, 3, 0)));

        let err = zone.convert_to_utc(gap).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInstant);
    }

    #[test]
    fn eastern_fold_is_ambiguous() {
        let zone = eastern();
        let fold = wall(2023, 11, 5, 1, 30);
        assert!(zone.is_ambiguous_time(fold));
        assert!(!zone.is_invalid_time(fold));
        assert_eq!(
            zone.ambiguous_offsets(fold).unwrap(),
            [UtcOffset::from_hours(-5), UtcOffset::from_hours(-4)]
        );
        // Ambiguous instants resolve to standard time.
        assert_eq!(zone.utc_offset(fold), UtcOffset::from_hours(-5));
        assert!(!zone.is_daylight_saving_time(fold));

        assert!(!zone.is_ambiguous_time(wall(2023, 11, 5, 2, 0)));
        assert!(zone.is_ambiguous_time(wall(2023, 11, 5, 1, 0)));
        assert!(!zone.is_ambiguous_time(wall(2023, 11, 5, 0, 59)));
        assert!(zone
            .ambiguous_offsets(wall(2023, 7, 1, 0, 0))
            .is_err());
    }

    #[test]
    fn eastern_utc_kind_resolution() {
        let zone = eastern();
        // 2023-03-12T07:00:00Z is the exact daylight transition.
        let dt = wall(2023, 3, 12, 7, 0).with_kind(TimeKind::Utc);
        assert_eq!(zone.utc_offset(dt), UtcOffset::from_hours(-4));
        let dt = wall(2023, 3, 12, 6, 59).with_kind(TimeKind::Utc);
        assert_eq!(zone.utc_offset(dt), UtcOffset::from_hours(-5));
        // 2023-11-05T06:00:00Z is the exact standard transition.
        let dt = wall(2023, 11, 5, 6, 0).with_kind(TimeKind::Utc);
        assert_eq!(zone.utc_offset(dt), UtcOffset::from_hours(-5));
        let dt = wall(2023, 11, 5, 5, 59).with_kind(TimeKind::Utc);
        assert_eq!(zone.utc_offset(dt), UtcOffset::from_hours(-4));
    }

    #[test]
    fn southern_daylight_spans_new_year() {
        let zone = southern();
        assert_eq!(
            zone.utc_offset(wall(2023, 1, 15, 12, 0)),
            UtcOffset::from_hours(11)
        );
        assert_eq!(
            zone.utc_offset(wall(2023, 12, 25, 12, 0)),
            UtcOffset::from_hours(11)
        );
        assert_eq!(
            zone.utc_offset(wall(2023, 6, 15, 12, 0)),
            UtcOffset::from_hours(10)
        );
    }

    #[test]
    fn southern_gap_and_fold() {
        let zone = southern();
        // 2023-10-01 02:30 never happened.
        assert!(zone.is_invalid_time(wall(2023, 10, 1, 2, 30)));
        // 2023-04-02 02:30 happened twice.
        let fold = wall(2023, 4, 2, 2, 30);
        assert!(zone.is_ambiguous_time(fold));
        assert_eq!(
            zone.ambiguous_offsets(fold).unwrap(),
            [UtcOffset::from_hours(10), UtcOffset::from_hours(11)]
        );
    }

    #[test]
    fn conversion_round_trip() {
        let zone = eastern();
        for dt in [
            wall(2023, 7, 1, 0, 0),
            wall(2023, 1, 15, 23, 45),
            wall(2023, 3, 12, 1, 59),
            wall(2023, 11, 5, 2, 0),
        ] {
            let utc = zone.convert_to_utc(dt).unwrap();
            assert_eq!(utc.kind, TimeKind::Utc);
            let back = zone.convert_from_utc(utc).unwrap();
            assert_eq!(back, dt);
        }
    }

    #[test]
    fn conversion_kind_checks() {
        let zone = eastern();
        let utc_kind = wall(2023, 7, 1, 0, 0).with_kind(TimeKind::Utc);
        assert_eq!(
            zone.convert_to_utc(utc_kind).unwrap_err().kind(),
            ErrorKind::InvalidInstant
        );
        let local_kind = wall(2023, 7, 1, 0, 0).with_kind(TimeKind::Local);
        assert_eq!(
            zone.convert_from_utc(local_kind).unwrap_err().kind(),
            ErrorKind::InvalidInstant
        );
        // The UTC zone accepts Utc-kind instants.
        assert!(TimeZone::utc().convert_to_utc(utc_kind).is_ok());
    }

    #[test]
    fn zone_to_zone_conversion() {
        let east = eastern();
        let south = southern();
        // 2023-07-01T08:00 eastern daylight == 2023-07-01T22:00 southern standard.
        let converted = TimeZone::convert(wall(2023, 7, 1, 8, 0), &east, &south).unwrap();
        assert_eq!(converted, wall(2023, 7, 1, 22, 0));
    }

    #[test]
    fn try_new_validation() {
        assert_eq!(
            TimeZone::fixed("", UtcOffset::ZERO).unwrap_err().kind(),
            ErrorKind::Argument
        );
        assert_eq!(
            TimeZone::fixed("X", UtcOffset::from_seconds(30))
                .unwrap_err()
                .kind(),
            ErrorKind::Argument
        );
        assert_eq!(
            TimeZone::fixed("X", UtcOffset::from_hours(15))
                .unwrap_err()
                .kind(),
            ErrorKind::Argument
        );
    }

    #[test]
    fn has_same_rules_ignores_names() {
        let a = eastern();
        let mut b = eastern();
        assert!(a.has_same_rules(&b));
        b = TimeZone::try_new(
            "Other/Id",
            a.base_offset(),
            "other",
            "other",
            "other",
            a.adjustment_rules().to_vec(),
        )
        .unwrap();
        assert!(a.has_same_rules(&b));
        let c = TimeZone::fixed("Fixed", UtcOffset::from_hours(-5)).unwrap();
        assert!(!a.has_same_rules(&c));
    }

    // ==== Raw transition table ====

    /// A small table shaped like one Eastern year: standard, daylight
    /// from March 12 07:00Z, standard again from November 5 06:00Z.
    fn table() -> Vec<ZoneTransition> {
        vec![
            ZoneTransition {
                at_time: i64::MIN,
                offset: -18_000,
                dst: false,
            },
            ZoneTransition {
                at_time: wall(2023, 3, 12, 7, 0).epoch_seconds(),
                offset: -14_400,
                dst: true,
            },
            ZoneTransition {
                at_time: wall(2023, 11, 5, 6, 0).epoch_seconds(),
                offset: -18_000,
                dst: false,
            },
        ]
    }

    fn table_zone() -> TimeZone {
        TimeZone::from_parts(
            alloc::string::String::from("Test/Table"),
            UtcOffset::from_hours(-5),
            alloc::string::String::from("Table"),
            alloc::string::String::from("TST"),
            alloc::string::String::from("TDT"),
            Vec::new(),
            Some(table()),
        )
    }

    #[test]
    fn table_utc_resolution() {
        let table = table();
        let before = wall(2023, 3, 12, 6, 59).epoch_seconds();
        assert_eq!(TimeZone::resolve_utc(&table, before).offset, -18_000);
        let after = wall(2023, 3, 12, 7, 0).epoch_seconds();
        assert_eq!(TimeZone::resolve_utc(&table, after).offset, -14_400);
    }

    #[test]
    fn table_wall_resolution() {
        let table = table();
        // Unique daylight instant.
        let july = wall(2023, 7, 1, 0, 0).epoch_seconds();
        assert!(matches!(
            TimeZone::resolve_wall(&table, july),
            LocalResolution::Single(r) if r.dst
        ));
        // Gap: 02:30 on the spring-forward day.
        let gap = wall(2023, 3, 12, 2, 30).epoch_seconds();
        assert!(matches!(
            TimeZone::resolve_wall(&table, gap),
            LocalResolution::Gap { .. }
        ));
        // Fold: 01:30 on the fall-back day.
        let fold = wall(2023, 11, 5, 1, 30).epoch_seconds();
        assert!(matches!(
            TimeZone::resolve_wall(&table, fold),
            LocalResolution::Ambiguous { std, dst }
                if std.offset == -18_000 && dst.offset == -14_400
        ));
    }

    #[test]
    fn table_zone_prefers_exact_data() {
        let zone = table_zone();
        assert_eq!(
            zone.utc_offset(wall(2023, 7, 1, 0, 0)),
            UtcOffset::from_hours(-4)
        );
        assert_eq!(
            zone.utc_offset(wall(2023, 11, 5, 1, 30)),
            UtcOffset::from_hours(-5)
        );
        assert!(zone.is_invalid_time(wall(2023, 3, 12, 2, 30)));
        assert!(zone.is_ambiguous_time(wall(2023, 11, 5, 1, 30)));
        assert_eq!(
            zone.ambiguous_offsets(wall(2023, 11, 5, 1, 30)).unwrap(),
            [UtcOffset::from_hours(-5), UtcOffset::from_hours(-4)]
        );
    }
}
