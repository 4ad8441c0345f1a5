//! Daylight-saving adjustment rules.
//!
//! An [`AdjustmentRule`] binds a fixed daylight delta and a pair of
//! yearly [`TransitionTime`]s to an inclusive calendar date range. A
//! zone carries an ordered, non-overlapping set of these; selection and
//! evaluation live in [`zone`][crate::zone].

use alloc::vec::Vec;

use crate::iso::{IsoDate, IsoTime, Weekday};
use crate::offset::UtcOffset;
use crate::{TimeZoneError, TimeZoneResult};

/// The day-in-month selector of a [`TransitionTime`].
///
/// A transition either happens on a fixed calendar day or floats as
/// "the nth weekday of the month". Week `5` means the last occurrence:
/// when the month has no fifth occurrence it collapses to the fourth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDate {
    /// A fixed calendar day, `1..=31`. Days past the end of a short
    /// month clamp to the month's last day when evaluated.
    Fixed { day: u8 },
    /// The `week`th (`1..=5`) occurrence of `weekday` in the month.
    Floating { week: u8, weekday: Weekday },
}

/// A yearly recurrence: the point within a year at which a zone enters
/// or leaves daylight saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTime {
    /// Wall-clock time of day at which the transition occurs.
    pub time_of_day: IsoTime,
    /// Month of the transition, `1..=12`.
    pub month: u8,
    /// Day selection within the month.
    pub date: TransitionDate,
}

impl TransitionTime {
    /// Create a fixed-date transition.
    pub fn fixed(month: u8, day: u8, time_of_day: IsoTime) -> TimeZoneResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(TimeZoneError::argument().with_message("month must be in 1..=12"));
        }
        if !(1..=31).contains(&day) {
            return Err(TimeZoneError::argument().with_message("day must be in 1..=31"));
        }
        Ok(Self {
            time_of_day,
            month,
            date: TransitionDate::Fixed { day },
        })
    }

    /// Create a floating "nth weekday of month" transition.
    pub fn floating(
        month: u8,
        week: u8,
        weekday: Weekday,
        time_of_day: IsoTime,
    ) -> TimeZoneResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(TimeZoneError::argument().with_message("month must be in 1..=12"));
        }
        if !(1..=5).contains(&week) {
            return Err(TimeZoneError::argument().with_message("week must be in 1..=5"));
        }
        Ok(Self {
            time_of_day,
            month,
            date: TransitionDate::Floating { week, weekday },
        })
    }

    /// Whether this is a fixed-date transition.
    #[inline]
    #[must_use]
    pub const fn is_fixed_date(&self) -> bool {
        matches!(self.date, TransitionDate::Fixed { .. })
    }
}

/// One entry of a zone's daylight-saving rule set.
///
/// Over the inclusive `[date_start, date_end]` range the zone observes
/// `daylight_delta` between `transition_start` and `transition_end` of
/// each year, and its base offset is adjusted by `base_offset_delta`
/// (non-zero only for ranges in which the zone's standard offset itself
/// differed from the current one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentRule {
    date_start: IsoDate,
    date_end: IsoDate,
    daylight_delta: UtcOffset,
    transition_start: TransitionTime,
    transition_end: TransitionTime,
    base_offset_delta: UtcOffset,
}

impl AdjustmentRule {
    /// Create a rule, validating the range and delta invariants.
    pub fn try_new(
        date_start: IsoDate,
        date_end: IsoDate,
        daylight_delta: UtcOffset,
        transition_start: TransitionTime,
        transition_end: TransitionTime,
    ) -> TimeZoneResult<Self> {
        Self::try_new_with_base_delta(
            date_start,
            date_end,
            daylight_delta,
            transition_start,
            transition_end,
            UtcOffset::ZERO,
        )
    }

    /// Create a rule that also adjusts the zone's base offset over its
    /// range.
    pub fn try_new_with_base_delta(
        date_start: IsoDate,
        date_end: IsoDate,
        daylight_delta: UtcOffset,
        transition_start: TransitionTime,
        transition_end: TransitionTime,
        base_offset_delta: UtcOffset,
    ) -> TimeZoneResult<Self> {
        if date_start > date_end {
            return Err(TimeZoneError::argument()
                .with_message("rule date range start must not be after its end"));
        }
        if transition_start == transition_end {
            return Err(TimeZoneError::argument()
                .with_message("rule transitions must describe a non-empty daylight period"));
        }
        daylight_delta.check_zone_offset("daylight delta")?;
        base_offset_delta.check_zone_offset("base offset delta")?;
        Ok(Self {
            date_start,
            date_end,
            daylight_delta,
            transition_start,
            transition_end,
            base_offset_delta,
        })
    }

    /// Loader path for rules that are correct by construction.
    pub(crate) const fn new_unchecked(
        date_start: IsoDate,
        date_end: IsoDate,
        daylight_delta: UtcOffset,
        transition_start: TransitionTime,
        transition_end: TransitionTime,
        base_offset_delta: UtcOffset,
    ) -> Self {
        Self {
            date_start,
            date_end,
            daylight_delta,
            transition_start,
            transition_end,
            base_offset_delta,
        }
    }

    /// First date the rule applies to.
    #[inline]
    #[must_use]
    pub const fn date_start(&self) -> IsoDate {
        self.date_start
    }

    /// Last date the rule applies to.
    #[inline]
    #[must_use]
    pub const fn date_end(&self) -> IsoDate {
        self.date_end
    }

    /// The offset added on top of the base offset while daylight saving
    /// is in effect.
    #[inline]
    #[must_use]
    pub const fn daylight_delta(&self) -> UtcOffset {
        self.daylight_delta
    }

    /// The yearly point at which daylight saving begins.
    #[inline]
    #[must_use]
    pub const fn transition_start(&self) -> &TransitionTime {
        &self.transition_start
    }

    /// The yearly point at which daylight saving ends.
    #[inline]
    #[must_use]
    pub const fn transition_end(&self) -> &TransitionTime {
        &self.transition_end
    }

    /// The adjustment to the zone's base offset over this rule's range.
    #[inline]
    #[must_use]
    pub const fn base_offset_delta(&self) -> UtcOffset {
        self.base_offset_delta
    }

    /// Whether this rule observes a daylight period at all.
    #[inline]
    #[must_use]
    pub fn has_daylight(&self) -> bool {
        !self.daylight_delta.is_zero()
    }

    #[inline]
    pub(crate) fn contains(&self, date: IsoDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }
}

/// Validate that a rule slice is sorted ascending by start date and
/// pairwise non-overlapping, and that each rule's offsets combine with
/// `base_offset` to a representable zone offset.
pub(crate) fn validate_rules(
    base_offset: UtcOffset,
    rules: &[AdjustmentRule],
) -> TimeZoneResult<()> {
    for (i, rule) in rules.iter().enumerate() {
        (base_offset + rule.base_offset_delta()).check_zone_offset("rule base offset")
            .map_err(|_| {
                TimeZoneError::data().with_message("rule base offset sum is out of range")
            })?;
        if let Some(next) = rules.get(i + 1) {
            if rule.date_end() >= next.date_start() {
                return Err(TimeZoneError::data()
                    .with_message("adjustment rules must be sorted and non-overlapping"));
            }
        }
    }
    Ok(())
}

/// Sort a freshly decoded rule list by start date before validation.
pub(crate) fn sort_rules(rules: &mut Vec<AdjustmentRule>) {
    rules.sort_by_key(AdjustmentRule::date_start);
}
