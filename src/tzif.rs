//! TZif v1 binary parsing and rule synthesis.
//!
//! The v1 layout is big-endian throughout: a 4-byte `"TZif"` magic, 16
//! reserved bytes, six 32-bit counts, then the transition instants,
//! transition type indices, type records, the abbreviation pool, and
//! the leap/standard/UT indicator tables (the last three are validated
//! for length and otherwise ignored).
//!
//! Parsing yields a raw transition table. Synthesis then tries to fold
//! that table into yearly [`AdjustmentRule`]s: each enter-daylight
//! transition is paired with the following enter-standard transition,
//! and a run of pairs that repeats on the same yearly pattern becomes a
//! single multi-year rule. A zone whose observed transitions do not
//! repeat cleanly is *irregular* and keeps the raw table as the source
//! of truth; whether a zone came from a file does not matter, only
//! whether its pattern repeats.

use alloc::string::ToString;
use alloc::vec::Vec;

use hashbrown::HashMap;
use tinystr::TinyAsciiStr;

use crate::iso::{IsoDate, IsoDateTime, IsoTime, TimeKind};
use crate::offset::{UtcOffset, MAX_OFFSET_SECONDS};
use crate::rule::{sort_rules, validate_rules, AdjustmentRule, TransitionDate, TransitionTime};
use crate::zone::{TimeZone, ZoneTransition};
use crate::{TimeZoneError, TimeZoneResult};

const MAGIC: &[u8; 4] = b"TZif";
const HEADER_LEN: usize = 44;

/// One distinct `(offset, is_dst, designation)` combination from the
/// type record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimeType {
    /// UTC offset in seconds, rounded down to a whole minute.
    pub(crate) offset_seconds: i64,
    pub(crate) is_dst: bool,
    pub(crate) designation: TinyAsciiStr<16>,
}

impl TimeZone {
    /// Decode a TZif buffer into a zone named `id`.
    pub fn from_tzif_bytes(id: &str, data: &[u8]) -> TimeZoneResult<Self> {
        if id.is_empty() {
            return Err(TimeZoneError::argument().with_message("zone id must not be empty"));
        }
        parse(id, data)
    }
}

// ==== Byte scanning ====

struct Scan<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> Scan<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    fn take(&mut self, n: usize) -> TimeZoneResult<&'a [u8]> {
        let end = self
            .cursor
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                TimeZoneError::corrupt().with_message("tzif buffer ends before its declared length")
            })?;
        let slice = &self.data[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    fn read_be_i32(&mut self) -> TimeZoneResult<i32> {
        let bytes = self.take(4)?;
        // Stored big-endian; from_be_bytes reverses on little-endian
        // hosts.
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u8(&mut self) -> TimeZoneResult<u8> {
        Ok(self.take(1)?[0])
    }
}

#[derive(Debug, Clone, Copy)]
struct Header {
    is_gmt_count: usize,
    is_std_count: usize,
    leap_count: usize,
    time_count: usize,
    type_count: usize,
    char_count: usize,
}

fn parse_header(scan: &mut Scan<'_>) -> TimeZoneResult<Header> {
    if scan.take(4)? != MAGIC {
        return Err(TimeZoneError::corrupt().with_message("missing TZif magic"));
    }
    // Version byte plus reserved padding.
    scan.take(16)?;
    let mut count = || -> TimeZoneResult<usize> {
        let raw = scan.read_be_i32()?;
        usize::try_from(raw)
            .map_err(|_| TimeZoneError::corrupt().with_message("negative count in tzif header"))
    };
    Ok(Header {
        is_gmt_count: count()?,
        is_std_count: count()?,
        leap_count: count()?,
        time_count: count()?,
        type_count: count()?,
        char_count: count()?,
    })
}

fn parse(id: &str, data: &[u8]) -> TimeZoneResult<TimeZone> {
    let mut scan = Scan::new(data);
    let header = parse_header(&mut scan)?;

    if header.type_count == 0 {
        return Err(TimeZoneError::corrupt().with_message("tzif data declares no time types"));
    }
    let declared = HEADER_LEN
        + header.time_count * 5
        + header.type_count * 6
        + header.char_count
        + header.leap_count * 8
        + header.is_std_count
        + header.is_gmt_count;
    if data.len() < declared {
        return Err(
            TimeZoneError::corrupt().with_message("tzif buffer is shorter than its header implies")
        );
    }

    let mut transition_times = Vec::with_capacity(header.time_count);
    for _ in 0..header.time_count {
        transition_times.push(i64::from(scan.read_be_i32()?));
    }
    if transition_times.windows(2).any(|w| w[0] >= w[1]) {
        return Err(
            TimeZoneError::corrupt().with_message("transition instants must be strictly increasing")
        );
    }

    let mut transition_types = Vec::with_capacity(header.time_count);
    for _ in 0..header.time_count {
        let idx = scan.read_u8()? as usize;
        if idx >= header.type_count {
            return Err(
                TimeZoneError::corrupt().with_message("transition references an unknown time type")
            );
        }
        transition_types.push(idx);
    }

    struct RawType {
        offset_seconds: i64,
        is_dst: bool,
        abbrev_index: usize,
    }
    let mut raw_types = Vec::with_capacity(header.type_count);
    for _ in 0..header.type_count {
        let offset = i64::from(scan.read_be_i32()?);
        let is_dst = match scan.read_u8()? {
            0 => false,
            1 => true,
            _ => {
                return Err(
                    TimeZoneError::corrupt().with_message("time type dst indicator must be 0 or 1")
                )
            }
        };
        raw_types.push(RawType {
            // Sub-minute offsets are not representable in the rule
            // model; round down to the whole minute.
            offset_seconds: offset.div_euclid(60) * 60,
            is_dst,
            abbrev_index: scan.read_u8()? as usize,
        });
    }

    // The abbreviation pool is indexed by raw byte offset, including
    // offsets pointing into the middle of a NUL-terminated run. Record
    // every suffix in one pass; the map is discarded after synthesis.
    let pool = scan.take(header.char_count)?;
    let mut designations: HashMap<usize, TinyAsciiStr<16>> = HashMap::new();
    let mut run_start = 0;
    for (i, byte) in pool.iter().enumerate() {
        if *byte == 0 {
            for start in run_start..=i {
                if let Ok(name) = TinyAsciiStr::try_from_utf8(&pool[start..i]) {
                    designations.insert(start, name);
                }
            }
            run_start = i + 1;
        }
    }
    if run_start < pool.len() {
        return Err(
            TimeZoneError::corrupt().with_message("abbreviation pool is not NUL-terminated")
        );
    }

    let mut types = Vec::with_capacity(header.type_count);
    for raw in &raw_types {
        let designation = designations.get(&raw.abbrev_index).copied().ok_or_else(|| {
            TimeZoneError::corrupt().with_message("time type references an invalid abbreviation")
        })?;
        types.push(TimeType {
            offset_seconds: raw.offset_seconds,
            is_dst: raw.is_dst,
            designation,
        });
    }

    // Leap seconds and the standard/UT indicators carry nothing the
    // rule model represents.
    scan.take(header.leap_count * 8 + header.is_std_count + header.is_gmt_count)?;

    // The state before the first transition is the first
    // non-daylight type by convention.
    let initial = *types
        .iter()
        .find(|ty| !ty.is_dst)
        .unwrap_or(&types[0]);

    let mut table = Vec::with_capacity(header.time_count + 1);
    table.push(ZoneTransition {
        at_time: i64::MIN,
        offset: initial.offset_seconds,
        dst: initial.is_dst,
    });
    for (at_time, type_idx) in transition_times.iter().zip(&transition_types) {
        let ty = types[*type_idx];
        table.push(ZoneTransition {
            at_time: *at_time,
            offset: ty.offset_seconds,
            dst: ty.is_dst,
        });
    }

    Ok(synthesize(id, initial, &types, &transition_times, &transition_types, table))
}

// ==== Rule synthesis ====

#[derive(Debug, Clone, Copy)]
struct DstObservation {
    start_utc: i64,
    end_utc: Option<i64>,
    std_offset: i64,
    dst_offset: i64,
    dst_designation: TinyAsciiStr<16>,
}

#[derive(Debug, Clone)]
struct RuleGroup {
    std_offset: i64,
    std_designation: TinyAsciiStr<16>,
    /// UTC instant the group's standard time took effect, `None` for
    /// the initial group.
    since: Option<i64>,
    observations: Vec<DstObservation>,
}

/// Walk the transition table and either produce a rule-backed zone or
/// fall back to the raw table for an irregular zone.
fn synthesize(
    id: &str,
    initial: TimeType,
    types: &[TimeType],
    transition_times: &[i64],
    transition_types: &[usize],
    table: Vec<ZoneTransition>,
) -> TimeZone {
    let mut groups: Vec<RuleGroup> = Vec::new();
    let mut group = RuleGroup {
        std_offset: initial.offset_seconds,
        std_designation: initial.designation,
        since: None,
        observations: Vec::new(),
    };
    let mut open_dst: Option<(i64, TimeType)> = None;
    let mut regular = true;

    for (at_time, type_idx) in transition_times.iter().zip(transition_types) {
        let ty = types[*type_idx];
        if ty.is_dst {
            if open_dst.is_some() {
                // Two daylight periods without an intervening standard
                // period never reduce to one yearly rule.
                regular = false;
                break;
            }
            open_dst = Some((*at_time, ty));
        } else {
            if let Some((start_utc, dst_ty)) = open_dst.take() {
                group.observations.push(DstObservation {
                    start_utc,
                    end_utc: Some(*at_time),
                    std_offset: group.std_offset,
                    dst_offset: dst_ty.offset_seconds,
                    dst_designation: dst_ty.designation,
                });
            }
            if ty.offset_seconds != group.std_offset || ty.designation != group.std_designation {
                groups.push(group);
                group = RuleGroup {
                    std_offset: ty.offset_seconds,
                    std_designation: ty.designation,
                    since: Some(*at_time),
                    observations: Vec::new(),
                };
            }
        }
    }
    if let Some((start_utc, dst_ty)) = open_dst {
        group.observations.push(DstObservation {
            start_utc,
            end_utc: None,
            std_offset: group.std_offset,
            dst_offset: dst_ty.offset_seconds,
            dst_designation: dst_ty.designation,
        });
    }
    groups.push(group);

    let last = groups.last().expect("at least the initial group exists");
    let base_offset = UtcOffset::from_seconds(last.std_offset);
    let standard_name = last.std_designation.to_string();
    let daylight_name = groups
        .iter()
        .rev()
        .find_map(|g| g.observations.last().map(|obs| obs.dst_designation))
        .map_or_else(|| standard_name.clone(), |name| name.to_string());

    let mut rules = Vec::new();
    if regular && base_offset.check_zone_offset("base offset").is_ok() {
        for (i, group) in groups.iter().enumerate() {
            // A group's calendar span is bounded by the instants the
            // surrounding standard changes took effect, read in the
            // group's own frame. `None` marks the open outer edges.
            let start_year = group
                .since
                .map(|s| IsoDateTime::from_epoch_seconds(s + group.std_offset, TimeKind::Unspecified).date.year);
            let end_year = groups.get(i + 1).and_then(|next| next.since).map(|s| {
                IsoDateTime::from_epoch_seconds(s + group.std_offset, TimeKind::Unspecified)
                    .date
                    .year
                    - 1
            });
            match synthesize_group(group, base_offset, start_year, end_year) {
                Some(Some(rule)) => rules.push(rule),
                // A rule-less standard period identical to the base
                // offset contributes nothing.
                Some(None) => {}
                None => {
                    regular = false;
                    break;
                }
            }
        }
    }

    if regular {
        sort_rules(&mut rules);
        regular = validate_rules(base_offset, &rules).is_ok();
    }

    if !regular {
        // Irregular: the raw table is the source of truth.
        return TimeZone::from_parts(
            id.to_string(),
            base_offset,
            id.to_string(),
            standard_name,
            daylight_name,
            Vec::new(),
            Some(table),
        );
    }

    TimeZone::from_parts(
        id.to_string(),
        base_offset,
        id.to_string(),
        standard_name,
        daylight_name,
        rules,
        None,
    )
}

/// Synthesize one group into at most one rule. `Some(None)` means the
/// group needs no rule; `None` means the group does not reduce to a
/// yearly pattern.
fn synthesize_group(
    group: &RuleGroup,
    base_offset: UtcOffset,
    start_year: Option<i32>,
    end_year: Option<i32>,
) -> Option<Option<AdjustmentRule>> {
    let base_delta = UtcOffset::from_seconds(group.std_offset) - base_offset;
    if base_delta.check_zone_offset("base offset delta").is_err() {
        return None;
    }

    if group.observations.is_empty() {
        if base_delta.is_zero() {
            return Some(None);
        }
        // A standard-offset change with no daylight saving still needs
        // a rule to carry the base offset delta over its range.
        let date_start = match start_year {
            None => IsoDate::MIN,
            Some(year) => IsoDate::new_unchecked(year, 1, 1),
        };
        let date_end = match end_year {
            None => IsoDate::MAX,
            Some(year) => IsoDate::new_unchecked(year, 12, 31),
        };
        if date_start > date_end {
            return None;
        }
        let rule = AdjustmentRule::new_unchecked(
            date_start,
            date_end,
            UtcOffset::ZERO,
            TransitionTime {
                time_of_day: IsoTime::new_unchecked(0, 0, 0, 0),
                month: 1,
                date: TransitionDate::Fixed { day: 1 },
            },
            TransitionTime {
                time_of_day: IsoTime::MAX,
                month: 12,
                date: TransitionDate::Fixed { day: 31 },
            },
            base_delta,
        );
        return Some(Some(rule));
    }

    let first = group.observations[0];
    let end_utc = first.end_utc?;
    let delta_seconds = first.dst_offset - first.std_offset;
    if delta_seconds.abs() > MAX_OFFSET_SECONDS || delta_seconds % 60 != 0 {
        return None;
    }
    let delta = UtcOffset::from_seconds(delta_seconds);

    // The start boundary is observed in the standard frame and the end
    // boundary in the daylight frame.
    let start_wall = IsoDateTime::from_epoch_seconds(first.start_utc + first.std_offset, TimeKind::Unspecified);
    let end_wall = IsoDateTime::from_epoch_seconds(end_utc + first.dst_offset, TimeKind::Unspecified);

    let start_candidates = floating_candidates(start_wall);
    let end_candidates = floating_candidates(end_wall);

    let mut matched = None;
    'combos: for ts in &start_candidates {
        for te in &end_candidates {
            if ts == te {
                continue;
            }
            if validate_pattern(group, ts, te) {
                matched = Some((*ts, *te));
                break 'combos;
            }
        }
    }
    let (transition_start, transition_end) = matched?;

    // Span the observed years without splitting a daylight interval:
    // whole calendar years in the northern hemisphere, July-to-June
    // years when the daylight period crosses the new year. The outer
    // edges of the zone's history extend to the representable range.
    let southern = transition_start.month >= transition_end.month;
    let first_obs_year = IsoDateTime::from_epoch_seconds(
        first.start_utc + first.std_offset,
        TimeKind::Unspecified,
    )
    .date
    .year;
    let last = group.observations.last().expect("observations is non-empty");
    let last_obs_utc = last.end_utc.unwrap_or(last.start_utc);
    let last_obs_year =
        IsoDateTime::from_epoch_seconds(last_obs_utc + last.dst_offset, TimeKind::Unspecified)
            .date
            .year;

    let date_start = match start_year {
        None => IsoDate::MIN,
        Some(_) if southern => IsoDate::new_unchecked(first_obs_year, 7, 1),
        Some(_) => IsoDate::new_unchecked(first_obs_year, 1, 1),
    };
    let date_end = match end_year {
        None => IsoDate::MAX,
        Some(_) if southern => IsoDate::new_unchecked(last_obs_year, 6, 30),
        Some(_) => IsoDate::new_unchecked(last_obs_year, 12, 31),
    };
    if date_start > date_end {
        return None;
    }

    Some(Some(AdjustmentRule::new_unchecked(
        date_start,
        date_end,
        delta,
        transition_start,
        transition_end,
        base_delta,
    )))
}

/// The candidate yearly patterns a single observed transition could be
/// an instance of: its nth-weekday-of-month reading, plus the
/// week-5 ("last") reading when it is the month's final occurrence.
fn floating_candidates(wall: IsoDateTime) -> Vec<TransitionTime> {
    let weekday = wall.date.day_of_week();
    let nth = (wall.date.day - 1) / 7 + 1;
    let mut candidates = Vec::with_capacity(2);
    candidates.push(TransitionTime {
        time_of_day: wall.time,
        month: wall.date.month,
        date: TransitionDate::Floating { week: nth, weekday },
    });
    if nth == 4 && wall.date.day + 7 > wall.date.days_in_month() {
        candidates.push(TransitionTime {
            time_of_day: wall.time,
            month: wall.date.month,
            date: TransitionDate::Floating { week: 5, weekday },
        });
    }
    candidates
}

/// Check that a candidate pattern reproduces every observed transition
/// pair in the group and that the pairs are exactly one year apart.
fn validate_pattern(group: &RuleGroup, start: &TransitionTime, end: &TransitionTime) -> bool {
    let southern = start.month >= end.month;
    let mut prev_year: Option<i32> = None;
    for obs in &group.observations {
        let start_wall =
            IsoDateTime::from_epoch_seconds(obs.start_utc + obs.std_offset, TimeKind::Unspecified);
        let year = start_wall.date.year;
        if TimeZone::transition_point(start, year) != start_wall {
            return false;
        }
        if let Some(prev) = prev_year {
            if year != prev + 1 {
                return false;
            }
        }
        prev_year = Some(year);

        let Some(end_utc) = obs.end_utc else {
            // An open trailing daylight period only needs its start to
            // match the pattern.
            continue;
        };
        let end_wall =
            IsoDateTime::from_epoch_seconds(end_utc + obs.dst_offset, TimeKind::Unspecified);
        let end_year = year + i32::from(southern);
        if end_wall.date.year != end_year || TimeZone::transition_point(end, end_year) != end_wall {
            return false;
        }
    }
    true
}
