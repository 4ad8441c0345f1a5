//! The process-wide zone cache and kind-aware conversions.
//!
//! A [`ZoneCache`] owns the lazily created `UTC` and local singletons
//! and a map of system zones loaded so far. Publication is
//! first-writer-wins: the cache lock is held only to check and to
//! publish, never across a loader call, and a loser of the race drops
//! its own freshly built zone in favor of the winner's. Zones are
//! immutable, so a caller holding an [`Arc`] across
//! [`clear`][ZoneCache::clear] simply keeps resolving against the
//! definition it already has.

use std::sync::Mutex;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;

use crate::iso::{IsoDateTime, TimeKind};
use crate::offset::UtcOffset;
use crate::sys::ZoneSource;
use crate::zone::TimeZone;
use crate::{TimeZoneError, TimeZoneResult};

#[derive(Debug, Default)]
struct CacheState {
    utc: Option<Arc<TimeZone>>,
    local: Option<Arc<TimeZone>>,
    zones: BTreeMap<String, Arc<TimeZone>>,
}

/// The owned cache of process-wide zones; see the module docs.
#[derive(Debug)]
pub struct ZoneCache {
    source: ZoneSource,
    state: Mutex<CacheState>,
}

impl Default for ZoneCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneCache {
    /// A cache over the probed platform source.
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(ZoneSource::probe())
    }

    /// A cache over an explicit source.
    #[must_use]
    pub fn with_source(source: ZoneSource) -> Self {
        Self {
            source,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        // A poisoned cache only means another thread panicked between
        // check and publish; the data itself is immutable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The UTC singleton.
    #[must_use]
    pub fn utc(&self) -> Arc<TimeZone> {
        if let Some(utc) = self.lock().utc.clone() {
            return utc;
        }
        let built = Arc::new(TimeZone::utc());
        let mut state = self.lock();
        state.utc.get_or_insert(built).clone()
    }

    /// The local-zone singleton. Resolution failures fall back to UTC.
    #[must_use]
    pub fn local(&self) -> Arc<TimeZone> {
        if let Some(local) = self.lock().local.clone() {
            return local;
        }
        let built = ZoneSource::local_identifier()
            .and_then(|id| match self.source.load(&id) {
                Ok(zone) => Some(Arc::new(zone)),
                Err(_err) => {
                    #[cfg(feature = "log")]
                    log::warn!("failed to load local zone '{id}': {_err}");
                    None
                }
            })
            .unwrap_or_else(|| self.utc());
        let mut state = self.lock();
        state.local.get_or_insert(built).clone()
    }

    /// Look up a zone in the system source, loading and caching it on
    /// first use.
    pub fn find_system_zone(&self, id: &str) -> TimeZoneResult<Arc<TimeZone>> {
        if id == "UTC" {
            return Ok(self.utc());
        }
        if let Some(zone) = self.lock().zones.get(id).cloned() {
            return Ok(zone);
        }
        let loaded = Arc::new(self.source.load(id)?);
        let mut state = self.lock();
        Ok(state
            .zones
            .entry(id.to_string())
            .or_insert(loaded)
            .clone())
    }

    /// Drop every cached zone. In-flight users keep their own
    /// references and continue correctly.
    pub fn clear(&self) {
        let mut state = self.lock();
        *state = CacheState::default();
    }

    fn is_local(&self, zone: &TimeZone) -> bool {
        self.local().id() == zone.id()
    }
}

// ==== Kind-aware resolution & conversion ====

impl ZoneCache {
    /// The net UTC offset of `zone` at `instant`, honoring the zone the
    /// instant's kind declares it to belong to.
    ///
    /// A `Local`-kind instant queried against a different zone is
    /// resolved in two explicit phases: first in its own declared
    /// (local) zone, then, shifted into UTC, in the target zone.
    #[must_use]
    pub fn utc_offset(&self, zone: &TimeZone, instant: IsoDateTime) -> UtcOffset {
        match instant.kind {
            TimeKind::Unspecified | TimeKind::Utc => zone.utc_offset(instant),
            TimeKind::Local => {
                let local = self.local();
                if local.id() == zone.id() {
                    return zone.utc_offset(instant.with_kind(TimeKind::Unspecified));
                }
                let declared = local.utc_offset(instant.with_kind(TimeKind::Unspecified));
                let utc = instant.saturating_sub(declared).with_kind(TimeKind::Utc);
                zone.utc_offset(utc)
            }
        }
    }

    /// Convert an instant in `source` to UTC, validating that the
    /// instant's kind is consistent with `source`.
    pub fn convert_to_utc(
        &self,
        instant: IsoDateTime,
        source: &TimeZone,
    ) -> TimeZoneResult<IsoDateTime> {
        if instant.kind == TimeKind::Local && !self.is_local(source) {
            return Err(TimeZoneError::invalid_instant()
                .with_message("a Local-kind instant cannot belong to a non-local source zone"));
        }
        source.convert_to_utc(instant)
    }

    /// Convert a UTC instant into `destination`'s wall clock. The
    /// result is `Local`-kind when the destination is the local zone.
    pub fn convert_from_utc(
        &self,
        instant: IsoDateTime,
        destination: &TimeZone,
    ) -> TimeZoneResult<IsoDateTime> {
        let converted = destination.convert_from_utc(instant)?;
        if self.is_local(destination) {
            return Ok(converted.with_kind(TimeKind::Local));
        }
        Ok(converted)
    }

    /// Convert an instant between two zones through UTC.
    pub fn convert(
        &self,
        instant: IsoDateTime,
        source: &TimeZone,
        destination: &TimeZone,
    ) -> TimeZoneResult<IsoDateTime> {
        // Local to local is the identity, modulo gap validation.
        if instant.kind == TimeKind::Local
            && self.is_local(source)
            && source.id() == destination.id()
        {
            if source.is_invalid_time(instant) {
                return Err(TimeZoneError::invalid_instant()
                    .with_message("instant falls inside a spring-forward gap"));
            }
            return Ok(instant);
        }
        let utc = self.convert_to_utc(instant, source)?;
        self.convert_from_utc(utc, destination)
    }

    /// Convert an instant to the zone named `destination_id`, sourcing
    /// the instant's own zone from its kind.
    pub fn convert_by_id(
        &self,
        instant: IsoDateTime,
        destination_id: &str,
    ) -> TimeZoneResult<IsoDateTime> {
        let destination = self.find_system_zone(destination_id)?;
        let source = match instant.kind {
            TimeKind::Utc => self.utc(),
            TimeKind::Local | TimeKind::Unspecified => self.local(),
        };
        self.convert(instant, &source, &destination)
    }
}

#[cfg(test)]
mod tests {
    use super::ZoneCache;
    use crate::iso::{IsoDate, IsoDateTime, IsoTime, TimeKind, Weekday};
    use crate::offset::UtcOffset;
    use crate::rule::{AdjustmentRule, TransitionTime};
    use crate::sys::ZoneSource;
    use crate::zone::TimeZone;
    use crate::ErrorKind;
    use alloc::collections::BTreeMap;
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec;

    fn wall(year: i32, month: u8, day: u8, hour: u8, minute: u8) -> IsoDateTime {
        IsoDateTime::new(
            IsoDate::try_new(year, month, day).unwrap(),
            IsoTime::try_new(hour, minute, 0, 0).unwrap(),
        )
    }

    fn eastern() -> TimeZone {
        let rule = AdjustmentRule::try_new(
            IsoDate::MIN,
            IsoDate::MAX,
            UtcOffset::from_hours(1),
            TransitionTime::floating(3, 2, Weekday::Sunday, IsoTime::try_new(2, 0, 0, 0).unwrap())
                .unwrap(),
            TransitionTime::floating(11, 1, Weekday::Sunday, IsoTime::try_new(2, 0, 0, 0).unwrap())
                .unwrap(),
        )
        .unwrap();
        TimeZone::try_new(
            "Test/Eastern",
            UtcOffset::from_hours(-5),
            "Eastern",
            "EST",
            "EDT",
            vec![rule],
        )
        .unwrap()
    }

    fn memory_cache() -> ZoneCache {
        let mut zones = BTreeMap::new();
        zones.insert(String::from("Test/Eastern"), eastern());
        zones.insert(
            String::from("Test/Kolkata"),
            TimeZone::fixed("Test/Kolkata", UtcOffset::from_minutes(330)).unwrap(),
        );
        ZoneCache::with_source(ZoneSource::Memory(zones))
    }

    #[test]
    fn utc_singleton_is_published_once() {
        let cache = memory_cache();
        let first = cache.utc();
        let second = cache.utc();
        assert!(Arc::ptr_eq(&first, &second));

        cache.clear();
        let third = cache.utc();
        assert!(!Arc::ptr_eq(&first, &third));
        // The old reference keeps working.
        assert_eq!(first.utc_offset(wall(2023, 7, 1, 0, 0)), UtcOffset::ZERO);
    }

    #[test]
    fn system_zones_are_cached() {
        let cache = memory_cache();
        let first = cache.find_system_zone("Test/Eastern").unwrap();
        let second = cache.find_system_zone("Test/Eastern").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            first.utc_offset(wall(2023, 7, 1, 0, 0)),
            UtcOffset::from_hours(-4)
        );
    }

    #[test]
    fn unknown_zone_is_not_found() {
        let cache = memory_cache();
        let err = cache.find_system_zone("Test/Nowhere").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let empty = ZoneCache::with_source(ZoneSource::None);
        assert_eq!(
            empty.find_system_zone("Test/Eastern").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        // UTC always resolves.
        assert!(empty.find_system_zone("UTC").is_ok());
    }

    #[test]
    fn local_falls_back_to_utc_without_a_source() {
        let cache = ZoneCache::with_source(ZoneSource::None);
        let local = cache.local();
        assert_eq!(local.id(), "UTC");
    }

    #[test]
    fn conversions_between_cached_zones() {
        let cache = memory_cache();
        let eastern = cache.find_system_zone("Test/Eastern").unwrap();
        let kolkata = cache.find_system_zone("Test/Kolkata").unwrap();

        // 2023-07-01T08:00 eastern daylight == 12:00Z == 17:30 Kolkata.
        let converted = cache
            .convert(wall(2023, 7, 1, 8, 0), &eastern, &kolkata)
            .unwrap();
        assert_eq!(converted, wall(2023, 7, 1, 17, 30));

        let utc = cache
            .convert_to_utc(wall(2023, 7, 1, 8, 0), &eastern)
            .unwrap();
        assert_eq!(utc, wall(2023, 7, 1, 12, 0));
        assert_eq!(utc.kind, TimeKind::Utc);
    }

    #[test]
    fn local_kind_consistency_is_enforced() {
        let cache = memory_cache();
        let eastern = cache.find_system_zone("Test/Eastern").unwrap();
        // With no TZ resolution the local zone is UTC, so a Local-kind
        // instant cannot claim to be eastern wall time.
        let instant = wall(2023, 7, 1, 8, 0).with_kind(TimeKind::Local);
        if cache.local().id() != eastern.id() {
            assert_eq!(
                cache.convert_to_utc(instant, &eastern).unwrap_err().kind(),
                ErrorKind::InvalidInstant
            );
        }
    }

    #[test]
    fn two_phase_local_resolution() {
        let cache = memory_cache();
        let eastern = cache.find_system_zone("Test/Eastern").unwrap();
        let local = cache.local();
        // Resolve a Local-kind instant against a foreign zone: first in
        // the local zone, then in the target.
        let instant = wall(2023, 7, 1, 12, 0).with_kind(TimeKind::Local);
        let expected = {
            let declared = local.utc_offset(wall(2023, 7, 1, 12, 0));
            let utc = instant.saturating_sub(declared).with_kind(TimeKind::Utc);
            eastern.utc_offset(utc)
        };
        assert_eq!(cache.utc_offset(&eastern, instant), expected);
    }
}
