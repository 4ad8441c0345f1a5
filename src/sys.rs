//! Platform time zone sources.
//!
//! The source a process reads zone data from is probed once and held
//! as a value; resolution never re-probes per lookup. On most Unix
//! systems the source is the compiled zoneinfo directory; a prepared
//! in-memory map serves embedded and test setups.

use std::fs;
use std::path::PathBuf;

use alloc::collections::BTreeMap;
use alloc::string::String;

use crate::zone::TimeZone;
use crate::{TimeZoneError, TimeZoneResult};

const ZONEINFO_DIR: &str = "/usr/share/zoneinfo";

/// Where a [`ZoneCache`][crate::ZoneCache] loads system zones from.
#[derive(Debug, Clone)]
pub enum ZoneSource {
    /// A directory of compiled TZif files keyed by zone identifier.
    ZoneInfoDir(PathBuf),
    /// A prepared in-memory set of zones.
    Memory(BTreeMap<String, TimeZone>),
    /// No system source; only `UTC` resolves.
    None,
}

impl ZoneSource {
    /// Probe the platform for a usable source. Runs once per cache.
    #[must_use]
    pub fn probe() -> Self {
        let dir = PathBuf::from(ZONEINFO_DIR);
        if dir.is_dir() {
            return Self::ZoneInfoDir(dir);
        }
        #[cfg(feature = "log")]
        log::debug!("no zoneinfo directory found; only UTC will resolve");
        Self::None
    }

    pub(crate) fn load(&self, id: &str) -> TimeZoneResult<TimeZone> {
        if id.is_empty() {
            return Err(TimeZoneError::argument().with_message("zone id must not be empty"));
        }
        match self {
            Self::ZoneInfoDir(dir) => {
                // Identifiers are relative paths into the zoneinfo
                // tree; anything that escapes it is a caller bug.
                if id.starts_with('/') || id.split('/').any(|part| part.is_empty() || part == "..")
                {
                    return Err(TimeZoneError::argument()
                        .with_message("zone id must be a relative zoneinfo path"));
                }
                let path = dir.join(id);
                let data = fs::read(&path).map_err(|_| {
                    TimeZoneError::not_found().with_message(alloc::format!(
                        "time zone '{id}' was not found in the system database"
                    ))
                })?;
                #[cfg(feature = "log")]
                log::debug!("loaded {} bytes of tzif data for {id}", data.len());
                TimeZone::from_tzif_bytes(id, &data)
            }
            Self::Memory(zones) => zones.get(id).cloned().ok_or_else(|| {
                TimeZoneError::not_found().with_message(alloc::format!(
                    "time zone '{id}' was not found in the system database"
                ))
            }),
            Self::None => Err(TimeZoneError::not_found()
                .with_message("no system time zone source is available")),
        }
    }

    /// The identifier of the system-local zone, if one can be
    /// determined.
    pub(crate) fn local_identifier() -> Option<String> {
        if let Ok(id) = std::env::var("TZ") {
            if !id.is_empty() {
                return Some(id);
            }
        }
        iana_time_zone::get_timezone().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::ZoneSource;
    use crate::ErrorKind;

    #[test]
    fn none_source_finds_nothing() {
        let err = ZoneSource::None.load("America/New_York").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn traversal_identifiers_are_rejected() {
        let source = ZoneSource::ZoneInfoDir("/usr/share/zoneinfo".into());
        for id in ["../etc/passwd", "/etc/passwd", "America//New_York"] {
            assert_eq!(source.load(id).unwrap_err().kind(), ErrorKind::Argument);
        }
        assert_eq!(source.load("").unwrap_err().kind(), ErrorKind::Argument);
    }
}
