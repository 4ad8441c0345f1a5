//! `tzinfo_rs` models a time zone as a base UTC offset plus a
//! chronologically ordered set of daylight-saving adjustment rules,
//! and resolves instants against that model.
//!
//! ```rust
//! use tzinfo_rs::{AdjustmentRule, IsoDate, IsoDateTime, IsoTime, TimeZone, TransitionTime,
//!     UtcOffset, Weekday};
//!
//! // A northern-hemisphere zone: UTC-5, one hour of daylight saving
//! // between the 2nd Sunday of March and the 1st Sunday of November.
//! let two_am = IsoTime::try_new(2, 0, 0, 0).unwrap();
//! let rule = AdjustmentRule::try_new(
//!     IsoDate::MIN,
//!     IsoDate::MAX,
//!     UtcOffset::from_hours(1),
//!     TransitionTime::floating(3, 2, Weekday::Sunday, two_am).unwrap(),
//!     TransitionTime::floating(11, 1, Weekday::Sunday, two_am).unwrap(),
//! )
//! .unwrap();
//! let zone = TimeZone::try_new(
//!     "Example/Eastern",
//!     UtcOffset::from_hours(-5),
//!     "Eastern Time",
//!     "Eastern Standard Time",
//!     "Eastern Daylight Time",
//!     vec![rule],
//! )
//! .unwrap();
//!
//! let july = IsoDateTime::new(
//!     IsoDate::try_new(2023, 7, 1).unwrap(),
//!     IsoTime::try_new(0, 0, 0, 0).unwrap(),
//! );
//! assert_eq!(zone.utc_offset(july), UtcOffset::from_hours(-4));
//! ```
//!
//! Instants inside a spring-forward gap are *invalid* and rejected by
//! conversions; instants inside a fall-back overlap are *ambiguous*
//! and resolve to standard time, with both candidates available from
//! [`TimeZone::ambiguous_offsets`].
//!
//! Zones are populated by the loaders: the TZif v1 binary format
//! ([`TimeZone::from_tzif_bytes`]), the 44-byte registry blob
//! ([`TimeZone::from_registry_bytes`]), and the serialized-string
//! transport ([`TimeZone::from_serialized_string`]); or they are built
//! programmatically as above. With the `std` feature, [`ZoneCache`]
//! adds the process-wide `UTC`/local singletons and system zone
//! lookup.
#![no_std]
#![cfg_attr(not(test), forbid(clippy::unwrap_used))]
#![allow(clippy::module_name_repetitions)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod iso;
pub mod offset;
pub mod rule;
pub mod serialized;
pub mod tzif;
pub mod zone;

pub mod registry;

#[cfg(feature = "std")]
pub mod cache;
#[cfg(feature = "std")]
pub mod sys;

pub(crate) mod utils;

#[doc(inline)]
pub use error::{ErrorKind, TimeZoneError};

/// The result type for time zone operations.
pub type TimeZoneResult<T> = Result<T, TimeZoneError>;

pub use iso::{IsoDate, IsoDateTime, IsoTime, TimeKind, Weekday};
pub use offset::UtcOffset;
pub use registry::{RegistrySystemTime, RegistryTzi};
pub use rule::{AdjustmentRule, TransitionDate, TransitionTime};
pub use zone::{TimeZone, ZoneTransition};

#[cfg(feature = "std")]
pub use cache::ZoneCache;
#[cfg(feature = "std")]
pub use sys::ZoneSource;
