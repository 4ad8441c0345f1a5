//! The error type for time zone operations.

use alloc::borrow::Cow;
use alloc::string::String;
use core::fmt;

/// `ErrorKind` classifies a [`TimeZoneError`].
///
/// The kinds map one-to-one onto the failure classes of this library:
/// caller bugs, invalid zone definitions, missing system zones, corrupt
/// source data, and instants that contradict the zone they are used with.
/// None of them are transient; nothing in this library retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A malformed argument: empty identifier, out-of-range or
    /// non-whole-minute offset, invalid calendar component.
    Argument,
    /// An invalid zone definition: unsorted, overlapping, or otherwise
    /// inconsistent adjustment rules, or an offset sum out of range.
    Data,
    /// The requested zone identifier is absent from the system source.
    NotFound,
    /// Malformed binary or serialized zone data. No partial zone is
    /// ever returned alongside this kind.
    Corrupt,
    /// A local instant inside a spring-forward gap, or an instant whose
    /// kind contradicts the zone used for a conversion.
    InvalidInstant,
    /// An internal invariant failed. Debug builds assert before
    /// returning this.
    Assert,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Argument => "ArgumentError",
            Self::Data => "InvalidTimeZoneDataError",
            Self::NotFound => "NotFoundError",
            Self::Corrupt => "CorruptDataError",
            Self::InvalidInstant => "InvalidInstantError",
            Self::Assert => "AssertionError",
        })
    }
}

/// The error type returned by all fallible operations in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeZoneError {
    kind: ErrorKind,
    msg: Cow<'static, str>,
}

impl TimeZoneError {
    #[inline]
    #[must_use]
    const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            msg: Cow::Borrowed(""),
        }
    }

    /// Create an argument error.
    #[inline]
    #[must_use]
    pub const fn argument() -> Self {
        Self::new(ErrorKind::Argument)
    }

    /// Create an invalid-zone-data error.
    #[inline]
    #[must_use]
    pub const fn data() -> Self {
        Self::new(ErrorKind::Data)
    }

    /// Create a not-found error.
    #[inline]
    #[must_use]
    pub const fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Create a corrupt-data error.
    #[inline]
    #[must_use]
    pub const fn corrupt() -> Self {
        Self::new(ErrorKind::Corrupt)
    }

    /// Create an invalid-instant error.
    #[inline]
    #[must_use]
    pub const fn invalid_instant() -> Self {
        Self::new(ErrorKind::InvalidInstant)
    }

    /// Create an assertion error for an internal invariant failure.
    #[inline]
    #[must_use]
    pub const fn assert() -> Self {
        Self::new(ErrorKind::Assert)
    }

    /// Attach a message to this error.
    #[must_use]
    pub fn with_message<S>(mut self, msg: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        self.msg = msg.into();
        self
    }

    /// The kind of this error.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message attached to this error, if any.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Consumes and returns the owned message.
    #[must_use]
    pub fn into_message(self) -> String {
        self.msg.into_owned()
    }
}

impl fmt::Display for TimeZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)?;
        if !self.msg.is_empty() {
            write!(f, ": {}", self.msg)?;
        }
        Ok(())
    }
}

impl core::error::Error for TimeZoneError {}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, TimeZoneError};

    #[test]
    fn display_with_and_without_message() {
        let err = TimeZoneError::corrupt();
        assert_eq!(alloc::format!("{err}"), "CorruptDataError");

        let err = TimeZoneError::argument().with_message("id must not be empty");
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert_eq!(
            alloc::format!("{err}"),
            "ArgumentError: id must not be empty"
        );
    }
}
