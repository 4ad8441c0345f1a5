//! The serialized-string transport format.
//!
//! A whole zone definition travels as one `;`-delimited string:
//!
//! ```text
//! id;offsetMinutes;displayName;standardName;daylightName;[rule]*;
//! rule       = [yyyy-MM-dd;yyyy-MM-dd;deltaMinutes;[transition];[transition];]
//! transition = [isFixed;HH:mm:ss.fff;month;(day | week;dayOfWeek);]
//! ```
//!
//! `\`, `;`, `[`, and `]` inside free-text fields are backslash-escaped
//! on write; on read an escape introducing any other character is a
//! corrupt-data error. Parsing is one left-to-right scan over an
//! explicit cursor with no backtracking.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::iso::{IsoDate, IsoTime, Weekday};
use crate::offset::UtcOffset;
use crate::rule::{AdjustmentRule, TransitionDate, TransitionTime};
use crate::zone::TimeZone;
use crate::{TimeZoneError, TimeZoneResult};

const ESCAPABLE: &[u8] = b"\\;[]";

impl TimeZone {
    /// Encode this zone for cross-process transport. Only the rule
    /// model travels; a raw transition table is not representable in
    /// the format.
    #[must_use]
    pub fn to_serialized_string(&self) -> String {
        let mut out = String::new();
        write_escaped(&mut out, self.id());
        out.push(';');
        let _ = write!(out, "{};", self.base_offset().minutes());
        write_escaped(&mut out, self.display_name());
        out.push(';');
        write_escaped(&mut out, self.standard_name());
        out.push(';');
        write_escaped(&mut out, self.daylight_name());
        out.push(';');
        for rule in self.adjustment_rules() {
            write_rule(&mut out, rule);
        }
        out.push(';');
        out
    }

    /// Decode a zone from its serialized form.
    pub fn from_serialized_string(source: &str) -> TimeZoneResult<Self> {
        let mut cursor = Cursor::new(source);
        let id = cursor.read_text_field()?;
        let offset_minutes = cursor.read_number::<i64>()?;
        let display_name = cursor.read_text_field()?;
        let standard_name = cursor.read_text_field()?;
        let daylight_name = cursor.read_text_field()?;

        let mut rules = Vec::new();
        while cursor.peek() == Some(b'[') {
            rules.push(read_rule(&mut cursor)?);
        }
        cursor.expect(b';')?;
        if !cursor.is_empty() {
            return Err(
                TimeZoneError::corrupt().with_message("trailing data after serialized zone")
            );
        }

        TimeZone::try_new(
            &id,
            UtcOffset::from_minutes(offset_minutes),
            &display_name,
            &standard_name,
            &daylight_name,
            rules,
        )
        .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))
    }
}

// ==== Writing ====

fn write_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch.is_ascii() && ESCAPABLE.contains(&(ch as u8)) {
            out.push('\\');
        }
        out.push(ch);
    }
}

fn write_rule(out: &mut String, rule: &AdjustmentRule) {
    out.push('[');
    write_date(out, rule.date_start());
    out.push(';');
    write_date(out, rule.date_end());
    out.push(';');
    let _ = write!(out, "{};", rule.daylight_delta().minutes());
    write_transition(out, rule.transition_start());
    out.push(';');
    write_transition(out, rule.transition_end());
    out.push_str(";]");
}

fn write_date(out: &mut String, date: IsoDate) {
    let _ = write!(out, "{:04}-{:02}-{:02}", date.year, date.month, date.day);
}

fn write_transition(out: &mut String, transition: &TransitionTime) {
    out.push('[');
    let time = transition.time_of_day;
    match transition.date {
        TransitionDate::Fixed { day } => {
            let _ = write!(
                out,
                "1;{:02}:{:02}:{:02}.{:03};{};{}",
                time.hour, time.minute, time.second, time.millisecond, transition.month, day
            );
        }
        TransitionDate::Floating { week, weekday } => {
            let _ = write!(
                out,
                "0;{:02}:{:02}:{:02}.{:03};{};{};{}",
                time.hour,
                time.minute,
                time.second,
                time.millisecond,
                transition.month,
                week,
                weekday.number()
            );
        }
    }
    out.push_str(";]");
}

// ==== Reading ====

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            data: source.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn bump(&mut self) -> TimeZoneResult<u8> {
        let byte = self.peek().ok_or_else(unexpected_end)?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect(&mut self, expected: u8) -> TimeZoneResult<()> {
        let found = self.bump()?;
        if found != expected {
            return Err(TimeZoneError::corrupt().with_message(alloc::format!(
                "expected '{}' in serialized zone data",
                expected as char
            )));
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// A free-text field, unescaping up to its `;` terminator.
    fn read_text_field(&mut self) -> TimeZoneResult<String> {
        let mut bytes = Vec::new();
        loop {
            match self.bump()? {
                b'\\' => {
                    let escaped = self.bump()?;
                    if !ESCAPABLE.contains(&escaped) {
                        return Err(TimeZoneError::corrupt()
                            .with_message("invalid escape in serialized zone data"));
                    }
                    bytes.push(escaped);
                }
                b';' => break,
                byte @ (b'[' | b']') => {
                    return Err(TimeZoneError::corrupt().with_message(alloc::format!(
                        "unescaped '{}' in serialized text field",
                        byte as char
                    )))
                }
                byte => bytes.push(byte),
            }
        }
        // The input is a &str and escapes are ASCII, so the field is
        // still valid UTF-8.
        String::from_utf8(bytes)
            .map_err(|_| TimeZoneError::corrupt().with_message("serialized text is not UTF-8"))
    }

    /// A numeric or structured field: raw bytes up to `;`, no escapes.
    fn read_raw_field(&mut self) -> TimeZoneResult<&'a str> {
        let start = self.pos;
        loop {
            match self.bump()? {
                b';' => break,
                b'\\' | b'[' | b']' => {
                    return Err(TimeZoneError::corrupt()
                        .with_message("unexpected delimiter in serialized field"))
                }
                _ => {}
            }
        }
        core::str::from_utf8(&self.data[start..self.pos - 1])
            .map_err(|_| TimeZoneError::corrupt().with_message("serialized text is not UTF-8"))
    }

    fn read_number<T: core::str::FromStr>(&mut self) -> TimeZoneResult<T> {
        self.read_raw_field()?
            .parse()
            .map_err(|_| TimeZoneError::corrupt().with_message("malformed number in serialized zone"))
    }
}

fn unexpected_end() -> TimeZoneError {
    TimeZoneError::corrupt().with_message("serialized zone data ends unexpectedly")
}

fn read_rule(cursor: &mut Cursor<'_>) -> TimeZoneResult<AdjustmentRule> {
    cursor.expect(b'[')?;
    let date_start = read_date(cursor)?;
    let date_end = read_date(cursor)?;
    let delta_minutes = cursor.read_number::<i64>()?;
    let transition_start = read_transition(cursor)?;
    cursor.expect(b';')?;
    let transition_end = read_transition(cursor)?;
    cursor.expect(b';')?;
    cursor.expect(b']')?;
    AdjustmentRule::try_new(
        date_start,
        date_end,
        UtcOffset::from_minutes(delta_minutes),
        transition_start,
        transition_end,
    )
    .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))
}

fn read_date(cursor: &mut Cursor<'_>) -> TimeZoneResult<IsoDate> {
    let field = cursor.read_raw_field()?;
    let mut parts = field.splitn(3, '-');
    let year = parts.next().and_then(|p| p.parse::<i32>().ok());
    let month = parts.next().and_then(|p| p.parse::<u8>().ok());
    let day = parts.next().and_then(|p| p.parse::<u8>().ok());
    match (year, month, day) {
        (Some(year), Some(month), Some(day)) => IsoDate::try_new(year, month, day)
            .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message())),
        _ => Err(TimeZoneError::corrupt().with_message("malformed date in serialized zone")),
    }
}

fn read_time(field: &str) -> TimeZoneResult<IsoTime> {
    let malformed = || TimeZoneError::corrupt().with_message("malformed time in serialized zone");
    let (hms, millis) = field.split_once('.').ok_or_else(malformed)?;
    let mut parts = hms.splitn(3, ':');
    let hour = parts.next().and_then(|p| p.parse::<u8>().ok());
    let minute = parts.next().and_then(|p| p.parse::<u8>().ok());
    let second = parts.next().and_then(|p| p.parse::<u8>().ok());
    let millisecond = millis.parse::<u16>().ok();
    match (hour, minute, second, millisecond) {
        (Some(hour), Some(minute), Some(second), Some(millisecond)) => {
            IsoTime::try_new(hour, minute, second, millisecond).map_err(|_| malformed())
        }
        _ => Err(malformed()),
    }
}

fn read_transition(cursor: &mut Cursor<'_>) -> TimeZoneResult<TransitionTime> {
    cursor.expect(b'[')?;
    let is_fixed = match cursor.read_raw_field()? {
        "0" => false,
        "1" => true,
        _ => {
            return Err(TimeZoneError::corrupt()
                .with_message("transition fixed-date flag must be 0 or 1"))
        }
    };
    let time_of_day = read_time(cursor.read_raw_field()?)?;
    let month = cursor.read_number::<u8>()?;
    let transition = if is_fixed {
        let day = cursor.read_number::<u8>()?;
        TransitionTime::fixed(month, day, time_of_day)
    } else {
        let week = cursor.read_number::<u8>()?;
        let weekday = Weekday::from_number(cursor.read_number::<u8>()?)
            .map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))?;
        TransitionTime::floating(month, week, weekday, time_of_day)
    };
    cursor.expect(b']')?;
    transition.map_err(|err| TimeZoneError::corrupt().with_message(err.into_message()))
}
