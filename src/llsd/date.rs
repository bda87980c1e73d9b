//! LLSD dates.
//!
//! Dates are points in time with microsecond resolution, rendered as
//! `YYYY-MM-DDTHH:MM:SS.ffffffZ`. The binary encoding carries them as
//! seconds since the Unix epoch in an `f64`.

use std::fmt;

use super::{Error, Res};

const MICROS_PER_SEC: i64 = 1_000_000;
const SECS_PER_DAY: i64 = 86_400;

// 0000-01-01T00:00:00Z and 9999-12-31T23:59:59.999999Z.
const MIN_MICROS: i64 = -62_167_219_200 * MICROS_PER_SEC;
const MAX_MICROS: i64 = 253_402_300_800 * MICROS_PER_SEC - 1;
const MAX_YEAR: u16 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Date {
    micros: i64,
}

impl Date {
    pub const EPOCH: Date = Date { micros: 0 };

    pub fn as_micros(&self) -> i64 {
        self.micros
    }

    /// `None` for non-finite input and for instants outside years 0 to 9999.
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        let micros = (secs * MICROS_PER_SEC as f64).round();
        if !micros.is_finite() {
            return None;
        }
        let micros = micros as i64;
        (MIN_MICROS..=MAX_MICROS)
            .contains(&micros)
            .then_some(Self { micros })
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.micros as f64 / MICROS_PER_SEC as f64
    }

    /// Build a date from calendar fields, all in UTC.
    pub fn from_parts(
        year: u16,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        micros: u32,
    ) -> Self {
        let days = days_from_civil(i64::from(year), month, day);
        let secs = days * SECS_PER_DAY
            + i64::from(hour) * 3600
            + i64::from(minute) * 60
            + i64::from(second);
        Self {
            micros: secs * MICROS_PER_SEC + i64::from(micros),
        }
    }

    /// Parse `YYYY-MM-DDTHH:MM:SS[.fraction]Z`.
    ///
    /// Fractions longer than six digits are truncated to microseconds.
    pub fn parse(text: &str) -> Res<Self> {
        let invalid = || Error::literal("date", text);
        let rest = text.trim().strip_suffix('Z').ok_or_else(invalid)?;
        let (date, time) = rest.split_once('T').ok_or_else(invalid)?;

        let mut fields = date.splitn(3, '-');
        let year: u16 = number(fields.next()).ok_or_else(invalid)?;
        let month: u32 = number(fields.next()).ok_or_else(invalid)?;
        let day: u32 = number(fields.next()).ok_or_else(invalid)?;

        let (clock, fraction) = match time.split_once('.') {
            Some((clock, fraction)) => (clock, Some(fraction)),
            None => (time, None),
        };
        let mut fields = clock.splitn(3, ':');
        let hour: u32 = number(fields.next()).ok_or_else(invalid)?;
        let minute: u32 = number(fields.next()).ok_or_else(invalid)?;
        let second: u32 = number(fields.next()).ok_or_else(invalid)?;

        let micros = match fraction {
            Some(f) if !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()) => {
                let digits: String = f.chars().chain("000000".chars()).take(6).collect();
                digits.parse::<u32>().map_err(|_| invalid())?
            }
            Some(_) => return Err(invalid()),
            None => 0,
        };

        if year > MAX_YEAR
            || !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 23
            || minute > 59
            || second > 60
        {
            return Err(invalid());
        }

        Ok(Self::from_parts(year, month, day, hour, minute, second, micros))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.micros.div_euclid(MICROS_PER_SEC);
        let micros = self.micros.rem_euclid(MICROS_PER_SEC);
        let days = secs.div_euclid(SECS_PER_DAY);
        let of_day = secs.rem_euclid(SECS_PER_DAY);
        let (year, month, day) = civil_from_days(days);
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}Z",
            year,
            month,
            day,
            of_day / 3600,
            (of_day % 3600) / 60,
            of_day % 60,
            micros
        )
    }
}

fn number<T: std::str::FromStr>(field: Option<&str>) -> Option<T> {
    let field = field?;
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

// Days since 1970-01-01 in the proleptic Gregorian calendar.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let yoe = year.rem_euclid(400);
    let month = i64::from(month);
    let doy = (153 * (if month > 2 { month - 3 } else { month + 9 }) + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
