//! Seconds-resolution cron expression engine.
//!
//! Expressions have six fields (`second minute hour day-of-month month
//! day-of-week`) and an optional seventh `year` field. The accepted syntax
//! follows the Quartz dialect the schedule records are stored in:
//!
//! - `*`, single values, ranges `a-b`, steps `*/n`, `a/n`, `a-b/n`, lists `a,b`
//! - `?` as the whole day-of-month or day-of-week field ("no constraint")
//! - month names `JAN`-`DEC`, weekday names `SUN`-`SAT`
//! - day-of-week numbering `1`-`7` = `SUN`-`SAT`
//! - `L` in day-of-month (last day of the month)
//! - `xL` (last weekday `x` of the month) and `x#n` (n-th weekday `x`) in
//!   day-of-week
//!
//! When both day fields are restricted a date matches if *either* matches.
//! All evaluation is done in UTC and is pure: nothing here reads the clock.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use thiserror::Error;

use crate::core::SchedulerError;

/// Earliest year a schedule may fire in.
pub const MIN_YEAR: i32 = 1970;
/// Latest year a schedule may fire in; searches give up past this point.
pub const MAX_YEAR: i32 = 2099;

const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Parse failure for a cron expression.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid cron expression `{expression}`: {reason}")]
pub struct CronError {
    /// The rejected expression.
    pub expression: String,
    /// What was wrong with it.
    pub reason: String,
}

impl From<CronError> for SchedulerError {
    fn from(err: CronError) -> Self {
        Self::InvalidConfiguration(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Second,
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
    Year,
}

impl Field {
    const fn name(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::DayOfMonth => "day-of-month",
            Self::Month => "month",
            Self::DayOfWeek => "day-of-week",
            Self::Year => "year",
        }
    }

    const fn bounds(self) -> (u32, u32) {
        match self {
            Self::Second | Self::Minute => (0, 59),
            Self::Hour => (0, 23),
            Self::DayOfMonth => (1, 31),
            Self::Month => (1, 12),
            Self::DayOfWeek => (1, 7),
            #[allow(clippy::cast_sign_loss)]
            Self::Year => (MIN_YEAR as u32, MAX_YEAR as u32),
        }
    }

    const fn names(self) -> &'static [&'static str] {
        match self {
            Self::Month => &MONTH_NAMES,
            Self::DayOfWeek => &WEEKDAY_NAMES,
            _ => &[],
        }
    }
}

/// Day-of-month constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DayOfMonth {
    restricted: bool,
    days: u64,
    last: bool,
}

impl DayOfMonth {
    fn matches(&self, date: NaiveDate) -> bool {
        self.days & bit(date.day()) != 0 || (self.last && date.day() == days_in_month(date))
    }
}

/// Day-of-week constraint. Weekdays are indexed from Sunday = 0.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DayOfWeek {
    restricted: bool,
    days: u64,
    last: u64,
    nth: Vec<(u32, u32)>,
}

impl DayOfWeek {
    fn matches(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_sunday();
        if self.days & bit(weekday) != 0 {
            return true;
        }
        if self.last & bit(weekday) != 0 && date.day() + 7 > days_in_month(date) {
            return true;
        }
        let occurrence = (date.day() - 1) / 7 + 1;
        self.nth.iter().any(|&(wd, n)| wd == weekday && n == occurrence)
    }
}

/// Bitset over `MIN_YEAR..=MAX_YEAR`; the range is wider than 128 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct YearSet([u64; 3]);

impl YearSet {
    fn from_years(years: &[u32]) -> Self {
        let mut words = [0u64; 3];
        for &year in years {
            let offset = year.saturating_sub(MIN_YEAR as u32) as usize;
            if let Some(word) = words.get_mut(offset / 64) {
                *word |= 1u64 << (offset % 64);
            }
        }
        Self(words)
    }

    fn contains(&self, year: i32) -> bool {
        let Ok(offset) = usize::try_from(year - MIN_YEAR) else {
            return false;
        };
        self.0
            .get(offset / 64)
            .is_some_and(|word| word & (1u64 << (offset % 64)) != 0)
    }
}

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpression {
    source: String,
    seconds: u64,
    minutes: u64,
    hours: u64,
    day_of_month: DayOfMonth,
    months: u64,
    day_of_week: DayOfWeek,
    years: Option<YearSet>,
}

impl CronExpression {
    /// Parse an expression, rejecting empty, malformed, or out-of-range input.
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        let fail = |reason: String| CronError {
            expression: expression.to_string(),
            reason,
        };

        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.is_empty() {
            return Err(fail("expression is empty".into()));
        }
        if fields.len() != 6 && fields.len() != 7 {
            return Err(fail(format!(
                "expected 6 or 7 fields, found {}",
                fields.len()
            )));
        }

        let seconds = to_mask(&parse_list(fields[0], Field::Second).map_err(&fail)?);
        let minutes = to_mask(&parse_list(fields[1], Field::Minute).map_err(&fail)?);
        let hours = to_mask(&parse_list(fields[2], Field::Hour).map_err(&fail)?);
        let day_of_month = parse_day_of_month(fields[3]).map_err(&fail)?;
        let months = to_mask(&parse_list(fields[4], Field::Month).map_err(&fail)?);
        let day_of_week = parse_day_of_week(fields[5]).map_err(&fail)?;
        let years = match fields.get(6) {
            Some(field) => Some(YearSet::from_years(
                &parse_list(field, Field::Year).map_err(&fail)?,
            )),
            None => None,
        };

        Ok(Self {
            source: fields.join(" "),
            seconds,
            minutes,
            hours,
            day_of_month,
            months,
            day_of_week,
            years,
        })
    }

    /// The normalized expression text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `instant` (truncated to the second) satisfies every field.
    pub fn matches(&self, instant: &DateTime<Utc>) -> bool {
        let dt = instant.naive_utc();
        self.year_matches(dt.year())
            && self.months & bit(dt.month()) != 0
            && self.day_matches(dt.date())
            && self.hours & bit(dt.hour()) != 0
            && self.minutes & bit(dt.minute()) != 0
            && self.seconds & bit(dt.second()) != 0
    }

    /// Earliest instant strictly after `after` that matches, or `None` when
    /// the expression never fires again before [`MAX_YEAR`] ends.
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        let start = after.naive_utc().with_nanosecond(0)? + Duration::seconds(1);
        let mut t = start;

        loop {
            if t.year() > MAX_YEAR {
                return None;
            }
            if !self.year_matches(t.year()) {
                t = NaiveDate::from_ymd_opt(t.year() + 1, 1, 1)?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if self.months & bit(t.month()) == 0 {
                t = first_of_next_month(t)?;
                continue;
            }
            if !self.day_matches(t.date()) {
                t = t.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            match next_set(self.hours, t.hour(), 23) {
                Some(hour) if hour == t.hour() => {}
                Some(hour) => {
                    t = t.date().and_hms_opt(hour, 0, 0)?;
                    continue;
                }
                None => {
                    t = t.date().succ_opt()?.and_hms_opt(0, 0, 0)?;
                    continue;
                }
            }
            match next_set(self.minutes, t.minute(), 59) {
                Some(minute) if minute == t.minute() => {}
                Some(minute) => {
                    t = t.date().and_hms_opt(t.hour(), minute, 0)?;
                    continue;
                }
                None => {
                    t = t.date().and_hms_opt(t.hour(), 0, 0)? + Duration::hours(1);
                    continue;
                }
            }
            match next_set(self.seconds, t.second(), 59) {
                Some(second) => {
                    return Some(t.with_second(second)?.and_utc());
                }
                None => {
                    t = t.with_second(0)? + Duration::minutes(1);
                }
            }
        }
    }

    /// Up to `count` consecutive fire instants after `after`.
    pub fn upcoming(&self, after: &DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut results = Vec::with_capacity(count);
        let mut cursor = *after;
        while results.len() < count {
            match self.next_after(&cursor) {
                Some(next) => {
                    results.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        results
    }

    fn year_matches(&self, year: i32) -> bool {
        (MIN_YEAR..=MAX_YEAR).contains(&year)
            && self.years.as_ref().is_none_or(|set| set.contains(year))
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        match (self.day_of_month.restricted, self.day_of_week.restricted) {
            (true, true) => self.day_of_month.matches(date) || self.day_of_week.matches(date),
            (true, false) => self.day_of_month.matches(date),
            (false, true) => self.day_of_week.matches(date),
            (false, false) => true,
        }
    }
}

impl FromStr for CronExpression {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Returns `false` for empty, malformed, or out-of-range expressions. Never panics.
pub fn validate(expression: &str) -> bool {
    CronExpression::parse(expression).is_ok()
}

/// Earliest instant strictly greater than `after` matching `expression`.
///
/// Fails with [`SchedulerError::InvalidConfiguration`] when the expression
/// does not parse or can never fire again.
pub fn next_fire_time(
    expression: &str,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, SchedulerError> {
    let cron = CronExpression::parse(expression)?;
    cron.next_after(&after).ok_or_else(|| {
        SchedulerError::InvalidConfiguration(format!(
            "cron expression `{expression}` has no fire time after {after}"
        ))
    })
}

const fn bit(value: u32) -> u64 {
    1u64 << value
}

fn to_mask(values: &[u32]) -> u64 {
    values.iter().fold(0, |mask, &v| mask | bit(v))
}

fn next_set(mask: u64, from: u32, max: u32) -> Option<u32> {
    (from..=max).find(|&v| mask & bit(v) != 0)
}

fn first_of_next_month(t: NaiveDateTime) -> Option<NaiveDateTime> {
    let (year, month) = if t.month() == 12 {
        (t.year() + 1, 1)
    } else {
        (t.year(), t.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

fn parse_value(token: &str, field: Field) -> Result<u32, String> {
    if let Ok(value) = token.parse::<u32>() {
        return Ok(value);
    }
    let upper = token.to_ascii_uppercase();
    field
        .names()
        .iter()
        .position(|name| *name == upper)
        .map(|idx| {
            #[allow(clippy::cast_possible_truncation)]
            let idx = idx as u32;
            idx + 1
        })
        .ok_or_else(|| format!("`{token}` is not a valid {} value", field.name()))
}

fn parse_list(list: &str, field: Field) -> Result<Vec<u32>, String> {
    let (min, max) = field.bounds();
    let mut values = Vec::new();
    for part in list.split(',') {
        if part.is_empty() {
            return Err(format!("empty entry in {} field", field.name()));
        }
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step = step
                    .parse::<u32>()
                    .map_err(|_| format!("`{step}` is not a valid step"))?;
                if step == 0 || step > max {
                    return Err(format!("step {step} out of range for {}", field.name()));
                }
                (range, Some(step))
            }
            None => (part, None),
        };

        let (start, end) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_value(a, field)?, parse_value(b, field)?)
        } else {
            let v = parse_value(range, field)?;
            (v, if step.is_some() { max } else { v })
        };

        if start < min || start > max || end < min || end > max {
            return Err(format!(
                "{}-{} out of range {min}-{max} for {}",
                start,
                end,
                field.name()
            ));
        }
        if start > end {
            return Err(format!("range {start}-{end} is reversed in {}", field.name()));
        }
        values.extend((start..=end).step_by(step.unwrap_or(1) as usize));
    }
    Ok(values)
}

fn parse_day_of_month(field: &str) -> Result<DayOfMonth, String> {
    if field == "?" || field == "*" {
        return Ok(DayOfMonth {
            restricted: false,
            days: u64::MAX,
            last: false,
        });
    }
    let mut days = 0u64;
    let mut last = false;
    for part in field.split(',') {
        if part.eq_ignore_ascii_case("L") {
            last = true;
        } else if part.to_ascii_uppercase().contains('W') || part.contains('L') {
            return Err(format!("`{part}` is not supported in day-of-month"));
        } else {
            days |= to_mask(&parse_list(part, Field::DayOfMonth)?);
        }
    }
    Ok(DayOfMonth {
        restricted: true,
        days,
        last,
    })
}

fn parse_day_of_week(field: &str) -> Result<DayOfWeek, String> {
    if field == "?" || field == "*" {
        return Ok(DayOfWeek {
            restricted: false,
            days: u64::MAX,
            last: 0,
            nth: Vec::new(),
        });
    }
    let weekday_index = |token: &str| -> Result<u32, String> {
        let v = parse_value(token, Field::DayOfWeek)?;
        if (1..=7).contains(&v) {
            Ok(v - 1)
        } else {
            Err(format!("{v} out of range 1-7 for day-of-week"))
        }
    };

    let mut days = 0u64;
    let mut last = 0u64;
    let mut nth = Vec::new();
    for part in field.split(',') {
        if part.eq_ignore_ascii_case("L") {
            days |= bit(6);
        } else if let Some((weekday, n)) = part.split_once('#') {
            let n = n
                .parse::<u32>()
                .map_err(|_| format!("`{n}` is not a valid occurrence"))?;
            if !(1..=5).contains(&n) {
                return Err(format!("occurrence {n} out of range 1-5"));
            }
            nth.push((weekday_index(weekday)?, n));
        } else if part.len() > 1 && part.to_ascii_uppercase().ends_with('L') {
            last |= bit(weekday_index(&part[..part.len() - 1])?);
        } else {
            for v in parse_list(part, Field::DayOfWeek)? {
                days |= bit(v - 1);
            }
        }
    }
    Ok(DayOfWeek {
        restricted: true,
        days,
        last,
        nth,
    })
}
