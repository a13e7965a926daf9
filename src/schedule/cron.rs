//! Cron expression parsing and next-fire evaluation
//!
//! Accepts classic crontab syntax:
//! - 5 fields: `minute hour day-of-month month day-of-week`
//! - 6 fields: a leading `second` field
//! - shortcuts: `@yearly`, `@annually`, `@monthly`, `@weekly`, `@daily`,
//!   `@midnight`, `@hourly`
//! - `@every <interval>` with `h`, `m`, `s` and `ms` units (`@every 1h30m`)
//!
//! Day-of-week follows crontab numbering (0 and 7 are Sunday). When both
//! day-of-month and day-of-week are restricted, a day matching either one
//! fires. Expressions are normalised to the seconds-first dialect of the
//! `cron` crate, which does the actual calendar evaluation.

use chrono::{DateTime, TimeDelta, TimeZone, Timelike, Utc};
use std::fmt;
use std::str::FromStr;

use crate::errors::ScheduleError;

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

const DAY_OF_MONTH: usize = 3;
const DAY_OF_WEEK: usize = 5;

/// A parsed, validated cron schedule.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    source: String,
    trigger: Trigger,
}

#[derive(Debug, Clone)]
enum Trigger {
    Calendar(::cron::Schedule),
    /// Both day fields restricted: one schedule per field, earliest wins
    EitherDay {
        month_day: ::cron::Schedule,
        week_day: ::cron::Schedule,
    },
    /// Fixed delay, whole seconds
    Every(TimeDelta),
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let source = expression.trim();
        if source.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let trigger = match source.split_once(char::is_whitespace) {
            Some((head, interval)) if head.eq_ignore_ascii_case("@every") => {
                Trigger::Every(parse_interval(interval.trim())?)
            }
            _ => calendar(source, normalize(source)?)?,
        };

        Ok(Self {
            source: source.to_string(),
            trigger,
        })
    }

    /// The expression as written by the operator.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// First fire time strictly after `after`, if any remains.
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        match &self.trigger {
            Trigger::Calendar(schedule) => schedule.after(after).next(),
            Trigger::EitherDay {
                month_day,
                week_day,
            } => month_day
                .after(after)
                .next()
                .into_iter()
                .chain(week_day.after(after).next())
                .min(),
            Trigger::Every(interval) => after
                .clone()
                .with_nanosecond(0)?
                .checked_add_signed(*interval),
        }
    }

    /// Next fire time from now in the given timezone.
    pub fn upcoming<Tz: TimeZone>(&self, tz: Tz) -> Option<DateTime<Tz>> {
        self.next_after(&Utc::now().with_timezone(&tz))
    }
}

impl FromStr for CronSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn calendar(source: &str, fields: Vec<String>) -> Result<Trigger, ScheduleError> {
    let compile = |fields: &[String]| {
        ::cron::Schedule::from_str(&fields.join(" ")).map_err(|e| ScheduleError::Invalid {
            expression: source.to_string(),
            reason: e.to_string(),
        })
    };

    if !is_restricted(&fields[DAY_OF_MONTH]) || !is_restricted(&fields[DAY_OF_WEEK]) {
        return compile(&fields).map(Trigger::Calendar);
    }

    let mut month_day = fields.clone();
    month_day[DAY_OF_WEEK] = "*".to_string();
    let mut week_day = fields;
    week_day[DAY_OF_MONTH] = "*".to_string();

    Ok(Trigger::EitherDay {
        month_day: compile(&month_day)?,
        week_day: compile(&week_day)?,
    })
}

/// Stepped stars like `*/2` count as restricted.
fn is_restricted(field: &str) -> bool {
    !matches!(field, "*" | "?" | "*/1")
}

/// Rewrite an expression into the `cron` crate's 6 fields.
fn normalize(expression: &str) -> Result<Vec<String>, ScheduleError> {
    if expression.starts_with('@') {
        return expand_shortcut(expression)
            .map(|fields| fields.split(' ').map(str::to_string).collect());
    }

    let mut fields: Vec<String> = expression.split_whitespace().map(str::to_string).collect();
    match fields.len() {
        5 => fields.insert(0, "0".to_string()),
        6 => {}
        found => {
            return Err(ScheduleError::FieldCount {
                expression: expression.to_string(),
                found,
            })
        }
    }

    fields[DAY_OF_WEEK] = normalize_day_of_week(&fields[DAY_OF_WEEK])?;
    Ok(fields)
}

fn expand_shortcut(shortcut: &str) -> Result<&'static str, ScheduleError> {
    match shortcut.to_ascii_lowercase().as_str() {
        "@yearly" | "@annually" => Ok("0 0 0 1 1 *"),
        "@monthly" => Ok("0 0 0 1 * *"),
        "@weekly" => Ok("0 0 0 * * SUN"),
        "@daily" | "@midnight" => Ok("0 0 0 * * *"),
        "@hourly" => Ok("0 0 * * * *"),
        _ => Err(ScheduleError::UnknownShortcut(shortcut.to_string())),
    }
}

/// Parse `1h30m`-style intervals. Sub-second parts are dropped and the
/// result is at least one second.
fn parse_interval(text: &str) -> Result<TimeDelta, ScheduleError> {
    let invalid = || ScheduleError::InvalidInterval(text.to_string());
    if text.is_empty() {
        return Err(invalid());
    }

    let mut rest = text;
    let mut millis: u64 = 0;
    while !rest.is_empty() {
        // A trailing number without a unit has no end
        let digits = rest.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let multiplier = match &rest[..unit_len] {
            "ms" => 1,
            "s" => 1000,
            "m" => 60 * 1000,
            "h" => 60 * 60 * 1000,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        millis = value
            .checked_mul(multiplier)
            .and_then(|part| millis.checked_add(part))
            .ok_or_else(invalid)?;
    }

    let seconds = i64::try_from((millis / 1000).max(1)).map_err(|_| invalid())?;
    TimeDelta::try_seconds(seconds).ok_or_else(invalid)
}

/// Map crontab day numbers (0-7, Sunday = 0 or 7) to day names.
///
/// The `cron` crate numbers Sunday as 1, so numeric items are expanded to
/// explicit name lists. Named items and `*`/`?` pass through.
fn normalize_day_of_week(field: &str) -> Result<String, ScheduleError> {
    let invalid = || ScheduleError::InvalidDayOfWeek(field.to_string());

    let mut items = Vec::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: usize = step.parse().map_err(|_| invalid())?;
                if step == 0 {
                    return Err(invalid());
                }
                (range, Some(step))
            }
            None => (item, None),
        };

        if range.is_empty() {
            return Err(invalid());
        }

        let numeric = range
            .split('-')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
        if !numeric {
            if range.split('-').any(|part| part.chars().all(|c| c.is_ascii_digit())) {
                // Mixed forms like `1-FRI`
                return Err(invalid());
            }
            items.push(item.to_string());
            continue;
        }

        let (start, end) = match range.split_once('-') {
            Some((start, end)) => (parse_day(start, field)?, parse_day(end, field)?),
            // `a/n` runs to the end of the week
            None if step.is_some() => (parse_day(range, field)?, 6),
            None => {
                let day = parse_day(range, field)?;
                (day, day)
            }
        };
        if start > end {
            return Err(invalid());
        }

        for day in (start..=end).step_by(step.unwrap_or(1)) {
            let name = DAY_NAMES[day % 7];
            if !items.iter().any(|existing| existing == name) {
                items.push(name.to_string());
            }
        }
    }

    Ok(items.join(","))
}

fn parse_day(value: &str, field: &str) -> Result<usize, ScheduleError> {
    match value.parse::<usize>() {
        Ok(day) if day <= 7 => Ok(day),
        _ => Err(ScheduleError::InvalidDayOfWeek(field.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike, Utc, Weekday};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn next(expr: &str, from: DateTime<Utc>) -> DateTime<Utc> {
        CronSchedule::parse(expr).unwrap().next_after(&from).unwrap()
    }

    #[test]
    fn test_five_fields_fire_on_minute_boundary() {
        let from = at(2026, 3, 10, 12, 0, 30);
        assert_eq!(next("*/15 * * * *", from), at(2026, 3, 10, 12, 15, 0));
        assert_eq!(next("30 2 * * *", from), at(2026, 3, 11, 2, 30, 0));
    }

    #[test]
    fn test_six_fields_include_seconds() {
        let from = at(2026, 3, 10, 12, 0, 0);
        assert_eq!(next("*/20 * * * * *", from), at(2026, 3, 10, 12, 0, 20));
    }

    #[test]
    fn test_shortcuts() {
        let from = at(2026, 3, 10, 12, 34, 0);
        assert_eq!(next("@daily", from), at(2026, 3, 11, 0, 0, 0));
        assert_eq!(next("@midnight", from), at(2026, 3, 11, 0, 0, 0));
        assert_eq!(next("@hourly", from), at(2026, 3, 10, 13, 0, 0));
        assert_eq!(next("@monthly", from), at(2026, 4, 1, 0, 0, 0));
        assert_eq!(next("@yearly", from), at(2027, 1, 1, 0, 0, 0));
        assert_eq!(next("@annually", from), at(2027, 1, 1, 0, 0, 0));

        let weekly = next("@weekly", from);
        assert_eq!(weekly.weekday(), Weekday::Sun);
        assert_eq!((weekly.hour(), weekly.minute()), (0, 0));
    }

    #[test]
    fn test_shortcut_is_case_insensitive() {
        assert!(CronSchedule::parse("@DAILY").is_ok());
    }

    #[test]
    fn test_unknown_shortcut() {
        assert_eq!(
            CronSchedule::parse("@fortnightly").unwrap_err(),
            ScheduleError::UnknownShortcut("@fortnightly".to_string())
        );
    }

    #[test]
    fn test_day_of_week_uses_crontab_numbering() {
        // 2026-03-10 is a Tuesday
        let from = at(2026, 3, 10, 12, 0, 0);
        assert_eq!(next("0 9 * * 1", from).weekday(), Weekday::Mon);
        assert_eq!(next("0 9 * * 0", from).weekday(), Weekday::Sun);
        assert_eq!(next("0 9 * * 7", from).weekday(), Weekday::Sun);
        assert_eq!(next("0 9 * * 3", from), at(2026, 3, 11, 9, 0, 0));
    }

    #[test]
    fn test_day_of_week_ranges_and_steps() {
        assert_eq!(normalize_day_of_week("1-5").unwrap(), "MON,TUE,WED,THU,FRI");
        assert_eq!(normalize_day_of_week("5-7").unwrap(), "FRI,SAT,SUN");
        assert_eq!(normalize_day_of_week("0-6/2").unwrap(), "SUN,TUE,THU,SAT");
        assert_eq!(normalize_day_of_week("1/3").unwrap(), "MON,THU");
        assert_eq!(normalize_day_of_week("0,7").unwrap(), "SUN");
        assert_eq!(normalize_day_of_week("*").unwrap(), "*");
        assert_eq!(normalize_day_of_week("*/2").unwrap(), "*/2");
        assert_eq!(normalize_day_of_week("mon-fri").unwrap(), "mon-fri");
    }

    #[test]
    fn test_weekday_range_skips_weekend() {
        // Friday 2026-03-13 18:00 -> next weekday 09:00 is Monday
        let from = at(2026, 3, 13, 18, 0, 0);
        assert_eq!(next("0 9 * * 1-5", from), at(2026, 3, 16, 9, 0, 0));
        assert_eq!(next("0 9 * * MON-FRI", from), at(2026, 3, 16, 9, 0, 0));
    }

    #[test]
    fn test_invalid_day_of_week() {
        assert!(matches!(
            CronSchedule::parse("0 0 * * 8"),
            Err(ScheduleError::InvalidDayOfWeek(_))
        ));
        assert!(CronSchedule::parse("0 0 * * 5-1").is_err());
        assert!(CronSchedule::parse("0 0 * * 1/0").is_err());
        assert!(CronSchedule::parse("0 0 * * 1-FRI").is_err());
    }

    #[test]
    fn test_month_names_and_lists() {
        let from = at(2026, 3, 10, 12, 0, 0);
        assert_eq!(next("0 0 1 JUN,DEC *", from), at(2026, 6, 1, 0, 0, 0));
        assert_eq!(next("0 6,18 * * *", from), at(2026, 3, 10, 18, 0, 0));
    }

    #[test]
    fn test_field_count_errors() {
        assert_eq!(
            CronSchedule::parse("* * * *").unwrap_err(),
            ScheduleError::FieldCount {
                expression: "* * * *".to_string(),
                found: 4
            }
        );
        assert!(matches!(
            CronSchedule::parse("0 0 0 * * * 2026 extra"),
            Err(ScheduleError::FieldCount { found: 8, .. })
        ));
    }

    #[test]
    fn test_empty_expression() {
        assert_eq!(CronSchedule::parse("").unwrap_err(), ScheduleError::Empty);
        assert_eq!(CronSchedule::parse("   ").unwrap_err(), ScheduleError::Empty);
    }

    #[test]
    fn test_out_of_range_values_are_invalid() {
        assert!(matches!(
            CronSchedule::parse("61 * * * *"),
            Err(ScheduleError::Invalid { .. })
        ));
        assert!(matches!(
            CronSchedule::parse("0 25 * * *"),
            Err(ScheduleError::Invalid { .. })
        ));
        assert!(matches!(
            CronSchedule::parse("not a cron at all"),
            Err(ScheduleError::FieldCount { .. })
        ));
    }

    #[test]
    fn test_source_is_preserved() {
        let schedule: CronSchedule = "  0 3 * * 0  ".parse().unwrap();
        assert_eq!(schedule.source(), "0 3 * * 0");
        assert_eq!(schedule.to_string(), "0 3 * * 0");
    }

    #[test]
    fn test_upcoming_is_in_future() {
        let schedule = CronSchedule::parse("* * * * * *").unwrap();
        let now = Utc::now();
        let upcoming = schedule.upcoming(Utc).unwrap();
        assert!(upcoming > now - chrono::Duration::seconds(1));
    }

    #[test]
    fn test_day_of_month_or_day_of_week() {
        // 2026-03-10 is a Tuesday: the next Monday comes before the 1st
        assert_eq!(
            next("0 0 1 * 1", at(2026, 3, 10, 12, 0, 0)),
            at(2026, 3, 16, 0, 0, 0)
        );
        // Tuesday 31st: the 1st (a Wednesday) comes before the next Monday
        assert_eq!(
            next("0 0 1 * 1", at(2026, 3, 31, 12, 0, 0)),
            at(2026, 4, 1, 0, 0, 0)
        );
        assert_eq!(
            next("0 0 0 1 * MON", at(2026, 3, 10, 12, 0, 0)),
            at(2026, 3, 16, 0, 0, 0)
        );
    }

    #[test]
    fn test_unrestricted_day_field_keeps_the_other() {
        let from = at(2026, 3, 10, 12, 0, 0);
        assert_eq!(next("0 0 * * 1", from), at(2026, 3, 16, 0, 0, 0));
        assert_eq!(next("0 0 15 * *", from), at(2026, 3, 15, 0, 0, 0));
    }

    #[test]
    fn test_stepped_day_of_month_combines_with_day_of_week() {
        // Odd days or Sundays; the 11th is odd
        assert_eq!(
            next("0 0 */2 * 0", at(2026, 3, 10, 12, 0, 0)),
            at(2026, 3, 11, 0, 0, 0)
        );
    }

    #[test]
    fn test_every_interval() {
        let from = at(2026, 3, 10, 12, 0, 0);
        assert_eq!(next("@every 5m", from), at(2026, 3, 10, 12, 5, 0));
        assert_eq!(next("@every 1h30m", from), at(2026, 3, 10, 13, 30, 0));
        assert_eq!(next("@EVERY  45s", from), at(2026, 3, 10, 12, 0, 45));
        assert_eq!(next("@every 2h", from), at(2026, 3, 10, 14, 0, 0));
    }

    #[test]
    fn test_every_interval_drops_sub_seconds() {
        let from = at(2026, 3, 10, 12, 0, 0) + chrono::Duration::milliseconds(700);
        assert_eq!(next("@every 10s", from), at(2026, 3, 10, 12, 0, 10));
        assert_eq!(next("@every 1500ms", from), at(2026, 3, 10, 12, 0, 1));
        assert_eq!(next("@every 200ms", from), at(2026, 3, 10, 12, 0, 1));
    }

    #[test]
    fn test_every_keeps_source_text() {
        let schedule = CronSchedule::parse(" @every 30m ").unwrap();
        assert_eq!(schedule.source(), "@every 30m");
    }

    #[test]
    fn test_invalid_every_interval() {
        for bad in ["@every 5", "@every m", "@every 5d", "@every 1.5h", "@every -5m"] {
            assert!(
                matches!(
                    CronSchedule::parse(bad),
                    Err(ScheduleError::InvalidInterval(_))
                ),
                "{} should be rejected",
                bad
            );
        }
        assert_eq!(
            CronSchedule::parse("@every").unwrap_err(),
            ScheduleError::UnknownShortcut("@every".to_string())
        );
    }
}
