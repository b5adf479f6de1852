//! Recurrence rule evaluation.
//!
//! Only the subset needed to advance a recurring task is implemented: given a rule and an
//! anchor date, compute the first occurrence strictly after the anchor, at day granularity
//! (rules are evaluated at midnight). Anything the evaluator cannot make sense of yields
//! `None`, never an error: the caller decides the fallback behavior.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};

/// Strip the redundant `RRULE:` prefix some callers (and some servers) put in front of the
/// rule body
pub fn normalize_rule(rule: &str) -> &str {
    let rule = rule.trim();
    match rule.strip_prefix("RRULE:") {
        Some(body) => body,
        None => rule,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Freq {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug)]
struct Rule {
    freq: Freq,
    interval: u32,
    by_day: Vec<Weekday>,
    by_month_day: Option<u32>,
    by_month: Option<u32>,
    until: Option<NaiveDate>,
}

/// Compute the first occurrence of `rule` strictly after `anchor`.
///
/// Returns `None` for malformed or unsatisfiable rules (e.g. an UNTIL in the past).
/// A COUNT part cannot be honored without the start of the series, so it is ignored.
pub fn next_occurrence(rule: &str, anchor: NaiveDate) -> Option<NaiveDate> {
    let rule = match parse_rule(normalize_rule(rule)) {
        Some(r) => r,
        None => {
            log::debug!("Unparsable recurrence rule: {}", rule);
            return None;
        }
    };

    let next = match rule.freq {
        Freq::Daily => anchor.checked_add_signed(Duration::days(i64::from(rule.interval)))?,
        Freq::Weekly => next_weekly(&rule, anchor)?,
        Freq::Monthly => next_monthly(&rule, anchor)?,
        Freq::Yearly => next_yearly(&rule, anchor)?,
    };

    match rule.until {
        Some(until) if next > until => None,
        _ => Some(next),
    }
}

fn parse_rule(body: &str) -> Option<Rule> {
    let mut freq = None;
    let mut interval = 1u32;
    let mut by_day = Vec::new();
    let mut by_month_day = None;
    let mut by_month = None;
    let mut until = None;

    for part in body.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let mut kv = part.splitn(2, '=');
        let key = kv.next()?.to_uppercase();
        let value = kv.next()?;

        match key.as_str() {
            "FREQ" => {
                freq = Some(match value.to_uppercase().as_str() {
                    "DAILY" => Freq::Daily,
                    "WEEKLY" => Freq::Weekly,
                    "MONTHLY" => Freq::Monthly,
                    "YEARLY" => Freq::Yearly,
                    _ => return None,
                });
            }
            "INTERVAL" => {
                interval = value.parse().ok()?;
                if interval == 0 {
                    return None;
                }
            }
            "BYDAY" => {
                for day in value.split(',') {
                    by_day.push(parse_weekday(day.trim())?);
                }
            }
            "BYMONTHDAY" => {
                let day: u32 = value.parse().ok()?;
                if (1..=31).contains(&day) == false {
                    return None;
                }
                by_month_day = Some(day);
            }
            "BYMONTH" => {
                let month: u32 = value.parse().ok()?;
                if (1..=12).contains(&month) == false {
                    return None;
                }
                by_month = Some(month);
            }
            "UNTIL" => {
                until = Some(parse_until(value)?);
            }
            // COUNT, WKST and the rest of RFC5545 are accepted but not evaluated
            _ => continue,
        }
    }

    Some(Rule {
        freq: freq?,
        interval,
        by_day,
        by_month_day,
        by_month,
        until,
    })
}

fn parse_weekday(token: &str) -> Option<Weekday> {
    // An ordinal prefix (e.g. the "2" of "2MO") is not meaningful at the granularity we
    // evaluate, keep the trailing weekday code only
    let code = if token.len() > 2 {
        &token[token.len() - 2..]
    } else {
        token
    };
    match code.to_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_until(value: &str) -> Option<NaiveDate> {
    // UNTIL can be a date or a date-time; the date part is all that matters here
    let date_part = match value.find('T') {
        Some(pos) => &value[..pos],
        None => value,
    };
    NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn next_weekly(rule: &Rule, anchor: NaiveDate) -> Option<NaiveDate> {
    if rule.by_day.is_empty() {
        return anchor.checked_add_signed(Duration::days(7 * i64::from(rule.interval)));
    }

    // Weeks are counted from the anchor's week (WKST=MO). Scan forward day by day; the
    // bound covers the worst case of an interval gap plus a full week
    let anchor_week = week_start(anchor);
    for offset in 1..=(7 * i64::from(rule.interval) + 7) {
        let candidate = anchor.checked_add_signed(Duration::days(offset))?;
        if rule.by_day.contains(&candidate.weekday()) == false {
            continue;
        }
        let weeks_apart = (week_start(candidate) - anchor_week).num_days() / 7;
        if weeks_apart % i64::from(rule.interval) == 0 {
            return Some(candidate);
        }
    }
    None
}

fn next_monthly(rule: &Rule, anchor: NaiveDate) -> Option<NaiveDate> {
    let target_day = rule.by_month_day.unwrap_or_else(|| anchor.day());

    // The target day may not exist in every candidate month (e.g. the 31st); skip over
    // invalid months, bounded so an impossible rule terminates
    for step in 0..=48u32 {
        let months = step.checked_mul(rule.interval)?;
        let base = anchor.checked_add_months(Months::new(months))?;
        if let Some(candidate) = NaiveDate::from_ymd_opt(base.year(), base.month(), target_day) {
            if candidate > anchor {
                return Some(candidate);
            }
        }
    }
    None
}

fn next_yearly(rule: &Rule, anchor: NaiveDate) -> Option<NaiveDate> {
    let target_month = rule.by_month.unwrap_or_else(|| anchor.month());
    let target_day = rule.by_month_day.unwrap_or_else(|| anchor.day());

    // Bounded scan: a Feb 29 rule has to wait for the next leap year
    for step in 0..=8u32 {
        let years = step.checked_mul(rule.interval)? as i32;
        let year = anchor.year().checked_add(years)?;
        if let Some(candidate) = NaiveDate::from_ymd_opt(year, target_month, target_day) {
            if candidate > anchor {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily() {
        assert_eq!(
            next_occurrence("FREQ=DAILY", date(2024, 1, 10)),
            Some(date(2024, 1, 11))
        );
        assert_eq!(
            next_occurrence("FREQ=DAILY;INTERVAL=3", date(2024, 1, 10)),
            Some(date(2024, 1, 13))
        );
    }

    #[test]
    fn rrule_prefix_is_normalized() {
        assert_eq!(
            next_occurrence("RRULE:FREQ=DAILY", date(2024, 1, 10)),
            Some(date(2024, 1, 11))
        );
    }

    #[test]
    fn weekly_without_byday() {
        assert_eq!(
            next_occurrence("FREQ=WEEKLY", date(2024, 1, 10)),
            Some(date(2024, 1, 17))
        );
        assert_eq!(
            next_occurrence("FREQ=WEEKLY;INTERVAL=2", date(2024, 1, 10)),
            Some(date(2024, 1, 24))
        );
    }

    #[test]
    fn weekly_with_byday() {
        // 2024-01-10 is a Wednesday
        assert_eq!(
            next_occurrence("FREQ=WEEKLY;BYDAY=MO,FR", date(2024, 1, 10)),
            Some(date(2024, 1, 12))
        );
        // Same weekday: strictly after the anchor
        assert_eq!(
            next_occurrence("FREQ=WEEKLY;BYDAY=WE", date(2024, 1, 10)),
            Some(date(2024, 1, 17))
        );
        // Interval 2: Friday of the anchor week still matches (same week)
        assert_eq!(
            next_occurrence("FREQ=WEEKLY;INTERVAL=2;BYDAY=FR", date(2024, 1, 10)),
            Some(date(2024, 1, 12))
        );
        // ...but the following Monday has to wait for an aligned week
        assert_eq!(
            next_occurrence("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO", date(2024, 1, 10)),
            Some(date(2024, 1, 22))
        );
    }

    #[test]
    fn monthly_clamps_to_valid_months() {
        assert_eq!(
            next_occurrence("FREQ=MONTHLY", date(2024, 1, 15)),
            Some(date(2024, 2, 15))
        );
        // No Feb 31st: skips to March
        assert_eq!(
            next_occurrence("FREQ=MONTHLY", date(2024, 1, 31)),
            Some(date(2024, 3, 31))
        );
        // BYMONTHDAY later in the anchor month counts
        assert_eq!(
            next_occurrence("FREQ=MONTHLY;BYMONTHDAY=20", date(2024, 1, 15)),
            Some(date(2024, 1, 20))
        );
    }

    #[test]
    fn yearly() {
        assert_eq!(
            next_occurrence("FREQ=YEARLY", date(2024, 3, 21)),
            Some(date(2025, 3, 21))
        );
        // Feb 29 waits for the next leap year
        assert_eq!(
            next_occurrence("FREQ=YEARLY", date(2024, 2, 29)),
            Some(date(2028, 2, 29))
        );
        assert_eq!(
            next_occurrence("FREQ=YEARLY;BYMONTH=12;BYMONTHDAY=24", date(2024, 3, 21)),
            Some(date(2024, 12, 24))
        );
    }

    #[test]
    fn until_makes_rules_run_out() {
        assert_eq!(
            next_occurrence("FREQ=DAILY;UNTIL=20240111", date(2024, 1, 10)),
            Some(date(2024, 1, 11))
        );
        assert_eq!(
            next_occurrence("FREQ=DAILY;UNTIL=20240110", date(2024, 1, 10)),
            None
        );
        // Date-time UNTIL values are accepted too
        assert_eq!(
            next_occurrence("FREQ=DAILY;UNTIL=20240111T000000Z", date(2024, 1, 10)),
            Some(date(2024, 1, 11))
        );
    }

    #[test]
    fn garbage_yields_none() {
        assert_eq!(next_occurrence("", date(2024, 1, 10)), None);
        assert_eq!(next_occurrence("FREQ=FORTNIGHTLY", date(2024, 1, 10)), None);
        assert_eq!(next_occurrence("INTERVAL=2", date(2024, 1, 10)), None);
        assert_eq!(
            next_occurrence("FREQ=DAILY;INTERVAL=0", date(2024, 1, 10)),
            None
        );
        assert_eq!(
            next_occurrence("FREQ=WEEKLY;BYDAY=XX", date(2024, 1, 10)),
            None
        );
    }
}
