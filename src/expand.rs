//! The RRULE expander: produces the ordered sequence of occurrence instants
//! an `RRule` generates within a bounded window.
//!
//! Follows a seed → per-period candidate generation → `BY*` filtering →
//! `BYSETPOS` selection pipeline: candidate generation walks forward by
//! `(FREQ, INTERVAL)` and filters by `BY*` parts in RFC 5545 §3.3.10
//! precedence order, rather than building full year/month mask tables.
//! Noted as a deliberate simplification in DESIGN.md.

use crate::error::ExpandError;
use crate::model::datetime::ICalDateTime;
use crate::model::rrule::{Frequency, RRule, Termination, WeekdayNum};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

/// A safety multiplier on `max_instances` bounding how many candidate
/// periods the expander will walk before giving up — protects against
/// rules (e.g. `BYDAY=MO` with `BYMONTH=FEB` in a leap-less rule) that
/// could otherwise spin without ever producing enough instances.
const MAX_PERIOD_SCAN_FACTOR: usize = 200;

/// Expand `rrule` seeded at `dtstart`, returning instants in the same
/// date-time form as `dtstart`. `until_bound`, if
/// given, additionally truncates the window regardless of the rule's own
/// `UNTIL` (e.g. a caller-supplied "don't look past this date" horizon).
pub fn expand_rrule(
    dtstart: &ICalDateTime,
    rrule: &RRule,
    max_instances: usize,
    until_bound: Option<&ICalDateTime>,
) -> Result<Vec<ICalDateTime>, ExpandError> {
    let seed = dtstart.naive();
    let until = match (&rrule.termination, until_bound) {
        (Termination::Until(u), Some(b)) => Some(seed_naive_min(u.naive(), b.naive())),
        (Termination::Until(u), None) => Some(u.naive()),
        (Termination::Never | Termination::Count(_), Some(b)) => Some(b.naive()),
        (Termination::Never | Termination::Count(_), None) => None,
    };
    let count_limit = match rrule.termination {
        Termination::Count(n) => Some(n as usize),
        _ => None,
    };

    let naive_instances = expand_naive(seed, rrule, max_instances, until, count_limit)?;

    Ok(naive_instances
        .into_iter()
        .filter(|dt| !exdate_matches(dt, &[]))
        .map(|dt| rewrap(dtstart, dt))
        .collect())
}

/// As [`expand_rrule`], additionally subtracting `exdate` instants, compared
/// after normalizing both sides to naive wall time.
pub fn expand_rrule_with_exdates(
    dtstart: &ICalDateTime,
    rrule: &RRule,
    exdates: &[ICalDateTime],
    max_instances: usize,
    until_bound: Option<&ICalDateTime>,
) -> Result<Vec<ICalDateTime>, ExpandError> {
    let all = expand_rrule(dtstart, rrule, max_instances, until_bound)?;
    let ex_naive: Vec<NaiveDateTime> = exdates.iter().map(|d| d.naive()).collect();
    Ok(all
        .into_iter()
        .filter(|dt| !exdate_matches(&dt.naive(), &ex_naive))
        .collect())
}

fn seed_naive_min(a: NaiveDateTime, b: NaiveDateTime) -> NaiveDateTime {
    a.min(b)
}

fn exdate_matches(candidate: &NaiveDateTime, exdates: &[NaiveDateTime]) -> bool {
    exdates.iter().any(|e| e == candidate)
}

fn rewrap(dtstart: &ICalDateTime, naive: NaiveDateTime) -> ICalDateTime {
    match dtstart {
        ICalDateTime::Date(_) => ICalDateTime::Date(naive.date()),
        ICalDateTime::Utc(_) => ICalDateTime::Utc(naive),
        ICalDateTime::Local { tzid, .. } => ICalDateTime::Local {
            tzid: tzid.clone(),
            local: naive,
        },
        ICalDateTime::Floating(_) => ICalDateTime::Floating(naive),
    }
}

fn expand_naive(
    seed: NaiveDateTime,
    rrule: &RRule,
    max_instances: usize,
    until: Option<NaiveDateTime>,
    count_limit: Option<usize>,
) -> Result<Vec<NaiveDateTime>, ExpandError> {
    let interval = rrule.interval.max(1) as i64;
    let mut results = Vec::new();
    let mut period_start = seed;
    let max_periods = max_instances.saturating_mul(MAX_PERIOD_SCAN_FACTOR).max(1000);

    for _ in 0..max_periods {
        if let Some(until) = until {
            if period_start > until {
                break;
            }
        }

        let mut candidates = candidates_for_period(period_start, rrule, seed);
        candidates.sort();
        candidates.dedup();
        candidates.retain(|c| *c >= seed);
        if let Some(until) = until {
            candidates.retain(|c| *c <= until);
        }

        let candidates = apply_by_set_pos(candidates, &rrule.by_set_pos);

        for candidate in candidates {
            results.push(candidate);
            if let Some(limit) = count_limit {
                if results.len() >= limit {
                    return Ok(results);
                }
            }
            if results.len() > max_instances {
                return Err(ExpandError::RRuleExplosion { limit: max_instances });
            }
        }

        period_start = advance_period(period_start, rrule.freq, interval);
    }

    Ok(results)
}

fn advance_period(from: NaiveDateTime, freq: Frequency, interval: i64) -> NaiveDateTime {
    match freq {
        Frequency::Secondly => from + Duration::seconds(interval),
        Frequency::Minutely => from + Duration::minutes(interval),
        Frequency::Hourly => from + Duration::hours(interval),
        Frequency::Daily => from + Duration::days(interval),
        Frequency::Weekly => from + Duration::weeks(interval),
        Frequency::Monthly => add_months(from, interval),
        Frequency::Yearly => add_months(from, interval * 12),
    }
}

fn add_months(from: NaiveDateTime, months: i64) -> NaiveDateTime {
    let total_month0 = from.year() as i64 * 12 + (from.month() as i64 - 1) + months;
    let year = (total_month0.div_euclid(12)) as i32;
    let month = (total_month0.rem_euclid(12)) as u32 + 1;
    let day = from.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or(from.date())
        .and_time(from.time())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    next.map(|n| (n - first).num_days() as u32).unwrap_or(30)
}

/// Generate the candidate set for the period containing `period_start`,
/// per the rule's frequency and `BY*` parts.
fn candidates_for_period(period_start: NaiveDateTime, rrule: &RRule, seed: NaiveDateTime) -> Vec<NaiveDateTime> {
    match rrule.freq {
        Frequency::Secondly | Frequency::Minutely | Frequency::Hourly | Frequency::Daily => {
            let mut day_candidates = if rrule.by_hour.is_empty()
                && rrule.by_minute.is_empty()
                && rrule.by_second.is_empty()
            {
                vec![period_start]
            } else {
                substitute_time_fields(period_start, rrule)
            };
            day_candidates.retain(|c| day_passes_filters(c.date(), rrule));
            day_candidates
        }
        Frequency::Weekly => week_candidates(period_start, rrule, seed),
        Frequency::Monthly => month_candidates(period_start, rrule),
        Frequency::Yearly => year_candidates(period_start, rrule),
    }
}

fn substitute_time_fields(base: NaiveDateTime, rrule: &RRule) -> Vec<NaiveDateTime> {
    let hours: Vec<u32> = if rrule.by_hour.is_empty() {
        vec![base.hour()]
    } else {
        rrule.by_hour.clone()
    };
    let minutes: Vec<u32> = if rrule.by_minute.is_empty() {
        vec![base.minute()]
    } else {
        rrule.by_minute.clone()
    };
    let seconds: Vec<u32> = if rrule.by_second.is_empty() {
        vec![base.second()]
    } else {
        rrule.by_second.clone()
    };

    let mut out = Vec::new();
    for &h in &hours {
        for &m in &minutes {
            for &s in &seconds {
                if let Some(t) = chrono::NaiveTime::from_hms_opt(h, m, s) {
                    out.push(base.date().and_time(t));
                }
            }
        }
    }
    out
}

fn day_passes_filters(date: NaiveDate, rrule: &RRule) -> bool {
    if !rrule.by_month.is_empty() && !rrule.by_month.contains(&date.month()) {
        return false;
    }
    if !rrule.by_month_day.is_empty() {
        let dim = days_in_month(date.year(), date.month()) as i32;
        let day = date.day() as i32;
        let neg_day = day - dim - 1;
        if !rrule.by_month_day.contains(&day) && !rrule.by_month_day.contains(&neg_day) {
            return false;
        }
    }
    if !rrule.by_day.is_empty() && !rrule.by_day.iter().any(|w| w.ordinal.is_none() && w.weekday.to_chrono() == date.weekday()) {
        return false;
    }
    true
}

fn week_candidates(period_start: NaiveDateTime, rrule: &RRule, seed: NaiveDateTime) -> Vec<NaiveDateTime> {
    let week_start_date = week_floor(period_start.date(), rrule.week_start.to_chrono());
    let weekdays: Vec<chrono::Weekday> = if rrule.by_day.is_empty() {
        vec![seed.weekday()]
    } else {
        rrule.by_day.iter().map(|w| w.weekday.to_chrono()).collect()
    };
    weekdays
        .into_iter()
        .filter_map(|wd| {
            let offset = wd.num_days_from_monday() as i64 - rrule.week_start.to_chrono().num_days_from_monday() as i64;
            let offset = offset.rem_euclid(7);
            let date = week_start_date + Duration::days(offset);
            if rrule.by_month.is_empty() || rrule.by_month.contains(&date.month()) {
                Some(date.and_time(period_start.time()))
            } else {
                None
            }
        })
        .collect()
}

fn week_floor(date: NaiveDate, week_start: chrono::Weekday) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as i64 - week_start.num_days_from_monday() as i64;
    let offset = offset.rem_euclid(7);
    date - Duration::days(offset)
}

fn month_candidates(period_start: NaiveDateTime, rrule: &RRule) -> Vec<NaiveDateTime> {
    let year = period_start.year();
    let month = period_start.month();
    let dim = days_in_month(year, month);
    let mut days: Vec<u32> = Vec::new();

    if !rrule.by_month_day.is_empty() {
        for &d in &rrule.by_month_day {
            let day = if d > 0 { d as u32 } else { (dim as i32 + d + 1) as u32 };
            if day >= 1 && day <= dim {
                days.push(day);
            }
        }
    } else if !rrule.by_day.is_empty() {
        days.extend(nth_weekdays_in_month(year, month, &rrule.by_day));
    } else {
        days.push(period_start.day().min(dim));
    }

    if !rrule.by_month.is_empty() && !rrule.by_month.contains(&month) {
        return Vec::new();
    }

    days.sort_unstable();
    days.dedup();
    days.into_iter()
        .filter_map(|d| NaiveDate::from_ymd_opt(year, month, d).map(|date| date.and_time(period_start.time())))
        .collect()
}

fn nth_weekdays_in_month(year: i32, month: u32, by_day: &[WeekdayNum]) -> Vec<u32> {
    let dim = days_in_month(year, month);
    let mut out = Vec::new();
    for wn in by_day {
        let matches: Vec<u32> = (1..=dim)
            .filter(|&d| {
                NaiveDate::from_ymd_opt(year, month, d)
                    .map(|date| date.weekday() == wn.weekday.to_chrono())
                    .unwrap_or(false)
            })
            .collect();
        match wn.ordinal {
            None => out.extend(matches),
            Some(n) if n > 0 => {
                if let Some(&d) = matches.get((n - 1) as usize) {
                    out.push(d);
                }
            }
            Some(n) => {
                let idx = matches.len() as i32 + n;
                if idx >= 0 {
                    if let Some(&d) = matches.get(idx as usize) {
                        out.push(d);
                    }
                }
            }
        }
    }
    out
}

fn year_candidates(period_start: NaiveDateTime, rrule: &RRule) -> Vec<NaiveDateTime> {
    let year = period_start.year();

    if !rrule.by_year_day.is_empty() {
        let year_len = if Datelike::leap_year(&NaiveDate::from_ymd_opt(year, 1, 1).unwrap()) {
            366
        } else {
            365
        };
        return rrule
            .by_year_day
            .iter()
            .filter_map(|&yd| {
                let day = if yd > 0 { yd } else { year_len + yd + 1 };
                if day >= 1 && day <= year_len {
                    NaiveDate::from_yo_opt(year, day as u32)
                } else {
                    None
                }
            })
            .map(|d| d.and_time(period_start.time()))
            .collect();
    }

    let months: Vec<u32> = if rrule.by_month.is_empty() {
        vec![period_start.month()]
    } else {
        rrule.by_month.clone()
    };

    let mut out = Vec::new();
    for month in months {
        let month_start = NaiveDate::from_ymd_opt(year, month, 1)
            .unwrap()
            .and_time(period_start.time());
        out.extend(month_candidates(month_start, rrule));
    }
    out
}

fn apply_by_set_pos(mut candidates: Vec<NaiveDateTime>, by_set_pos: &[i32]) -> Vec<NaiveDateTime> {
    if by_set_pos.is_empty() {
        return candidates;
    }
    candidates.sort();
    let len = candidates.len() as i32;
    let mut selected = Vec::new();
    for &pos in by_set_pos {
        let idx = if pos > 0 { pos - 1 } else { len + pos };
        if idx >= 0 && idx < len {
            selected.push(candidates[idx as usize]);
        }
    }
    selected.sort();
    selected.dedup();
    selected
}
