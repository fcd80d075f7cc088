//! `RRule` — the recurrence rule value model.

use super::datetime::ICalDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Secondly => "SECONDLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        hashify::tiny_map_ignore_case!(s.as_bytes(),
            "SECONDLY" => Frequency::Secondly,
            "MINUTELY" => Frequency::Minutely,
            "HOURLY" => Frequency::Hourly,
            "DAILY" => Frequency::Daily,
            "WEEKLY" => Frequency::Weekly,
            "MONTHLY" => Frequency::Monthly,
            "YEARLY" => Frequency::Yearly,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Mo,
    Tu,
    We,
    Th,
    Fr,
    Sa,
    Su,
}

impl Weekday {
    pub fn parse(s: &str) -> Option<Self> {
        hashify::tiny_map_ignore_case!(s.as_bytes(),
            "MO" => Weekday::Mo,
            "TU" => Weekday::Tu,
            "WE" => Weekday::We,
            "TH" => Weekday::Th,
            "FR" => Weekday::Fr,
            "SA" => Weekday::Sa,
            "SU" => Weekday::Su,
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Mo => "MO",
            Weekday::Tu => "TU",
            Weekday::We => "WE",
            Weekday::Th => "TH",
            Weekday::Fr => "FR",
            Weekday::Sa => "SA",
            Weekday::Su => "SU",
        }
    }

    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Mo => chrono::Weekday::Mon,
            Weekday::Tu => chrono::Weekday::Tue,
            Weekday::We => chrono::Weekday::Wed,
            Weekday::Th => chrono::Weekday::Thu,
            Weekday::Fr => chrono::Weekday::Fri,
            Weekday::Sa => chrono::Weekday::Sat,
            Weekday::Su => chrono::Weekday::Sun,
        }
    }
}

/// A `BYDAY` entry: an optional ordinal (`+1MO`, `-1FR`) plus a weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    pub ordinal: Option<i32>,
    pub weekday: Weekday,
}

/// When a recurrence set stops generating instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Termination {
    /// No explicit bound; the expander enforces `max_rrule_instances` instead.
    Never,
    Until(ICalDateTime),
    Count(u32),
}

/// A parsed `RRULE` value. `BY*` parts default to empty, meaning
/// "unconstrained" for that part, per RFC 5545 §3.3.10.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RRule {
    pub freq: Frequency,
    pub interval: u32,
    pub termination: Termination,
    pub by_second: Vec<u32>,
    pub by_minute: Vec<u32>,
    pub by_hour: Vec<u32>,
    pub by_day: Vec<WeekdayNum>,
    pub by_month_day: Vec<i32>,
    pub by_year_day: Vec<i32>,
    pub by_week_no: Vec<i32>,
    pub by_month: Vec<u32>,
    pub by_set_pos: Vec<i32>,
    pub week_start: Weekday,
}

impl RRule {
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: 1,
            termination: Termination::Never,
            by_second: Vec::new(),
            by_minute: Vec::new(),
            by_hour: Vec::new(),
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_year_day: Vec::new(),
            by_week_no: Vec::new(),
            by_month: Vec::new(),
            by_set_pos: Vec::new(),
            week_start: Weekday::Mo,
        }
    }

    pub fn interval(mut self, value: u32) -> Self {
        self.interval = value;
        self
    }

    pub fn until(mut self, value: ICalDateTime) -> Self {
        self.termination = Termination::Until(value);
        self
    }

    pub fn count(mut self, value: u32) -> Self {
        self.termination = Termination::Count(value);
        self
    }

    pub fn by_day(mut self, value: Vec<WeekdayNum>) -> Self {
        self.by_day = value;
        self
    }

    pub fn by_month_day(mut self, value: Vec<i32>) -> Self {
        self.by_month_day = value;
        self
    }

    pub fn by_month(mut self, value: Vec<u32>) -> Self {
        self.by_month = value;
        self
    }

    pub fn by_set_pos(mut self, value: Vec<i32>) -> Self {
        self.by_set_pos = value;
        self
    }

    pub fn week_start(mut self, value: Weekday) -> Self {
        self.week_start = value;
        self
    }

    /// Parse an `RRULE` property value, e.g. `FREQ=DAILY;COUNT=3`.
    ///
    /// Unknown parts are ignored rather than rejected, matching the
    /// tolerant-parser stance the rest of the codec takes.
    pub fn parse(value: &str) -> Option<Self> {
        let mut freq = None;
        let mut rule = None;
        for part in value.split(';') {
            let (key, val) = part.split_once('=')?;
            if key.eq_ignore_ascii_case("FREQ") {
                freq = Frequency::parse(val);
                rule = freq.map(RRule::new);
            }
        }
        let mut rule = rule?;
        for part in value.split(';') {
            let Some((key, val)) = part.split_once('=') else {
                continue;
            };
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => {}
                "INTERVAL" => rule.interval = val.parse().unwrap_or(1),
                "COUNT" => rule.termination = Termination::Count(val.parse().ok()?),
                "UNTIL" => {
                    let is_date_only = val.len() == 8;
                    rule.termination =
                        Termination::Until(ICalDateTime::parse(val, is_date_only, None)?);
                }
                "BYSECOND" => rule.by_second = parse_uint_list(val),
                "BYMINUTE" => rule.by_minute = parse_uint_list(val),
                "BYHOUR" => rule.by_hour = parse_uint_list(val),
                "BYMONTHDAY" => rule.by_month_day = parse_int_list(val),
                "BYYEARDAY" => rule.by_year_day = parse_int_list(val),
                "BYWEEKNO" => rule.by_week_no = parse_int_list(val),
                "BYMONTH" => rule.by_month = parse_uint_list(val),
                "BYSETPOS" => rule.by_set_pos = parse_int_list(val),
                "WKST" => rule.week_start = Weekday::parse(val).unwrap_or(Weekday::Mo),
                "BYDAY" => {
                    rule.by_day = val
                        .split(',')
                        .filter_map(parse_weekday_num)
                        .collect();
                }
                _ => {}
            }
        }
        if freq.is_none() {
            return None;
        }
        Some(rule)
    }

    pub fn to_value_string(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.freq.as_str())];
        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        match &self.termination {
            Termination::Never => {}
            Termination::Count(n) => parts.push(format!("COUNT={n}")),
            Termination::Until(dt) => parts.push(format!("UNTIL={}", dt.format_value())),
        }
        if !self.by_second.is_empty() {
            parts.push(format!("BYSECOND={}", join(&self.by_second)));
        }
        if !self.by_minute.is_empty() {
            parts.push(format!("BYMINUTE={}", join(&self.by_minute)));
        }
        if !self.by_hour.is_empty() {
            parts.push(format!("BYHOUR={}", join(&self.by_hour)));
        }
        if !self.by_month.is_empty() {
            parts.push(format!("BYMONTH={}", join(&self.by_month)));
        }
        if !self.by_month_day.is_empty() {
            parts.push(format!("BYMONTHDAY={}", join(&self.by_month_day)));
        }
        if !self.by_year_day.is_empty() {
            parts.push(format!("BYYEARDAY={}", join(&self.by_year_day)));
        }
        if !self.by_week_no.is_empty() {
            parts.push(format!("BYWEEKNO={}", join(&self.by_week_no)));
        }
        if !self.by_day.is_empty() {
            let days: Vec<String> = self
                .by_day
                .iter()
                .map(|w| match w.ordinal {
                    Some(n) if n > 0 => format!("+{n}{}", w.weekday.as_str()),
                    Some(n) => format!("{n}{}", w.weekday.as_str()),
                    None => w.weekday.as_str().to_string(),
                })
                .collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }
        if !self.by_set_pos.is_empty() {
            parts.push(format!("BYSETPOS={}", join(&self.by_set_pos)));
        }
        if self.week_start != Weekday::Mo {
            parts.push(format!("WKST={}", self.week_start.as_str()));
        }
        parts.join(";")
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_uint_list(s: &str) -> Vec<u32> {
    s.split(',').filter_map(|v| v.parse().ok()).collect()
}

fn parse_int_list(s: &str) -> Vec<i32> {
    s.split(',').filter_map(|v| v.parse().ok()).collect()
}

fn parse_weekday_num(s: &str) -> Option<WeekdayNum> {
    let s = s.trim();
    let (ordinal, wd) = if s.len() > 2 {
        let (num, wd) = s.split_at(s.len() - 2);
        (num.parse::<i32>().ok(), wd)
    } else {
        (None, s)
    };
    Some(WeekdayNum {
        ordinal,
        weekday: Weekday::parse(wd)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_daily_count() {
        let r = RRule::parse("FREQ=DAILY;COUNT=3").unwrap();
        assert_eq!(r.freq, Frequency::Daily);
        assert_eq!(r.termination, Termination::Count(3));
    }

    #[test]
    fn parses_byday_with_ordinal() {
        let r = RRule::parse("FREQ=MONTHLY;BYDAY=-1FR").unwrap();
        assert_eq!(r.by_day[0].ordinal, Some(-1));
        assert_eq!(r.by_day[0].weekday, Weekday::Fr);
    }

    #[test]
    fn round_trips_through_value_string() {
        let r = RRule::new(Frequency::Weekly)
            .interval(2)
            .by_day(vec![WeekdayNum { ordinal: None, weekday: Weekday::Tu }])
            .count(5);
        let s = r.to_value_string();
        assert_eq!(RRule::parse(&s).unwrap(), r);
    }

    #[test]
    fn by_hour_minute_second_and_yearday_weekno_round_trip() {
        let r = RRule::parse("FREQ=DAILY;BYHOUR=9,12;BYMINUTE=30;BYSECOND=0;BYYEARDAY=1,100;BYWEEKNO=20")
            .unwrap();
        let s = r.to_value_string();
        assert!(s.contains("BYHOUR=9,12"));
        assert!(s.contains("BYMINUTE=30"));
        assert!(s.contains("BYSECOND=0"));
        assert!(s.contains("BYYEARDAY=1,100"));
        assert!(s.contains("BYWEEKNO=20"));
        assert_eq!(RRule::parse(&s).unwrap(), r);
    }

    #[test]
    fn unknown_parts_are_ignored() {
        let r = RRule::parse("FREQ=DAILY;FOOBAR=1;COUNT=2").unwrap();
        assert_eq!(r.termination, Termination::Count(2));
    }
}
