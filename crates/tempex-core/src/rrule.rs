//! Restricted RRULE codec: the `DTSTART:…\nRRULE:…` subset used by the
//! wire format, with a canonical serialization order and a bounded
//! occurrence iterator over civil datetimes.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::ParseError;
use crate::timepoint::weekday_from_index;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freq {
    Daily,
    Weekly,
}

impl Freq {
    fn as_str(self) -> &'static str {
        match self {
            Freq::Daily => "DAILY",
            Freq::Weekly => "WEEKLY",
        }
    }
}

/// A parsed recurrence rule. Fields mirror the restricted key set:
/// FREQ, COUNT, BYDAY, BYHOUR, BYMINUTE, INTERVAL, UNTIL.
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    pub dtstart: NaiveDateTime,
    /// DTSTART was a bare date; serialized back without a time part.
    pub dtstart_is_date: bool,
    pub freq: Freq,
    pub count: Option<u32>,
    pub interval: Option<u32>,
    pub byday: Vec<Weekday>,
    pub byhour: Option<u32>,
    pub byminute: Option<u32>,
    pub until: Option<NaiveDateTime>,
    /// UNTIL was a bare date.
    pub until_is_date: bool,
}

impl Recurrence {
    pub fn new(freq: Freq, dtstart: NaiveDate) -> Self {
        Recurrence {
            dtstart: dtstart.and_time(NaiveTime::MIN),
            dtstart_is_date: true,
            freq,
            count: None,
            interval: None,
            byday: Vec::new(),
            byhour: None,
            byminute: None,
            until: None,
            until_is_date: true,
        }
    }

    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let invalid = |reason: &str| ParseError::InvalidRRule {
            input: input.to_owned(),
            reason: reason.to_owned(),
        };

        let mut dtstart: Option<(NaiveDateTime, bool)> = None;
        let mut rule_part: Option<&str> = None;
        for line in input.lines() {
            let line = line.trim();
            if let Some(value) = line.strip_prefix("DTSTART:") {
                dtstart = Some(parse_ical_datetime(value.trim()).ok_or_else(|| {
                    invalid("malformed DTSTART value")
                })?);
            } else if let Some(value) = line.strip_prefix("RRULE:") {
                rule_part = Some(value.trim());
            }
        }
        let (dtstart, dtstart_is_date) = dtstart.ok_or_else(|| invalid("missing DTSTART"))?;
        let rule_part = rule_part.ok_or_else(|| invalid("missing RRULE"))?;

        let mut rule = Recurrence {
            dtstart,
            dtstart_is_date,
            freq: Freq::Daily,
            count: None,
            interval: None,
            byday: Vec::new(),
            byhour: None,
            byminute: None,
            until: None,
            until_is_date: true,
        };
        let mut freq_seen = false;
        for field in rule_part.split(';') {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            let Some((key, value)) = field.split_once('=') else {
                return Err(invalid("malformed RRULE field"));
            };
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => {
                    rule.freq = match value.trim().to_ascii_uppercase().as_str() {
                        "DAILY" => Freq::Daily,
                        "WEEKLY" => Freq::Weekly,
                        _ => return Err(invalid("unsupported FREQ")),
                    };
                    freq_seen = true;
                }
                "COUNT" => {
                    rule.count =
                        Some(value.trim().parse().map_err(|_| invalid("malformed COUNT"))?);
                }
                "INTERVAL" => {
                    rule.interval = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| invalid("malformed INTERVAL"))?,
                    );
                }
                "BYDAY" => {
                    let mut days = Vec::new();
                    for code in value.split(',') {
                        days.push(parse_weekday(code.trim()).ok_or_else(|| {
                            invalid("malformed BYDAY value")
                        })?);
                    }
                    days.sort_by_key(|d| d.num_days_from_monday());
                    days.dedup();
                    rule.byday = days;
                }
                "BYHOUR" => {
                    let first = value.split(',').next().unwrap_or(value);
                    rule.byhour =
                        Some(first.trim().parse().map_err(|_| invalid("malformed BYHOUR"))?);
                }
                "BYMINUTE" => {
                    let first = value.split(',').next().unwrap_or(value);
                    rule.byminute = Some(
                        first
                            .trim()
                            .parse()
                            .map_err(|_| invalid("malformed BYMINUTE"))?,
                    );
                }
                "UNTIL" => {
                    let (until, is_date) = parse_ical_datetime(value.trim())
                        .ok_or_else(|| invalid("malformed UNTIL value"))?;
                    rule.until = Some(until);
                    rule.until_is_date = is_date;
                }
                // resilient on the rest of the iCalendar vocabulary
                _ => {}
            }
        }
        if !freq_seen {
            return Err(invalid("missing FREQ"));
        }
        Ok(rule)
    }

    /// Event start time: BYHOUR/BYMINUTE when set, else the DTSTART
    /// time of day.
    pub fn start_time(&self) -> NaiveTime {
        match (self.byhour, self.byminute) {
            (Some(hour), minute) => {
                NaiveTime::from_hms_opt(hour.min(23), minute.unwrap_or(0).min(59), 0)
                    .unwrap_or(NaiveTime::MIN)
            }
            _ => self.dtstart.time(),
        }
    }

    /// Whether the rule yields an event on that calendar date,
    /// disregarding the time of day.
    pub fn generates_date(&self, date: NaiveDate) -> bool {
        if date < self.dtstart.date() {
            return false;
        }
        if let Some(until) = self.until {
            if date > until.date() {
                return false;
            }
        }
        if let Some(count) = self.count {
            // COUNT is only used for single dates in this subset
            if count == 1 {
                return date == self.dtstart.date();
            }
        }
        match self.freq {
            Freq::Daily => {
                let interval = i64::from(self.interval.unwrap_or(1).max(1));
                let days = date.signed_duration_since(self.dtstart.date()).num_days();
                if days % interval != 0 {
                    return false;
                }
                self.byday.is_empty() || self.byday.contains(&date.weekday())
            }
            Freq::Weekly => {
                if self.byday.is_empty() {
                    date.weekday() == self.dtstart.date().weekday()
                } else {
                    self.byday.contains(&date.weekday())
                }
            }
        }
    }

    /// Occurrence datetimes within `[lower, upper]`, both inclusive,
    /// also honoring DTSTART/UNTIL/COUNT. The caller supplies the
    /// window for unbounded rules.
    pub fn occurrences_between(
        &self,
        lower: NaiveDateTime,
        upper: NaiveDateTime,
    ) -> Occurrences<'_> {
        let time = self.start_time();
        let mut start = self.dtstart.date().max(lower.date());
        // keep the interval alignment when jumping to the window start
        if self.count.is_none() {
            if let Freq::Daily = self.freq {
                let interval = i64::from(self.interval.unwrap_or(1).max(1));
                let days = start.signed_duration_since(self.dtstart.date()).num_days();
                let offset = days.rem_euclid(interval);
                if offset != 0 {
                    start = start
                        .checked_add_signed(Duration::days(interval - offset))
                        .unwrap_or(start);
                }
            }
        } else {
            // counted rules enumerate from their own start
            start = self.dtstart.date();
        }
        let end = match self.until {
            Some(until) => until.date().min(upper.date()),
            None => upper.date(),
        };
        Occurrences {
            rule: self,
            time,
            cursor: Some(start),
            end,
            lower,
            upper,
            yielded: 0,
        }
    }
}

impl std::fmt::Display for Recurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DTSTART:")?;
        if self.dtstart_is_date {
            write!(f, "{}", self.dtstart.format("%Y%m%d"))?;
        } else {
            write!(f, "{}", self.dtstart.format("%Y%m%dT%H%M%S"))?;
        }
        write!(f, "\nRRULE:FREQ={}", self.freq.as_str())?;
        if let Some(count) = self.count {
            write!(f, ";COUNT={count}")?;
        }
        if !self.byday.is_empty() {
            let days: Vec<&str> = self.byday.iter().map(|d| weekday_code(*d)).collect();
            write!(f, ";BYDAY={}", days.join(","))?;
        }
        if let Some(hour) = self.byhour {
            write!(f, ";BYHOUR={hour}")?;
        }
        if let Some(minute) = self.byminute {
            write!(f, ";BYMINUTE={minute}")?;
        }
        if let Some(interval) = self.interval {
            write!(f, ";INTERVAL={interval}")?;
        }
        if let Some(until) = self.until {
            if self.until_is_date {
                write!(f, ";UNTIL={}", until.format("%Y%m%d"))?;
            } else {
                write!(f, ";UNTIL={}", until.format("%Y%m%dT%H%M%S"))?;
            }
        }
        Ok(())
    }
}

/// Iterator over the rule occurrences inside a window.
pub struct Occurrences<'a> {
    rule: &'a Recurrence,
    time: NaiveTime,
    cursor: Option<NaiveDate>,
    end: NaiveDate,
    lower: NaiveDateTime,
    upper: NaiveDateTime,
    yielded: u32,
}

impl Iterator for Occurrences<'_> {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<NaiveDateTime> {
        loop {
            let date = self.cursor?;
            if date > self.end {
                self.cursor = None;
                return None;
            }
            if let Some(count) = self.rule.count {
                if self.yielded >= count {
                    self.cursor = None;
                    return None;
                }
            }
            self.cursor = date.succ_opt();
            if !self.rule.generates_date(date) {
                continue;
            }
            let occurrence = date.and_time(self.time);
            // UNTIL bounds the occurrence datetime, so a date-only
            // UNTIL cuts same-day occurrences later than midnight
            if let Some(until) = self.rule.until {
                if occurrence > until {
                    self.cursor = None;
                    return None;
                }
            }
            // counted rules consume their budget even before the window
            if self.rule.count.is_some() {
                self.yielded += 1;
            }
            if occurrence < self.lower || occurrence > self.upper {
                continue;
            }
            return Some(occurrence);
        }
    }
}

pub(crate) fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

pub(crate) fn parse_weekday(code: &str) -> Option<Weekday> {
    let idx = match code.to_ascii_uppercase().as_str() {
        "MO" => 0,
        "TU" => 1,
        "WE" => 2,
        "TH" => 3,
        "FR" => 4,
        "SA" => 5,
        "SU" => 6,
        _ => return None,
    };
    Some(weekday_from_index(idx))
}

/// `YYYYMMDD` or `YYYYMMDDTHHMMSS`; returns the value and whether it
/// was a bare date.
fn parse_ical_datetime(value: &str) -> Option<(NaiveDateTime, bool)> {
    if let Some((date_part, time_part)) = value.split_once('T') {
        let date = parse_ical_date(date_part)?;
        if time_part.len() != 6 || !time_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let hour: u32 = time_part[0..2].parse().ok()?;
        let minute: u32 = time_part[2..4].parse().ok()?;
        let second: u32 = time_part[4..6].parse().ok()?;
        let time = NaiveTime::from_hms_opt(hour, minute, second)?;
        Some((date.and_time(time), false))
    } else {
        let date = parse_ical_date(value)?;
        Some((date.and_time(NaiveTime::MIN), true))
    }
}

fn parse_ical_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = value[0..4].parse().ok()?;
    let month: u32 = value[4..6].parse().ok()?;
    let day: u32 = value[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
