//! `ScheduleRule` wraps a wire `DurationRRule` record together with its
//! parsed recurrence, exposing the classification properties and the
//! in-place mutators the packer and the coherency filter need.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::ParseError;
use crate::export::DurationRRule;
use crate::rrule::{Freq, Recurrence};
use crate::timepoint::{ALL_DAY, day_end};

pub(crate) fn unlimited_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

pub(crate) fn unlimited_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Iteration bounds for a rule. Unbounded rules fall back to a virtual
/// window of one year from the reference date.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterBounds {
    pub lower: Option<NaiveDateTime>,
    pub upper: Option<NaiveDateTime>,
    /// Anchor of the virtual window; defaults to today.
    pub reference: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct ScheduleRule {
    record: DurationRRule,
    rule: Recurrence,
    exclusions: Vec<Recurrence>,
}

impl ScheduleRule {
    pub fn new(record: DurationRRule) -> Result<Self, ParseError> {
        let mut rule = Recurrence::parse(&record.rrule)?;
        if record.unlimited {
            rule.dtstart = unlimited_start().and_time(NaiveTime::MIN);
            rule.until = Some(unlimited_end().and_time(day_end()));
            rule.until_is_date = false;
        }
        // malformed exclusion strings are dropped, not fatal
        let exclusions = record
            .excluded
            .iter()
            .filter_map(|raw| Recurrence::parse(raw).ok())
            .collect();
        Ok(ScheduleRule {
            record,
            rule,
            exclusions,
        })
    }

    pub fn record(&self) -> &DurationRRule {
        &self.record
    }

    pub fn into_record(self) -> DurationRRule {
        self.record
    }

    pub fn rule(&self) -> &Recurrence {
        &self.rule
    }

    pub fn duration(&self) -> i64 {
        self.record.duration
    }

    pub fn weekdays(&self) -> &[Weekday] {
        &self.rule.byday
    }

    pub fn weekday_indexes(&self) -> Vec<u8> {
        self.rule
            .byday
            .iter()
            .map(|d| d.num_days_from_monday() as u8)
            .collect()
    }

    /// Start and end time of day; all-day rules span 0:00 to 23:59:59.
    pub fn time_interval(&self) -> (NaiveTime, NaiveTime) {
        if self.rule.byhour.is_some() && self.record.duration != ALL_DAY {
            let start = self.rule.start_time();
            let anchor = unlimited_start().and_time(start);
            let end = anchor + Duration::minutes(self.record.duration);
            (start, end.time())
        } else {
            (NaiveTime::MIN, day_end())
        }
    }

    pub fn start_datetime(&self) -> NaiveDateTime {
        self.rule.dtstart.date().and_time(self.time_interval().0)
    }

    /// End of the last occurrence: the UNTIL date at the start time
    /// plus the duration, the single occurrence end for counted rules,
    /// or one year past the start for unbounded rules.
    pub fn end_datetime(&self) -> NaiveDateTime {
        let (start_time, end_time) = self.time_interval();
        match self.rule.until {
            Some(until) => {
                if self.is_continuous() {
                    until.date().and_time(end_time)
                } else {
                    let base = until.date().and_time(start_time);
                    base.checked_add_signed(Duration::minutes(self.record.duration))
                        .unwrap_or(base)
                }
            }
            None if self.rule.count.is_some() => {
                let base = self.rule.dtstart.date().and_time(start_time);
                base.checked_add_signed(Duration::minutes(self.record.duration))
                    .unwrap_or(base)
            }
            None => {
                let base = self.rule.dtstart.date().and_time(start_time);
                base.checked_add_signed(Duration::days(365))
                    .and_then(|d| d.checked_add_signed(Duration::minutes(self.record.duration)))
                    .unwrap_or(base)
            }
        }
    }

    pub fn date_interval(&self) -> (NaiveDate, Option<NaiveDate>) {
        (self.rule.dtstart.date(), self.rule.until.map(|u| u.date()))
    }

    pub fn bounded(&self) -> bool {
        !self.unlimited()
    }

    pub fn unlimited(&self) -> bool {
        if self.record.unlimited {
            return true;
        }
        if self.rule.until.is_some()
            && self
                .end_datetime()
                .signed_duration_since(self.start_datetime())
                .num_days()
                > 364
        {
            return true;
        }
        self.rule.until.is_none() && self.rule.count.is_none()
    }

    pub fn is_continuous(&self) -> bool {
        self.record.continuous
    }

    pub fn single_date(&self) -> bool {
        self.rule.count == Some(1) && self.record.duration <= ALL_DAY
    }

    /// A rule restricted to specific weekdays. Seven-day rules are
    /// plain intervals, not recurrences, even over a full year; a
    /// single counted date never recurs.
    pub fn is_recurring(&self) -> bool {
        if self.rule.byday.is_empty() {
            return false;
        }
        if self.rule.byday.len() == 7 {
            return false;
        }
        self.rule.count != Some(1)
    }

    /// "tous les jours" over one year: BYDAY present and
    /// UNTIL = DTSTART + 365 days.
    pub fn is_all_year_recurrence(&self) -> bool {
        if self.rule.byday.is_empty() {
            return false;
        }
        match self.rule.until {
            Some(until) => {
                self.rule
                    .dtstart
                    .date()
                    .checked_add_signed(Duration::days(365))
                    == Some(until.date())
            }
            None => false,
        }
    }

    fn day_span(&self) -> Option<i64> {
        let (start, end) = self.date_interval();
        end.map(|end| end.signed_duration_since(start).num_days())
    }

    /// More than a day, up to 4 months.
    pub fn small_date_interval(&self) -> bool {
        self.day_span().is_some_and(|days| (1..=120).contains(&days))
    }

    /// Between 4 and 8 months.
    pub fn long_date_interval(&self) -> bool {
        self.day_span().is_some_and(|days| (121..=240).contains(&days))
    }

    /// More than 8 months.
    pub fn unlimited_date_interval(&self) -> bool {
        self.day_span().is_some_and(|days| days > 240)
    }

    pub fn has_timings(&self) -> bool {
        self.record.duration < ALL_DAY
    }

    /// Occurrence datetimes, subtracting the exclusion rules. The
    /// exclusions mask whole dates, which also covers exclusion rules
    /// carrying a different BYHOUR/BYMINUTE than the constructive one.
    pub fn occurrences(&self, bounds: IterBounds) -> impl Iterator<Item = NaiveDateTime> + '_ {
        let (lower, upper) = if self.bounded() {
            (
                bounds
                    .lower
                    .unwrap_or_else(|| self.rule.dtstart.date().and_time(NaiveTime::MIN)),
                bounds
                    .upper
                    .or_else(|| self.rule.until.map(|u| u.date().and_time(day_end())))
                    .unwrap_or_else(|| unlimited_end().and_time(day_end())),
            )
        } else {
            let reference = bounds
                .reference
                .unwrap_or_else(|| chrono::Local::now().date_naive());
            let lower = bounds
                .lower
                .unwrap_or_else(|| reference.and_time(NaiveTime::MIN));
            let upper = bounds.upper.unwrap_or_else(|| {
                reference
                    .checked_add_signed(Duration::days(365))
                    .unwrap_or(reference)
                    .and_time(day_end())
            });
            (lower, upper)
        };
        self.rule
            .occurrences_between(lower, upper)
            .filter(move |dt| {
                !self
                    .exclusions
                    .iter()
                    .any(|exclusion| exclusion.generates_date(dt.date()))
            })
    }

    /// First occurrence date, using the reference window for unbounded
    /// rules.
    pub fn first_occurrence_date(&self, reference: NaiveDate) -> Option<NaiveDate> {
        self.occurrences(IterBounds {
            reference: Some(reference),
            ..IterBounds::default()
        })
        .next()
        .map(|dt| dt.date())
    }

    /// Last date on which a weekday of the rule falls, walking back
    /// from the end of the interval.
    pub fn last_occurrence_date(&self) -> Option<NaiveDate> {
        let end = self.rule.until?.date();
        if self.rule.byday.is_empty() {
            return Some(end);
        }
        for back in 0..7 {
            let candidate = end.checked_sub_signed(Duration::days(back))?;
            if self.rule.byday.contains(&candidate.weekday()) {
                return Some(candidate);
            }
        }
        Some(end)
    }

    fn resync(&mut self) {
        self.record.rrule = self.rule.to_string();
    }

    /// Replace the start date; the DTSTART collapses to a bare date.
    pub fn set_start_date(&mut self, date: NaiveDate) {
        self.rule.dtstart = date.and_time(NaiveTime::MIN);
        self.rule.dtstart_is_date = true;
        self.resync();
    }

    /// Replace the date part of UNTIL, keeping its time of day.
    /// `None` removes the bound entirely.
    pub fn set_end_date(&mut self, date: Option<NaiveDate>) {
        match (date, self.rule.until) {
            (Some(date), Some(until)) => {
                self.rule.until = Some(date.and_time(until.time()));
            }
            (Some(date), None) => {
                self.rule.until = Some(date.and_time(NaiveTime::MIN));
            }
            (None, _) => {
                self.rule.until = None;
            }
        }
        self.resync();
    }

    /// Append an UNTIL at end-of-day.
    pub fn add_end_date(&mut self, date: NaiveDate) {
        self.rule.until = Some(date.and_time(day_end()));
        self.rule.until_is_date = false;
        self.resync();
    }

    pub fn set_weekdays(&mut self, days: Vec<Weekday>) {
        let mut days = days;
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();
        self.rule.byday = days;
        self.resync();
    }

    pub fn add_weekdays(&mut self, days: &[Weekday]) {
        let mut merged = self.rule.byday.clone();
        merged.extend_from_slice(days);
        self.set_weekdays(merged);
    }

    pub fn set_frequency(&mut self, freq: Freq) {
        self.rule.freq = freq;
        self.resync();
    }

    pub fn remove_count(&mut self) {
        self.rule.count = None;
        self.resync();
    }

    pub fn remove_interval(&mut self) {
        self.rule.interval = None;
        self.resync();
    }

    /// Replace UNTIL with an exact datetime.
    pub fn set_until(&mut self, until: NaiveDateTime) {
        self.rule.until = Some(until);
        self.rule.until_is_date = false;
        self.resync();
    }

    pub fn set_duration(&mut self, minutes: i64) {
        self.record.duration = minutes;
    }

    pub fn set_time(&mut self, hour: u32, minute: u32) {
        self.rule.byhour = Some(hour);
        self.rule.byminute = Some(minute);
        self.resync();
    }
}

impl PartialEq for ScheduleRule {
    fn eq(&self, other: &Self) -> bool {
        self.record.rrule == other.record.rrule && self.record.duration == other.record.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::DurationRRule;

    fn record(rrule: &str, duration: i64) -> DurationRRule {
        DurationRRule {
            rrule: rrule.to_owned(),
            duration,
            ..DurationRRule::default()
        }
    }

    fn rule(rrule: &str, duration: i64) -> ScheduleRule {
        ScheduleRule::new(record(rrule, duration)).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn classifies_single_dates() {
        let single = rule(
            "DTSTART:20150304\nRRULE:FREQ=DAILY;COUNT=1;BYHOUR=18;BYMINUTE=30",
            0,
        );
        assert!(single.single_date());
        assert!(!single.is_recurring());
        assert!(single.bounded());
        assert!(single.has_timings());
        assert_eq!(
            single.start_datetime(),
            d(2015, 3, 4).and_hms_opt(18, 30, 0).unwrap()
        );
    }

    #[test]
    fn classifies_intervals_by_span() {
        let small = rule(
            "DTSTART:20150305\nRRULE:FREQ=DAILY;BYHOUR=0;BYMINUTE=0;INTERVAL=1;UNTIL=20150329",
            1439,
        );
        assert!(small.small_date_interval());
        assert!(!small.long_date_interval());

        let long = rule(
            "DTSTART:20150305\nRRULE:FREQ=DAILY;BYHOUR=0;BYMINUTE=0;INTERVAL=1;UNTIL=20150910",
            1439,
        );
        assert!(long.long_date_interval());

        let huge = rule(
            "DTSTART:20150105\nRRULE:FREQ=DAILY;BYHOUR=0;BYMINUTE=0;INTERVAL=1;UNTIL=20151231",
            1439,
        );
        assert!(huge.unlimited_date_interval());
    }

    #[test]
    fn seven_byday_rule_is_not_recurring() {
        let weekly = rule(
            "DTSTART:20150302\nRRULE:FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR,SA,SU;BYHOUR=8;BYMINUTE=0;UNTIL=20150329T235959",
            120,
        );
        assert!(!weekly.is_recurring());

        let narrow = rule(
            "DTSTART:20150302\nRRULE:FREQ=WEEKLY;BYDAY=MO;BYHOUR=8;BYMINUTE=0;UNTIL=20150329T235959",
            120,
        );
        assert!(narrow.is_recurring());
    }

    #[test]
    fn all_year_seven_day_rule_stays_continuous_not_recurring() {
        let all_year = rule(
            "DTSTART:20150101\nRRULE:FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR,SA,SU;BYHOUR=8;BYMINUTE=0;UNTIL=20160101T235959",
            120,
        );
        assert!(all_year.is_all_year_recurrence());
        // an every-day rule over a year reads as a continuous span
        assert!(!all_year.is_recurring());
        assert!(all_year.unlimited());
    }

    #[test]
    fn unlimited_flag_forces_sentinels() {
        let unlimited = ScheduleRule::new(DurationRRule {
            rrule: "DTSTART:00010101\nRRULE:FREQ=WEEKLY;BYDAY=MO;BYHOUR=8;BYMINUTE=0;UNTIL=99991231T235959".to_owned(),
            duration: 0,
            unlimited: true,
            ..DurationRRule::default()
        })
        .unwrap();
        assert!(unlimited.unlimited());
        let occurrences: Vec<_> = unlimited
            .occurrences(IterBounds {
                reference: Some(d(2015, 3, 1)),
                ..IterBounds::default()
            })
            .collect();
        assert_eq!(occurrences.len(), 53);
        assert_eq!(occurrences[0].date(), d(2015, 3, 2));
    }

    #[test]
    fn exclusions_mask_dates() {
        let record = DurationRRule {
            rrule: "DTSTART:20150305\nRRULE:FREQ=DAILY;BYHOUR=0;BYMINUTE=0;INTERVAL=1;UNTIL=20150329"
                .to_owned(),
            duration: 1439,
            excluded: vec![
                "DTSTART:20150305\nRRULE:FREQ=DAILY;BYDAY=MO;BYHOUR=0;BYMINUTE=0;UNTIL=20150329T000000"
                    .to_owned(),
            ],
            ..DurationRRule::default()
        };
        let rule = ScheduleRule::new(record).unwrap();
        let occurrences: Vec<_> = rule.occurrences(IterBounds::default()).collect();
        // 25 days in the interval, minus 4 Mondays (9, 16, 23 March + 2 March is
        // out of range): 2015-03-09 is a Monday
        assert!(occurrences.iter().all(|dt| dt.date().weekday() != Weekday::Mon));
        assert_eq!(occurrences.len(), 25 - 3);
    }

    #[test]
    fn mutators_resync_the_wire_string() {
        let mut cont = rule(
            "DTSTART:20161010\nRRULE:FREQ=DAILY;BYHOUR=3;BYMINUTE=0;INTERVAL=1;UNTIL=20161023T235959",
            60,
        );
        cont.set_start_date(d(2016, 10, 9));
        cont.set_end_date(Some(d(2016, 10, 24)));
        assert_eq!(
            cont.record().rrule,
            "DTSTART:20161009\nRRULE:FREQ=DAILY;BYHOUR=3;BYMINUTE=0;INTERVAL=1;UNTIL=20161024T235959"
        );
    }

    #[test]
    fn weekday_mutation_rewrites_byday() {
        let mut weekly = rule(
            "DTSTART:20150302\nRRULE:FREQ=WEEKLY;BYDAY=MO;BYHOUR=14;BYMINUTE=0;UNTIL=20150329T235959",
            0,
        );
        weekly.add_weekdays(&[Weekday::Tue]);
        assert!(weekly.record().rrule.contains("BYDAY=MO,TU"));
        weekly.set_weekdays(vec![Weekday::Fri]);
        assert!(weekly.record().rrule.contains("BYDAY=FR"));
    }

    #[test]
    fn last_occurrence_respects_weekdays() {
        let weekly = rule(
            "DTSTART:20140321\nRRULE:FREQ=WEEKLY;BYDAY=MO,TU;BYHOUR=14;BYMINUTE=0;UNTIL=20140330T235959",
            0,
        );
        // 2014-03-30 is a Sunday; the last Monday/Tuesday is the 25th
        assert_eq!(weekly.last_occurrence_date(), Some(d(2014, 3, 25)));
    }
}
