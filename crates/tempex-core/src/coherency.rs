//! Coherency filtering. The timepoint-level pass cleans up redundant
//! extractions inside one text; the rule-level pass caps what a noisy
//! text may export, keeping the most specific information.

use chrono::Datelike;
use log::debug;

use crate::models::ScheduleRule;
use crate::timepoint::{Date, Datetime, Time, Timepoint};

type Spanned = (Timepoint, (usize, usize));

/// In-text cleanup, run right after year transmission.
pub(crate) fn timepoint_coherency(timepoints: Vec<Spanned>) -> Vec<Spanned> {
    let timepoints = inherit_date_lapse(timepoints);
    let timepoints = deduplicate_intervals_and_dates(timepoints);
    deduplicate_weekly_and_dates(timepoints)
}

/// An unlimited weekly recurrence co-occurring with a dated interval
/// inherits its range (and its time window when the recurrence has
/// none); the consumed interval is dropped.
fn inherit_date_lapse(timepoints: Vec<Spanned>) -> Vec<Spanned> {
    let has_unlimited_weekly = timepoints.iter().any(|(tp, _)| {
        matches!(tp, Timepoint::WeeklyRecurrence(weekly) if weekly.is_unlimited())
    });
    if !has_unlimited_weekly {
        return timepoints;
    }
    let range = timepoints.iter().find_map(|(tp, _)| match tp {
        Timepoint::DateInterval(interval) if interval.is_valid() => {
            Some((interval.clone(), None))
        }
        Timepoint::DatetimeInterval(interval) if interval.date_interval.is_valid() => Some((
            interval.date_interval.clone(),
            Some(interval.time_interval),
        )),
        _ => None,
    });
    let Some((interval, time)) = range else {
        return timepoints;
    };
    let mut out = Vec::new();
    for (timepoint, span) in timepoints {
        match timepoint {
            Timepoint::WeeklyRecurrence(mut weekly) if weekly.is_unlimited() => {
                weekly.date_interval = interval.clone();
                if weekly.time_interval.is_all_day() {
                    if let Some(time) = time {
                        weekly.time_interval = time;
                    }
                }
                out.push((Timepoint::WeeklyRecurrence(weekly), span));
            }
            Timepoint::DateInterval(_) | Timepoint::DatetimeInterval(_) => {
                // consumed by the recurrence
            }
            other => out.push((other, span)),
        }
    }
    out
}

/// Drop a date interval whose days are all restated by independent
/// single dates.
fn deduplicate_intervals_and_dates(timepoints: Vec<Spanned>) -> Vec<Spanned> {
    let single_dates: Vec<Date> = timepoints
        .iter()
        .filter_map(|(tp, _)| match tp {
            Timepoint::Date(date) => Some(*date),
            Timepoint::Datetime(datetime) => Some(datetime.date),
            _ => None,
        })
        .collect();
    if single_dates.is_empty() {
        return timepoints;
    }
    timepoints
        .into_iter()
        .filter(|(tp, _)| {
            let interval = match tp {
                Timepoint::DateInterval(interval) => interval,
                Timepoint::DatetimeInterval(interval) => &interval.date_interval,
                _ => return true,
            };
            if !interval.is_valid() || interval.dates().len() > 62 {
                return true;
            }
            let covered = interval.dates().iter().all(|day| {
                single_dates
                    .iter()
                    .any(|date| date.to_naive() == Some(*day))
            });
            !covered
        })
        .collect()
}

/// A single-weekday recurrence that merely restates a single date(-time)
/// was almost surely a misparse of that date; drop it.
fn deduplicate_weekly_and_dates(timepoints: Vec<Spanned>) -> Vec<Spanned> {
    let dates: Vec<Datetime> = timepoints
        .iter()
        .filter_map(|(tp, _)| match tp {
            Timepoint::Date(date) => {
                Some(Datetime::new(*date, Time::new(0, 0), Some(Time::new(23, 59))))
            }
            Timepoint::Datetime(datetime) => Some(*datetime),
            _ => None,
        })
        .collect();
    if dates.is_empty() {
        return timepoints;
    }
    timepoints
        .into_iter()
        .filter(|(tp, _)| {
            let Timepoint::WeeklyRecurrence(weekly) = tp else {
                return true;
            };
            if weekly.weekdays.days.len() != 1 {
                return true;
            }
            let restated = dates.iter().any(|datetime| {
                let Some(day) = datetime.date.to_naive() else {
                    return false;
                };
                let same_day = day.weekday() == weekly.weekdays.days[0];
                let same_time = weekly.time_interval.is_all_day()
                    || weekly.time_interval.start == datetime.start;
                same_day && same_time
            });
            !restated
        })
        .collect()
}

/// Caps applied by the rule-level coherency filter. Defaults match the
/// historical tuning.
#[derive(Debug, Clone, Copy)]
pub struct CoherencyOptions {
    pub max_single_dates: usize,
    pub max_small_intervals: usize,
    pub max_long_intervals_per_weekday: usize,
    pub max_unlimited_intervals_per_weekday: usize,
}

impl Default for CoherencyOptions {
    fn default() -> Self {
        CoherencyOptions {
            max_single_dates: 40,
            max_small_intervals: 5,
            max_long_intervals_per_weekday: 2,
            max_unlimited_intervals_per_weekday: 1,
        }
    }
}

/// Heuristic filter over exported rules: specific information beats
/// vague repetition, and each rule family is capped.
pub struct CoherencyFilter {
    options: CoherencyOptions,
}

impl CoherencyFilter {
    pub fn new(options: CoherencyOptions) -> Self {
        CoherencyFilter { options }
    }

    pub fn apply(&self, rules: Vec<ScheduleRule>) -> Vec<ScheduleRule> {
        let before = rules.len();
        let rules = self.apply_type_heuristics(rules);
        let rules = self.apply_size_heuristics(rules);
        debug!("coherency: {} rule(s) in, {} out", before, rules.len());
        rules
    }

    /// Single dates evict everything but single dates and small
    /// intervals; long intervals evict everything shorter-lived than
    /// themselves; unlimited intervals evict everything else.
    fn apply_type_heuristics(&self, mut rules: Vec<ScheduleRule>) -> Vec<ScheduleRule> {
        if rules.iter().any(ScheduleRule::single_date) {
            rules.retain(|rule| rule.single_date() || rule.small_date_interval());
        }
        if rules.iter().any(ScheduleRule::long_date_interval) {
            rules.retain(ScheduleRule::long_date_interval);
        }
        if rules.iter().any(ScheduleRule::unlimited_date_interval) {
            rules.retain(ScheduleRule::unlimited_date_interval);
        }
        rules
    }

    fn apply_size_heuristics(&self, rules: Vec<ScheduleRule>) -> Vec<ScheduleRule> {
        let rules = cap_count(rules, self.options.max_single_dates, ScheduleRule::single_date);
        let rules = cap_count(
            rules,
            self.options.max_small_intervals,
            ScheduleRule::small_date_interval,
        );
        let rules = cap_per_weekday(
            rules,
            self.options.max_long_intervals_per_weekday,
            ScheduleRule::long_date_interval,
        );
        cap_per_weekday(
            rules,
            self.options.max_unlimited_intervals_per_weekday,
            ScheduleRule::unlimited_date_interval,
        )
    }
}

fn cap_count(
    rules: Vec<ScheduleRule>,
    cap: usize,
    matches: impl Fn(&ScheduleRule) -> bool,
) -> Vec<ScheduleRule> {
    let mut kept = 0;
    rules
        .into_iter()
        .filter(|rule| {
            if !matches(rule) {
                return true;
            }
            if kept < cap {
                kept += 1;
                true
            } else {
                false
            }
        })
        .collect()
}

/// Per-weekday cap. A rule whose weekdays are only partly under the
/// cap is split: kept for the weekdays still authorized, dropped for
/// the rest.
fn cap_per_weekday(
    rules: Vec<ScheduleRule>,
    cap: usize,
    matches: impl Fn(&ScheduleRule) -> bool,
) -> Vec<ScheduleRule> {
    let mut counts = [0usize; 7];
    let mut out = Vec::new();
    for rule in rules {
        if !matches(&rule) || rule.weekdays().is_empty() {
            out.push(rule);
            continue;
        }
        let authorized: Vec<chrono::Weekday> = rule
            .weekdays()
            .iter()
            .copied()
            .filter(|day| counts[day.num_days_from_monday() as usize] < cap)
            .collect();
        if authorized.len() == rule.weekdays().len() {
            for day in &authorized {
                counts[day.num_days_from_monday() as usize] += 1;
            }
            out.push(rule);
        } else if !authorized.is_empty() {
            for day in &authorized {
                counts[day.num_days_from_monday() as usize] += 1;
            }
            let mut split = rule.clone();
            split.set_weekdays(authorized);
            out.push(split);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::DurationRRule;
    use crate::timepoint::{DateInterval, Time, TimeInterval, Weekdays, WeeklyRecurrence};

    fn rule(rrule: &str, duration: i64) -> ScheduleRule {
        ScheduleRule::new(DurationRRule {
            rrule: rrule.to_owned(),
            duration,
            ..DurationRRule::default()
        })
        .unwrap()
    }

    fn single(day: u32) -> ScheduleRule {
        rule(
            &format!("DTSTART:201503{day:02}\nRRULE:FREQ=DAILY;COUNT=1;BYHOUR=0;BYMINUTE=0"),
            1439,
        )
    }

    fn small_interval() -> ScheduleRule {
        rule(
            "DTSTART:20150305\nRRULE:FREQ=DAILY;BYHOUR=0;BYMINUTE=0;INTERVAL=1;UNTIL=20150329",
            1439,
        )
    }

    fn long_interval(byday: &str) -> ScheduleRule {
        rule(
            &format!(
                "DTSTART:20150305\nRRULE:FREQ=WEEKLY;BYDAY={byday};BYHOUR=0;BYMINUTE=0;UNTIL=20150910T235959"
            ),
            1439,
        )
    }

    #[test]
    fn single_dates_evict_long_intervals() {
        let filtered = CoherencyFilter::new(CoherencyOptions::default())
            .apply(vec![single(4), long_interval("MO"), small_interval()]);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| !r.long_date_interval()));
    }

    #[test]
    fn single_date_cap_applies() {
        let mut options = CoherencyOptions::default();
        options.max_single_dates = 3;
        let rules = (1..=6).map(single).collect();
        let filtered = CoherencyFilter::new(options).apply(rules);
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn long_interval_weekday_cap_splits_rules() {
        let mut options = CoherencyOptions::default();
        options.max_long_intervals_per_weekday = 1;
        let rules = vec![long_interval("MO"), long_interval("MO,TU")];
        let filtered = CoherencyFilter::new(options).apply(rules);
        assert_eq!(filtered.len(), 2);
        // the second rule lost its Monday but kept its Tuesday
        assert_eq!(filtered[1].weekdays(), &[chrono::Weekday::Tue]);
    }

    #[test]
    fn filter_output_is_a_subset_of_input() {
        let rules = vec![single(4), single(5), small_interval()];
        let inputs: Vec<String> = rules.iter().map(|r| r.record().rrule.clone()).collect();
        let filtered = CoherencyFilter::new(CoherencyOptions::default()).apply(rules);
        assert!(
            filtered
                .iter()
                .all(|rule| inputs.contains(&rule.record().rrule))
        );
    }

    #[test]
    fn unlimited_weekly_inherits_a_co_occurring_interval() {
        let weekly = Timepoint::WeeklyRecurrence(WeeklyRecurrence::new(
            DateInterval::undefined(),
            TimeInterval::single(Time::new(14, 0)),
            Weekdays::new(vec![chrono::Weekday::Mon]),
        ));
        let interval = Timepoint::DateInterval(DateInterval::new(
            Date::full(2014, 10, 2),
            Date::full(2014, 10, 11),
        ));
        let out = timepoint_coherency(vec![(weekly, (0, 10)), (interval, (12, 30))]);
        assert_eq!(out.len(), 1);
        let Timepoint::WeeklyRecurrence(merged) = &out[0].0 else {
            panic!("expected the weekly recurrence to survive");
        };
        assert_eq!(merged.date_interval.start, Date::full(2014, 10, 2));
        assert_eq!(merged.date_interval.end, Date::full(2014, 10, 11));
    }

    #[test]
    fn interval_restated_by_dates_is_dropped() {
        let interval = Timepoint::DateInterval(DateInterval::new(
            Date::full(2015, 3, 2),
            Date::full(2015, 3, 3),
        ));
        let out = timepoint_coherency(vec![
            (interval, (0, 10)),
            (Timepoint::Date(Date::full(2015, 3, 2)), (12, 20)),
            (Timepoint::Date(Date::full(2015, 3, 3)), (22, 30)),
        ]);
        assert_eq!(out.len(), 2);
        assert!(
            out.iter()
                .all(|(tp, _)| matches!(tp, Timepoint::Date(_)))
        );
    }

    #[test]
    fn weekly_restating_a_single_datetime_is_dropped() {
        // 2015-03-02 is a Monday
        let datetime = Timepoint::Datetime(Datetime::new(
            Date::full(2015, 3, 2),
            Time::new(14, 0),
            None,
        ));
        let weekly = Timepoint::WeeklyRecurrence(WeeklyRecurrence::new(
            DateInterval::new(Date::full(2015, 3, 1), Date::full(2015, 3, 31)),
            TimeInterval::single(Time::new(14, 0)),
            Weekdays::new(vec![chrono::Weekday::Mon]),
        ));
        let out = timepoint_coherency(vec![(datetime, (0, 10)), (weekly, (12, 40))]);
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0].0, Timepoint::Datetime(_)));
    }
}
