//! Construction of exclusion rrules: the second match of a
//! `MATCH EXCLUDE MATCH` group becomes an RRULE subtracted from the
//! first during iteration.

use chrono::NaiveTime;

use crate::export;
use crate::rrule::Recurrence;
use crate::timepoint::{
    Date, DateInterval, Datetime, Time, TimeInterval, Timepoint, Weekdays, WeeklyRecurrence,
    day_end,
};

/// Build the exclusion rrule string for `excluded` applied against the
/// constructive timepoint. Returns `None` when the pairing is not
/// supported; the exclusion token is then ignored.
pub(crate) fn exclusion_rrule(constructive: &Timepoint, excluded: &Timepoint) -> Option<String> {
    let excluded = classify(excluded)?;
    match constructive {
        Timepoint::DateInterval(interval) => match excluded {
            Excluded::Date(date) => date_exclusion(date, &interval.end, None),
            Excluded::Weekdays(days) => {
                weekday_exclusion(&export::date_interval_rule(interval)?, &days)
            }
        },
        Timepoint::DatetimeInterval(interval) => match excluded {
            Excluded::Date(date) => date_exclusion(
                date,
                &interval.date_interval.end,
                Some(interval.time_interval),
            ),
            Excluded::Weekdays(days) => {
                weekday_exclusion(&export::datetime_interval_rule(interval)?, &days)
            }
        },
        Timepoint::WeeklyRecurrence(weekly) => match excluded {
            Excluded::Date(date) => weekly_date_exclusion(weekly, date),
            Excluded::Weekdays(days) => {
                weekday_exclusion(&export::weekly_recurrence_rule(weekly)?, &days)
            }
        },
        _ => None,
    }
}

enum Excluded {
    Date(Datetime),
    Weekdays(Weekdays),
}

/// Interpret the excluded match: a bare date or datetime excludes one
/// day, a weekly recurrence with no own date range excludes weekdays.
fn classify(excluded: &Timepoint) -> Option<Excluded> {
    match excluded {
        Timepoint::Date(date) => Some(Excluded::Date(Datetime::new(
            *date,
            Time::new(0, 0),
            Some(Time::new(23, 59)),
        ))),
        Timepoint::Datetime(datetime) => Some(Excluded::Date(*datetime)),
        Timepoint::WeeklyRecurrence(weekly)
            if weekly.is_unlimited() && weekly.time_interval.is_all_day() =>
        {
            Some(Excluded::Weekdays(weekly.weekdays.clone()))
        }
        _ => None,
    }
}

/// One excluded day, optionally narrowed to the constructive time
/// window. Missing year/month inherit from the constructive end date.
fn date_exclusion(excluded: Datetime, end: &Date, window: Option<TimeInterval>) -> Option<String> {
    let mut date = excluded.date;
    if date.year.is_none() {
        date.year = end.year;
    }
    if date.month.is_none() {
        date.month = end.month;
    }
    match window {
        Some(window) => {
            export::datetime_rule(&Datetime::new(date, window.start, Some(window.end)))
        }
        None => export::date_rule(&date),
    }
}

/// A weekly rule pinned to the single excluded day, keeping the
/// recurrence timings.
fn weekly_date_exclusion(weekly: &WeeklyRecurrence, excluded: Datetime) -> Option<String> {
    let mut date = excluded.date;
    if date.year.is_none() {
        date.year = weekly.date_interval.end.year;
    }
    if date.month.is_none() {
        date.month = weekly.date_interval.end.month;
    }
    let pinned = WeeklyRecurrence::new(
        DateInterval::new(date, date),
        weekly.time_interval,
        weekly.weekdays.clone(),
    );
    export::weekly_recurrence_rule(&pinned)
}

/// Swap the excluded weekdays into the constructive rule and bound it
/// by the constructive UNTIL, at midnight for date-only bounds.
fn weekday_exclusion(constructive_rrule: &str, days: &Weekdays) -> Option<String> {
    let mut rule = Recurrence::parse(constructive_rrule).ok()?;
    rule.byday = days.days.clone();
    rule.count = None;
    rule.interval = None;
    if let Some(until) = rule.until {
        let time = if rule.until_is_date {
            NaiveTime::MIN
        } else {
            until.time()
        };
        rule.until = Some(until.date().and_time(time));
        rule.until_is_date = false;
    } else {
        rule.until = Some(rule.dtstart.date().and_time(day_end()));
        rule.until_is_date = false;
    }
    Some(rule.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timepoint::{DateInterval, DatetimeInterval};

    fn interval_2015_march() -> DateInterval {
        DateInterval::new(Date::full(2015, 3, 5), Date::full(2015, 3, 29))
    }

    #[test]
    fn weekday_exclusion_on_date_interval() {
        let constructive = Timepoint::DateInterval(interval_2015_march());
        let excluded = Timepoint::WeeklyRecurrence(WeeklyRecurrence::new(
            DateInterval::undefined(),
            TimeInterval::all_day(),
            Weekdays::new(vec![chrono::Weekday::Mon]),
        ));
        let rrule = exclusion_rrule(&constructive, &excluded).unwrap();
        assert_eq!(
            rrule,
            "DTSTART:20150305\nRRULE:FREQ=DAILY;BYDAY=MO;BYHOUR=0;BYMINUTE=0;UNTIL=20150329T000000"
        );
    }

    #[test]
    fn date_exclusion_on_date_interval() {
        let constructive = Timepoint::DateInterval(interval_2015_march());
        let excluded = Timepoint::Date(Date::new(None, Some(3), 12));
        let rrule = exclusion_rrule(&constructive, &excluded).unwrap();
        assert_eq!(
            rrule,
            "DTSTART:20150312\nRRULE:FREQ=DAILY;COUNT=1;BYHOUR=0;BYMINUTE=0"
        );
    }

    #[test]
    fn date_exclusion_on_datetime_interval_keeps_the_window() {
        let constructive = Timepoint::DatetimeInterval(DatetimeInterval::new(
            interval_2015_march(),
            TimeInterval::new(Time::new(20, 0), Time::new(22, 0)),
        ));
        let excluded = Timepoint::Date(Date::new(None, Some(3), 12));
        let rrule = exclusion_rrule(&constructive, &excluded).unwrap();
        assert_eq!(
            rrule,
            "DTSTART:20150312\nRRULE:FREQ=DAILY;COUNT=1;BYHOUR=20;BYMINUTE=0"
        );
    }

    #[test]
    fn dangling_pairings_are_ignored() {
        let constructive = Timepoint::Date(Date::full(2015, 3, 5));
        let excluded = Timepoint::Date(Date::full(2015, 3, 6));
        assert!(exclusion_rrule(&constructive, &excluded).is_none());
    }
}
