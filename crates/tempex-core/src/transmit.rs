//! Year transmission: fills the missing years of timepoints, first
//! from peer timepoints generating the same month/day, then from the
//! reference date.

use chrono::{Datelike, NaiveDate};

use crate::timepoint::{Date, DateInterval, Timepoint};

/// Peers with a span longer than this are not used as containers;
/// enumerating them would be unbounded.
const MAX_CONTAINER_SPAN_DAYS: i64 = 400;

/// How many months ahead an activity may start and still count as
/// upcoming rather than recently passed.
const UPCOMING_DELTA_MONTHS: u32 = 3;

pub(crate) fn transmit(timepoints: &mut [Timepoint], reference: Option<NaiveDate>) {
    // strategy 1: peer inheritance
    let containers: Vec<DateInterval> = timepoints
        .iter()
        .filter_map(container_interval)
        .collect();
    for timepoint in timepoints.iter_mut() {
        peer_transmit(timepoint, &containers);
    }

    // strategy 2: reference partition
    if let Some(reference) = reference {
        for timepoint in timepoints.iter_mut() {
            reference_transmit(timepoint, reference);
        }
    }
}

/// A year-defined interval usable as a transmission source.
fn container_interval(timepoint: &Timepoint) -> Option<DateInterval> {
    let interval = match timepoint {
        Timepoint::DateInterval(interval) => interval,
        Timepoint::DatetimeInterval(interval) => &interval.date_interval,
        Timepoint::WeeklyRecurrence(weekly) if !weekly.is_unlimited() => &weekly.date_interval,
        _ => return None,
    };
    if !interval.is_valid() {
        return None;
    }
    let (start, end) = (interval.start.to_naive()?, interval.end.to_naive()?);
    if end.signed_duration_since(start).num_days() > MAX_CONTAINER_SPAN_DAYS {
        return None;
    }
    Some(interval.clone())
}

fn peer_transmit(timepoint: &mut Timepoint, containers: &[DateInterval]) {
    let fill = |date: &mut Date| {
        if date.year.is_some() {
            return;
        }
        let Some(month) = date.month else { return };
        for container in containers {
            if container.contains_month_day(month, date.day) {
                // copy the year of the covering date
                if let Some(covering) = container
                    .dates()
                    .into_iter()
                    .find(|d| d.month() == month && d.day() == date.day)
                {
                    date.year = Some(covering.year());
                    return;
                }
            }
        }
    };
    match timepoint {
        Timepoint::Date(date) => fill(date),
        Timepoint::Datetime(datetime) => fill(&mut datetime.date),
        Timepoint::DateList(list) => list.dates.iter_mut().for_each(fill),
        Timepoint::DatetimeList(list) => {
            list.datetimes.iter_mut().for_each(|dt| fill(&mut dt.date));
        }
        _ => {}
    }
}

fn reference_transmit(timepoint: &mut Timepoint, reference: NaiveDate) {
    match timepoint {
        Timepoint::Date(date) => assign_single(date, reference),
        Timepoint::Datetime(datetime) => assign_single(&mut datetime.date, reference),
        Timepoint::DateList(list) => {
            for date in &mut list.dates {
                assign_single(date, reference);
            }
        }
        Timepoint::DatetimeList(list) => {
            for datetime in &mut list.datetimes {
                assign_single(&mut datetime.date, reference);
            }
        }
        Timepoint::DateInterval(interval) => assign_interval(interval, reference),
        Timepoint::DatetimeInterval(interval) => {
            assign_interval(&mut interval.date_interval, reference);
        }
        Timepoint::WeeklyRecurrence(weekly) => {
            if !weekly.is_unlimited() {
                assign_interval(&mut weekly.date_interval, reference);
            }
        }
        Timepoint::ContinuousDatetimeInterval(_) => {}
    }
}

fn assign_single(date: &mut Date, reference: NaiveDate) {
    if date.year.is_some() {
        return;
    }
    let Some(month) = date.month else { return };
    date.year = Some(partition_year(month, month, reference));
}

/// Both interval bounds take the partition year; when the span then
/// runs backwards across a year boundary, the start slides back one
/// year.
fn assign_interval(interval: &mut DateInterval, reference: NaiveDate) {
    if interval.start.year.is_some() && interval.end.year.is_some() {
        return;
    }
    let (Some(start_month), Some(end_month)) = (interval.start.month, interval.end.month) else {
        return;
    };
    let year = partition_year(start_month, end_month, reference);
    if interval.end.year.is_none() {
        interval.end.year = Some(year);
    }
    if interval.start.year.is_none() {
        interval.start.year = interval.end.year;
        let backwards = match (interval.start.to_naive(), interval.end.to_naive()) {
            (Some(start), Some(end)) => start > end,
            // month-level comparison when a bound is not a real date
            _ => start_month > end_month,
        };
        if backwards {
            interval.start.year = interval.end.year.map(|y| y - 1);
        }
    }
}

/// Ongoing or upcoming activities take the reference year (or the
/// next one when their end month is already past); recently passed
/// ones take the reference year (or the previous one when their start
/// month is ahead).
fn partition_year(start_month: u32, end_month: u32, reference: NaiveDate) -> i32 {
    let ref_month = reference.month();
    let ongoing = month_window_contains(start_month, end_month, ref_month);
    let upcoming = (ref_month + 12 - start_month) % 12 > UPCOMING_DELTA_MONTHS;
    if ongoing || upcoming {
        if ref_month <= end_month {
            reference.year()
        } else {
            reference.year() + 1
        }
    } else if ref_month >= end_month {
        reference.year()
    } else {
        reference.year() - 1
    }
}

/// Month-circle containment: the window may wrap over December.
fn month_window_contains(start: u32, end: u32, month: u32) -> bool {
    if start <= end {
        (start..=end).contains(&month)
    } else {
        month >= start || month <= end
    }
}
