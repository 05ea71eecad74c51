//! Schedule-level helpers: splitting around a date and occurrence
//! count estimation.

use chrono::{Duration, NaiveDate};

use crate::export::DurationRRule;
use crate::models::ScheduleRule;

/// Split a schedule into past and future halves around `split_date`.
/// Rules straddling the date are duplicated with adjusted bounds: the
/// past copy ends the day before, the future copy starts on the date.
pub fn split_schedule(
    schedule: &[DurationRRule],
    split_date: NaiveDate,
) -> (Vec<DurationRRule>, Vec<DurationRRule>) {
    let mut past = Vec::new();
    let mut future = Vec::new();
    for record in schedule {
        let Ok(rule) = ScheduleRule::new(record.clone()) else {
            continue;
        };
        if rule.end_datetime().date() < split_date {
            past.push(record.clone());
        } else if rule.start_datetime().date() >= split_date {
            future.push(record.clone());
        } else {
            let mut future_half = rule.clone();
            future_half.set_start_date(split_date);
            future.push(future_half.into_record());

            let mut past_half = rule;
            if let Some(previous) = split_date.checked_sub_signed(Duration::days(1)) {
                past_half.set_end_date(Some(previous));
            }
            past.push(past_half.into_record());
        }
    }
    (past, future)
}

/// Fill `estimated_count` with a cheap occurrence count: 1 for a
/// single date, the day span for a continuous rule, weekdays times
/// weeks for a weekly recurrence.
pub fn estimate_count(record: &mut DurationRRule) {
    let Ok(rule) = ScheduleRule::new(record.clone()) else {
        return;
    };
    let count = if rule.single_date() {
        1
    } else if rule.is_continuous() {
        rule.end_datetime()
            .signed_duration_since(rule.start_datetime())
            .num_days()
    } else if rule.is_recurring() {
        let days = rule.weekdays().len() as i64;
        let span = rule
            .end_datetime()
            .signed_duration_since(rule.start_datetime())
            .num_days();
        days * (span / 7 + 1)
    } else {
        0
    };
    record.estimated_count = Some(count);
}
