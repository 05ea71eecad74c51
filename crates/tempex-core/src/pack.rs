//! Lossless packing of exported rules: near-duplicate single dates,
//! continuous intervals and weekly recurrences produced by separate
//! grammar hits merge into a minimal equivalent set.

use chrono::{Datelike, Duration, NaiveDate};
use log::debug;

use crate::models::ScheduleRule;

fn have_same_timings(a: &ScheduleRule, b: &ScheduleRule) -> bool {
    a.duration() == b.duration()
        && a.rule().byhour == b.rule().byhour
        && a.rule().byminute == b.rule().byminute
}

fn has_date_inbetween(single: &ScheduleRule, other: &ScheduleRule) -> bool {
    single.start_datetime() >= other.start_datetime()
        && (other.unlimited() || single.end_datetime() <= other.end_datetime())
}

fn has_weekday_included(single: &ScheduleRule, weekly: &ScheduleRule) -> bool {
    let day = single.start_datetime().date().weekday();
    !weekly.weekdays().is_empty() && weekly.weekdays().contains(&day)
}

fn is_a_day_before(single: &ScheduleRule, cont: &ScheduleRule) -> bool {
    let single_date = single.start_datetime().date();
    let cont_date = cont.start_datetime().date();
    cont_date
        .checked_sub_signed(Duration::days(1))
        .is_some_and(|previous| single_date == previous)
}

fn is_a_day_after(single: &ScheduleRule, cont: &ScheduleRule) -> bool {
    if !cont.bounded() {
        return false;
    }
    let single_date = single.start_datetime().date();
    let cont_date = cont.end_datetime().date();
    cont_date
        .checked_add_signed(Duration::days(1))
        .is_some_and(|next| single_date == next)
}

fn is_a_week_before(single: &ScheduleRule, weekly: &ScheduleRule) -> bool {
    let single_date = single.start_datetime().date();
    let weekly_date = weekly.start_datetime().date();
    single_date < weekly_date && single_date + Duration::days(7) > weekly_date
}

fn is_a_week_after(single: &ScheduleRule, weekly: &ScheduleRule) -> bool {
    if !weekly.bounded() {
        return false;
    }
    let single_date = single.start_datetime().date();
    let weekly_date = weekly.end_datetime().date();
    single_date > weekly_date && weekly_date + Duration::days(7) > single_date
}

fn are_overlapping(a: &ScheduleRule, b: &ScheduleRule) -> bool {
    match (a.unlimited(), b.unlimited()) {
        (true, true) => true,
        (true, false) => a.start_datetime() <= b.end_datetime(),
        (false, true) => b.start_datetime() <= a.end_datetime(),
        (false, false) => {
            if a.end_datetime() <= b.end_datetime() {
                a.end_datetime() >= b.start_datetime()
            } else {
                b.end_datetime() >= a.start_datetime()
            }
        }
    }
}

fn are_contiguous(a: &ScheduleRule, b: &ScheduleRule) -> bool {
    let day = Duration::days(1);
    a.end_datetime().date() + day == b.start_datetime().date()
        || b.end_datetime().date() + day == a.start_datetime().date()
}

fn first_of_weekly(weekly: &ScheduleRule, reference: NaiveDate) -> Option<NaiveDate> {
    weekly.first_occurrence_date(reference)
}

fn last_of_weekly(weekly: &ScheduleRule) -> Option<NaiveDate> {
    weekly.last_occurrence_date()
}

/// One recurrence continues the other: the last occurrence of the
/// bounded one is exactly one week before the first of the other.
fn are_close(a: &ScheduleRule, b: &ScheduleRule, reference: NaiveDate) -> bool {
    if a.bounded() {
        if let (Some(end_a), Some(start_b)) = (last_of_weekly(a), first_of_weekly(b, reference)) {
            return end_a + Duration::days(7) == start_b;
        }
    }
    if b.bounded() {
        if let (Some(end_b), Some(start_a)) = (last_of_weekly(b), first_of_weekly(a, reference)) {
            return end_b + Duration::days(7) == start_a;
        }
    }
    false
}

/// Compatible bounds: the first occurrences fall within 7 days of each
/// other.
fn have_compatible_bounds(a: &ScheduleRule, b: &ScheduleRule, reference: NaiveDate) -> bool {
    let (Some(first_a), Some(first_b)) = (first_of_weekly(a, reference), first_of_weekly(b, reference))
    else {
        return false;
    };
    (first_b.signed_duration_since(first_a)).num_days().abs() < 7
}

fn have_same_days(a: &ScheduleRule, b: &ScheduleRule) -> bool {
    a.weekdays() == b.weekdays()
}

/// Packs single dates into continuous/weekly rules, extends and merges
/// them until a fixpoint. All transformations preserve the generated
/// occurrence set.
pub struct RulePacker {
    singles: Vec<ScheduleRule>,
    continuous: Vec<ScheduleRule>,
    weekly: Vec<ScheduleRule>,
    others: Vec<ScheduleRule>,
    reference: NaiveDate,
}

impl RulePacker {
    pub fn new(rules: Vec<ScheduleRule>, reference: NaiveDate) -> Self {
        let mut packer = RulePacker {
            singles: Vec::new(),
            continuous: Vec::new(),
            weekly: Vec::new(),
            others: Vec::new(),
            reference,
        };
        for rule in rules {
            if rule.single_date() {
                packer.singles.push(rule);
            } else if rule.is_continuous() {
                packer.continuous.push(rule);
            } else if rule.is_recurring() {
                packer.weekly.push(rule);
            } else {
                packer.others.push(rule);
            }
        }
        packer
    }

    pub fn pack(mut self) -> Vec<ScheduleRule> {
        let before =
            self.singles.len() + self.continuous.len() + self.weekly.len() + self.others.len();
        self.include_singles_in_continuous();
        self.include_singles_in_weekly();
        self.extend_continuous_with_singles();
        self.extend_weekly_with_singles();
        self.merge_continuous();
        self.merge_weekly();
        let mut out = self.singles;
        out.extend(self.continuous);
        out.extend(self.weekly);
        out.extend(self.others);
        debug!("pack: {} rule(s) in, {} out", before, out.len());
        out
    }

    /// Drop single dates already generated by a continuous rule.
    fn include_singles_in_continuous(&mut self) {
        let continuous = &self.continuous;
        self.singles.retain(|single| {
            !continuous.iter().any(|cont| {
                has_date_inbetween(single, cont) && have_same_timings(single, cont)
            })
        });
    }

    /// Drop single dates already generated by a weekly recurrence.
    fn include_singles_in_weekly(&mut self) {
        let weekly = &self.weekly;
        self.singles.retain(|single| {
            !weekly.iter().any(|weekly_rule| {
                has_date_inbetween(single, weekly_rule)
                    && have_same_timings(single, weekly_rule)
                    && has_weekday_included(single, weekly_rule)
            })
        });
    }

    /// A single one day before or after a continuous rule with the
    /// same timings widens it.
    fn extend_continuous_with_singles(&mut self) {
        loop {
            let mut extended = None;
            'search: for (idx, single) in self.singles.iter().enumerate() {
                for cont in self.continuous.iter_mut() {
                    if cont.unlimited() || !have_same_timings(single, cont) {
                        continue;
                    }
                    if is_a_day_before(single, cont) {
                        cont.set_start_date(single.start_datetime().date());
                        extended = Some(idx);
                        break 'search;
                    }
                    if is_a_day_after(single, cont) {
                        cont.set_end_date(Some(single.end_datetime().date()));
                        extended = Some(idx);
                        break 'search;
                    }
                }
            }
            match extended {
                Some(idx) => {
                    self.singles.remove(idx);
                }
                None => break,
            }
        }
    }

    /// A single within a week of a weekly recurrence boundary, on one
    /// of its weekdays and with its timings, widens the recurrence.
    fn extend_weekly_with_singles(&mut self) {
        loop {
            let mut extended = None;
            'search: for (idx, single) in self.singles.iter().enumerate() {
                for weekly in self.weekly.iter_mut() {
                    if !have_same_timings(single, weekly)
                        || !has_weekday_included(single, weekly)
                    {
                        continue;
                    }
                    let single_date = single.start_datetime().date();
                    if is_a_week_before(single, weekly) {
                        weekly.set_start_date(single_date);
                        extended = Some(idx);
                        break 'search;
                    }
                    if is_a_week_after(single, weekly) {
                        weekly.set_end_date(Some(single_date));
                        extended = Some(idx);
                        break 'search;
                    }
                }
            }
            match extended {
                Some(idx) => {
                    self.singles.remove(idx);
                }
                None => break,
            }
        }
    }

    /// Union of overlapping or contiguous continuous rules with the
    /// same timings.
    fn merge_continuous(&mut self) {
        loop {
            let Some((keep, drop)) = self.find_mergeable_continuous() else {
                break;
            };
            let dropped = self.continuous.remove(drop);
            let target = &mut self.continuous[keep];
            let first = target.start_datetime().min(dropped.start_datetime());
            target.set_start_date(first.date());
            if target.unlimited() || dropped.unlimited() {
                target.set_end_date(None);
            } else {
                let last = target.end_datetime().max(dropped.end_datetime());
                target.set_end_date(Some(last.date()));
            }
        }
    }

    fn find_mergeable_continuous(&self) -> Option<(usize, usize)> {
        for (i, a) in self.continuous.iter().enumerate() {
            for (j, b) in self.continuous.iter().enumerate().skip(i + 1) {
                if have_same_timings(a, b) && (are_overlapping(a, b) || are_contiguous(a, b)) {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Union of weekly recurrences with the same timings whose bounds
    /// are compatible, or which continue each other on the same days.
    fn merge_weekly(&mut self) {
        loop {
            let Some((keep, drop)) = self.find_mergeable_weekly() else {
                break;
            };
            let reference = self.reference;
            let first_keep = first_of_weekly(&self.weekly[keep], reference);
            let first_drop = first_of_weekly(&self.weekly[drop], reference);
            let last_keep = last_of_weekly(&self.weekly[keep]);
            let last_drop = last_of_weekly(&self.weekly[drop]);
            let dropped = self.weekly.remove(drop);
            let target = &mut self.weekly[keep];
            target.add_weekdays(dropped.weekdays());
            if let (Some(a), Some(b)) = (first_keep, first_drop) {
                target.set_start_date(a.min(b));
            }
            if let (Some(a), Some(b)) = (last_keep, last_drop) {
                target.set_end_date(Some(a.max(b)));
            }
        }
    }

    fn find_mergeable_weekly(&self) -> Option<(usize, usize)> {
        for (i, a) in self.weekly.iter().enumerate() {
            for (j, b) in self.weekly.iter().enumerate().skip(i + 1) {
                if !have_same_timings(a, b) {
                    continue;
                }
                if have_compatible_bounds(a, b, self.reference)
                    || (have_same_days(a, b) && are_close(a, b, self.reference))
                {
                    return Some((i, j));
                }
            }
        }
        None
    }
}
