//! Cross-source fusion: schedules extracted from several texts about
//! the same event tend to split the information (one source gives the
//! date range, another the weekday and time). This pass absorbs
//! overlapping dated rules into each other and composes a lone dated
//! rule with the weekday/time-only rules around it.

use log::debug;

use crate::export::DurationRRule;
use crate::models::ScheduleRule;
use crate::rrule::Freq;

fn has_day(rule: &ScheduleRule) -> bool {
    rule.rule().freq == Freq::Weekly
        && !rule.weekdays().is_empty()
        && rule.weekdays().len() != 7
}

fn has_time(rule: &ScheduleRule) -> bool {
    rule.rule().byhour.unwrap_or(0) != 0 || rule.rule().byminute.unwrap_or(0) != 0
}

fn has_date(rule: &ScheduleRule) -> bool {
    rule.rule().count == Some(1)
}

/// Bounded to less than a year: the rule describes an actual lapse of
/// time rather than an open recurrence.
fn has_timelapse(rule: &ScheduleRule) -> bool {
    let start = rule.start_datetime();
    let end = rule.end_datetime();
    end < start + chrono::Duration::days(365) && end >= start - chrono::Duration::days(1)
}

fn is_dated(rule: &ScheduleRule) -> bool {
    has_date(rule) || has_timelapse(rule)
}

fn is_same_time(a: &ScheduleRule, b: &ScheduleRule) -> bool {
    has_time(a)
        && has_time(b)
        && a.rule().byhour == b.rule().byhour
        && a.rule().byminute == b.rule().byminute
}

fn time_compatible(a: &ScheduleRule, b: &ScheduleRule) -> bool {
    !has_time(a) || !has_time(b) || is_same_time(a, b)
}

fn day_compatible(a: &ScheduleRule, b: &ScheduleRule) -> bool {
    !has_day(a) || !has_day(b) || a.weekdays() == b.weekdays()
}

fn take_time_of(target: &mut ScheduleRule, source: &ScheduleRule) {
    if !has_time(target) && has_time(source) {
        target.set_duration(source.duration());
        target.set_time(
            source.rule().byhour.unwrap_or(0),
            source.rule().byminute.unwrap_or(0),
        );
    }
}

fn take_weekdays_of(target: &mut ScheduleRule, source: &ScheduleRule) {
    if has_day(source) && time_compatible(target, source) {
        target.add_weekdays(source.weekdays());
        target.set_frequency(Freq::Weekly);
        target.remove_interval();
    }
}

/// Try to absorb `other` into `target` without losing information.
fn absorb(target: &mut ScheduleRule, other: &ScheduleRule) -> bool {
    if !time_compatible(target, other) || !day_compatible(target, other) {
        return false;
    }
    let (t_start, t_end) = (target.start_datetime(), target.end_datetime());
    let (o_start, o_end) = (other.start_datetime(), other.end_datetime());

    let same_lapse = t_start == o_start && t_end == o_end;
    let other_inside = t_start <= o_start && o_end <= t_end;
    let target_inside = o_start <= t_start && t_end <= o_end;
    let day = chrono::Duration::days(1);
    let week = chrono::Duration::days(8);
    let other_follows = t_end <= o_start
        && (o_start - t_end <= day || (target.weekdays() == other.weekdays() && o_start - t_end <= week));
    let other_precedes = o_end <= t_start
        && (t_start - o_end <= day || (target.weekdays() == other.weekdays() && t_start - o_end <= week));
    let overlaps_end = t_start < o_start && o_start < t_end && t_end < o_end;
    let overlaps_start = o_start < t_start && t_start < o_end && o_end < t_end;

    let mut absorbed = true;
    if same_lapse || other_inside {
        // nothing to widen
    } else if target_inside {
        target.set_start_date(o_start.date());
        target.set_end_date(Some(o_end.date()));
    } else if other_follows || overlaps_end {
        target.set_end_date(Some(o_end.date()));
    } else if other_precedes || overlaps_start {
        target.set_start_date(o_start.date());
    } else {
        absorbed = false;
    }

    if absorbed {
        take_weekdays_of(target, other);
        take_time_of(target, other);
    }
    absorbed
}

/// Fuse the duration rrules of several sources into a more cohesive
/// set.
pub fn fuse(schedules: Vec<DurationRRule>) -> Vec<DurationRRule> {
    let mut rules: Vec<ScheduleRule> = schedules
        .into_iter()
        .filter_map(|record| ScheduleRule::new(record).ok())
        .collect();
    let before = rules.len();

    // drop exact duplicates
    let mut unique: Vec<ScheduleRule> = Vec::new();
    for rule in rules.drain(..) {
        if !unique.contains(&rule) {
            unique.push(rule);
        }
    }

    let (dated, floating): (Vec<_>, Vec<_>) = unique.into_iter().partition(is_dated);

    // absorb dated rules into each other
    let mut merged: Vec<ScheduleRule> = Vec::new();
    'outer: for rule in dated {
        for kept in merged.iter_mut() {
            if absorb(kept, &rule) {
                continue 'outer;
            }
        }
        merged.push(rule);
    }

    let out = if merged.len() == 1 && !floating.is_empty() {
        compose(merged.remove(0), floating)
    } else {
        merged.extend(floating);
        merged
    };
    debug!("cohesion: {} rule(s) in, {} out", before, out.len());

    let mut records: Vec<DurationRRule> = Vec::new();
    for mut rule in out {
        finalize(&mut rule);
        let record = rule.into_record();
        if !records
            .iter()
            .any(|seen| seen.rrule == record.rrule && seen.duration == record.duration)
        {
            records.push(record);
        }
    }
    records
}

/// Compose the lone dated root with the weekday-only / time-only /
/// weekday-and-time rules.
fn compose(root: ScheduleRule, floating: Vec<ScheduleRule>) -> Vec<ScheduleRule> {
    let mut day_only: Vec<&ScheduleRule> = Vec::new();
    let mut time_only: Vec<&ScheduleRule> = Vec::new();
    let mut day_and_time: Vec<ScheduleRule> = Vec::new();
    let mut untouched: Vec<ScheduleRule> = Vec::new();
    for rule in &floating {
        match (has_day(rule), has_time(rule)) {
            (true, true) => day_and_time.push(rule.clone()),
            (true, false) => day_only.push(rule),
            (false, true) => time_only.push(rule),
            (false, false) => untouched.push(rule.clone()),
        }
    }

    let mut composed: Vec<ScheduleRule> = day_and_time;
    if !day_only.is_empty() && !time_only.is_empty() {
        for &days in &day_only {
            for &times in &time_only {
                let mut combined = days.clone();
                take_time_of(&mut combined, times);
                composed.push(combined);
            }
        }
    } else {
        composed.extend(day_only.into_iter().cloned());
        composed.extend(time_only.into_iter().cloned());
    }

    if composed.is_empty() {
        let mut out = vec![root];
        out.extend(untouched);
        return out;
    }

    // same time, weekday union
    let mut reduced: Vec<ScheduleRule> = Vec::new();
    'outer: for rule in composed {
        for kept in reduced.iter_mut() {
            if is_same_time(kept, &rule) || (!has_time(kept) && !has_time(&rule)) {
                take_weekdays_of(kept, &rule);
                continue 'outer;
            }
        }
        reduced.push(rule);
    }

    let mut out = Vec::new();
    if has_time(&root) && has_day(&root) {
        out.push(root.clone());
    }
    for rule in &reduced {
        let mut variant = root.clone();
        take_time_of(&mut variant, rule);
        take_weekdays_of(&mut variant, rule);
        out.push(variant);
    }
    out.extend(untouched);
    out
}

/// Line up the UNTIL time with the start time of fused rules, so the
/// bound still includes the last occurrence.
fn finalize(rule: &mut ScheduleRule) {
    if !has_time(rule) {
        return;
    }
    let time = rule.rule().start_time();
    if let Some(until) = rule.rule().until {
        if until.time() < time {
            rule.set_until(until.date().and_time(time));
        }
    }
}
