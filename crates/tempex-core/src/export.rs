//! The `DurationRRule` wire record, the per-variant exporter and the
//! text-to-schedule pipeline.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::ParseError;
use crate::coherency::{CoherencyFilter, CoherencyOptions};
use crate::locale::Locale;
use crate::models::{IterBounds, ScheduleRule, unlimited_end, unlimited_start};
use crate::pack::RulePacker;
use crate::rrule::{Freq, Recurrence};
use crate::timepoint::{
    ALL_DAY, ContinuousDatetimeInterval, Date, DateInterval, Datetime, DatetimeInterval,
    Timepoint, WeeklyRecurrence, day_end,
};

/// The external wire format: an RRULE string paired with a duration in
/// minutes, plus optional flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationRRule {
    pub rrule: String,
    pub duration: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub continuous: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unlimited: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<(usize, usize)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_count: Option<i64>,
}

pub(crate) fn date_rule(date: &Date) -> Option<String> {
    let naive = date.to_naive()?;
    let mut rule = Recurrence::new(Freq::Daily, naive);
    rule.count = Some(1);
    rule.byhour = Some(0);
    rule.byminute = Some(0);
    Some(rule.to_string())
}

pub(crate) fn datetime_rule(datetime: &Datetime) -> Option<String> {
    let naive = datetime.date.to_naive()?;
    let mut rule = Recurrence::new(Freq::Daily, naive);
    rule.count = Some(1);
    rule.byhour = Some(datetime.start.hour);
    rule.byminute = Some(datetime.start.minute);
    Some(rule.to_string())
}

pub(crate) fn date_interval_rule(interval: &DateInterval) -> Option<String> {
    let start = interval.start.to_naive()?;
    let end = interval.end.to_naive()?;
    let mut rule = Recurrence::new(Freq::Daily, start);
    rule.byhour = Some(0);
    rule.byminute = Some(0);
    rule.interval = Some(1);
    rule.until = Some(end.and_time(NaiveTime::MIN));
    rule.until_is_date = true;
    Some(rule.to_string())
}

pub(crate) fn datetime_interval_rule(interval: &DatetimeInterval) -> Option<String> {
    let start = interval.date_interval.start.to_naive()?;
    let end = interval.date_interval.end.to_naive()?;
    let mut rule = Recurrence::new(Freq::Daily, start);
    rule.byhour = Some(interval.time_interval.start.hour);
    rule.byminute = Some(interval.time_interval.start.minute);
    rule.interval = Some(1);
    rule.until = Some(end.and_time(day_end()));
    rule.until_is_date = false;
    Some(rule.to_string())
}

pub(crate) fn continuous_rule(interval: &ContinuousDatetimeInterval) -> Option<String> {
    let start = interval.start_date.to_naive()?;
    let end = interval.end_date.to_naive()?;
    let mut rule = Recurrence::new(Freq::Daily, start);
    rule.byhour = Some(interval.start_time.hour);
    rule.byminute = Some(interval.start_time.minute);
    rule.interval = Some(1);
    rule.until = Some(end.and_time(day_end()));
    rule.until_is_date = false;
    Some(rule.to_string())
}

pub(crate) fn weekly_recurrence_rule(weekly: &WeeklyRecurrence) -> Option<String> {
    let (start, end) = if weekly.is_unlimited() {
        (unlimited_start(), unlimited_end())
    } else {
        (
            weekly.date_interval.start.to_naive()?,
            weekly.date_interval.end.to_naive()?,
        )
    };
    let mut rule = Recurrence::new(Freq::Weekly, start);
    rule.byday = weekly.weekdays.days.clone();
    rule.byhour = Some(weekly.time_interval.start.hour);
    rule.byminute = Some(weekly.time_interval.start.minute);
    rule.until = Some(end.and_time(day_end()));
    rule.until_is_date = false;
    Some(rule.to_string())
}

/// Export one timepoint to its wire records. Lists flatten to one
/// record per element; partial timepoints yield nothing.
pub fn export_timepoint(timepoint: &Timepoint) -> Vec<DurationRRule> {
    match timepoint {
        Timepoint::Date(date) => date_rule(date)
            .map(|rrule| DurationRRule {
                rrule,
                duration: ALL_DAY,
                ..DurationRRule::default()
            })
            .into_iter()
            .collect(),
        Timepoint::Datetime(datetime) => datetime_rule(datetime)
            .map(|rrule| DurationRRule {
                rrule,
                duration: duration_minutes(datetime),
                ..DurationRRule::default()
            })
            .into_iter()
            .collect(),
        Timepoint::DateList(list) => list
            .dates
            .iter()
            .filter_map(|date| {
                date_rule(date).map(|rrule| DurationRRule {
                    rrule,
                    duration: ALL_DAY,
                    ..DurationRRule::default()
                })
            })
            .collect(),
        Timepoint::DatetimeList(list) => list
            .datetimes
            .iter()
            .filter_map(|datetime| {
                datetime_rule(datetime).map(|rrule| DurationRRule {
                    rrule,
                    duration: duration_minutes(datetime),
                    ..DurationRRule::default()
                })
            })
            .collect(),
        Timepoint::DateInterval(interval) => date_interval_rule(interval)
            .map(|rrule| DurationRRule {
                rrule,
                duration: ALL_DAY,
                excluded: interval.excluded.clone(),
                ..DurationRRule::default()
            })
            .into_iter()
            .collect(),
        Timepoint::DatetimeInterval(interval) => datetime_interval_rule(interval)
            .map(|rrule| DurationRRule {
                rrule,
                duration: interval.time_interval.duration_minutes(),
                excluded: interval.excluded.clone(),
                ..DurationRRule::default()
            })
            .into_iter()
            .collect(),
        Timepoint::ContinuousDatetimeInterval(interval) => continuous_rule(interval)
            .map(|rrule| DurationRRule {
                rrule,
                duration: interval.duration_minutes(),
                continuous: true,
                ..DurationRRule::default()
            })
            .into_iter()
            .collect(),
        Timepoint::WeeklyRecurrence(weekly) => weekly_recurrence_rule(weekly)
            .map(|rrule| DurationRRule {
                rrule,
                duration: weekly.time_interval.duration_minutes(),
                unlimited: weekly.is_unlimited(),
                excluded: weekly.excluded.clone(),
                ..DurationRRule::default()
            })
            .into_iter()
            .collect(),
    }
}

fn duration_minutes(datetime: &Datetime) -> i64 {
    (datetime.end.total_minutes() - datetime.start.total_minutes()).max(0)
}

/// Options of the text-to-schedule pipeline.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Drop invalid timepoints before exporting.
    pub valid_only: bool,
    /// Drop timepoints entirely located before the reference date.
    pub only_future: bool,
    /// Extraction reference date; defaults to today. Also drives year
    /// inheritance and 2-digit year resolution.
    pub reference: Option<NaiveDate>,
    pub coherency: CoherencyOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            valid_only: true,
            only_future: false,
            reference: None,
            coherency: CoherencyOptions::default(),
        }
    }
}

/// Extract and normalize the schedule of a text: parse, export each
/// timepoint, pack the resulting rules and filter them for coherency.
pub fn export(text: &str, lang: &str, options: &ExportOptions) -> Result<Vec<DurationRRule>, ParseError> {
    let locale =
        Locale::from_code(lang).ok_or_else(|| ParseError::UnsupportedLocale(lang.to_owned()))?;
    let reference = options
        .reference
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let mut timepoints = crate::parse_spanned(text, locale, Some(reference));
    if options.valid_only {
        timepoints.retain(|(tp, _)| tp.is_valid());
    }
    if options.only_future {
        timepoints.retain(|(tp, _)| tp.is_future(reference));
    }

    let mut rules: Vec<ScheduleRule> = Vec::new();
    for (timepoint, span) in &timepoints {
        for mut record in export_timepoint(timepoint) {
            record.span = Some(*span);
            if let Ok(rule) = ScheduleRule::new(record) {
                rules.push(rule);
            }
        }
    }
    debug!("export: {} rule(s) before packing", rules.len());

    let rules = RulePacker::new(rules, reference).pack();
    let rules = CoherencyFilter::new(options.coherency).apply(rules);
    debug!("export: {} rule(s) after coherency", rules.len());

    // deduplicate, keeping first-seen order
    let mut out: Vec<DurationRRule> = Vec::new();
    for rule in rules {
        let record = rule.into_record();
        if !out
            .iter()
            .any(|seen| seen.rrule == record.rrule && seen.duration == record.duration)
        {
            out.push(record);
        }
    }
    Ok(out)
}

/// Discretization grain for [`discretize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grain {
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

fn truncate(dt: NaiveDateTime, grain: Grain) -> NaiveDateTime {
    let date = dt.date();
    match grain {
        Grain::Minute => date
            .and_hms_opt(dt.hour(), dt.minute(), 0)
            .unwrap_or_else(|| date.and_time(NaiveTime::MIN)),
        Grain::Hour => date
            .and_hms_opt(dt.hour(), 0, 0)
            .unwrap_or_else(|| date.and_time(NaiveTime::MIN)),
        Grain::Day => date.and_time(NaiveTime::MIN),
        Grain::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
            .unwrap_or(date)
            .and_time(NaiveTime::MIN),
        Grain::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)
            .unwrap_or(date)
            .and_time(NaiveTime::MIN),
    }
}

/// Expand a schedule into the sorted set of its occurrence datetimes,
/// truncated at the requested grain. Unbounded rules expand within the
/// virtual window of `bounds`.
pub fn discretize(schedule: &[DurationRRule], grain: Grain, bounds: IterBounds) -> Vec<NaiveDateTime> {
    let mut out: Vec<NaiveDateTime> = schedule
        .iter()
        .filter_map(|record| ScheduleRule::new(record.clone()).ok())
        .flat_map(|rule| {
            rule.occurrences(bounds)
                .map(|dt| truncate(dt, grain))
                .collect::<Vec<_>>()
        })
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Earliest start over the schedule.
pub fn schedule_first_date(schedule: &[DurationRRule]) -> Option<NaiveDateTime> {
    schedule
        .iter()
        .filter_map(|record| ScheduleRule::new(record.clone()).ok())
        .map(|rule| rule.start_datetime())
        .min()
}

/// Latest end over the schedule.
pub fn schedule_last_date(schedule: &[DurationRRule]) -> Option<NaiveDateTime> {
    schedule
        .iter()
        .filter_map(|record| ScheduleRule::new(record.clone()).ok())
        .map(|rule| rule.end_datetime())
        .max()
}

/// Next occurrence strictly after the reference datetime.
pub fn next_occurrence(
    schedule: &[DurationRRule],
    reference: NaiveDateTime,
) -> Option<NaiveDateTime> {
    schedule
        .iter()
        .filter_map(|record| ScheduleRule::new(record.clone()).ok())
        .filter_map(|rule| {
            rule.occurrences(IterBounds {
                lower: Some(reference),
                reference: Some(reference.date()),
                ..IterBounds::default()
            })
            .find(|dt| *dt > reference)
        })
        .min()
}

/// Expand one wire record into its occurrence datetimes.
pub fn iterate(
    record: &DurationRRule,
    bounds: IterBounds,
) -> Result<Vec<NaiveDateTime>, ParseError> {
    let rule = ScheduleRule::new(record.clone())?;
    Ok(rule.occurrences(bounds).collect())
}
