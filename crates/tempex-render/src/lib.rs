//! Human-readable rendering of tempex schedules. The locale is always
//! passed explicitly; month and weekday spellings come from the core
//! calendar tables.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use tempex_core::locale::Locale;
use tempex_core::models::ScheduleRule;
use tempex_core::rrule::Recurrence;
use tempex_core::{DurationRRule, next_occurrence};

/// Render a whole schedule, one clause per rule, joined by commas.
pub fn render_schedule(schedule: &[DurationRRule], locale: Locale) -> String {
    let clauses: Vec<String> = schedule
        .iter()
        .filter_map(|record| render_rule(record, locale))
        .collect();
    clauses.join(", ")
}

/// Render a single wire record. Returns `None` on malformed input.
pub fn render_rule(record: &DurationRRule, locale: Locale) -> Option<String> {
    let rule = ScheduleRule::new(record.clone()).ok()?;
    let mut out = if rule.is_continuous() {
        render_continuous(&rule, locale)?
    } else if rule.is_recurring() || !rule.weekdays().is_empty() {
        render_weekly(&rule, locale)?
    } else if rule.single_date() {
        render_single(&rule, locale)?
    } else {
        render_interval(&rule, locale)?
    };
    if let Some(exclusion) = render_exclusions(record, locale) {
        out.push_str(&exclusion);
    }
    Some(out)
}

/// Render the next occurrence after `reference`, like
/// "le 4 mars 2015 à 18h30".
pub fn render_next_occurrence(
    schedule: &[DurationRRule],
    reference: NaiveDateTime,
    locale: Locale,
) -> Option<String> {
    let next = next_occurrence(schedule, reference)?;
    let date = format_date(next.date(), locale);
    if next.time() == NaiveTime::MIN {
        return Some(date);
    }
    Some(match locale {
        Locale::Fr => format!("{date} à {}", format_time(next.time(), locale)),
        Locale::En => format!("{date} at {}", format_time(next.time(), locale)),
    })
}

fn render_single(rule: &ScheduleRule, locale: Locale) -> Option<String> {
    let date = format_date(rule.start_datetime().date(), locale);
    Some(format!("{}{}", date, format_timings(rule, locale)))
}

fn render_interval(rule: &ScheduleRule, locale: Locale) -> Option<String> {
    let (start, end) = rule.date_interval();
    let end = end?;
    Some(format!(
        "{}{}",
        format_date_span(start, end, locale),
        format_timings(rule, locale)
    ))
}

fn render_continuous(rule: &ScheduleRule, locale: Locale) -> Option<String> {
    let (start, end) = rule.date_interval();
    let end = end?;
    let (start_time, end_time) = rule.time_interval();
    let (start_date, end_date) = (
        format_date_no_article(start, locale),
        format_date_no_article(end, locale),
    );
    Some(match locale {
        Locale::Fr => format!(
            "du {start_date} à {} au {end_date} à {}",
            format_time(start_time, locale),
            format_time(end_time, locale)
        ),
        Locale::En => format!(
            "from {start_date} at {} to {end_date} at {}",
            format_time(start_time, locale),
            format_time(end_time, locale)
        ),
    })
}

fn render_weekly(rule: &ScheduleRule, locale: Locale) -> Option<String> {
    let days = format_weekdays(rule.weekdays(), locale);
    if rule.unlimited() {
        return Some(format!("{days}{}", format_timings(rule, locale)));
    }
    let (start, end) = rule.date_interval();
    let end = end?;
    let span = format_date_span(start, end, locale);
    Some(format!("{days}, {span}{}", format_timings(rule, locale)))
}

fn render_exclusions(record: &DurationRRule, locale: Locale) -> Option<String> {
    if record.excluded.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    for raw in &record.excluded {
        let Ok(rule) = Recurrence::parse(raw) else {
            continue;
        };
        if rule.byday.is_empty() {
            parts.push(format_date(rule.dtstart.date(), locale));
        } else {
            parts.push(format_weekdays(&rule.byday, locale));
        }
    }
    if parts.is_empty() {
        return None;
    }
    let keyword = match locale {
        Locale::Fr => "sauf",
        Locale::En => "except",
    };
    Some(format!(", {keyword} {}", parts.join(", ")))
}

/// Time window suffix: nothing for all-day rules, " à 18h" for a
/// single time, " de 16h à 18h" for a window.
fn format_timings(rule: &ScheduleRule, locale: Locale) -> String {
    if !rule.has_timings() {
        return String::new();
    }
    let (start, end) = rule.time_interval();
    match locale {
        Locale::Fr => {
            if start == end || rule.duration() == 0 {
                format!(" à {}", format_time(start, locale))
            } else {
                format!(
                    " de {} à {}",
                    format_time(start, locale),
                    format_time(end, locale)
                )
            }
        }
        Locale::En => {
            if start == end || rule.duration() == 0 {
                format!(" at {}", format_time(start, locale))
            } else {
                format!(
                    " from {} to {}",
                    format_time(start, locale),
                    format_time(end, locale)
                )
            }
        }
    }
}

fn month_name(month: u32, locale: Locale) -> String {
    let name = locale
        .calendar()
        .month_names
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("");
    match locale {
        Locale::Fr => name.to_owned(),
        Locale::En => capitalize(name),
    }
}

fn weekday_name(day: Weekday, locale: Locale) -> String {
    let name = locale.calendar().weekday_names[day.num_days_from_monday() as usize];
    match locale {
        Locale::Fr => name.to_owned(),
        Locale::En => capitalize(name),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn format_day_number(day: u32, locale: Locale) -> String {
    match locale {
        Locale::Fr if day == 1 => "1er".to_owned(),
        _ => day.to_string(),
    }
}

fn format_date_no_article(date: NaiveDate, locale: Locale) -> String {
    match locale {
        Locale::Fr => format!(
            "{} {} {}",
            format_day_number(date.day(), locale),
            month_name(date.month(), locale),
            date.year()
        ),
        Locale::En => format!(
            "{} {}, {}",
            month_name(date.month(), locale),
            date.day(),
            date.year()
        ),
    }
}

fn format_date(date: NaiveDate, locale: Locale) -> String {
    match locale {
        Locale::Fr => format!("le {}", format_date_no_article(date, locale)),
        Locale::En => format!("on {}", format_date_no_article(date, locale)),
    }
}

/// Date span, compressed when the bounds share their month or year:
/// "du 5 au 29 mars 2015", "du 5 septembre au 7 octobre 2015".
fn format_date_span(start: NaiveDate, end: NaiveDate, locale: Locale) -> String {
    match locale {
        Locale::Fr => {
            let start_day = format_day_number(start.day(), locale);
            if start.year() == end.year() && start.month() == end.month() {
                format!(
                    "du {start_day} au {} {} {}",
                    format_day_number(end.day(), locale),
                    month_name(end.month(), locale),
                    end.year()
                )
            } else if start.year() == end.year() {
                format!(
                    "du {start_day} {} au {} {} {}",
                    month_name(start.month(), locale),
                    format_day_number(end.day(), locale),
                    month_name(end.month(), locale),
                    end.year()
                )
            } else {
                format!(
                    "du {} au {}",
                    format_date_no_article(start, locale),
                    format_date_no_article(end, locale)
                )
            }
        }
        Locale::En => format!(
            "from {} to {}",
            format_date_no_article(start, locale),
            format_date_no_article(end, locale)
        ),
    }
}

fn format_weekdays(days: &[Weekday], locale: Locale) -> String {
    let all_week = days.len() == 7;
    if all_week {
        return match locale {
            Locale::Fr => "tous les jours".to_owned(),
            Locale::En => "every day".to_owned(),
        };
    }
    // a run of consecutive weekdays reads as an interval
    if days.len() >= 3 && consecutive(days) {
        let (first, last) = (days[0], days[days.len() - 1]);
        return match locale {
            Locale::Fr => format!(
                "du {} au {}",
                weekday_name(first, locale),
                weekday_name(last, locale)
            ),
            Locale::En => format!(
                "{} to {}",
                weekday_name(first, locale),
                weekday_name(last, locale)
            ),
        };
    }
    let names: Vec<String> = days.iter().map(|d| weekday_name(*d, locale)).collect();
    let list = join_with_and(&names, locale);
    match locale {
        Locale::Fr => format!("le {list}"),
        Locale::En => format!("on {list}"),
    }
}

fn consecutive(days: &[Weekday]) -> bool {
    days.windows(2).all(|pair| {
        pair[1].num_days_from_monday() == pair[0].num_days_from_monday() + 1
    })
}

fn join_with_and(parts: &[String], locale: Locale) -> String {
    let and = match locale {
        Locale::Fr => "et",
        Locale::En => "and",
    };
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => format!(
            "{} {and} {}",
            parts[..parts.len() - 1].join(", "),
            parts[parts.len() - 1]
        ),
    }
}

fn format_time(time: NaiveTime, locale: Locale) -> String {
    match locale {
        Locale::Fr => {
            if time.minute() == 0 {
                format!("{}h", time.hour())
            } else {
                format!("{}h{:02}", time.hour(), time.minute())
            }
        }
        Locale::En => {
            let (hour, meridiem) = match time.hour() {
                0 => (12, "am"),
                h if h < 12 => (h, "am"),
                12 => (12, "pm"),
                h => (h - 12, "pm"),
            };
            if time.minute() == 0 {
                format!("{hour} {meridiem}")
            } else {
                format!("{hour}:{:02} {meridiem}", time.minute())
            }
        }
    }
}
