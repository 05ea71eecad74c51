//! French grammar: recursive-descent productions over the lexemes of a
//! probed window.

use chrono::Datelike;

use super::{Cursor, GrammarContext, Kw, LexKind, Match, Tag, scan_production};
use crate::timepoint::{
    ContinuousDatetimeInterval, Date, DateInterval, DateList, Datetime, DatetimeInterval,
    DatetimeList, Time, TimeInterval, Timepoint, Weekdays, WeeklyRecurrence, weekday_from_index,
};

pub(crate) fn scan(lexemes: &[super::Lexeme], ctx: &GrammarContext, out: &mut Vec<Match>) {
    scan_production(lexemes, ctx, Tag::WeeklyRecurrence, out, weekly_recurrence);
    scan_production(
        lexemes,
        ctx,
        Tag::WeeklyRecurrence,
        out,
        multiple_weekly_recurrence,
    );
    scan_production(lexemes, ctx, Tag::Datetime, out, datetime_pattern);
    scan_production(lexemes, ctx, Tag::DatetimeList, out, datetime_list);
    scan_production(lexemes, ctx, Tag::DatetimeInterval, out, datetime_interval);
    scan_production(
        lexemes,
        ctx,
        Tag::ContinuousDatetimeInterval,
        out,
        continuous_datetime_interval,
    );
    scan_production(lexemes, ctx, Tag::Date, out, date_production);
    scan_production(lexemes, ctx, Tag::DateList, out, date_list_production);
    scan_production(lexemes, ctx, Tag::DateInterval, out, date_interval_production);
    scan_production(lexemes, ctx, Tag::Exclusion, out, exclusion_production);
}

/// Resolve a 2-digit year against the reference date: the century
/// putting the year less than 15 years in the future wins, otherwise
/// the previous century (15 years exactly flips back).
pub(crate) fn normalize_2digit_year(value: u32, ctx: &GrammarContext) -> i32 {
    let reference_year = ctx.reference.year();
    let candidate = (reference_year / 100) * 100 + value as i32;
    if candidate >= reference_year + 15 {
        candidate - 100
    } else {
        candidate
    }
}

fn weekday(c: &mut Cursor) -> Option<u8> {
    if let Some(lexeme) = c.peek() {
        if let LexKind::Word(info) = lexeme.kind {
            if let Some(day) = info.weekday {
                c.bump();
                return Some(day);
            }
        }
    }
    None
}

fn month_name(c: &mut Cursor) -> Option<u32> {
    if let Some(lexeme) = c.peek() {
        if let LexKind::Word(info) = lexeme.kind {
            // a word can read both as a short weekday and a short
            // month ("mar"); position decides, and here we want the
            // month reading
            if let Some(month) = info.month {
                c.bump();
                return Some(month);
            }
        }
    }
    None
}

/// A day number between 1 and 31, at most two digits, not a price.
fn day_number(c: &mut Cursor) -> Option<u32> {
    c.attempt(|c| {
        let lexeme = c.peek()?;
        let LexKind::Number { value, digits, .. } = lexeme.kind else {
            return None;
        };
        if !(1..=31).contains(&value) || digits > 2 {
            return None;
        }
        c.bump();
        if matches!(c.peek().map(|l| l.kind), Some(LexKind::Currency)) {
            return None;
        }
        Some(value)
    })
}

fn year_4digit(c: &mut Cursor) -> Option<i32> {
    let lexeme = c.peek()?;
    let LexKind::Number { value, digits, .. } = lexeme.kind else {
        return None;
    };
    if digits == 4 && (1000..=2999).contains(&value) {
        c.bump();
        return Some(value as i32);
    }
    None
}

fn numeric_year(c: &mut Cursor, ctx: &GrammarContext) -> Option<i32> {
    if let Some(year) = year_4digit(c) {
        return Some(year);
    }
    let lexeme = c.peek()?;
    let LexKind::Number { value, digits, .. } = lexeme.kind else {
        return None;
    };
    if digits == 2 {
        c.bump();
        return Some(normalize_2digit_year(value, ctx));
    }
    None
}

fn numeric_month(c: &mut Cursor) -> Option<u32> {
    let lexeme = c.peek()?;
    let LexKind::Number { value, digits, .. } = lexeme.kind else {
        return None;
    };
    if (1..=12).contains(&value) && digits <= 2 {
        c.bump();
        return Some(value);
    }
    None
}

fn date_sep(c: &mut Cursor) -> bool {
    c.eat(|k| matches!(k, LexKind::Slash | LexKind::Dash | LexKind::Dot))
}

/// Numeric date, French day-first or year-first: 05/10/2012, 05/03,
/// 2014/5/12.
fn numeric_date(c: &mut Cursor, ctx: &GrammarContext) -> Option<Date> {
    let day_first = c.attempt(|c| {
        let day = day_number(c)?;
        if !date_sep(c) {
            return None;
        }
        let month = numeric_month(c)?;
        let year = c.attempt(|c| {
            if !date_sep(c) {
                return None;
            }
            numeric_year(c, ctx)
        });
        Some(Date::new(year, Some(month), day))
    });
    if day_first.is_some() {
        return day_first;
    }
    c.attempt(|c| {
        let year = year_4digit(c)?;
        if !date_sep(c) {
            return None;
        }
        let month = numeric_month(c)?;
        if !date_sep(c) {
            return None;
        }
        let day = day_number(c)?;
        Some(Date::new(Some(year), Some(month), day))
    })
}

/// Full date: `[le] [weekday] 5 mars [2015]` or a numeric shape.
fn date_pattern(c: &mut Cursor, ctx: &GrammarContext) -> Option<Date> {
    c.attempt(|c| {
        c.eat_kw(Kw::Le);
        weekday(c);
        let literal = c.attempt(|c| {
            let day = day_number(c)?;
            let month = month_name(c)?;
            let year = year_4digit(c);
            Some(Date::new(year, Some(month), day))
        });
        literal.or_else(|| numeric_date(c, ctx))
    })
}

fn time_lexeme(c: &mut Cursor) -> Option<Time> {
    let lexeme = c.peek()?;
    let LexKind::Time { hour, minute } = lexeme.kind else {
        return None;
    };
    c.bump();
    Some(Time::new(hour, minute.unwrap_or(0)))
}

/// `[à] 15h30`
fn time(c: &mut Cursor) -> Option<Time> {
    c.attempt(|c| {
        c.eat_kw(Kw::A);
        time_lexeme(c)
    })
}

/// `de 15h30 à 18h`, `entre 15h et 16h`, `15h30 - 17h`, or a single
/// time. A bare hour is accepted as start only when an explicit end
/// time follows ("de 15 à 18h").
fn time_interval(c: &mut Cursor) -> Option<TimeInterval> {
    c.attempt(|c| {
        // prefix: de | entre | à | a | et de | et à
        c.attempt(|c| {
            if !c.eat_kw(Kw::Et) {
                return None;
            }
            if c.eat_kw(Kw::De) || c.eat_kw(Kw::A) {
                Some(())
            } else {
                None
            }
        })
        .or_else(|| {
            if c.eat_kw(Kw::De) || c.eat_kw(Kw::Entre) || c.eat_kw(Kw::A) {
                Some(())
            } else {
                None
            }
        });

        let start = match time_lexeme(c) {
            Some(start) => start,
            None => {
                // bare hour start, only with an explicit suffix + end
                let bare = c.attempt(|c| {
                    let lexeme = c.peek()?;
                    let LexKind::Number {
                        value,
                        digits,
                        ordinal: false,
                    } = lexeme.kind
                    else {
                        return None;
                    };
                    if value > 24 || digits > 2 {
                        return None;
                    }
                    c.bump();
                    let suffix_end = c.attempt(|c| {
                        if !(c.eat(|k| matches!(k, LexKind::Dash))
                            || c.eat_kw(Kw::A)
                            || c.eat_kw(Kw::Et))
                        {
                            return None;
                        }
                        time(c)
                    })?;
                    Some(TimeInterval::new(Time::new(value, 0), suffix_end))
                });
                return bare;
            }
        };

        let end = c.attempt(|c| {
            if !(c.eat(|k| matches!(k, LexKind::Dash)) || c.eat_kw(Kw::A) || c.eat_kw(Kw::Et)) {
                return None;
            }
            time(c)
        });
        Some(TimeInterval::new(start, end.unwrap_or(start)))
    })
}

/// One or more time intervals: `à 18h, 19h30, et de 22h à 23h30`.
fn time_pattern(c: &mut Cursor) -> Option<Vec<TimeInterval>> {
    let first = time_interval(c)?;
    let mut intervals = vec![first];
    loop {
        let next = c.attempt(|c| {
            while c.eat(|k| {
                matches!(
                    k,
                    LexKind::Comma | LexKind::Amp | LexKind::Semicolon | LexKind::Slash
                )
            }) || c.eat_kw(Kw::Et)
                || c.eat_kw(Kw::Ou)
            {}
            time_interval(c)
        });
        match next {
            Some(interval) => intervals.push(interval),
            None => break,
        }
    }
    Some(intervals)
}

/// A day number with optional partial month/year: `5`, `1er avril`,
/// `02/04/2014`, `2 avril 2015, et`.
fn partial_date(c: &mut Cursor, ctx: &GrammarContext) -> Option<Date> {
    c.attempt(|c| {
        if weekday(c).is_some() {
            c.eat(|k| matches!(k, LexKind::Comma));
        }
        let day = day_number(c)?;
        let partial = c
            .attempt(|c| {
                if !date_sep(c) {
                    return None;
                }
                let month = numeric_month(c)?;
                let year = c.attempt(|c| {
                    if !date_sep(c) {
                        return None;
                    }
                    numeric_year(c, ctx)
                });
                Some((month, year))
            })
            .or_else(|| {
                c.attempt(|c| {
                    let month = month_name(c)?;
                    let year = year_4digit(c);
                    Some((month, year))
                })
            });
        while c.eat(|k| matches!(k, LexKind::Comma | LexKind::Amp))
            || c.eat_kw(Kw::Et)
            || c.eat_kw(Kw::Le)
        {}
        let (month, year) = match partial {
            Some((month, year)) => (Some(month), year),
            None => (None, None),
        };
        Some(Date::new(year, month, day))
    })
}

fn partial_date_series(c: &mut Cursor, ctx: &GrammarContext, min: usize) -> Option<Vec<Date>> {
    let mut dates = Vec::new();
    while let Some(date) = partial_date(c, ctx) {
        dates.push(date);
    }
    if dates.len() < min {
        return None;
    }
    Some(dates)
}

/// `les 5, 6, 8 mars 2013`
fn date_list(c: &mut Cursor, ctx: &GrammarContext) -> Option<DateList> {
    c.attempt(|c| {
        let _ = c.eat_kw(Kw::Les) || c.eat_kw(Kw::Le);
        let dates = partial_date_series(c, ctx, 2)?;
        DateList::from_match(dates)
    })
}

fn date_list_production(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    date_list(c, ctx).map(|list| vec![Timepoint::DateList(list)])
}

/// `du 5 au 29 mars 2015`, `du 03/05/2014 au 03/05/2015`. The end date
/// must be fully qualified or the fragment is discarded.
fn date_interval(c: &mut Cursor, ctx: &GrammarContext) -> Option<DateInterval> {
    c.attempt(|c| {
        c.eat(|k| matches!(k, LexKind::Comma | LexKind::Dash));
        c.eat_kw(Kw::Du);
        let start = partial_date(c, ctx)?;
        if !(c.eat_kw(Kw::Au) || c.eat(|k| matches!(k, LexKind::Dash))) {
            return None;
        }
        weekday(c);
        let end = date_pattern(c, ctx)?;
        DateInterval::from_match(start, end)
    })
}

fn date_interval_production(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    date_interval(c, ctx).map(|interval| vec![Timepoint::DateInterval(interval)])
}

fn date_production(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    date_pattern(c, ctx).map(|date| vec![Timepoint::Date(date)])
}

/// `le 5 mars 2015 à 20h, 22h30, et de 23h à 23h30` develops into one
/// datetime per time window.
fn datetime_pattern(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    c.attempt(|c| {
        let date = date_pattern(c, ctx)?;
        c.eat(|k| matches!(k, LexKind::Comma | LexKind::Dash | LexKind::Colon));
        c.eat(|k| matches!(k, LexKind::Dot));
        let times = time_pattern(c)?;
        Some(
            times
                .into_iter()
                .map(|ti| Timepoint::Datetime(Datetime::new(date, ti.start, Some(ti.end))))
                .collect(),
        )
    })
}

/// `les 5, 6, 7 septembre 2014, à 15h20`
fn datetime_list(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    c.attempt(|c| {
        let _ = c.eat_kw(Kw::Les) || c.eat_kw(Kw::Le);
        let dates = partial_date_series(c, ctx, 1)?;
        let list = DateList::from_match(dates)?;
        c.eat(|k| matches!(k, LexKind::Comma));
        let _ = c.eat_kw(Kw::A) || c.eat(|k| matches!(k, LexKind::Dash));
        let interval = time_interval(c)?;
        Some(vec![Timepoint::DatetimeList(DatetimeList::from_match(
            list, interval,
        ))])
    })
}

/// `du 5 au 28 avril 2015 de 16h à 18h`, possibly with several time
/// windows, one `DatetimeInterval` per window.
fn datetime_interval(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    c.attempt(|c| {
        c.eat(|k| matches!(k, LexKind::Comma | LexKind::Dash));
        let interval = date_interval(c, ctx)?;
        c.eat(|k| matches!(k, LexKind::Comma));
        let times = time_pattern(c)?;
        Some(
            times
                .into_iter()
                .map(|ti| {
                    Timepoint::DatetimeInterval(DatetimeInterval::new(interval.clone(), ti))
                })
                .collect(),
        )
    })
}

/// `du 5 mars 2015 à 18h au 6 mars 2015 à 5h`
fn continuous_datetime_interval(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    c.attempt(|c| {
        c.eat_kw(Kw::Du);
        let start_date = date_pattern(c, ctx)?;
        let _ = c.eat_kw(Kw::A) || c.eat(|k| matches!(k, LexKind::Dash));
        let start_time = time(c)?;
        if !(c.eat_kw(Kw::Au) || c.eat(|k| matches!(k, LexKind::Dash)) || c.eat_kw(Kw::A)) {
            return None;
        }
        let end_date = date_pattern(c, ctx)?;
        let _ = c.eat_kw(Kw::A) || c.eat(|k| matches!(k, LexKind::Dash));
        let end_time = time(c)?;
        let interval =
            ContinuousDatetimeInterval::from_match(start_date, start_time, end_date, end_time)?;
        Some(vec![Timepoint::ContinuousDatetimeInterval(interval)])
    })
}

/// `le lundi`, `les lundis, mardi, et mercredis`, `tous les lundis`
fn weekday_list(c: &mut Cursor) -> Option<Weekdays> {
    c.attempt(|c| {
        c.eat_kw(Kw::Ouvert);
        if c.eat_kw(Kw::Tous) {
            if !c.eat_kw(Kw::Les) {
                return None;
            }
        } else {
            let _ = c.eat_kw(Kw::Les) || c.eat_kw(Kw::Le);
        }
        let mut days = vec![weekday(c)?];
        loop {
            let next = c.attempt(|c| {
                while c.eat(|k| {
                    matches!(k, LexKind::Semicolon | LexKind::Comma | LexKind::Amp | LexKind::Slash)
                }) || c.eat_kw(Kw::Et)
                    || c.eat_kw(Kw::Le)
                    || c.eat_kw(Kw::Les)
                {}
                weekday(c)
            });
            match next {
                Some(day) => days.push(day),
                None => break,
            }
        }
        Some(Weekdays::new(
            days.into_iter().map(weekday_from_index).collect(),
        ))
    })
}

/// `du lundi au mercredi`, wrapping across the week end if needed.
fn weekday_interval(c: &mut Cursor) -> Option<Weekdays> {
    c.attempt(|c| {
        c.eat_kw(Kw::Ouvert);
        c.eat_kw(Kw::Du);
        let first = weekday(c)?;
        if !(c.eat_kw(Kw::Au) || c.eat(|k| matches!(k, LexKind::Dash))) {
            return None;
        }
        let last = weekday(c)?;
        let mut days = Vec::new();
        let mut day = first;
        loop {
            days.push(weekday_from_index(day));
            if day == last {
                break;
            }
            day = (day + 1) % 7;
        }
        Some(Weekdays::new(days))
    })
}

fn weekday_pattern(c: &mut Cursor) -> Option<Weekdays> {
    c.attempt(|c| {
        c.eat(|k| matches!(k, LexKind::Comma | LexKind::Dash));
        weekday_interval(c).or_else(|| weekday_list(c))
    })
}

/// A weekday pattern, an optional time pattern and an optional date
/// interval, in any order: the weekly recurrence. Without a date
/// interval the recurrence is unlimited; without times it is all-day.
fn weekly_recurrence(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    c.attempt(|c| {
        let mut weekdays: Option<Weekdays> = None;
        let mut times: Option<Vec<TimeInterval>> = None;
        let mut interval: Option<DateInterval> = None;
        loop {
            let progressed = c.attempt(|c| {
                while c.eat(|k| matches!(k, LexKind::Comma | LexKind::Dash)) {}
                if weekdays.is_none() {
                    if let Some(found) = weekday_pattern(c) {
                        return Some(Component::Weekdays(found));
                    }
                }
                if interval.is_none() {
                    if let Some(found) = date_interval(c, ctx) {
                        return Some(Component::Interval(found));
                    }
                }
                if times.is_none() {
                    if let Some(found) = time_pattern(c) {
                        return Some(Component::Times(found));
                    }
                }
                None
            });
            match progressed {
                Some(Component::Weekdays(found)) => weekdays = Some(found),
                Some(Component::Interval(found)) => interval = Some(found),
                Some(Component::Times(found)) => times = Some(found),
                None => break,
            }
        }
        let weekdays = weekdays?;
        let interval = interval.unwrap_or_else(DateInterval::undefined);
        let times = times.unwrap_or_else(|| vec![TimeInterval::all_day()]);
        Some(
            times
                .into_iter()
                .map(|ti| {
                    Timepoint::WeeklyRecurrence(WeeklyRecurrence::new(
                        interval.clone(),
                        ti,
                        weekdays.clone(),
                    ))
                })
                .collect(),
        )
    })
}

enum Component {
    Weekdays(Weekdays),
    Times(Vec<TimeInterval>),
    Interval(DateInterval),
}

/// `Du 29/03/15 au 02/04/15 - Mardi, mercredi samedi à 19h, jeudi à
/// 20h30 et vendredi à 15h`: one date interval shared by several
/// weekday/time groups.
fn multiple_weekly_recurrence(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    c.attempt(|c| {
        let interval = date_interval(c, ctx)?;
        let mut groups: Vec<(Weekdays, Vec<TimeInterval>)> = Vec::new();
        loop {
            let group = c.attempt(|c| {
                while c.eat(|k| matches!(k, LexKind::Comma | LexKind::Dash)) || c.eat_kw(Kw::Et) {}
                let days = weekday_pattern(c)?;
                let times = time_pattern(c)?;
                Some((days, times))
            });
            match group {
                Some(group) => groups.push(group),
                None => break,
            }
        }
        if groups.len() < 2 {
            return None;
        }
        let mut out = Vec::new();
        for (days, times) in groups {
            for ti in times {
                out.push(Timepoint::WeeklyRecurrence(WeeklyRecurrence::new(
                    interval.clone(),
                    ti,
                    days.clone(),
                )));
            }
        }
        Some(out)
    })
}

fn exclusion_production(c: &mut Cursor, _ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    let lexeme = c.peek()?;
    if let LexKind::Word(info) = lexeme.kind {
        if info.exclusion {
            c.bump();
            return Some(Vec::new());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{self, Lexeme};
    use crate::locale::Locale;
    use chrono::NaiveDate;

    fn ctx() -> GrammarContext {
        GrammarContext {
            reference: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
        }
    }

    fn lexed(text: &str) -> Vec<Lexeme> {
        grammar::lex(text, 0, Locale::Fr)
    }

    fn parse_one<T>(
        text: &str,
        production: impl Fn(&mut Cursor, &GrammarContext) -> Option<T>,
    ) -> Option<T> {
        let lexemes = lexed(text);
        let mut cursor = Cursor::new(&lexemes, 0);
        production(&mut cursor, &ctx())
    }

    fn parse_timepoints(
        text: &str,
        production: impl Fn(&mut Cursor, &GrammarContext) -> Option<Vec<Timepoint>>,
    ) -> Vec<Timepoint> {
        parse_one(text, production).unwrap_or_default()
    }

    #[test]
    fn parses_literal_dates() {
        for text in [
            "le 1er janvier 2015",
            "Le 1er janvier 2015",
            "1er janvier 2015",
            "1ER Janvier 2015",
        ] {
            assert_eq!(
                parse_one(text, date_pattern),
                Some(Date::full(2015, 1, 1)),
                "failed on {text:?}"
            );
        }
        assert_eq!(parse_one("2 mars 2015", date_pattern), Some(Date::full(2015, 3, 2)));
        assert_eq!(
            parse_one("le 2 mar. 2015", date_pattern),
            Some(Date::full(2015, 3, 2))
        );
        assert_eq!(
            parse_one("1er janvier", date_pattern),
            Some(Date::new(None, Some(1), 1))
        );
    }

    #[test]
    fn parses_numeric_dates() {
        assert_eq!(
            parse_one("01/01/2015", date_pattern),
            Some(Date::full(2015, 1, 1))
        );
        assert_eq!(
            parse_one("01-01-2015", date_pattern),
            Some(Date::full(2015, 1, 1))
        );
        assert_eq!(
            parse_one("01.01.2015", date_pattern),
            Some(Date::full(2015, 1, 1))
        );
        // 2-digit year, within 15 years of the 2015 reference
        assert_eq!(parse_one("01/01/15", date_pattern), Some(Date::full(2015, 1, 1)));
        assert_eq!(parse_one("1/1/15", date_pattern), Some(Date::full(2015, 1, 1)));
        assert_eq!(
            parse_one("26/2", date_pattern),
            Some(Date::new(None, Some(2), 26))
        );
    }

    #[test]
    fn two_digit_year_century_window() {
        let reference = GrammarContext {
            reference: NaiveDate::from_ymd_opt(2015, 6, 1).unwrap(),
        };
        assert_eq!(normalize_2digit_year(29, &reference), 2029);
        // exactly 15 years ahead flips to the previous century
        assert_eq!(normalize_2digit_year(30, &reference), 1930);
        assert_eq!(normalize_2digit_year(99, &reference), 1999);
    }

    #[test]
    fn parses_times() {
        assert_eq!(parse_one("15h30", |c, _| time(c)), Some(Time::new(15, 30)));
        assert_eq!(parse_one("15:30", |c, _| time(c)), Some(Time::new(15, 30)));
        assert_eq!(parse_one("15h", |c, _| time(c)), Some(Time::new(15, 0)));
        assert_eq!(parse_one("à 15h30", |c, _| time(c)), Some(Time::new(15, 30)));
    }

    #[test]
    fn parses_time_intervals() {
        assert_eq!(
            parse_one("de 15h30 à 18h", |c, _| time_interval(c)),
            Some(TimeInterval::new(Time::new(15, 30), Time::new(18, 0)))
        );
        assert_eq!(
            parse_one("Entre 15h30 et 18h", |c, _| time_interval(c)),
            Some(TimeInterval::new(Time::new(15, 30), Time::new(18, 0)))
        );
        assert_eq!(
            parse_one("15h30 - 18h", |c, _| time_interval(c)),
            Some(TimeInterval::new(Time::new(15, 30), Time::new(18, 0)))
        );
        assert_eq!(
            parse_one("15h30", |c, _| time_interval(c)),
            Some(TimeInterval::single(Time::new(15, 30)))
        );
    }

    #[test]
    fn parses_time_patterns() {
        let times = parse_one("à 18h, 19h30, et de 22h à 23h30", |c, _| time_pattern(c)).unwrap();
        assert_eq!(
            times,
            vec![
                TimeInterval::single(Time::new(18, 0)),
                TimeInterval::single(Time::new(19, 30)),
                TimeInterval::new(Time::new(22, 0), Time::new(23, 30)),
            ]
        );
    }

    #[test]
    fn parses_partial_dates() {
        assert_eq!(parse_one("5", |c, x| partial_date(c, x)), Some(Date::new(None, None, 5)));
        assert_eq!(
            parse_one("1er", |c, x| partial_date(c, x)),
            Some(Date::new(None, None, 1))
        );
        assert_eq!(
            parse_one("1er avril", |c, x| partial_date(c, x)),
            Some(Date::new(None, Some(4), 1))
        );
        assert_eq!(
            parse_one("01/02", |c, x| partial_date(c, x)),
            Some(Date::new(None, Some(2), 1))
        );
        assert_eq!(
            parse_one("1er mars 2015", |c, x| partial_date(c, x)),
            Some(Date::full(2015, 3, 1))
        );
        assert_eq!(
            parse_one("02/04/2014", |c, x| partial_date(c, x)),
            Some(Date::full(2014, 4, 2))
        );
    }

    #[test]
    fn parses_date_lists() {
        let list = parse_one("les 5, 6, 8 mars 2013", date_list).unwrap();
        assert_eq!(
            list.dates,
            vec![
                Date::full(2013, 3, 5),
                Date::full(2013, 3, 6),
                Date::full(2013, 3, 8)
            ]
        );
        // a yearless list is tolerated; the transmitter resolves it
        assert!(parse_one("Le 5, 6 et 8 mars", date_list).is_some());
    }

    #[test]
    fn parses_date_intervals() {
        let interval = parse_one("Du 5 septembre 2014 au 7 octobre 2015", date_interval).unwrap();
        assert_eq!(interval.start, Date::full(2014, 9, 5));
        assert_eq!(interval.end, Date::full(2015, 10, 7));

        let interval = parse_one("du 03/05 au 5 mai 2015", date_interval).unwrap();
        assert_eq!(interval.start, Date::full(2015, 5, 3));
        assert_eq!(interval.end, Date::full(2015, 5, 5));

        let interval = parse_one("Du 5 au 7 octobre 2015", date_interval).unwrap();
        assert_eq!(interval.start, Date::full(2015, 10, 5));
        assert_eq!(interval.end, Date::full(2015, 10, 7));

        let interval = parse_one("03/05/2014 - 03/05/2015", date_interval).unwrap();
        assert_eq!(interval.start, Date::full(2014, 5, 3));
        assert_eq!(interval.end, Date::full(2015, 5, 3));
    }

    #[test]
    fn date_interval_without_end_year_is_discarded() {
        assert!(parse_one("Du 26 août au 29 septembre", date_interval).is_none());
    }

    #[test]
    fn parses_datetimes() {
        let tps = parse_timepoints("5 mars 2015 à 15h30", datetime_pattern);
        assert_eq!(
            tps,
            vec![Timepoint::Datetime(Datetime::new(
                Date::full(2015, 3, 5),
                Time::new(15, 30),
                None
            ))]
        );
        let tps = parse_timepoints("Le 5 mars 2015 : 15h30", datetime_pattern);
        assert_eq!(tps.len(), 1);
        let tps = parse_timepoints("le 5 mars 2015 de 14h à 15h30", datetime_pattern);
        assert_eq!(
            tps,
            vec![Timepoint::Datetime(Datetime::new(
                Date::full(2015, 3, 5),
                Time::new(14, 0),
                Some(Time::new(15, 30))
            ))]
        );
    }

    #[test]
    fn datetime_pattern_develops_each_time_window() {
        let tps = parse_timepoints(
            "Le 25 novembre 2012 à 20h, 22h30, et de 23h à 23h30",
            datetime_pattern,
        );
        assert_eq!(
            tps,
            vec![
                Timepoint::Datetime(Datetime::new(
                    Date::full(2012, 11, 25),
                    Time::new(20, 0),
                    None
                )),
                Timepoint::Datetime(Datetime::new(
                    Date::full(2012, 11, 25),
                    Time::new(22, 30),
                    None
                )),
                Timepoint::Datetime(Datetime::new(
                    Date::full(2012, 11, 25),
                    Time::new(23, 0),
                    Some(Time::new(23, 30))
                )),
            ]
        );
    }

    #[test]
    fn parses_datetime_lists() {
        let tps = parse_timepoints("les 5, 8, 10 mars 2015 à 18h", datetime_list);
        let Timepoint::DatetimeList(list) = &tps[0] else {
            panic!("expected a datetime list");
        };
        assert_eq!(list.datetimes.len(), 3);
        assert_eq!(list.datetimes[0].date, Date::full(2015, 3, 5));
        assert_eq!(list.datetimes[0].start, Time::new(18, 0));

        let tps = parse_timepoints("Les 05/04, 6 avril 2015, de 14h à 16h", datetime_list);
        let Timepoint::DatetimeList(list) = &tps[0] else {
            panic!("expected a datetime list");
        };
        assert_eq!(list.datetimes[0].date, Date::full(2015, 4, 5));
        assert_eq!(list.datetimes[1].date, Date::full(2015, 4, 6));
        assert_eq!(list.datetimes[0].end, Time::new(16, 0));
    }

    #[test]
    fn parses_datetime_intervals() {
        let tps = parse_timepoints("Du 5 au 28 avril 2015 de 16h à 18h", datetime_interval);
        let Timepoint::DatetimeInterval(interval) = &tps[0] else {
            panic!("expected a datetime interval");
        };
        assert_eq!(interval.date_interval.start, Date::full(2015, 4, 5));
        assert_eq!(interval.date_interval.end, Date::full(2015, 4, 28));
        assert_eq!(
            interval.time_interval,
            TimeInterval::new(Time::new(16, 0), Time::new(18, 0))
        );
    }

    #[test]
    fn parses_continuous_intervals() {
        for text in [
            "Du 5 mars 2015 à 18h au 6 mars 2015 à 5h",
            "5 mars 2015 à 18h - 6 mars 2015 à 5h",
            "Du 5 mars à 18h au 6 mars 2015 à 5h",
            "Du 5/3 à 18h au 6/3/2015 à 5h",
        ] {
            let tps = parse_timepoints(text, continuous_datetime_interval);
            let Some(Timepoint::ContinuousDatetimeInterval(cont)) = tps.first() else {
                panic!("no continuous interval in {text:?}");
            };
            assert_eq!(cont.start_date, Date::full(2015, 3, 5), "in {text:?}");
            assert_eq!(cont.start_time, Time::new(18, 0));
            assert_eq!(cont.end_date, Date::full(2015, 3, 6));
            assert_eq!(cont.end_time, Time::new(5, 0));
        }
    }

    #[test]
    fn parses_weekday_lists() {
        use chrono::Weekday::*;
        assert_eq!(parse_one("le lundi", |c, _| weekday_list(c)).unwrap().days, vec![Mon]);
        assert_eq!(
            parse_one("les lundis", |c, _| weekday_list(c)).unwrap().days,
            vec![Mon]
        );
        assert_eq!(
            parse_one("les lundis, mardi, et mercredis", |c, _| weekday_list(c))
                .unwrap()
                .days,
            vec![Mon, Tue, Wed]
        );
    }

    #[test]
    fn parses_weekday_intervals() {
        use chrono::Weekday::*;
        assert_eq!(
            parse_one("du lundi au mercredi", |c, _| weekday_interval(c))
                .unwrap()
                .days,
            vec![Mon, Tue, Wed]
        );
        // wraps over the end of the week
        assert_eq!(
            parse_one("du samedi au lundi", |c, _| weekday_interval(c))
                .unwrap()
                .days,
            vec![Mon, Sat, Sun]
        );
    }

    #[test]
    fn parses_weekly_recurrences_in_any_component_order() {
        use chrono::Weekday::*;
        for text in [
            "du lundi au vendredi, du 2 au 29 mars 2015, de 8h à 10h",
            "du lundi au vendredi, de 8h à 10h, du 2 au 29 mars 2015",
            "Du 2 au 29 mars 2015 de 8h à 10h, du lundi au vendredi",
        ] {
            let tps = parse_timepoints(text, weekly_recurrence);
            let Some(Timepoint::WeeklyRecurrence(rec)) = tps.first() else {
                panic!("no weekly recurrence in {text:?}");
            };
            assert_eq!(rec.weekdays.days, vec![Mon, Tue, Wed, Thu, Fri], "in {text:?}");
            assert_eq!(rec.date_interval.start, Date::full(2015, 3, 2));
            assert_eq!(rec.date_interval.end, Date::full(2015, 3, 29));
            assert_eq!(
                rec.time_interval,
                TimeInterval::new(Time::new(8, 0), Time::new(10, 0))
            );
        }
    }

    #[test]
    fn weekly_recurrence_without_interval_is_unlimited() {
        let tps = parse_timepoints("tous les lundis à 8h", weekly_recurrence);
        let Some(Timepoint::WeeklyRecurrence(rec)) = tps.first() else {
            panic!("expected a weekly recurrence");
        };
        assert!(rec.is_unlimited());
        assert_eq!(rec.time_interval, TimeInterval::single(Time::new(8, 0)));
    }

    #[test]
    fn parses_multiple_weekly_recurrences() {
        use chrono::Weekday::*;
        let tps = parse_timepoints(
            "Du 29/03/15 au 02/04/15 - Mardi, mercredi samedi 16h-19h, lundi à 18h",
            multiple_weekly_recurrence,
        );
        assert_eq!(tps.len(), 2);
        let Timepoint::WeeklyRecurrence(first) = &tps[0] else {
            panic!("expected weekly recurrences");
        };
        assert_eq!(first.weekdays.days, vec![Tue, Wed, Sat]);
        assert_eq!(first.date_interval.start, Date::full(2015, 3, 29));
        assert_eq!(first.date_interval.end, Date::full(2015, 4, 2));
        assert_eq!(
            first.time_interval,
            TimeInterval::new(Time::new(16, 0), Time::new(19, 0))
        );
        let Timepoint::WeeklyRecurrence(second) = &tps[1] else {
            panic!("expected weekly recurrences");
        };
        assert_eq!(second.weekdays.days, vec![Mon]);
        assert_eq!(second.time_interval, TimeInterval::single(Time::new(18, 0)));
    }
}
