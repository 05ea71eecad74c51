//! English grammar. Narrower than the French one: dates, datetimes and
//! exclusion keywords, with am/pm times and both British and American
//! date orders.

use super::{Cursor, GrammarContext, Kw, LexKind, Match, Meridiem, Tag, scan_production};
use crate::timepoint::{Date, Datetime, Time, TimeInterval, Timepoint};

pub(crate) fn scan(lexemes: &[super::Lexeme], ctx: &GrammarContext, out: &mut Vec<Match>) {
    scan_production(lexemes, ctx, Tag::Datetime, out, datetime_pattern);
    scan_production(lexemes, ctx, Tag::Date, out, date_production);
    scan_production(lexemes, ctx, Tag::Exclusion, out, exclusion_production);
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
            if let Some(month) = info.month {
                c.bump();
                return Some(month);
            }
        }
    }
    None
}

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
        return Some(super::fr::normalize_2digit_year(value, ctx));
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
    c.eat(|k| matches!(k, LexKind::Slash | LexKind::Dash))
}

fn meridiem(c: &mut Cursor) -> Option<Meridiem> {
    let lexeme = c.peek()?;
    if let LexKind::Word(info) = lexeme.kind {
        if let Some(m) = info.meridiem {
            c.bump();
            return Some(m);
        }
    }
    None
}

fn apply_meridiem(hour: u32, m: Meridiem) -> u32 {
    match m {
        Meridiem::Am if hour == 12 => 0,
        Meridiem::Am => hour,
        Meridiem::Pm if hour < 12 => hour + 12,
        Meridiem::Pm => hour,
    }
}

/// `(at) 10(:30) am/pm` - the meridiem is mandatory.
fn time(c: &mut Cursor) -> Option<Time> {
    c.attempt(|c| {
        c.eat_kw(Kw::A);
        if let Some(lexeme) = c.peek() {
            if let LexKind::Time { hour, minute } = lexeme.kind {
                c.bump();
                let m = meridiem(c)?;
                return Some(Time::new(apply_meridiem(hour, m), minute.unwrap_or(0)));
            }
            if let LexKind::Number { value, digits, .. } = lexeme.kind {
                if value <= 12 && digits <= 2 {
                    c.bump();
                    let m = meridiem(c)?;
                    return Some(Time::new(apply_meridiem(value, m), 0));
                }
            }
        }
        None
    })
}

/// `from 6 pm to 8 pm`, `between 10 am and 12 pm`, or a single time.
fn time_interval(c: &mut Cursor) -> Option<TimeInterval> {
    c.attempt(|c| {
        let _ = c.eat_kw(Kw::De) || c.eat_kw(Kw::Entre);
        let start = time(c)?;
        let end = c.attempt(|c| {
            if !(c.eat(|k| matches!(k, LexKind::Dash)) || c.eat_kw(Kw::Au) || c.eat_kw(Kw::Et)) {
                return None;
            }
            time(c)
        });
        Some(TimeInterval::new(start, end.unwrap_or(start)))
    })
}

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

/// `5(th) (of) October(,) 2004` - the year is mandatory in English.
fn british_date(c: &mut Cursor) -> Option<Date> {
    c.attempt(|c| {
        let day = day_number(c)?;
        c.eat_kw(Kw::Of);
        let month = month_name(c)?;
        c.eat(|k| matches!(k, LexKind::Comma));
        let year = year_4digit(c)?;
        Some(Date::full(year, month, day))
    })
}

/// `October (the) 5(th), 2004`
fn american_date(c: &mut Cursor) -> Option<Date> {
    c.attempt(|c| {
        let month = month_name(c)?;
        c.eat_kw(Kw::Le);
        let day = day_number(c)?;
        c.eat(|k| matches!(k, LexKind::Comma));
        let year = year_4digit(c)?;
        Some(Date::full(year, month, day))
    })
}

/// `(0)5/(0)2/(20)04` day first, or `2014/5/1` year first. Year-first
/// dates never take a 2-digit year, which would be ambiguous.
fn numeric_date(c: &mut Cursor, ctx: &GrammarContext) -> Option<Date> {
    let day_first = c.attempt(|c| {
        let day = day_number(c)?;
        if !date_sep(c) {
            return None;
        }
        let month = numeric_month(c)?;
        if !date_sep(c) {
            return None;
        }
        let year = numeric_year(c, ctx)?;
        Some(Date::full(year, month, day))
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
        Some(Date::full(year, month, day))
    })
}

/// `(on) (Friday) March 5, 2015`
fn date_pattern(c: &mut Cursor, ctx: &GrammarContext) -> Option<Date> {
    c.attempt(|c| {
        c.eat_kw(Kw::Le);
        weekday(c);
        british_date(c)
            .or_else(|| american_date(c))
            .or_else(|| numeric_date(c, ctx))
    })
}

fn date_production(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    date_pattern(c, ctx).map(|date| vec![Timepoint::Date(date)])
}

fn datetime_pattern(c: &mut Cursor, ctx: &GrammarContext) -> Option<Vec<Timepoint>> {
    c.attempt(|c| {
        let date = date_pattern(c, ctx)?;
        c.eat(|k| matches!(k, LexKind::Comma | LexKind::Dash | LexKind::Colon));
        let times = time_pattern(c)?;
        Some(
            times
                .into_iter()
                .map(|ti| Timepoint::Datetime(Datetime::new(date, ti.start, Some(ti.end))))
                .collect(),
        )
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
