//! Grammar engine shared by the locale grammars: a lexer producing
//! typed lexemes, a backtracking cursor for the recursive-descent
//! productions, overlap resolution between tagged matches, and the
//! grouping of exclusion tokens with their constructive neighbours.

pub mod en;
pub mod fr;

use chrono::NaiveDate;
use log::debug;

use crate::exclusion;
use crate::locale::Locale;
use crate::probe;
use crate::timepoint::Timepoint;

/// Tags of the grammar productions, ordered by specificity. The order
/// decides which match survives when two productions cover the exact
/// same span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    WeeklyRecurrence,
    Datetime,
    DatetimeList,
    DatetimeInterval,
    ContinuousDatetimeInterval,
    Date,
    DateList,
    DateInterval,
    Exclusion,
}

impl Tag {
    fn priority(self) -> u8 {
        match self {
            Tag::WeeklyRecurrence => 0,
            Tag::Datetime => 1,
            Tag::DatetimeList => 2,
            Tag::DatetimeInterval => 3,
            Tag::ContinuousDatetimeInterval => 4,
            Tag::Date => 5,
            Tag::DateList => 6,
            Tag::DateInterval => 7,
            Tag::Exclusion => 8,
        }
    }
}

/// A grammar hit: one or more timepoints built from the same text span.
/// Multi-window productions ("à 20h, 22h30 et de 23h à 23h30") yield
/// several timepoints under a single match.
#[derive(Debug, Clone)]
pub struct Match {
    pub timepoints: Vec<Timepoint>,
    pub tag: Tag,
    pub span: (usize, usize),
}

impl Match {
    fn len(&self) -> usize {
        self.span.1 - self.span.0
    }

    fn intersects(&self, other: &Match) -> bool {
        self.span.0 < other.span.1 && other.span.0 < self.span.1
    }

    fn covers(&self, other: &Match) -> bool {
        self.span.0 <= other.span.0 && other.span.1 <= self.span.1
    }
}

/// Per-parse context threaded through the productions.
#[derive(Debug, Clone, Copy)]
pub struct GrammarContext {
    /// Reference date used to resolve 2-digit years.
    pub reference: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// Possible readings of a word. A word may be both a short weekday and
/// a short month ("mar"); the productions pick the reading their
/// position calls for.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordInfo {
    pub weekday: Option<u8>,
    pub month: Option<u32>,
    pub kw: Option<Kw>,
    pub exclusion: bool,
    pub meridiem: Option<Meridiem>,
}

/// Grammar keywords, shared across locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kw {
    /// fr "du", en "from" (date interval opener)
    Du,
    /// fr "au", en "to"/"until" (interval closer)
    Au,
    /// fr "le", en "on"/"the"
    Le,
    /// fr "les"
    Les,
    /// fr "de", en "from" (time interval opener)
    De,
    /// fr "à"/"a", en "at"
    A,
    /// fr "et", en "and"
    Et,
    /// fr "entre", en "between"
    Entre,
    /// fr "ou", en "or"
    Ou,
    /// fr "tous"
    Tous,
    /// fr "ouvert"
    Ouvert,
    /// en "of"
    Of,
}

#[derive(Debug, Clone, Copy)]
pub enum LexKind {
    Word(WordInfo),
    Number {
        value: u32,
        digits: u8,
        ordinal: bool,
    },
    Time {
        hour: u32,
        minute: Option<u32>,
    },
    Slash,
    Dash,
    Dot,
    Comma,
    Semicolon,
    Colon,
    Amp,
    Currency,
    Other,
}

#[derive(Debug, Clone, Copy)]
pub struct Lexeme {
    pub kind: LexKind,
    pub start: usize,
    pub end: usize,
}

fn classify_word(word: &str, locale: Locale) -> WordInfo {
    let calendar = locale.calendar();
    let lower = word.to_lowercase();
    let kw = match locale {
        Locale::Fr => match lower.as_str() {
            "du" => Some(Kw::Du),
            "au" => Some(Kw::Au),
            "le" => Some(Kw::Le),
            "les" => Some(Kw::Les),
            "de" => Some(Kw::De),
            "à" | "a" => Some(Kw::A),
            "et" => Some(Kw::Et),
            "entre" => Some(Kw::Entre),
            "ou" => Some(Kw::Ou),
            "tous" => Some(Kw::Tous),
            "ouvert" | "ouverte" | "ouverts" => Some(Kw::Ouvert),
            _ => None,
        },
        Locale::En => match lower.as_str() {
            "from" => Some(Kw::De),
            "to" | "until" => Some(Kw::Au),
            "on" | "the" => Some(Kw::Le),
            "at" => Some(Kw::A),
            "and" => Some(Kw::Et),
            "between" => Some(Kw::Entre),
            "or" => Some(Kw::Ou),
            "of" => Some(Kw::Of),
            _ => None,
        },
    };
    let exclusion = match locale {
        Locale::Fr => matches!(lower.as_str(), "sauf" | "relâche" | "relache" | "fermé" | "ferme"),
        Locale::En => matches!(lower.as_str(), "except" | "closed"),
    };
    let meridiem = match lower.as_str() {
        "am" => Some(Meridiem::Am),
        "pm" => Some(Meridiem::Pm),
        _ => None,
    };
    WordInfo {
        weekday: calendar.weekday_number(&lower),
        month: calendar.month_number(&lower),
        kw,
        exclusion,
        meridiem,
    }
}

/// Split a context window into lexemes. `offset` is the byte position
/// of the window inside the full text, so lexeme spans are absolute.
pub(crate) fn lex(window: &str, offset: usize, locale: Locale) -> Vec<Lexeme> {
    let bytes = window.as_bytes();
    let mut lexemes = Vec::new();
    let mut i = 0;
    while i < window.len() {
        let rest = &window[i..];
        let c = match rest.chars().next() {
            Some(c) => c,
            None => break,
        };
        if c.is_whitespace() {
            i += c.len_utf8();
            continue;
        }
        if c.is_ascii_digit() {
            let digits_len = rest
                .find(|ch: char| !ch.is_ascii_digit())
                .unwrap_or(rest.len());
            let digits = &rest[..digits_len];
            let value: u32 = digits.parse().unwrap_or(u32::MAX);
            let mut end = i + digits_len;

            // time shape: hour + optional space + 'h' or ':' + optional minute
            if value <= 24 {
                if let Some((minute, time_end)) = scan_time_tail(window, end) {
                    lexemes.push(Lexeme {
                        kind: LexKind::Time {
                            hour: value,
                            minute,
                        },
                        start: offset + i,
                        end: offset + time_end,
                    });
                    i = time_end;
                    continue;
                }
            }

            // ordinal suffix: fr "1er", en "5th"
            let mut ordinal = false;
            let after = &window[end..];
            for suffix in ["er", "st", "nd", "rd", "th"] {
                let Some(head) = after.get(..suffix.len()) else {
                    continue;
                };
                if head.eq_ignore_ascii_case(suffix)
                    && !after[suffix.len()..]
                        .chars()
                        .next()
                        .is_some_and(char::is_alphanumeric)
                {
                    ordinal = true;
                    end += suffix.len();
                    break;
                }
            }

            lexemes.push(Lexeme {
                kind: LexKind::Number {
                    value,
                    digits: digits_len.min(u8::MAX as usize) as u8,
                    ordinal,
                },
                start: offset + i,
                end: offset + end,
            });
            i = end;
            continue;
        }
        if c.is_alphabetic() {
            let word_len = rest
                .find(|ch: char| !ch.is_alphabetic())
                .unwrap_or(rest.len());
            let word = &rest[..word_len];
            let mut end = i + word_len;
            let info = classify_word(word, locale);
            // short month/weekday abbreviations may carry a dot
            if (info.month.is_some() || info.weekday.is_some()) && bytes.get(end) == Some(&b'.') {
                end += 1;
            }
            lexemes.push(Lexeme {
                kind: LexKind::Word(info),
                start: offset + i,
                end: offset + end,
            });
            i = end;
            continue;
        }
        let kind = match c {
            '/' => LexKind::Slash,
            '-' | '–' => LexKind::Dash,
            '.' => LexKind::Dot,
            ',' => LexKind::Comma,
            ';' => LexKind::Semicolon,
            ':' => LexKind::Colon,
            '&' => LexKind::Amp,
            '€' | '$' | '£' => LexKind::Currency,
            _ => LexKind::Other,
        };
        lexemes.push(Lexeme {
            kind,
            start: offset + i,
            end: offset + i + c.len_utf8(),
        });
        i += c.len_utf8();
    }
    lexemes
}

/// After an hour number, recognize `h`/`:` and an optional 2-digit
/// minute. Returns the minute and the byte end of the time lexeme.
fn scan_time_tail(window: &str, hour_end: usize) -> Option<(Option<u32>, usize)> {
    let mut pos = hour_end;
    let rest = &window[pos..];
    let mut chars = rest.chars();
    let mut sep = chars.next()?;
    if sep == ' ' {
        sep = chars.next()?;
        pos += 1;
    }
    if sep != 'h' && sep != 'H' && sep != ':' {
        return None;
    }
    pos += sep.len_utf8();
    let after_sep = &window[pos..];
    // "15heures" is not a time shape
    if after_sep.chars().next().is_some_and(char::is_alphabetic) {
        return None;
    }
    let minute_digits: String = after_sep.chars().take_while(char::is_ascii_digit).collect();
    if minute_digits.len() >= 2 {
        let two = &minute_digits[..2];
        // minutes are exactly two digits, not followed by another digit
        if minute_digits.len() == 2 {
            if let Ok(minute) = two.parse::<u32>() {
                if minute < 60 {
                    return Some((Some(minute), pos + 2));
                }
            }
        }
        return None;
    }
    Some((None, pos))
}

/// Resolve overlapping matches: a match covering another removes it,
/// equal spans keep the most specific tag, and the survivors come back
/// sorted by ascending start then descending length.
pub(crate) fn remove_subsets(matches: Vec<Match>) -> Vec<Match> {
    let mut kept: Vec<Match> = Vec::new();
    'outer: for candidate in matches {
        let mut i = 0;
        while i < kept.len() {
            let other = &kept[i];
            if candidate.intersects(other) {
                if other.covers(&candidate) && other.len() > candidate.len() {
                    continue 'outer;
                }
                if candidate.covers(other) && candidate.len() > other.len() {
                    kept.remove(i);
                    continue;
                }
                if candidate.span == other.span {
                    if candidate.tag.priority() < other.tag.priority() {
                        kept.remove(i);
                        continue;
                    }
                    continue 'outer;
                }
            }
            i += 1;
        }
        kept.push(candidate);
    }
    kept.sort_by(|a, b| {
        a.span
            .0
            .cmp(&b.span.0)
            .then_with(|| b.len().cmp(&a.len()))
    });
    kept
}

/// Group `MATCH EXCLUDE MATCH` windows: the second match turns into
/// exclusion rrules on the first. A dangling exclusion token is
/// dropped.
pub(crate) fn group_exclusions(matches: Vec<Match>) -> Vec<(Timepoint, (usize, usize))> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < matches.len() {
        let is_triple = i + 2 < matches.len()
            && matches[i].tag != Tag::Exclusion
            && matches[i + 1].tag == Tag::Exclusion
            && matches[i + 2].tag != Tag::Exclusion;
        if is_triple {
            let excluded = matches[i + 2].timepoints.clone();
            let span = (matches[i].span.0, matches[i + 2].span.1);
            for mut timepoint in matches[i].timepoints.clone() {
                for excluded_tp in &excluded {
                    if let Some(rrule) = exclusion::exclusion_rrule(&timepoint, excluded_tp) {
                        timepoint.attach_exclusion(rrule);
                    }
                }
                out.push((timepoint, span));
            }
            i += 3;
        } else {
            if matches[i].tag != Tag::Exclusion {
                for timepoint in matches[i].timepoints.clone() {
                    out.push((timepoint, matches[i].span));
                }
            }
            i += 1;
        }
    }
    out
}

/// Run the locale grammar over every probed window of `text` and return
/// non-overlapping timepoints with their spans.
pub(crate) fn tokenize(
    text: &str,
    locale: Locale,
    ctx: &GrammarContext,
) -> Vec<(Timepoint, (usize, usize))> {
    let contexts = probe::probe(text, locale);
    if contexts.is_empty() {
        return Vec::new();
    }
    let mut matches = Vec::new();
    for window in &contexts {
        let slice = &text[window.start..window.end];
        let lexemes = lex(slice, window.start, locale);
        match locale {
            Locale::Fr => fr::scan(&lexemes, ctx, &mut matches),
            Locale::En => en::scan(&lexemes, ctx, &mut matches),
        }
    }
    debug!("grammar: {} raw match(es)", matches.len());
    let matches = remove_subsets(matches);
    group_exclusions(matches)
}

/// Backtracking cursor over the lexemes of one window.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    lexemes: &'a [Lexeme],
    pub pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(lexemes: &'a [Lexeme], pos: usize) -> Self {
        Cursor { lexemes, pos }
    }

    pub fn peek(&self) -> Option<&'a Lexeme> {
        self.lexemes.get(self.pos)
    }

    pub fn bump(&mut self) -> Option<&'a Lexeme> {
        let lexeme = self.lexemes.get(self.pos)?;
        self.pos += 1;
        Some(lexeme)
    }

    /// Byte span covered between a saved position and the current one.
    pub fn span_since(&self, start_pos: usize) -> Option<(usize, usize)> {
        if self.pos == start_pos {
            return None;
        }
        let first = self.lexemes.get(start_pos)?;
        let last = self.lexemes.get(self.pos - 1)?;
        Some((first.start, last.end))
    }

    pub fn eat_kw(&mut self, kw: Kw) -> bool {
        if let Some(Lexeme {
            kind: LexKind::Word(info),
            ..
        }) = self.peek()
        {
            if info.kw == Some(kw) {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    pub fn eat(&mut self, pred: impl Fn(&LexKind) -> bool) -> bool {
        if let Some(lexeme) = self.peek() {
            if pred(&lexeme.kind) {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    /// Try a sub-parse; restores the position on failure.
    pub fn attempt<T>(&mut self, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let saved = self.pos;
        match parse(self) {
            Some(value) => Some(value),
            None => {
                self.pos = saved;
                None
            }
        }
    }
}

/// Slide a production over the lexemes, restarting after every hit,
/// the way a scan-string pass would.
pub(crate) fn scan_production(
    lexemes: &[Lexeme],
    ctx: &GrammarContext,
    tag: Tag,
    out: &mut Vec<Match>,
    production: impl Fn(&mut Cursor, &GrammarContext) -> Option<Vec<Timepoint>>,
) {
    let mut pos = 0;
    while pos < lexemes.len() {
        let mut cursor = Cursor::new(lexemes, pos);
        let saved = cursor.pos;
        match production(&mut cursor, ctx) {
            Some(timepoints) if cursor.pos > saved => {
                if let Some(span) = cursor.span_since(saved) {
                    out.push(Match {
                        timepoints,
                        tag,
                        span,
                    });
                }
                pos = cursor.pos;
            }
            _ => pos += 1,
        }
    }
}
