//! Cheap scan for temporal markers. The full grammar only runs inside
//! the windows returned here, which keeps the expensive passes off long
//! non-temporal text.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::locale::Locale;

/// Number of characters of context kept on each side of a probe hit.
const CONTEXT_SIZE: usize = 30;

/// A `[start, end)` byte slice of the input text worth parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub start: usize,
    pub end: usize,
}

impl Context {
    fn around(match_start: usize, match_end: usize, text: &str) -> Self {
        let start = back_n_chars(text, match_start, CONTEXT_SIZE);
        let end = fwd_n_chars(text, match_end, CONTEXT_SIZE);
        Context { start, end }
    }

    fn overlaps(&self, other: &Context) -> bool {
        other.start < self.end && self.start < other.end
    }

    fn merge(&mut self, other: &Context) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
    }
}

fn back_n_chars(text: &str, idx: usize, n: usize) -> usize {
    let mut i = idx;
    for _ in 0..n {
        match text[..i].chars().next_back() {
            Some(c) => i -= c.len_utf8(),
            None => break,
        }
    }
    i
}

fn fwd_n_chars(text: &str, idx: usize, n: usize) -> usize {
    let mut i = idx;
    for _ in 0..n {
        match text[i..].chars().next() {
            Some(c) => i += c.len_utf8(),
            None => break,
        }
    }
    i
}

fn name_probe(names: &[(&str, u32)]) -> String {
    let alternation = names
        .iter()
        .map(|(name, _)| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    format!(r"(?i)\b(?:{alternation})\b")
}

fn weekday_probe(names: &[(&str, u8)]) -> String {
    let alternation = names
        .iter()
        .map(|(name, _)| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    format!(r"(?i)\b(?:{alternation})s?\b")
}

fn build_probes(locale: Locale) -> Vec<Regex> {
    let calendar = locale.calendar();
    let patterns = [
        name_probe(calendar.months),
        weekday_probe(calendar.weekdays),
        // numeric date shapes: dd/mm, dd-mm-yyyy, dd.mm.yy ...
        r"\b\d{1,2}[/.-]\d{1,2}(?:[/.-]\d{2,4})?\b".to_owned(),
        // a 4-digit year
        r"\b(?:1\d{3}|2\d{3})\b".to_owned(),
        // hour-minute shapes: 8h, 15h30, 15:30
        r"\b\d{1,2}\s?(?:h|:)(?:[0-5]\d)?\b".to_owned(),
        // a bare day number
        r"\b(?:3[01]|[12]\d|0?[1-9])\b".to_owned(),
    ];
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect()
}

static FR_PROBES: LazyLock<Vec<Regex>> = LazyLock::new(|| build_probes(Locale::Fr));
static EN_PROBES: LazyLock<Vec<Regex>> = LazyLock::new(|| build_probes(Locale::En));

fn probes(locale: Locale) -> &'static [Regex] {
    match locale {
        Locale::Fr => &FR_PROBES,
        Locale::En => &EN_PROBES,
    }
}

/// Locate the candidate regions of `text`. Returns non-overlapping
/// windows sorted by start index; an empty list when nothing temporal
/// shows up.
pub fn probe(text: &str, locale: Locale) -> Vec<Context> {
    let mut contexts: Vec<Context> = Vec::new();
    for pattern in probes(locale) {
        for hit in pattern.find_iter(text) {
            contexts.push(Context::around(hit.start(), hit.end(), text));
        }
    }
    contexts.sort_by_key(|ctx| (ctx.start, ctx.end));
    let merged = merge_overlapping(contexts);
    debug!("probe: {} window(s) in {} bytes", merged.len(), text.len());
    merged
}

fn merge_overlapping(contexts: Vec<Context>) -> Vec<Context> {
    let mut out: Vec<Context> = Vec::new();
    for ctx in contexts {
        match out.last_mut() {
            Some(last) if last.overlaps(&ctx) || last.end == ctx.start => last.merge(&ctx),
            _ => out.push(ctx),
        }
    }
    out
}
