//! Extraction and normalization of natural-language temporal
//! expressions ("du lundi au vendredi, de 8h à 10h, sauf le 12 mars")
//! into RRULE + duration schedules.

pub mod coherency;
pub mod cohesion;
pub mod combine;
pub mod exclusion;
pub mod export;
pub mod grammar;
pub mod locale;
pub mod models;
pub mod pack;
pub mod probe;
pub mod rrule;
pub mod timepoint;
pub mod transmit;

use chrono::NaiveDate;
use thiserror::Error;

pub use coherency::CoherencyOptions;
pub use cohesion::fuse;
pub use combine::{estimate_count, split_schedule};
pub use export::{
    DurationRRule, ExportOptions, Grain, discretize, export, iterate, next_occurrence,
    schedule_first_date, schedule_last_date,
};
pub use locale::{Locale, detect_language};
pub use models::{IterBounds, ScheduleRule};
pub use rrule::{Freq, Recurrence};
pub use timepoint::Timepoint;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported locale '{0}'")]
    UnsupportedLocale(String),

    #[error("invalid rrule '{input}': {reason}")]
    InvalidRRule { input: String, reason: String },
}

/// Extract the timepoints of a text. Invalid timepoints are returned
/// too, flagged by [`Timepoint::is_valid`]; the caller decides.
///
/// The reference date resolves 2-digit years and missing years; it
/// defaults to today.
pub fn parse(
    text: &str,
    lang: &str,
    reference: Option<NaiveDate>,
) -> Result<Vec<Timepoint>, ParseError> {
    let locale =
        Locale::from_code(lang).ok_or_else(|| ParseError::UnsupportedLocale(lang.to_owned()))?;
    Ok(parse_spanned(text, locale, reference)
        .into_iter()
        .map(|(timepoint, _)| timepoint)
        .collect())
}

/// Full extraction pipeline up to timepoints: substitutions, probing,
/// grammar, overlap resolution, exclusion grouping, year transmission
/// and in-text coherency.
pub(crate) fn parse_spanned(
    text: &str,
    locale: Locale,
    reference: Option<NaiveDate>,
) -> Vec<(Timepoint, (usize, usize))> {
    let normalized = locale::apply_substitutions(text, locale);
    let grammar_reference =
        reference.unwrap_or_else(|| chrono::Local::now().date_naive());
    let ctx = grammar::GrammarContext {
        reference: grammar_reference,
    };
    let spanned = grammar::tokenize(&normalized, locale, &ctx);
    let mut timepoints: Vec<Timepoint> = Vec::with_capacity(spanned.len());
    let mut spans: Vec<(usize, usize)> = Vec::with_capacity(spanned.len());
    for (timepoint, span) in spanned {
        timepoints.push(timepoint);
        spans.push(span);
    }
    transmit::transmit(&mut timepoints, reference);
    let spanned: Vec<(Timepoint, (usize, usize))> =
        timepoints.into_iter().zip(spans).collect();
    coherency::timepoint_coherency(spanned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timepoint::{Date, Time};

    fn ref_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
    }

    #[test]
    fn unknown_locale_is_an_error() {
        let err = parse("le 5 mars 2015", "xx", None).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedLocale(_)));
    }

    #[test]
    fn parses_a_simple_datetime() {
        let timepoints = parse("Le 4 mars 2015 à 18h30", "fr", Some(ref_date())).unwrap();
        assert_eq!(timepoints.len(), 1);
        let Timepoint::Datetime(datetime) = &timepoints[0] else {
            panic!("expected a datetime, got {:?}", timepoints[0]);
        };
        assert_eq!(datetime.date, Date::full(2015, 3, 4));
        assert_eq!(datetime.start, Time::new(18, 30));
    }

    #[test]
    fn invalid_dates_are_flagged_not_dropped() {
        let timepoints = parse("le 30 février 2015", "fr", Some(ref_date())).unwrap();
        assert!(!timepoints.is_empty());
        assert!(timepoints.iter().any(|tp| !tp.is_valid()));
    }

    #[test]
    fn text_without_temporal_markers_yields_nothing() {
        let timepoints = parse("rien de temporel par ici", "fr", Some(ref_date())).unwrap();
        assert!(timepoints.is_empty());
    }

    #[test]
    fn year_is_inherited_from_a_peer_interval() {
        let timepoints = parse(
            "Du 11 avril 2015 au 12 avril 2015. Concert le 11 avril à 20h.",
            "fr",
            Some(ref_date()),
        )
        .unwrap();
        let datetime = timepoints.iter().find_map(|tp| match tp {
            Timepoint::Datetime(datetime) => Some(datetime),
            _ => None,
        });
        let datetime = datetime.expect("expected a datetime match");
        assert_eq!(datetime.date, Date::full(2015, 4, 11));
    }
}
