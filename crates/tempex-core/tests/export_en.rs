//! End-to-end extraction scenarios on English text.

use chrono::NaiveDate;

use tempex_core::{ExportOptions, detect_language, export, locale::Locale};

fn options() -> ExportOptions {
    ExportOptions {
        reference: Some(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()),
        ..ExportOptions::default()
    }
}

#[test]
fn single_datetime_with_meridiem() {
    let records = export("on March 5, 2015 at 8 pm", "en", &options()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].rrule,
        "DTSTART:20150305\nRRULE:FREQ=DAILY;COUNT=1;BYHOUR=20;BYMINUTE=0"
    );
    assert_eq!(records[0].duration, 0);
}

#[test]
fn british_date_with_time_window() {
    let records = export("5th of October, 2015, from 6 pm to 8 pm", "en", &options()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].rrule,
        "DTSTART:20151005\nRRULE:FREQ=DAILY;COUNT=1;BYHOUR=18;BYMINUTE=0"
    );
    assert_eq!(records[0].duration, 120);
}

#[test]
fn bare_date_is_all_day() {
    let records = export("October 5, 2015", "en", &options()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].rrule,
        "DTSTART:20151005\nRRULE:FREQ=DAILY;COUNT=1;BYHOUR=0;BYMINUTE=0"
    );
    assert_eq!(records[0].duration, 1439);
}

#[test]
fn meridiem_forces_english_detection() {
    assert_eq!(detect_language("March 5, 2015 at 8 pm", "fr"), Locale::En);
}
