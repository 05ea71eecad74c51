//! End-to-end extraction scenarios on French text.

use chrono::NaiveDate;

use tempex_core::models::IterBounds;
use tempex_core::{ExportOptions, cohesion, export, iterate};

fn options() -> ExportOptions {
    ExportOptions {
        reference: Some(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()),
        ..ExportOptions::default()
    }
}

#[test]
fn single_datetime() {
    let records = export("Le 4 mars 2015 à 18h30", "fr", &options()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].rrule,
        "DTSTART:20150304\nRRULE:FREQ=DAILY;COUNT=1;BYHOUR=18;BYMINUTE=30"
    );
    assert_eq!(records[0].duration, 0);
    assert!(!records[0].continuous);
    assert!(!records[0].unlimited);
}

#[test]
fn interval_with_weekday_exclusion() {
    let records = export("Du 5 au 29 mars 2015, sauf le lundi", "fr", &options()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].rrule,
        "DTSTART:20150305\nRRULE:FREQ=DAILY;BYHOUR=0;BYMINUTE=0;INTERVAL=1;UNTIL=20150329"
    );
    assert_eq!(records[0].duration, 1439);
    assert_eq!(
        records[0].excluded,
        vec![
            "DTSTART:20150305\nRRULE:FREQ=DAILY;BYDAY=MO;BYHOUR=0;BYMINUTE=0;UNTIL=20150329T000000"
                .to_owned()
        ]
    );

    // iterating the rule skips every Monday
    let occurrences = iterate(&records[0], IterBounds::default()).unwrap();
    use chrono::Datelike;
    assert_eq!(occurrences.len(), 22);
    assert!(
        occurrences
            .iter()
            .all(|dt| dt.weekday() != chrono::Weekday::Mon)
    );
}

#[test]
fn interval_with_date_exclusion() {
    let records = export("Du 5 au 29 mars 2015, sauf le 12 mars", "fr", &options()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].excluded,
        vec!["DTSTART:20150312\nRRULE:FREQ=DAILY;COUNT=1;BYHOUR=0;BYMINUTE=0".to_owned()]
    );
    let occurrences = iterate(&records[0], IterBounds::default()).unwrap();
    assert_eq!(occurrences.len(), 24);
    assert!(
        occurrences
            .iter()
            .all(|dt| dt.date() != NaiveDate::from_ymd_opt(2015, 3, 12).unwrap())
    );
}

#[test]
fn continuous_interval_over_midnight() {
    let records = export("Du 5 avril à 22h au 6 avril 2015 à 8h", "fr", &options()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].rrule,
        "DTSTART:20150405\nRRULE:FREQ=DAILY;BYHOUR=22;BYMINUTE=0;INTERVAL=1;UNTIL=20150406T235959"
    );
    assert!(records[0].continuous);
    assert_eq!(records[0].duration, 600);
}

#[test]
fn unlimited_weekly_recurrence() {
    let records = export("tous les lundis à 8h", "fr", &options()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].rrule,
        "DTSTART:00010101\nRRULE:FREQ=WEEKLY;BYDAY=MO;BYHOUR=8;BYMINUTE=0;UNTIL=99991231T235959"
    );
    assert!(records[0].unlimited);
    assert_eq!(records[0].duration, 0);
}

#[test]
fn weekly_recurrence_with_range_and_times() {
    let records = export(
        "du lundi au vendredi, du 2 au 29 mars 2015, de 8h à 10h",
        "fr",
        &options(),
    )
    .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].rrule,
        "DTSTART:20150302\nRRULE:FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;BYHOUR=8;BYMINUTE=0;UNTIL=20150329T235959"
    );
    assert_eq!(records[0].duration, 120);
}

#[test]
fn datetime_list_distributes_the_time() {
    let records = export("les 5, 8, 10 mars 2015 à 18h", "fr", &options()).unwrap();
    assert_eq!(records.len(), 3);
    for (record, day) in records.iter().zip([5, 8, 10]) {
        assert_eq!(
            record.rrule,
            format!("DTSTART:201503{day:02}\nRRULE:FREQ=DAILY;COUNT=1;BYHOUR=18;BYMINUTE=0")
        );
        assert_eq!(record.duration, 0);
    }
}

#[test]
fn fuse_interval_and_weekly_across_sources() {
    let interval = export("du 21 au 30 mars 2014", "fr", &options()).unwrap();
    let weekly = export("le lundi et mardi à 14h", "fr", &options()).unwrap();
    let mut schedules = interval;
    schedules.extend(weekly);
    let fused = cohesion::fuse(schedules);
    assert_eq!(fused.len(), 1);
    assert_eq!(
        fused[0].rrule,
        "DTSTART:20140321\nRRULE:FREQ=WEEKLY;BYDAY=MO,TU;BYHOUR=14;BYMINUTE=0;UNTIL=20140330T140000"
    );
    assert_eq!(fused[0].duration, 0);
}

#[test]
fn past_dates_are_dropped_with_only_future() {
    let mut options = options();
    options.only_future = true;
    options.reference = Some(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
    let records = export("Le 4 mars 1990 à 18h30", "fr", &options).unwrap();
    assert!(records.is_empty());

    let records = export("Le 4 mars 2015 à 18h30", "fr", &options).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn invalid_dates_are_dropped_by_default() {
    let records = export("le 30 février 2015", "fr", &options()).unwrap();
    assert!(records.is_empty());
}

#[test]
fn near_duplicate_hits_pack_into_one_rule() {
    // the same single date mentioned twice
    let records = export(
        "Le 4 mars 2015 à 18h30. Rendez-vous le 4 mars 2015 à 18h30.",
        "fr",
        &options(),
    )
    .unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn unsupported_locale_fails() {
    assert!(export("Le 4 mars 2015", "de", &options()).is_err());
}

#[test]
fn empty_text_yields_empty_schedule() {
    let records = export("", "fr", &options()).unwrap();
    assert!(records.is_empty());
}
