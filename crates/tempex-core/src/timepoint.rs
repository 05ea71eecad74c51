//! The normalized AST produced by the grammars: a closed family of
//! tagged variants, each with its own validity invariants.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Number of minutes from midnight to 23:59, the all-day sentinel.
pub const ALL_DAY: i64 = 1439;

pub(crate) fn day_end() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

pub(crate) fn weekday_from_index(idx: u8) -> Weekday {
    match idx {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// A calendar date tolerating missing year and month, so that partial
/// matches can be completed later by list/interval inheritance or by
/// the year transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: u32,
}

impl Date {
    pub fn new(year: Option<i32>, month: Option<u32>, day: u32) -> Self {
        Date { year, month, day }
    }

    pub fn full(year: i32, month: u32, day: u32) -> Self {
        Date {
            year: Some(year),
            month: Some(month),
            day,
        }
    }

    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year?, self.month?, self.day)
    }

    pub fn is_valid(&self) -> bool {
        self.to_naive().is_some()
    }

    pub fn is_future(&self, reference: NaiveDate) -> bool {
        self.to_naive().is_some_and(|date| date >= reference)
    }
}

/// A civil time of day. Hour 24 is only allowed with minute 0 and
/// stands for end-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub hour: u32,
    pub minute: u32,
}

impl Time {
    pub fn new(hour: u32, minute: u32) -> Self {
        Time { hour, minute }
    }

    pub fn is_valid(&self) -> bool {
        (self.hour < 24 && self.minute < 60) || (self.hour == 24 && self.minute == 0)
    }

    /// Minutes from midnight; 24:00 maps to 1440.
    pub fn total_minutes(&self) -> i64 {
        i64::from(self.hour) * 60 + i64::from(self.minute)
    }

    pub fn to_naive(&self) -> NaiveTime {
        if self.hour == 24 {
            return day_end();
        }
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: Time,
    pub end: Time,
}

impl TimeInterval {
    pub fn new(start: Time, end: Time) -> Self {
        TimeInterval { start, end }
    }

    /// A single time is an interval whose bounds coincide.
    pub fn single(time: Time) -> Self {
        TimeInterval {
            start: time,
            end: time,
        }
    }

    pub fn all_day() -> Self {
        TimeInterval {
            start: Time::new(0, 0),
            end: Time::new(23, 59),
        }
    }

    pub fn is_single_time(&self) -> bool {
        self.start == self.end
    }

    pub fn is_all_day(&self) -> bool {
        *self == TimeInterval::all_day()
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_valid() && self.end.is_valid()
    }

    /// Window length in minutes, 0 for a single time. Negative spans
    /// (overnight) are only meaningful on continuous intervals and are
    /// clamped here.
    pub fn duration_minutes(&self) -> i64 {
        (self.end.total_minutes() - self.start.total_minutes()).max(0)
    }
}

/// An ordered list of dates; all but the last may be partial, and
/// inherit the missing month/year from the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateList {
    pub dates: Vec<Date>,
}

impl DateList {
    /// Build from grammar output. The last date must carry a month;
    /// a missing year is left for the year transmitter.
    pub fn from_match(mut dates: Vec<Date>) -> Option<Self> {
        let last = *dates.last()?;
        last.month?;
        for date in dates.iter_mut() {
            if date.month.is_none() {
                date.month = last.month;
            }
            if date.year.is_none() {
                date.year = last.year;
            }
        }
        Some(DateList { dates })
    }

    pub fn is_valid(&self) -> bool {
        !self.dates.is_empty() && self.dates.iter().all(Date::is_valid)
    }

    pub fn is_future(&self, reference: NaiveDate) -> bool {
        self.dates.iter().any(|d| d.is_future(reference))
    }
}

/// An inclusive date span. The start inherits missing fields from the
/// end; the undefined sentinel span stands for an unbounded recurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateInterval {
    pub start: Date,
    pub end: Date,
    pub excluded: Vec<String>,
}

impl DateInterval {
    pub fn new(start: Date, end: Date) -> Self {
        DateInterval {
            start,
            end,
            excluded: Vec::new(),
        }
    }

    /// Build from grammar output; the end date must be fully qualified.
    pub fn from_match(mut start: Date, end: Date) -> Option<Self> {
        end.year?;
        end.month?;
        if start.year.is_none() {
            start.year = end.year;
        }
        if start.month.is_none() {
            start.month = end.month;
        }
        Some(DateInterval::new(start, end))
    }

    pub fn undefined() -> Self {
        DateInterval::new(Date::full(1, 1, 1), Date::full(9999, 12, 31))
    }

    pub fn is_undefined(&self) -> bool {
        self.start == Date::full(1, 1, 1) && self.end == Date::full(9999, 12, 31)
    }

    pub fn is_valid(&self) -> bool {
        if self.is_undefined() {
            return false;
        }
        match (self.start.to_naive(), self.end.to_naive()) {
            (Some(start), Some(end)) => start <= end,
            _ => false,
        }
    }

    pub fn is_future(&self, reference: NaiveDate) -> bool {
        self.end.is_future(reference)
    }

    /// Every concrete date of the span, empty when partial or invalid.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let (Some(start), Some(end)) = (self.start.to_naive(), self.end.to_naive()) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut current = start;
        while current <= end {
            out.push(current);
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        out
    }

    pub fn contains_month_day(&self, month: u32, day: u32) -> bool {
        self.dates()
            .iter()
            .any(|d| d.month() == month && d.day() == day)
    }
}

/// A date with a time window; a missing end time collapses onto the
/// start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datetime {
    pub date: Date,
    pub start: Time,
    pub end: Time,
}

impl Datetime {
    pub fn new(date: Date, start: Time, end: Option<Time>) -> Self {
        Datetime {
            date,
            start,
            end: end.unwrap_or(start),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.date.is_valid() && self.start.is_valid() && self.end.is_valid()
    }

    pub fn is_future(&self, reference: NaiveDate) -> bool {
        self.date.is_future(reference)
    }
}

/// Several dates sharing one time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatetimeList {
    pub datetimes: Vec<Datetime>,
}

impl DatetimeList {
    pub fn from_match(dates: DateList, time: TimeInterval) -> Self {
        DatetimeList {
            datetimes: dates
                .dates
                .into_iter()
                .map(|date| Datetime::new(date, time.start, Some(time.end)))
                .collect(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.datetimes.is_empty() && self.datetimes.iter().all(Datetime::is_valid)
    }

    pub fn is_future(&self, reference: NaiveDate) -> bool {
        self.datetimes.iter().any(|dt| dt.is_future(reference))
    }
}

/// Every day in a date span, within a time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatetimeInterval {
    pub date_interval: DateInterval,
    pub time_interval: TimeInterval,
    pub excluded: Vec<String>,
}

impl DatetimeInterval {
    pub fn new(date_interval: DateInterval, time_interval: TimeInterval) -> Self {
        DatetimeInterval {
            date_interval,
            time_interval,
            excluded: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.date_interval.is_valid() && self.time_interval.is_valid()
    }

    pub fn is_future(&self, reference: NaiveDate) -> bool {
        self.date_interval.is_future(reference)
    }
}

/// A single uninterrupted span that may cross midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuousDatetimeInterval {
    pub start_date: Date,
    pub start_time: Time,
    pub end_date: Date,
    pub end_time: Time,
}

impl ContinuousDatetimeInterval {
    /// Build from grammar output; the end date must be fully qualified.
    pub fn from_match(
        mut start_date: Date,
        start_time: Time,
        end_date: Date,
        end_time: Time,
    ) -> Option<Self> {
        end_date.year?;
        end_date.month?;
        if start_date.year.is_none() {
            start_date.year = end_date.year;
        }
        if start_date.month.is_none() {
            start_date.month = end_date.month;
        }
        Some(ContinuousDatetimeInterval {
            start_date,
            start_time,
            end_date,
            end_time,
        })
    }

    pub fn start_datetime(&self) -> Option<NaiveDateTime> {
        Some(self.start_date.to_naive()?.and_time(self.start_time.to_naive()))
    }

    pub fn end_datetime(&self) -> Option<NaiveDateTime> {
        Some(self.end_date.to_naive()?.and_time(self.end_time.to_naive()))
    }

    pub fn is_valid(&self) -> bool {
        if !(self.start_time.is_valid() && self.end_time.is_valid()) {
            return false;
        }
        match (self.start_datetime(), self.end_datetime()) {
            (Some(start), Some(end)) => start < end,
            _ => false,
        }
    }

    pub fn is_future(&self, reference: NaiveDate) -> bool {
        self.end_date.is_future(reference)
    }

    /// Total duration in minutes, crossing midnight when needed.
    pub fn duration_minutes(&self) -> i64 {
        match (self.start_datetime(), self.end_datetime()) {
            (Some(start), Some(end)) => end.signed_duration_since(start).num_minutes().max(0),
            _ => 0,
        }
    }
}

/// An ordered set of weekday codes (MO..SU).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Weekdays {
    pub days: Vec<Weekday>,
}

impl Weekdays {
    /// Deduplicates and orders MO..SU.
    pub fn new(mut days: Vec<Weekday>) -> Self {
        days.sort_by_key(|d| d.num_days_from_monday());
        days.dedup();
        Weekdays { days }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// A weekly recurrence over a date span (or unbounded, when the span is
/// the undefined sentinel), within a time window, on a weekday set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyRecurrence {
    pub date_interval: DateInterval,
    pub time_interval: TimeInterval,
    pub weekdays: Weekdays,
    pub excluded: Vec<String>,
}

impl WeeklyRecurrence {
    pub fn new(date_interval: DateInterval, time_interval: TimeInterval, weekdays: Weekdays) -> Self {
        WeeklyRecurrence {
            date_interval,
            time_interval,
            weekdays,
            excluded: Vec::new(),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.date_interval.is_undefined()
    }

    pub fn is_valid(&self) -> bool {
        !self.weekdays.is_empty()
            && self.time_interval.is_valid()
            && (self.is_unlimited() || self.date_interval.is_valid())
    }

    pub fn is_future(&self, reference: NaiveDate) -> bool {
        self.is_unlimited() || self.date_interval.is_future(reference)
    }
}

/// Any variant of the normalized AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Timepoint {
    Date(Date),
    DateList(DateList),
    DateInterval(DateInterval),
    Datetime(Datetime),
    DatetimeList(DatetimeList),
    DatetimeInterval(DatetimeInterval),
    ContinuousDatetimeInterval(ContinuousDatetimeInterval),
    WeeklyRecurrence(WeeklyRecurrence),
}

impl Timepoint {
    pub fn is_valid(&self) -> bool {
        match self {
            Timepoint::Date(t) => t.is_valid(),
            Timepoint::DateList(t) => t.is_valid(),
            Timepoint::DateInterval(t) => t.is_valid(),
            Timepoint::Datetime(t) => t.is_valid(),
            Timepoint::DatetimeList(t) => t.is_valid(),
            Timepoint::DatetimeInterval(t) => t.is_valid(),
            Timepoint::ContinuousDatetimeInterval(t) => t.is_valid(),
            Timepoint::WeeklyRecurrence(t) => t.is_valid(),
        }
    }

    pub fn is_future(&self, reference: NaiveDate) -> bool {
        match self {
            Timepoint::Date(t) => t.is_future(reference),
            Timepoint::DateList(t) => t.is_future(reference),
            Timepoint::DateInterval(t) => t.is_future(reference),
            Timepoint::Datetime(t) => t.is_future(reference),
            Timepoint::DatetimeList(t) => t.is_future(reference),
            Timepoint::DatetimeInterval(t) => t.is_future(reference),
            Timepoint::ContinuousDatetimeInterval(t) => t.is_future(reference),
            Timepoint::WeeklyRecurrence(t) => t.is_future(reference),
        }
    }

    /// Attach an exclusion rrule to a constructive timepoint. Variants
    /// that cannot carry exclusions ignore the call.
    pub(crate) fn attach_exclusion(&mut self, rrule: String) {
        match self {
            Timepoint::DateInterval(t) => t.excluded.push(rrule),
            Timepoint::DatetimeInterval(t) => t.excluded.push(rrule),
            Timepoint::WeeklyRecurrence(t) => t.excluded.push(rrule),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dates_are_flagged_not_raised() {
        assert!(!Date::full(2015, 2, 30).is_valid());
        assert!(Date::full(2016, 2, 29).is_valid());
        assert!(!Date::new(None, Some(3), 5).is_valid());
    }

    #[test]
    fn end_of_day_time() {
        assert!(Time::new(24, 0).is_valid());
        assert!(!Time::new(24, 1).is_valid());
        assert!(!Time::new(25, 0).is_valid());
        assert_eq!(Time::new(24, 0).total_minutes(), 1440);
    }

    #[test]
    fn date_list_inherits_from_last() {
        let list = DateList::from_match(vec![
            Date::new(None, None, 5),
            Date::new(None, None, 8),
            Date::full(2015, 3, 10),
        ])
        .unwrap();
        assert_eq!(list.dates[0], Date::full(2015, 3, 5));
        assert_eq!(list.dates[1], Date::full(2015, 3, 8));
    }

    #[test]
    fn date_list_requires_month_on_last() {
        assert!(DateList::from_match(vec![Date::new(None, None, 5)]).is_none());
        // a missing year is tolerated, it is resolved later
        assert!(
            DateList::from_match(vec![
                Date::new(None, None, 5),
                Date::new(None, Some(3), 8),
            ])
            .is_some()
        );
    }

    #[test]
    fn interval_inheritance_and_ordering() {
        let interval =
            DateInterval::from_match(Date::new(None, None, 5), Date::full(2015, 10, 7)).unwrap();
        assert_eq!(interval.start, Date::full(2015, 10, 5));
        assert!(interval.is_valid());

        let backwards =
            DateInterval::from_match(Date::full(2015, 10, 9), Date::full(2015, 10, 7)).unwrap();
        assert!(!backwards.is_valid());

        assert!(DateInterval::from_match(Date::new(None, None, 5), Date::new(None, Some(9), 29))
            .is_none());
    }

    #[test]
    fn undefined_interval_is_not_valid_by_itself() {
        let undefined = DateInterval::undefined();
        assert!(undefined.is_undefined());
        assert!(!undefined.is_valid());
    }

    #[test]
    fn continuous_interval_crosses_midnight() {
        let cont = ContinuousDatetimeInterval::from_match(
            Date::new(None, None, 5),
            Time::new(22, 0),
            Date::full(2015, 4, 6),
            Time::new(8, 0),
        )
        .unwrap();
        assert!(cont.is_valid());
        assert_eq!(cont.duration_minutes(), 600);
    }

    #[test]
    fn weekdays_are_ordered_and_unique() {
        let days = Weekdays::new(vec![Weekday::Fri, Weekday::Mon, Weekday::Fri]);
        assert_eq!(days.days, vec![Weekday::Mon, Weekday::Fri]);
    }
}
