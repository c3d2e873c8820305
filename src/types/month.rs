use chrono::{Datelike, Months, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

/// A calendar month. QCLCD archives are published one per month, so this is
/// the unit every archive, station list and observation file is keyed on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month(NaiveDate);

impl Month {
    /// Returns `None` when `month` is not in `1..=12` or the year is out of range.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Month)
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Month(date - chrono::Days::new(u64::from(date.day0())))
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    /// The following month; December wraps to January of the next year.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Month)
    }

    /// Six digit `YYYYMM` prefix used by archive and inner file names.
    pub fn prefix(self) -> String {
        format!("{:04}{:02}", self.year(), self.month())
    }

    /// Every month from `start` to `end`, both inclusive. Empty when `start > end`.
    pub fn range(start: Month, end: Month) -> Vec<Month> {
        let mut months = Vec::new();
        let mut current = Some(start);
        while let Some(month) = current {
            if month > end {
                break;
            }
            months.push(month);
            current = month.next();
        }
        months
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// The set of months a batch must process, each with the zip codes whose
/// requested date range covers that month.
///
/// Months between the earliest start and the latest end are all present, even
/// when no zip code is active in one of them.
///
/// ```
/// use chrono::NaiveDate;
/// use qclcd_weather::{Month, MonthSchedule};
///
/// let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
/// let schedule = MonthSchedule::from_ranges(&[
///     (12601, d(2013, 3, 15), d(2013, 4, 2)),
///     (94611, d(2013, 4, 1), d(2013, 5, 31)),
/// ]);
///
/// let april = Month::new(2013, 4).unwrap();
/// assert_eq!(schedule.zips(april), Some(&[12601, 94611][..]));
/// assert_eq!(schedule.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthSchedule {
    months: BTreeMap<Month, Vec<u32>>,
}

impl MonthSchedule {
    /// Builds the schedule from `(zip, start, end)` ranges. Only the month of
    /// each date matters. Zip codes keep the order they were given in.
    pub fn from_ranges(ranges: &[(u32, NaiveDate, NaiveDate)]) -> Self {
        let bounds = ranges
            .iter()
            .map(|&(_, start, end)| (Month::of(start), Month::of(end)))
            .filter(|(start, end)| start <= end);
        let first = bounds.clone().map(|(start, _)| start).min();
        let last = bounds.map(|(_, end)| end).max();

        let mut months = BTreeMap::new();
        if let (Some(first), Some(last)) = (first, last) {
            for month in Month::range(first, last) {
                let zips = ranges
                    .iter()
                    .filter(|&&(_, start, end)| Month::of(start) <= month && month <= Month::of(end))
                    .map(|&(zip, _, _)| zip)
                    .collect();
                months.insert(month, zips);
            }
        }
        Self { months }
    }

    pub fn zips(&self, month: Month) -> Option<&[u32]> {
        self.months.get(&month).map(Vec::as_slice)
    }

    /// Months in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (Month, &[u32])> {
        self.months.iter().map(|(month, zips)| (*month, zips.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}
