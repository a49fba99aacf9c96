use chrono::{Duration, NaiveDate};
use serde::Serialize;
use thiserror::Error;

/// Longest window a single report may cover, inclusive of both ends.
pub const MAX_WINDOW_DAYS: i64 = 180;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("Start date must be before or equal to end date.")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Date range too large. Please use {max} days or less.")]
    RangeTooLarge { days: i64, max: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub day_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u32,
}

impl DateWindow {
    pub fn plan(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::InvalidRange { start, end });
        }
        let days = (end - start).num_days() + 1;
        if days > MAX_WINDOW_DAYS {
            return Err(WindowError::RangeTooLarge {
                days,
                max: MAX_WINDOW_DAYS,
            });
        }
        Ok(Self {
            start,
            end,
            day_count: days as u32,
        })
    }

    /// The `days` days ending on `today`, both inclusive.
    pub fn ending_on(today: NaiveDate, days: u32) -> Result<Self, WindowError> {
        let days = i64::from(days.max(1));
        let too_large = WindowError::RangeTooLarge {
            days,
            max: MAX_WINDOW_DAYS,
        };
        if days > MAX_WINDOW_DAYS {
            return Err(too_large);
        }
        let start = today
            .checked_sub_signed(Duration::days(days - 1))
            .ok_or(too_large)?;
        Self::plan(start, today)
    }

    /// Every date in the window, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        // every offset lands on or before `end`, so none is dropped
        (0..self.day_count)
            .filter_map(move |offset| start.checked_add_signed(Duration::days(i64::from(offset))))
    }

    /// One zero entry per day, so a day whose query fails still shows up.
    pub fn zeroed_counts(&self) -> Vec<DailyCount> {
        self.days().map(|date| DailyCount { date, count: 0 }).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_day() {
        let window = DateWindow::plan(date(2024, 3, 10), date(2024, 3, 10)).unwrap();
        assert_eq!(window.day_count, 1);
        assert_eq!(window.days().collect::<Vec<_>>(), vec![date(2024, 3, 10)]);
    }

    #[test]
    fn limit_is_inclusive() {
        let start = date(2024, 1, 1);
        let window = DateWindow::plan(start, start + Duration::days(179)).unwrap();
        assert_eq!(window.day_count, 180);

        let err = DateWindow::plan(start, start + Duration::days(180)).unwrap_err();
        assert_eq!(err, WindowError::RangeTooLarge { days: 181, max: 180 });
        assert_eq!(err.to_string(), "Date range too large. Please use 180 days or less.");
    }

    #[test]
    fn reversed_dates_are_invalid() {
        let err = DateWindow::plan(date(2024, 1, 5), date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, WindowError::InvalidRange { .. }));
    }

    #[test]
    fn days_cross_month_and_leap_day() {
        let window = DateWindow::plan(date(2024, 2, 28), date(2024, 3, 1)).unwrap();
        let days: Vec<_> = window.days().collect();
        assert_eq!(days, vec![date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]);
    }

    #[test]
    fn zeroed_counts_cover_every_day() {
        let window = DateWindow::plan(date(2023, 12, 30), date(2024, 1, 2)).unwrap();
        let counts = window.zeroed_counts();
        assert_eq!(counts.len(), 4);
        assert!(counts.iter().all(|c| c.count == 0));
        assert_eq!(counts[0].date, window.start);
        assert_eq!(counts[3].date, window.end);
    }

    #[test]
    fn ending_on_today_covers_last_week() {
        let window = DateWindow::ending_on(date(2024, 1, 7), 7).unwrap();
        assert_eq!(window.start, date(2024, 1, 1));
        assert_eq!(window.day_count, 7);
    }

    #[test]
    fn oversized_default_window_is_an_error() {
        let err = DateWindow::ending_on(date(2024, 1, 7), u32::MAX).unwrap_err();
        assert_eq!(
            err,
            WindowError::RangeTooLarge {
                days: i64::from(u32::MAX),
                max: 180
            }
        );
        let err = DateWindow::ending_on(date(2024, 1, 7), 181).unwrap_err();
        assert!(matches!(err, WindowError::RangeTooLarge { days: 181, .. }));
        assert_eq!(DateWindow::ending_on(date(2024, 1, 7), 180).unwrap().day_count, 180);
    }

    #[test]
    fn last_calendar_day_is_a_valid_window() {
        let window = DateWindow::plan(NaiveDate::MAX, NaiveDate::MAX).unwrap();
        assert_eq!(window.days().collect::<Vec<_>>(), vec![NaiveDate::MAX]);
        assert_eq!(window.zeroed_counts().len(), 1);
    }
}
