use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregator::Aggregation;
use crate::window::{DailyCount, DateWindow};

/// Incoming-mail volume for one request. Built once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub total_in_range: u64,
    pub days_in_range: u32,
    pub daily_counts: Vec<DailyCount>,
    pub today_count: u32,
    pub today_per_minute: f64,
    pub failed_queries: u32,
}

impl Report {
    pub fn assemble(window: &DateWindow, aggregation: Aggregation) -> Self {
        let total_in_range = aggregation
            .daily_counts
            .iter()
            .map(|day| u64::from(day.count))
            .sum();

        Self {
            window_start: window.start,
            window_end: window.end,
            total_in_range,
            days_in_range: window.day_count,
            daily_counts: aggregation.daily_counts,
            today_count: aggregation.today_count,
            today_per_minute: aggregation.today_per_minute,
            failed_queries: aggregation.failed_queries,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total incoming (selected range): {}", self.total_in_range)?;
        writeln!(f, "Today incoming:                  {}", self.today_count)?;
        writeln!(f, "Today average / minute:          {:.4}", self.today_per_minute)?;
        writeln!(
            f,
            "Range: {} to {} ({} days)",
            self.window_start, self.window_end, self.days_in_range
        )?;
        writeln!(f)?;
        writeln!(f, "{:<12} {:>14}", "Date (UTC)", "Incoming mails")?;
        for day in &self.daily_counts {
            writeln!(f, "{:<12} {:>14}", day.date, day.count)?;
        }
        if self.failed_queries > 0 {
            writeln!(f)?;
            writeln!(f, "{} search(es) failed and were counted as 0", self.failed_queries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Report {
        let window = DateWindow::plan(date(2024, 1, 1), date(2024, 1, 3)).unwrap();
        let mut daily_counts = window.zeroed_counts();
        daily_counts[0].count = 2;
        daily_counts[1].count = 5;
        Report::assemble(
            &window,
            Aggregation {
                daily_counts,
                today_count: 30,
                minutes_elapsed_today: 15,
                today_per_minute: 2.0,
                failed_queries: 0,
            },
        )
    }

    #[test]
    fn total_is_sum_of_days() {
        let report = sample();
        assert_eq!(report.total_in_range, 7);
        assert_eq!(report.days_in_range, 3);
        assert_eq!(report.daily_counts.len(), 3);
        assert_eq!(report.window_end, date(2024, 1, 3));
    }

    #[test]
    fn serializes_with_iso_dates() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["window_start"], "2024-01-01");
        assert_eq!(json["total_in_range"], 7);
        assert_eq!(json["daily_counts"][1]["date"], "2024-01-02");
        assert_eq!(json["daily_counts"][1]["count"], 5);
        assert_eq!(json["today_per_minute"], 2.0);
    }

    #[test]
    fn text_rounds_rate_to_four_places() {
        let text = sample().to_string();
        assert!(text.contains("Today average / minute:          2.0000"));
        assert!(text.contains("Range: 2024-01-01 to 2024-01-03 (3 days)"));
        assert!(!text.contains("failed"));
    }
}
