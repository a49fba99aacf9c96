//! Per-day message counts over a live session.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use log::{debug, warn};
use thiserror::Error;

use crate::email::MailSession;
use crate::window::{DailyCount, DateWindow};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("no calendar day follows {0}")]
    DateOutOfRange(NaiveDate),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub daily_counts: Vec<DailyCount>,
    pub today_count: u32,
    pub minutes_elapsed_today: u32,
    pub today_per_minute: f64,
    /// Queries that errored and were counted as zero.
    pub failed_queries: u32,
}

/// IMAP search date, e.g. `01-Jan-2024`.
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

/// Search criteria for the half-open day `[day, day + 1)`.
pub fn day_criteria(day: NaiveDate) -> Result<String, AggregateError> {
    let next = day.succ_opt().ok_or(AggregateError::DateOutOfRange(day))?;
    Ok(format!("SINCE {} BEFORE {}", imap_date(day), imap_date(next)))
}

/// Whole minutes since UTC midnight, never less than 1.
pub fn minutes_elapsed_today(now: DateTime<Utc>) -> u32 {
    (now.hour() * 60 + now.minute()).max(1)
}

/// Counts one day. A failed query reads as zero; the flag says whether it
/// failed.
fn count_day<S: MailSession>(session: &mut S, day: NaiveDate) -> Result<(u32, bool), AggregateError> {
    let criteria = day_criteria(day)?;
    match session.count_matching(&criteria) {
        Ok(count) => {
            debug!("{}: {} messages", criteria, count);
            Ok((u32::try_from(count).unwrap_or(u32::MAX), false))
        }
        Err(e) => {
            warn!("Search '{}' failed, counting as 0: {}", criteria, e);
            Ok((0, true))
        }
    }
}

/// Runs one search per day of the window, then one for today (UTC), all
/// sequentially on the same session.
pub fn aggregate<S: MailSession>(
    session: &mut S,
    window: &DateWindow,
    now: DateTime<Utc>,
) -> Result<Aggregation, AggregateError> {
    let mut daily_counts = window.zeroed_counts();
    let mut failed_queries = 0;

    for entry in daily_counts.iter_mut() {
        let (count, failed) = count_day(session, entry.date)?;
        entry.count = count;
        failed_queries += u32::from(failed);
    }

    let (today_count, failed) = count_day(session, now.date_naive())?;
    failed_queries += u32::from(failed);

    let minutes_elapsed_today = minutes_elapsed_today(now);
    let today_per_minute = f64::from(today_count) / f64::from(minutes_elapsed_today);

    Ok(Aggregation {
        daily_counts,
        today_count,
        minutes_elapsed_today,
        today_per_minute,
        failed_queries,
    })
}
