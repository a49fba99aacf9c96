use chrono::{DateTime, Utc};
use log::{info, warn};
use thiserror::Error;

use crate::aggregator::aggregate;
use crate::candidates::{build_candidates, ConnectionCandidate};
use crate::config::{ReportRequest, ValidationError};
use crate::negotiator::{negotiate, ConnectionResult, NegotiationFailure, SessionOpener};
use crate::report::Report;
use crate::window::{DateWindow, WindowError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Window(#[from] WindowError),

    #[error("{0}")]
    Negotiation(#[from] NegotiationFailure),

    #[error("Processing failed: {0}")]
    Processing(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report: Report,
    /// Connection notes meant for the user, e.g. the insecure-fallback warning.
    pub notices: Vec<String>,
}

pub fn connection_notice(candidate: &ConnectionCandidate) -> String {
    if candidate.insecure {
        "Connected using plain IMAP (no TLS). This is insecure; use SSL or STARTTLS if possible."
            .to_string()
    } else {
        format!("Connected using {}", candidate.mailbox_uri())
    }
}

/// Plans the window, negotiates a session, counts, and assembles the report.
///
/// The window is checked before any network traffic. The session is logged
/// out on every path once negotiation has succeeded.
pub fn run_report<O: SessionOpener>(
    opener: &mut O,
    request: &ReportRequest,
    now: DateTime<Utc>,
) -> AppResult<ReportOutcome> {
    let window = DateWindow::plan(request.start, request.end)?;

    let candidates = build_candidates(&request.host, request.port, request.security, &request.mailbox);
    let ConnectionResult {
        mut session,
        candidate,
    } = negotiate(opener, &candidates, &request.credentials)?;

    let notice = connection_notice(&candidate);
    if candidate.insecure {
        warn!("{}", notice);
    }

    let aggregation = aggregate(&mut session, &window, now);
    session.close();
    let aggregation = aggregation.map_err(|e| AppError::Processing(e.to_string()))?;

    let report = Report::assemble(&window, aggregation);
    info!(
        "{} messages from {} to {}, {} today",
        report.total_in_range, report.window_start, report.window_end, report.today_count
    );

    Ok(ReportOutcome {
        report,
        notices: vec![notice],
    })
}
