pub mod aggregator;
pub mod app;
pub mod candidates;
pub mod config;
pub mod email;
pub mod negotiator;
pub mod report;
pub mod window;

// Re-export commonly used types
pub use app::{run_report, AppError, AppResult, ReportOutcome};
pub use candidates::{build_candidates, ConnectionCandidate, Transport};
pub use config::{Config, Credentials, ReportRequest, RequestInput, Security};
pub use email::{EmailError, ImapOpener, MailSession};
pub use negotiator::{negotiate, ConnectionResult, NegotiationFailure, SessionOpener};
pub use report::Report;
pub use window::{DailyCount, DateWindow, WindowError};
