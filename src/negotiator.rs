//! Tries connection candidates in priority order until one yields a session.

use std::mem;

use log::{debug, info, warn};
use thiserror::Error;

use crate::candidates::ConnectionCandidate;
use crate::config::Credentials;
use crate::email::{EmailError, MailSession};

pub const PORT_HINT: &str =
    "Check host/port/security. For SSL use port 993, for STARTTLS use port 143.";

const UNKNOWN_ERROR: &str = "Unknown IMAP error.";

/// Protocol-level errors collected during a single connection attempt.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<String>,
}

impl Diagnostics {
    pub fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Records the error of a failed stage and passes the result through.
    pub fn track<T>(&mut self, result: Result<T, EmailError>) -> Result<T, EmailError> {
        if let Err(e) = &result {
            self.errors.push(e.to_string());
        }
        result
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn drain(&mut self) -> Vec<String> {
        mem::take(&mut self.errors)
    }
}

/// What one attempt produced: the session or its error, plus whatever
/// diagnostics piled up on the way.
pub struct Attempt<S> {
    pub outcome: Result<S, EmailError>,
    pub diagnostics: Diagnostics,
}

/// Something that can open a mailbox session for a candidate. A failed
/// attempt must have closed its own connection before returning.
pub trait SessionOpener {
    type Session: MailSession;

    fn open(&mut self, candidate: &ConnectionCandidate, credentials: &Credentials)
        -> Attempt<Self::Session>;
}

/// Owns a live session and logs it out exactly once, on `close` or on drop.
pub struct OpenSession<S: MailSession> {
    inner: Option<S>,
}

impl<S: MailSession> OpenSession<S> {
    pub fn new(session: S) -> Self {
        Self { inner: Some(session) }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    pub fn close(&mut self) {
        if let Some(mut session) = self.inner.take() {
            match session.logout() {
                Ok(()) => debug!("Session logged out"),
                Err(e) => warn!("Logout failed: {}", e),
            }
        }
    }
}

impl<S: MailSession> MailSession for OpenSession<S> {
    fn count_matching(&mut self, criteria: &str) -> Result<usize, EmailError> {
        match self.inner.as_mut() {
            Some(session) => session.count_matching(criteria),
            None => Err(EmailError::ImapError("session already closed".to_string())),
        }
    }

    fn logout(&mut self) -> Result<(), EmailError> {
        self.close();
        Ok(())
    }
}

impl<S: MailSession> Drop for OpenSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct ConnectionResult<S: MailSession> {
    pub session: OpenSession<S>,
    pub candidate: ConnectionCandidate,
}

impl<S: MailSession> ConnectionResult<S> {
    pub fn insecure(&self) -> bool {
        self.candidate.insecure
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Connection failed: {last_error} {hint}")]
pub struct NegotiationFailure {
    pub last_error: String,
    pub hint: &'static str,
    pub attempts: usize,
}

/// Opens the first candidate that works, in list order.
///
/// Each candidate gets exactly one attempt. The diagnostics of every attempt
/// are drained before the next one starts; when all fail, the error of the
/// last attempt is reported along with a hint about conventional ports.
pub fn negotiate<O: SessionOpener>(
    opener: &mut O,
    candidates: &[ConnectionCandidate],
    credentials: &Credentials,
) -> Result<ConnectionResult<O::Session>, NegotiationFailure> {
    let mut last_error: Option<String> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        debug!("Attempt {}/{}: {}", index + 1, candidates.len(), candidate);
        let Attempt {
            outcome,
            mut diagnostics,
        } = opener.open(candidate, credentials);
        let errors = diagnostics.drain();

        match outcome {
            Ok(session) => {
                if !errors.is_empty() {
                    debug!(
                        "Discarding diagnostics from successful attempt: {}",
                        errors.join(" | ")
                    );
                }
                info!("Connected using {}", candidate);
                return Ok(ConnectionResult {
                    session: OpenSession::new(session),
                    candidate: candidate.clone(),
                });
            }
            Err(e) => {
                debug!("Attempt {} failed: {}", index + 1, e);
                last_error = if errors.is_empty() {
                    Some(e.to_string())
                } else {
                    Some(errors.join(" | "))
                };
            }
        }
    }

    Err(NegotiationFailure {
        last_error: last_error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
        hint: PORT_HINT,
        attempts: candidates.len(),
    })
}
