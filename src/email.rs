use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use imap::Session;
use log::debug;
use native_tls::{TlsConnector, TlsStream};
use thiserror::Error;

use crate::candidates::{ConnectionCandidate, Transport};
use crate::config::Credentials;
use crate::negotiator::{Attempt, Diagnostics, SessionOpener};

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("IMAP error: {0}")]
    ImapError(String),

    #[error("Can't connect to {0}")]
    ConnectError(String),

    #[error("TLS error: {0}")]
    TlsError(#[from] native_tls::Error),

    #[error("TLS handshake failed: {0}")]
    HandshakeError(String),

    #[error("Login failed: {0}")]
    LoginError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A logged-in session with a mailbox already selected.
pub trait MailSession {
    /// Number of messages matching an IMAP SEARCH criteria string.
    fn count_matching(&mut self, criteria: &str) -> Result<usize, EmailError>;

    fn logout(&mut self) -> Result<(), EmailError>;
}

pub enum ImapSession {
    Tls(Session<TlsStream<TcpStream>>),
    Plain(Session<TcpStream>),
}

impl ImapSession {
    /// Read-only select, so counting never touches \Seen flags.
    fn examine(&mut self, mailbox: &str) -> Result<u32, EmailError> {
        let selected = match self {
            ImapSession::Tls(session) => session.examine(mailbox),
            ImapSession::Plain(session) => session.examine(mailbox),
        };
        selected
            .map(|mailbox| mailbox.exists)
            .map_err(|e| EmailError::ImapError(format!("EXAMINE {} failed: {}", mailbox, e)))
    }
}

impl MailSession for ImapSession {
    fn count_matching(&mut self, criteria: &str) -> Result<usize, EmailError> {
        let uids = match self {
            ImapSession::Tls(session) => session.uid_search(criteria),
            ImapSession::Plain(session) => session.uid_search(criteria),
        };
        let uids = uids.map_err(|e| EmailError::ImapError(e.to_string()))?;
        Ok(uids.len())
    }

    fn logout(&mut self) -> Result<(), EmailError> {
        let result = match self {
            ImapSession::Tls(session) => session.logout(),
            ImapSession::Plain(session) => session.logout(),
        };
        result.map_err(|e| EmailError::ImapError(e.to_string()))
    }
}

/// Opens real IMAP sessions over the network. Every stage of an attempt
/// shares the same timeout and nothing is retried.
#[derive(Debug, Clone)]
pub struct ImapOpener {
    timeout: Duration,
}

impl ImapOpener {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn connect_tcp(
        &self,
        host: &str,
        port: u16,
        diagnostics: &mut Diagnostics,
    ) -> Result<TcpStream, EmailError> {
        let target = format!("{}:{}", host, port);
        let addrs = (host, port).to_socket_addrs().map_err(|e| {
            diagnostics.push(format!("{}: {}", target, e));
            EmailError::ConnectError(target.clone())
        })?;

        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    return Ok(stream);
                }
                Err(e) => diagnostics.push(format!("{}: {}", addr, e)),
            }
        }

        Err(EmailError::ConnectError(target))
    }

    fn connect(
        &self,
        candidate: &ConnectionCandidate,
        credentials: &Credentials,
        diagnostics: &mut Diagnostics,
    ) -> Result<ImapSession, EmailError> {
        let host = candidate.host.as_str();
        let tcp = self.connect_tcp(host, candidate.port, diagnostics)?;

        let mut session = match candidate.transport {
            Transport::Ssl => {
                let tls = diagnostics.track(tls_connector(candidate.validate_certs))?;
                let stream = diagnostics.track(
                    tls.connect(host, tcp)
                        .map_err(|e| EmailError::HandshakeError(e.to_string())),
                )?;
                let client = diagnostics.track(greet(imap::Client::new(stream)))?;
                ImapSession::Tls(diagnostics.track(login(client, credentials))?)
            }
            Transport::StartTls => {
                let client = diagnostics.track(greet(imap::Client::new(tcp)))?;
                let tls = diagnostics.track(tls_connector(candidate.validate_certs))?;
                let client = diagnostics.track(
                    client
                        .secure(host, &tls)
                        .map_err(|e| EmailError::HandshakeError(e.to_string())),
                )?;
                ImapSession::Tls(diagnostics.track(login(client, credentials))?)
            }
            Transport::Plain => {
                let client = diagnostics.track(greet(imap::Client::new(tcp)))?;
                ImapSession::Plain(diagnostics.track(login(client, credentials))?)
            }
        };

        match session.examine(&candidate.mailbox) {
            Ok(exists) => {
                debug!("{} selected, {} messages", candidate.mailbox_uri(), exists);
                Ok(session)
            }
            Err(e) => {
                diagnostics.push(e.to_string());
                if let Err(logout_err) = session.logout() {
                    diagnostics.push(logout_err.to_string());
                }
                Err(e)
            }
        }
    }
}

impl SessionOpener for ImapOpener {
    type Session = ImapSession;

    fn open(
        &mut self,
        candidate: &ConnectionCandidate,
        credentials: &Credentials,
    ) -> Attempt<ImapSession> {
        let mut diagnostics = Diagnostics::default();
        let outcome = self.connect(candidate, credentials, &mut diagnostics);
        Attempt { outcome, diagnostics }
    }
}

fn tls_connector(validate_certs: bool) -> Result<TlsConnector, EmailError> {
    let mut builder = TlsConnector::builder();
    if !validate_certs {
        builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }
    Ok(builder.build()?)
}

fn greet<T: Read + Write>(mut client: imap::Client<T>) -> Result<imap::Client<T>, EmailError> {
    client
        .read_greeting()
        .map_err(|e| EmailError::ImapError(format!("No greeting from server: {}", e)))?;
    Ok(client)
}

fn login<T: Read + Write>(
    client: imap::Client<T>,
    credentials: &Credentials,
) -> Result<Session<T>, EmailError> {
    client
        .login(&credentials.username, &credentials.password)
        .map_err(|(e, _client)| EmailError::LoginError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Security;
    use std::net::TcpListener;

    fn credentials() -> Credentials {
        Credentials {
            username: "alice".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn refused_port_records_each_address() {
        // Bind then drop to get a local port nothing is listening on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let candidate = crate::candidates::build_candidates("127.0.0.1", port, Security::Ssl, "INBOX")
            .remove(0);

        let mut opener = ImapOpener::new(Duration::from_secs(2));
        let attempt = opener.open(&candidate, &credentials());

        match attempt.outcome {
            Err(EmailError::ConnectError(target)) => assert_eq!(target, format!("127.0.0.1:{}", port)),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("connected to a closed port"),
        }
        assert_eq!(attempt.diagnostics.len(), 1);
    }

    #[test]
    fn login_error_message_is_readable() {
        let err = EmailError::LoginError("NO [AUTHENTICATIONFAILED] Invalid credentials".to_string());
        assert_eq!(err.to_string(), "Login failed: NO [AUTHENTICATIONFAILED] Invalid credentials");
    }
}
