//! Ordered list of ways to reach a mailbox when the server's exact transport
//! requirements are unknown.

use std::fmt;

use crate::config::{Security, DEFAULT_MAILBOX};

pub const IMAP_PORT: u16 = 143;
pub const IMAPS_PORT: u16 = 993;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// TLS from the first byte.
    Ssl,
    /// Plain greeting, then STARTTLS upgrade.
    StartTls,
    /// No encryption at all.
    Plain,
}

impl From<Security> for Transport {
    fn from(security: Security) -> Self {
        match security {
            Security::Ssl => Transport::Ssl,
            Security::StartTls => Transport::StartTls,
        }
    }
}

/// One fully specified way to address and secure a mailbox connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCandidate {
    pub host: String,
    pub port: u16,
    pub transport: Transport,
    pub validate_certs: bool,
    pub mailbox: String,
    pub insecure: bool,
}

impl ConnectionCandidate {
    /// Transport and security tag, e.g. `imap/tls/novalidate-cert`.
    pub fn flags(&self) -> String {
        let base = match self.transport {
            Transport::Ssl => "imap/ssl",
            Transport::StartTls => "imap/tls",
            Transport::Plain => return "imap/notls".to_string(),
        };
        if self.validate_certs {
            base.to_string()
        } else {
            format!("{}/novalidate-cert", base)
        }
    }

    pub fn mailbox_uri(&self) -> String {
        format!("{{{}:{}/{}}}{}", self.host, self.port, self.flags(), self.mailbox)
    }
}

impl fmt::Display for ConnectionCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mailbox_uri())
    }
}

struct CandidateList {
    host: String,
    mailbox: String,
    items: Vec<ConnectionCandidate>,
}

impl CandidateList {
    fn push(&mut self, port: u16, transport: Transport, validate_certs: bool, insecure: bool) {
        let candidate = ConnectionCandidate {
            host: self.host.clone(),
            port,
            transport,
            validate_certs,
            mailbox: self.mailbox.clone(),
            insecure,
        };
        let uri = candidate.mailbox_uri();
        if self.items.iter().any(|existing| existing.mailbox_uri() == uri) {
            return;
        }
        self.items.push(candidate);
    }
}

/// Builds the prioritized, duplicate-free candidate list for a server.
///
/// The declared port and security come first (validated, then not), followed
/// by the other handshake style on its conventional port, and finally
/// plaintext attempts which are flagged insecure.
pub fn build_candidates(
    host: &str,
    port: u16,
    security: Security,
    mailbox: &str,
) -> Vec<ConnectionCandidate> {
    let mailbox = match mailbox.trim() {
        "" => DEFAULT_MAILBOX,
        name => name,
    };
    let mut list = CandidateList {
        host: host.to_string(),
        mailbox: mailbox.to_string(),
        items: Vec::with_capacity(8),
    };

    let declared = Transport::from(security);
    list.push(port, declared, true, false);
    list.push(port, declared, false, false);

    // Some hosts only accept one handshake style whatever the port implies.
    list.push(IMAP_PORT, Transport::StartTls, true, false);
    list.push(IMAP_PORT, Transport::StartTls, false, false);
    list.push(IMAPS_PORT, Transport::Ssl, true, false);
    list.push(IMAPS_PORT, Transport::Ssl, false, false);

    list.push(port, Transport::Plain, false, true);
    list.push(IMAP_PORT, Transport::Plain, false, true);

    list.items
}
