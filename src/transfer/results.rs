//! Transfer result types
//!
//! Defines result structures returned by transfer operations.

use std::fmt;
use tokio::net::TcpStream;

use crate::control::{Command, Reply};
use crate::transfer::modes::DataEndpoint;

/// Result of setting up passive mode
#[derive(Debug)]
pub struct PassiveModeResult {
    pub endpoint: DataEndpoint,
    pub reply: Reply,
    pub stream: TcpStream,
}

/// Verbs that move bytes over a data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferVerb {
    STOR,
    APPE,
    RETR,
    LIST,
}

impl TransferVerb {
    /// True for verbs whose bytes flow from the client to the server.
    pub fn is_upload(self) -> bool {
        matches!(self, TransferVerb::STOR | TransferVerb::APPE)
    }
}

impl fmt::Display for TransferVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            TransferVerb::STOR => "STOR",
            TransferVerb::APPE => "APPE",
            TransferVerb::RETR => "RETR",
            TransferVerb::LIST => "LIST",
        };
        write!(f, "{}", verb)
    }
}

/// One transfer to run: the verb and the remote path it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub verb: TransferVerb,
    pub remote_path: String,
}

impl TransferRequest {
    pub fn new(verb: TransferVerb, remote_path: impl Into<String>) -> Self {
        Self {
            verb,
            remote_path: remote_path.into(),
        }
    }

    /// The control command that starts this transfer.
    pub fn command(&self) -> Command {
        let path = self.remote_path.clone();
        match self.verb {
            TransferVerb::STOR => Command::STOR(path),
            TransferVerb::APPE => Command::APPE(path),
            TransferVerb::RETR => Command::RETR(path),
            TransferVerb::LIST => Command::LIST(Some(path)),
        }
    }
}

/// How the data stream of a download or listing ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The server closed the data connection.
    PeerClosed,
    /// No byte arrived within the inactivity window.
    InactivityTimeout,
}

/// Outcome of a completed transfer.
#[derive(Debug, Clone)]
pub struct TransferResult {
    pub request: TransferRequest,
    pub preliminary: Reply,
    pub final_reply: Reply,
    pub bytes: u64,
    /// Set for downloads and listings; uploads end when the source does.
    pub completion: Option<Completion>,
}

impl TransferResult {
    /// Success is judged from the final reply alone.
    pub fn is_success(&self) -> bool {
        self.final_reply.is_positive_completion()
    }
}
