//! Module `commands`
//!
//! Defines the FTP commands the client can send and their wire rendering.

use std::fmt;

use crate::error::ControlError;
use crate::utils::validation::is_valid_argument;

/// Representation type argument of `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Image,
}

/// File structure argument of `STRU`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStructure {
    File,
    Record,
    Page,
}

/// Transmission mode argument of `MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionMode {
    Stream,
    Block,
    Compressed,
}

impl TransferType {
    fn code(self) -> char {
        match self {
            TransferType::Ascii => 'A',
            TransferType::Image => 'I',
        }
    }
}

impl FileStructure {
    fn code(self) -> char {
        match self {
            FileStructure::File => 'F',
            FileStructure::Record => 'R',
            FileStructure::Page => 'P',
        }
    }
}

impl TransmissionMode {
    fn code(self) -> char {
        match self {
            TransmissionMode::Stream => 'S',
            TransmissionMode::Block => 'B',
            TransmissionMode::Compressed => 'C',
        }
    }
}

/// An FTP command sent by the client.
///
/// Variants carrying a `String` hold the raw argument; `LIST` and `HELP`
/// take an optional one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    USER(String),
    PASS(String),
    PORT(String), // h1,h2,h3,h4,p1,p2
    PASV,
    TYPE(TransferType),
    STRU(FileStructure),
    MODE(TransmissionMode),
    STOR(String),
    APPE(String),
    RETR(String),
    LIST(Option<String>),
    DELE(String),
    RNFR(String),
    RNTO(String),
    MKD(String),
    RMD(String),
    PWD,
    CDUP,
    CWD(String),
    ABOR,
    NOOP,
    FEAT,
    HELP(Option<String>),
    REIN,
    SMNT(String),
    QUIT,
}

impl Command {
    /// Returns the command verb as sent on the wire.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::USER(_) => "USER",
            Command::PASS(_) => "PASS",
            Command::PORT(_) => "PORT",
            Command::PASV => "PASV",
            Command::TYPE(_) => "TYPE",
            Command::STRU(_) => "STRU",
            Command::MODE(_) => "MODE",
            Command::STOR(_) => "STOR",
            Command::APPE(_) => "APPE",
            Command::RETR(_) => "RETR",
            Command::LIST(_) => "LIST",
            Command::DELE(_) => "DELE",
            Command::RNFR(_) => "RNFR",
            Command::RNTO(_) => "RNTO",
            Command::MKD(_) => "MKD",
            Command::RMD(_) => "RMD",
            Command::PWD => "PWD",
            Command::CDUP => "CDUP",
            Command::CWD(_) => "CWD",
            Command::ABOR => "ABOR",
            Command::NOOP => "NOOP",
            Command::FEAT => "FEAT",
            Command::HELP(_) => "HELP",
            Command::REIN => "REIN",
            Command::SMNT(_) => "SMNT",
            Command::QUIT => "QUIT",
        }
    }

    fn argument(&self) -> Option<String> {
        match self {
            Command::USER(arg)
            | Command::PASS(arg)
            | Command::PORT(arg)
            | Command::STOR(arg)
            | Command::APPE(arg)
            | Command::RETR(arg)
            | Command::DELE(arg)
            | Command::RNFR(arg)
            | Command::RNTO(arg)
            | Command::MKD(arg)
            | Command::RMD(arg)
            | Command::CWD(arg)
            | Command::SMNT(arg) => Some(arg.clone()),
            Command::LIST(arg) | Command::HELP(arg) => {
                arg.as_ref().filter(|a| !a.is_empty()).cloned()
            }
            Command::TYPE(t) => Some(t.code().to_string()),
            Command::STRU(s) => Some(s.code().to_string()),
            Command::MODE(m) => Some(m.code().to_string()),
            Command::PASV
            | Command::PWD
            | Command::CDUP
            | Command::ABOR
            | Command::NOOP
            | Command::FEAT
            | Command::REIN
            | Command::QUIT => None,
        }
    }

    /// Renders the CRLF-terminated wire line, refusing arguments that would
    /// split it into several commands.
    pub fn to_line(&self) -> Result<String, ControlError> {
        match self.argument() {
            Some(arg) if !is_valid_argument(&arg) => Err(ControlError::InvalidArgument(arg)),
            _ => Ok(format!("{}\r\n", self)),
        }
    }

    /// Rendering safe for logs: the password is masked.
    pub fn loggable(&self) -> String {
        match self {
            Command::PASS(_) => "PASS ****".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.argument() {
            Some(arg) => write!(f, "{} {}", self.verb(), arg),
            None => write!(f, "{}", self.verb()),
        }
    }
}
