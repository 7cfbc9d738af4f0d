//! Error types
//!
//! Defines domain-specific error types for each module of the FTP client.

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::control::Reply;

/// Control channel errors
#[derive(Debug)]
pub enum ControlError {
    Io(io::Error),
    ConnectionClosed,
    MalformedReply(String),
    CommandOutstanding(String),
    InvalidArgument(String),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::Io(e) => write!(f, "Control connection I/O error: {}", e),
            ControlError::ConnectionClosed => write!(f, "Control connection closed by server"),
            ControlError::MalformedReply(line) => write!(f, "Malformed reply: {:?}", line),
            ControlError::CommandOutstanding(verb) => {
                write!(f, "Cannot send {}: previous command still awaiting a reply", verb)
            }
            ControlError::InvalidArgument(arg) => write!(f, "Invalid command argument: {:?}", arg),
        }
    }
}

impl std::error::Error for ControlError {}

impl From<io::Error> for ControlError {
    fn from(error: io::Error) -> Self {
        ControlError::Io(error)
    }
}

/// Data channel negotiation errors
#[derive(Debug)]
pub enum NegotiationError {
    MalformedPasvReply(String),
    Rejected(Reply),
    BindFailed(io::Error),
    ConnectFailed(SocketAddr, io::Error),
    AcceptFailed(io::Error),
    AcceptTimeout(Duration),
    AddressDiscovery(io::Error),
    UnsupportedAddress(IpAddr),
    Control(ControlError),
}

impl fmt::Display for NegotiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationError::MalformedPasvReply(reply) => {
                write!(f, "Malformed PASV reply: {:?}", reply)
            }
            NegotiationError::Rejected(reply) => write!(f, "Server rejected data channel: {}", reply),
            NegotiationError::BindFailed(e) => write!(f, "Failed to bind data listener: {}", e),
            NegotiationError::ConnectFailed(addr, e) => {
                write!(f, "Failed to connect data channel to {}: {}", addr, e)
            }
            NegotiationError::AcceptFailed(e) => write!(f, "Failed to accept data connection: {}", e),
            NegotiationError::AcceptTimeout(after) => {
                write!(f, "No data connection from server within {:?}", after)
            }
            NegotiationError::AddressDiscovery(e) => {
                write!(f, "Failed to discover local address: {}", e)
            }
            NegotiationError::UnsupportedAddress(ip) => {
                write!(f, "Unsupported address {}: only IPv4 is supported", ip)
            }
            NegotiationError::Control(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for NegotiationError {}

impl From<ControlError> for NegotiationError {
    fn from(error: ControlError) -> Self {
        NegotiationError::Control(error)
    }
}

/// Transfer engine errors
#[derive(Debug)]
pub enum TransferError {
    Negotiation(NegotiationError),
    Control(ControlError),
    DataStream(io::Error),
    LocalIo(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Negotiation(e) => write!(f, "Negotiation failed: {}", e),
            TransferError::Control(e) => write!(f, "{}", e),
            TransferError::DataStream(e) => write!(f, "Data connection error: {}", e),
            TransferError::LocalIo(e) => write!(f, "Local stream error: {}", e),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<NegotiationError> for TransferError {
    fn from(error: NegotiationError) -> Self {
        TransferError::Negotiation(error)
    }
}

impl From<ControlError> for TransferError {
    fn from(error: ControlError) -> Self {
        TransferError::Control(error)
    }
}

/// General FTP client error that encompasses all error types
#[derive(Debug)]
pub enum FtpClientError {
    Control(ControlError),
    Negotiation(NegotiationError),
    Transfer(TransferError),
    Config(config::ConfigError),
    NotConnected,
}

impl FtpClientError {
    /// True when the failure comes from a socket or stream rather than from
    /// the content of a server reply.
    pub fn is_transport(&self) -> bool {
        match self {
            FtpClientError::Control(e) => is_transport_control(e),
            FtpClientError::Negotiation(e) => is_transport_negotiation(e),
            FtpClientError::Transfer(TransferError::Negotiation(e)) => is_transport_negotiation(e),
            FtpClientError::Transfer(TransferError::Control(e)) => is_transport_control(e),
            FtpClientError::Transfer(_) => true,
            FtpClientError::Config(_) | FtpClientError::NotConnected => false,
        }
    }
}

fn is_transport_control(error: &ControlError) -> bool {
    matches!(error, ControlError::Io(_) | ControlError::ConnectionClosed)
}

fn is_transport_negotiation(error: &NegotiationError) -> bool {
    match error {
        NegotiationError::MalformedPasvReply(_)
        | NegotiationError::Rejected(_)
        | NegotiationError::UnsupportedAddress(_) => false,
        NegotiationError::Control(e) => is_transport_control(e),
        _ => true,
    }
}

impl fmt::Display for FtpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpClientError::Control(e) => write!(f, "Control error: {}", e),
            FtpClientError::Negotiation(e) => write!(f, "Negotiation error: {}", e),
            FtpClientError::Transfer(e) => write!(f, "Transfer error: {}", e),
            FtpClientError::Config(e) => write!(f, "Configuration error: {}", e),
            FtpClientError::NotConnected => write!(f, "Not connected to a server"),
        }
    }
}

impl std::error::Error for FtpClientError {}

impl From<ControlError> for FtpClientError {
    fn from(error: ControlError) -> Self {
        FtpClientError::Control(error)
    }
}

impl From<NegotiationError> for FtpClientError {
    fn from(error: NegotiationError) -> Self {
        FtpClientError::Negotiation(error)
    }
}

impl From<TransferError> for FtpClientError {
    fn from(error: TransferError) -> Self {
        FtpClientError::Transfer(error)
    }
}

impl From<config::ConfigError> for FtpClientError {
    fn from(error: config::ConfigError) -> Self {
        FtpClientError::Config(error)
    }
}
