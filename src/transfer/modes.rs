//! FTP data connection modes
//!
//! Active/passive mode selection and the `h1,h2,h3,h4,p1,p2` endpoint
//! encoding shared by `PORT` and `PASV`.

use serde::Deserialize;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// Who opens the data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// The client listens, the server connects.
    Active,
    /// The server listens, the client connects.
    Passive,
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataMode::Active => write!(f, "active"),
            DataMode::Passive => write!(f, "passive"),
        }
    }
}

/// Where a data connection is initiated or accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataEndpoint {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl DataEndpoint {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Builds an endpoint from the six numbers of a PORT/PASV tuple.
    pub fn from_tuple(fields: [u8; 6]) -> Self {
        let [h1, h2, h3, h4, p1, p2] = fields;
        Self::new(Ipv4Addr::new(h1, h2, h3, h4), decode_port(p1, p2))
    }

    /// Renders the `h1,h2,h3,h4,p1,p2` argument of a PORT command.
    pub fn to_port_argument(&self) -> String {
        let [h1, h2, h3, h4] = self.ip.octets();
        let (p1, p2) = encode_port(self.port);
        format!("{},{},{},{},{},{}", h1, h2, h3, h4, p1, p2)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.ip, self.port))
    }
}

impl fmt::Display for DataEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Splits a port into the `p1,p2` pair: `p1 = port / 256`, `p2 = port % 256`.
pub fn encode_port(port: u16) -> (u8, u8) {
    ((port / 256) as u8, (port % 256) as u8)
}

/// `p1 * 256 + p2`
pub fn decode_port(p1: u8, p2: u8) -> u16 {
    u16::from(p1) * 256 + u16::from(p2)
}
