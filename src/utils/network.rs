//! Network utilities
//!
//! Discovery of the local IPv4 address advertised in `PORT` commands.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Source of the address the server should connect back to in active mode.
pub trait LocalAddrDiscovery: Send + Sync {
    fn discover(&self) -> io::Result<Ipv4Addr>;
}

/// Finds the outward-facing interface by "connecting" a throwaway UDP socket
/// to a probe address and reading its local endpoint. No packet is sent.
#[derive(Debug, Clone)]
pub struct UdpProbeDiscovery {
    probe: SocketAddr,
}

impl UdpProbeDiscovery {
    pub fn new(probe: SocketAddr) -> Self {
        Self { probe }
    }
}

impl LocalAddrDiscovery for UdpProbeDiscovery {
    fn discover(&self) -> io::Result<Ipv4Addr> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.connect(self.probe)?;
        match socket.local_addr()?.ip() {
            IpAddr::V4(ip) if !ip.is_unspecified() => Ok(ip),
            other => Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("probe to {} yielded unusable address {}", self.probe, other),
            )),
        }
    }
}

/// Always reports the same address.
#[derive(Debug, Clone, Copy)]
pub struct FixedAddrDiscovery(pub Ipv4Addr);

impl LocalAddrDiscovery for FixedAddrDiscovery {
    fn discover(&self) -> io::Result<Ipv4Addr> {
        Ok(self.0)
    }
}
