//! Transfer operations
//!
//! Handles data channel negotiation for FTP passive and active modes.

use log::{debug, info, warn};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;

use crate::control::{Command, ControlChannel};
use crate::error::NegotiationError;
use crate::transfer::data_channel::{ActiveListener, connect_data_stream};
use crate::transfer::modes::DataEndpoint;
use crate::transfer::results::PassiveModeResult;
use crate::utils::network::LocalAddrDiscovery;

/// Extracts the data endpoint from a PASV reply such as
/// `227 Entering Passive Mode (127,0,0,1,19,136)`.
///
/// The first parenthesized group must hold exactly six comma-separated
/// numbers in `0..=255`; anything else is a format error.
pub fn parse_pasv_reply(text: &str) -> Result<DataEndpoint, NegotiationError> {
    let malformed = || NegotiationError::MalformedPasvReply(text.trim_end().to_string());

    let open = text.find('(').ok_or_else(malformed)?;
    let close = text[open..]
        .find(')')
        .map(|offset| open + offset)
        .ok_or_else(malformed)?;

    let fields: Vec<&str> = text[open + 1..close].split(',').collect();
    if fields.len() != 6 {
        return Err(malformed());
    }

    let mut tuple = [0u8; 6];
    for (slot, field) in tuple.iter_mut().zip(&fields) {
        *slot = field.trim().parse().map_err(|_| malformed())?;
    }
    Ok(DataEndpoint::from_tuple(tuple))
}

/// Sends PASV and connects to the endpoint the server advertises.
pub async fn setup_passive_mode(
    control: &mut ControlChannel,
) -> Result<PassiveModeResult, NegotiationError> {
    let reply = control.execute(&Command::PASV).await?;
    let mut endpoint = parse_pasv_reply(&reply.text())?;

    // Some servers advertise the wildcard address; reuse the control peer.
    if endpoint.ip.is_unspecified() {
        let peer = control.peer_addr().map_err(NegotiationError::AddressDiscovery)?;
        match peer.ip() {
            IpAddr::V4(ip) => {
                warn!("Server advertised {}, using control peer {} instead", endpoint, ip);
                endpoint.ip = ip;
            }
            other => return Err(NegotiationError::UnsupportedAddress(other)),
        }
    }

    let stream = connect_data_stream(endpoint).await?;
    info!("Passive data connection established with {}", endpoint);

    Ok(PassiveModeResult {
        endpoint,
        reply,
        stream,
    })
}

/// Opens a listener on an ephemeral port and announces it with PORT.
///
/// The returned listener accepts exactly one connection, after the transfer
/// command has been sent.
pub async fn setup_active_mode(
    control: &mut ControlChannel,
    discovery: &dyn LocalAddrDiscovery,
) -> Result<ActiveListener, NegotiationError> {
    let ip = discovery
        .discover()
        .map_err(NegotiationError::AddressDiscovery)?;

    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
        .await
        .map_err(NegotiationError::BindFailed)?;
    let port = listener
        .local_addr()
        .map_err(NegotiationError::BindFailed)?
        .port();

    let endpoint = DataEndpoint::new(ip, port);
    debug!("Active mode listener bound, advertising {}", endpoint);

    let reply = control
        .execute(&Command::PORT(endpoint.to_port_argument()))
        .await?;
    if !reply.is_positive_completion() {
        return Err(NegotiationError::Rejected(reply));
    }

    info!("Active mode ready, server will connect to {}", endpoint);
    Ok(ActiveListener::new(listener, endpoint))
}
