//! Transfer engine
//!
//! Drives one transfer: the command/reply pair on the control channel and
//! the byte stream on a negotiated data connection.
//!
//! Ordering per transfer:
//! - active upload: send verb, accept the server's connection, read the
//!   preliminary reply, stream the source, close, read the final reply.
//! - passive upload: send verb on an already-connected stream, read the
//!   preliminary reply, stream the source, close, read the final reply.
//! - download / listing: send verb on an already-connected stream, read the
//!   preliminary reply, read until close or inactivity, close, read the
//!   final reply.
//!
//! The preliminary reply is not used as a gate: bytes are moved whatever it
//! says and the final reply reports the outcome. When the preliminary reply
//! is already a completion or a refusal, it is reported as the final reply.

use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::control::{ControlChannel, Reply};
use crate::error::{ControlError, TransferError};
use crate::transfer::data_channel::{ActiveListener, close_data_stream};
use crate::transfer::file_ops::{InactivityPolicy, receive_until_idle, send_source};
use crate::transfer::results::{Completion, TransferRequest, TransferResult};

/// A data connection ready for the engine.
#[derive(Debug)]
pub enum DataChannel {
    /// Connected to the server's passive endpoint.
    Passive(TcpStream),
    /// Waiting for the server to connect after the transfer command.
    Active(ActiveListener),
}

pub struct TransferEngine<'a> {
    control: &'a mut ControlChannel,
    policy: InactivityPolicy,
    buffer_size: usize,
    accept_timeout: Duration,
}

impl<'a> TransferEngine<'a> {
    pub fn new(
        control: &'a mut ControlChannel,
        policy: InactivityPolicy,
        buffer_size: usize,
        accept_timeout: Duration,
    ) -> Self {
        Self {
            control,
            policy,
            buffer_size,
            accept_timeout,
        }
    }

    /// Runs a STOR or APPE transfer from `source`.
    pub async fn upload<R>(
        &mut self,
        request: &TransferRequest,
        channel: DataChannel,
        source: &mut R,
    ) -> Result<TransferResult, TransferError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut data_stream = self.open(request, channel).await?;
        let preliminary = self.control.read_reply().await?;

        let sent = send_source(source, &mut data_stream, self.buffer_size).await;
        close_data_stream(data_stream).await;
        let bytes = match sent {
            Ok(bytes) => bytes,
            Err(TransferError::DataStream(e)) if !preliminary.is_preliminary() => {
                warn!("Data stream failed after {:?}: {}", preliminary.status_line(), e);
                0
            }
            Err(e) => {
                self.resync(&preliminary).await;
                return Err(e);
            }
        };

        let final_reply = self.final_reply(&preliminary).await?;
        info!(
            "{} {} finished: {} bytes sent, server said {:?}",
            request.verb,
            request.remote_path,
            bytes,
            final_reply.status_line()
        );

        Ok(TransferResult {
            request: request.clone(),
            preliminary,
            final_reply,
            bytes,
            completion: None,
        })
    }

    /// Runs a RETR or LIST transfer into `sink`.
    pub async fn download<W>(
        &mut self,
        request: &TransferRequest,
        channel: DataChannel,
        sink: &mut W,
    ) -> Result<TransferResult, TransferError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut data_stream = self.open(request, channel).await?;
        let preliminary = self.control.read_reply().await?;

        let received =
            receive_until_idle(&mut data_stream, sink, self.policy, self.buffer_size).await;
        close_data_stream(data_stream).await;
        let (bytes, completion) = match received {
            Ok(outcome) => outcome,
            Err(TransferError::DataStream(e)) if !preliminary.is_preliminary() => {
                warn!("Data stream failed after {:?}: {}", preliminary.status_line(), e);
                (0, Completion::PeerClosed)
            }
            Err(e) => {
                self.resync(&preliminary).await;
                return Err(e);
            }
        };

        let final_reply = self.final_reply(&preliminary).await?;
        info!(
            "{} {} finished: {} bytes received ({:?}), server said {:?}",
            request.verb,
            request.remote_path,
            bytes,
            completion,
            final_reply.status_line()
        );

        Ok(TransferResult {
            request: request.clone(),
            preliminary,
            final_reply,
            bytes,
            completion: Some(completion),
        })
    }

    /// Sends the transfer command and yields the connected data stream.
    async fn open(
        &mut self,
        request: &TransferRequest,
        channel: DataChannel,
    ) -> Result<TcpStream, TransferError> {
        self.control.send_command(&request.command()).await?;

        match channel {
            DataChannel::Passive(stream) => Ok(stream),
            DataChannel::Active(listener) => {
                debug!("Waiting for {} data connection on {}", request.verb, listener.endpoint());
                self.accept(request, listener).await
            }
        }
    }

    async fn accept(
        &mut self,
        request: &TransferRequest,
        listener: ActiveListener,
    ) -> Result<TcpStream, TransferError> {
        match listener.accept_once(self.accept_timeout).await {
            Ok(stream) => Ok(stream),
            Err(e) => {
                // The server still answers the command, possibly with a 1xx
                // first; consume up to its final reply.
                match self.read_until_final().await {
                    Ok(reply) => warn!(
                        "No data connection for {}; server replied {:?}",
                        request.verb,
                        reply.status_line()
                    ),
                    Err(read_err) => warn!("Failed to read reply after {}: {}", e, read_err),
                }
                Err(e.into())
            }
        }
    }

    /// A preliminary reply promises a final one; anything else already is
    /// the final reply.
    async fn final_reply(&mut self, preliminary: &Reply) -> Result<Reply, ControlError> {
        if preliminary.is_preliminary() {
            self.read_until_final().await
        } else {
            Ok(preliminary.clone())
        }
    }

    /// After a failed data stream, consume the reply the server still owes.
    async fn resync(&mut self, preliminary: &Reply) {
        if !preliminary.is_preliminary() {
            return;
        }
        match self.read_until_final().await {
            Ok(reply) => warn!("Transfer aborted; server replied {:?}", reply.status_line()),
            Err(e) => warn!("Transfer aborted; no final reply: {}", e),
        }
    }

    /// Reads replies until one that is not preliminary.
    async fn read_until_final(&mut self) -> Result<Reply, ControlError> {
        loop {
            let reply = self.control.read_reply().await?;
            if !reply.is_preliminary() {
                return Ok(reply);
            }
        }
    }
}
