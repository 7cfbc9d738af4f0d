//! Module `channel`
//!
//! The control connection: one TCP stream carrying CRLF-terminated commands
//! and the server's replies, driven as a strict request/response state
//! machine. A command can only be written while the channel is idle; a
//! preliminary (1xx) reply keeps it waiting for the final one.

use log::{debug, info};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::control::{Command, Reply, ReplyBuilder};
use crate::error::ControlError;
use crate::utils::logging::{log_command, log_reply};

/// Request/response state of the control connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    AwaitingResponse,
}

pub struct ControlChannel {
    reader: BufReader<TcpStream>,
    server: String,
    state: ChannelState,
}

impl ControlChannel {
    /// Opens the control connection and reads the server greeting.
    ///
    /// `120 ready in n minutes` greetings are followed until the final one.
    pub async fn connect(host: &str, port: u16) -> Result<(Self, Reply), ControlError> {
        let stream = TcpStream::connect((host, port)).await?;
        let server = match stream.peer_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => format!("{}:{}", host, port),
        };
        info!("Control connection established with {}", server);

        let mut channel = Self {
            reader: BufReader::new(stream),
            server,
            state: ChannelState::AwaitingResponse,
        };

        let mut greeting = channel.read_reply().await?;
        while greeting.is_preliminary() {
            greeting = channel.read_reply().await?;
        }
        Ok((channel, greeting))
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Address of the server end of the control connection.
    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.reader.get_ref().peer_addr()
    }

    /// Writes one command line. Fails if the previous command is unanswered.
    pub async fn send_command(&mut self, command: &Command) -> Result<(), ControlError> {
        if self.state == ChannelState::AwaitingResponse {
            return Err(ControlError::CommandOutstanding(command.verb().to_string()));
        }

        let line = command.to_line()?;
        let stream = self.reader.get_mut();
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;

        log_command(&self.server, command);
        self.state = ChannelState::AwaitingResponse;
        Ok(())
    }

    /// Reads one complete reply, multi-line replies included.
    pub async fn read_reply(&mut self) -> Result<Reply, ControlError> {
        let mut builder = ReplyBuilder::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let n = self.reader.read_until(b'\n', &mut buf).await?;
            if n == 0 {
                debug!("{} closed the control connection", self.server);
                return Err(ControlError::ConnectionClosed);
            }

            let line = String::from_utf8_lossy(&buf);
            let reply = match builder.push_line(&line) {
                Ok(Some(reply)) => reply,
                Ok(None) => continue,
                Err(e) => {
                    // The unparsable line ends the exchange; the next command
                    // may still be sent.
                    self.state = ChannelState::Idle;
                    return Err(e);
                }
            };

            log_reply(&self.server, &reply);
            if !reply.is_preliminary() {
                self.state = ChannelState::Idle;
            }
            return Ok(reply);
        }
    }

    /// Sends a command and reads its reply.
    pub async fn execute(&mut self, command: &Command) -> Result<Reply, ControlError> {
        self.send_command(command).await?;
        self.read_reply().await
    }

    /// Closes the connection; the server sees end of stream.
    pub async fn shutdown(mut self) -> Result<(), ControlError> {
        self.reader.get_mut().shutdown().await?;
        info!("Control connection to {} closed", self.server);
        Ok(())
    }
}
