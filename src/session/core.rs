//! FTP session
//!
//! Owns the control channel, the session state and the prepared data
//! connection, and exposes the command surface callers use.

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::config::ClientConfig;
use crate::control::codes::{FILE_ACTION_OK, FILE_ACTION_PENDING, LOGGED_IN, PATH_CREATED};
use crate::control::{Command, ControlChannel, FileStructure, Reply, TransferType, TransmissionMode};
use crate::error::{ControlError, FtpClientError};
use crate::session::state::SessionState;
use crate::transfer::{
    DataChannel, DataEndpoint, DataMode, TransferEngine, TransferRequest, TransferResult,
    TransferVerb, setup_active_mode, setup_passive_mode,
};
use crate::utils::network::{LocalAddrDiscovery, UdpProbeDiscovery};

/// Every reply of the login exchange.
#[derive(Debug, Clone)]
pub struct LoginReplies {
    pub greeting: Reply,
    pub user: Reply,
    /// Absent when the server logged the user in on USER alone.
    pub pass: Option<Reply>,
}

impl LoginReplies {
    pub fn is_logged_in(&self) -> bool {
        self.pass.as_ref().unwrap_or(&self.user).code() == LOGGED_IN
    }
}

/// Replies of a rename. `to_reply` is absent when RNFR was refused.
#[derive(Debug, Clone)]
pub struct RenameResult {
    pub from_reply: Reply,
    pub to_reply: Option<Reply>,
}

impl RenameResult {
    pub fn is_success(&self) -> bool {
        self.to_reply
            .as_ref()
            .is_some_and(|reply| reply.code() == FILE_ACTION_OK)
    }
}

/// A client session against one FTP server.
///
/// Every operation takes `&mut self`, so commands are issued strictly one
/// after another.
pub struct FtpSession {
    config: ClientConfig,
    discovery: Box<dyn LocalAddrDiscovery>,
    control: Option<ControlChannel>,
    state: SessionState,
    data_stream: Option<TcpStream>,
}

impl FtpSession {
    /// Creates a session that discovers its active-mode address by probing
    /// the configured `discovery_probe`.
    pub fn new(config: ClientConfig) -> Result<Self, FtpClientError> {
        let probe = config.discovery_probe_addr()?;
        Self::with_discovery(config, UdpProbeDiscovery::new(probe))
    }

    /// Creates a session with an explicit active-mode address source.
    pub fn with_discovery(
        config: ClientConfig,
        discovery: impl LocalAddrDiscovery + 'static,
    ) -> Result<Self, FtpClientError> {
        config.validate()?;
        let state = SessionState::new(config.default_mode);
        Ok(Self {
            config,
            discovery: Box::new(discovery),
            control: None,
            state,
            data_stream: None,
        })
    }

    // --------------------
    // Accessors
    // --------------------

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn mode(&self) -> DataMode {
        self.state.mode()
    }

    pub fn working_path(&self) -> &str {
        self.state.working_path()
    }

    pub fn is_connected(&self) -> bool {
        self.control.is_some()
    }

    /// Returns whether a passive data connection is prepared.
    pub fn has_data_connection(&self) -> bool {
        self.data_stream.is_some()
    }

    // --------------------
    // Connection lifecycle
    // --------------------

    /// Opens the control connection, reads the greeting and logs in.
    ///
    /// PASS is skipped when the server accepts USER with 230. A refused
    /// login is not an error: the replies tell the caller what happened.
    pub async fn connect(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<LoginReplies, FtpClientError> {
        if self.control.is_some() {
            warn!("Replacing existing control connection to {}", self.config.control_socket());
            self.discard_data_stream();
            self.control = None;
        }

        let (control, greeting) =
            ControlChannel::connect(&self.config.host, self.config.control_port).await?;
        self.control = Some(control);
        self.state.set_credentials(username, password);

        let user = self.execute(Command::USER(username.to_string())).await?;
        let pass = if user.code() == LOGGED_IN {
            None
        } else {
            Some(self.execute(Command::PASS(password.to_string())).await?)
        };

        let replies = LoginReplies {
            greeting,
            user,
            pass,
        };
        self.state.set_logged_in(replies.is_logged_in());
        if replies.is_logged_in() {
            info!("Logged in to {} as {}", self.config.control_socket(), username);
        } else {
            warn!("Login to {} as {} was refused", self.config.control_socket(), username);
        }
        Ok(replies)
    }

    /// Sends QUIT and closes the control connection.
    pub async fn close(&mut self) -> Result<Reply, FtpClientError> {
        self.discard_data_stream();
        let mut control = self.control.take().ok_or(FtpClientError::NotConnected)?;
        let reply = control.execute(&Command::QUIT).await?;
        if let Err(e) = control.shutdown().await {
            debug!("Control shutdown after QUIT failed: {}", e);
        }
        self.state.set_logged_in(false);
        Ok(reply)
    }

    // --------------------
    // Data modes
    // --------------------

    /// Sends PASV and connects to the advertised endpoint. The connection is
    /// kept for the next passive upload; any previous one is closed.
    pub async fn enter_passive_mode(&mut self) -> Result<DataEndpoint, FtpClientError> {
        self.discard_data_stream();
        let control = self.control.as_mut().ok_or(FtpClientError::NotConnected)?;
        let passive = setup_passive_mode(control).await?;

        self.data_stream = Some(passive.stream);
        self.state.set_mode(DataMode::Passive);
        Ok(passive.endpoint)
    }

    /// Switches uploads to active mode. The listener and PORT command are set
    /// up per transfer; a prepared passive connection is closed.
    pub fn enter_active_mode(&mut self) {
        self.discard_data_stream();
        self.state.set_mode(DataMode::Active);
        debug!("Session switched to active mode");
    }

    // --------------------
    // Transfers
    // --------------------

    /// Uploads `source` to `remote_path` with STOR in the current mode.
    pub async fn store<R>(
        &mut self,
        remote_path: &str,
        source: &mut R,
    ) -> Result<TransferResult, FtpClientError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let request = TransferRequest::new(TransferVerb::STOR, remote_path);
        self.upload(&request, self.state.mode(), source).await
    }

    /// Appends `source` to `remote_path` with APPE in the current mode.
    pub async fn append<R>(
        &mut self,
        remote_path: &str,
        source: &mut R,
    ) -> Result<TransferResult, FtpClientError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let request = TransferRequest::new(TransferVerb::APPE, remote_path);
        self.upload(&request, self.state.mode(), source).await
    }

    /// Runs an upload in the given mode.
    pub async fn upload<R>(
        &mut self,
        request: &TransferRequest,
        mode: DataMode,
        source: &mut R,
    ) -> Result<TransferResult, FtpClientError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if !request.verb.is_upload() {
            return Err(
                ControlError::InvalidArgument(format!("{} is not an upload", request.verb)).into(),
            );
        }
        let control = self.control.as_mut().ok_or(FtpClientError::NotConnected)?;

        let channel = match mode {
            DataMode::Active => {
                if self.data_stream.take().is_some() {
                    debug!("Closing prepared passive connection before active upload");
                }
                DataChannel::Active(setup_active_mode(control, &*self.discovery).await?)
            }
            DataMode::Passive => match self.data_stream.take() {
                Some(stream) => DataChannel::Passive(stream),
                None => DataChannel::Passive(setup_passive_mode(control).await?.stream),
            },
        };

        let mut engine = TransferEngine::new(
            control,
            self.config.inactivity_policy(),
            self.config.buffer_size,
            self.config.accept_timeout(),
        );
        let result = engine.upload(request, channel, source).await?;

        if mode == DataMode::Passive {
            self.prepare_next_passive().await;
        }
        Ok(result)
    }

    /// Downloads `remote_path` into `sink` with RETR.
    pub async fn retrieve<W>(
        &mut self,
        remote_path: &str,
        sink: &mut W,
    ) -> Result<TransferResult, FtpClientError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let request = TransferRequest::new(TransferVerb::RETR, remote_path);
        self.download(&request, sink).await
    }

    /// Writes the LIST output for `path` (empty for the working directory)
    /// into `sink`, then prepares a passive connection for the next transfer.
    pub async fn list<W>(&mut self, path: &str, sink: &mut W) -> Result<TransferResult, FtpClientError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let request = TransferRequest::new(TransferVerb::LIST, path);
        let result = self.download(&request, sink).await?;
        self.prepare_next_passive().await;
        Ok(result)
    }

    /// LIST collected into a string.
    pub async fn list_to_string(
        &mut self,
        path: &str,
    ) -> Result<(TransferResult, String), FtpClientError> {
        let mut listing = Vec::new();
        let result = self.list(path, &mut listing).await?;
        Ok((result, String::from_utf8_lossy(&listing).into_owned()))
    }

    /// Downloads always negotiate a fresh passive connection first.
    async fn download<W>(
        &mut self,
        request: &TransferRequest,
        sink: &mut W,
    ) -> Result<TransferResult, FtpClientError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.discard_data_stream();
        let control = self.control.as_mut().ok_or(FtpClientError::NotConnected)?;
        let passive = setup_passive_mode(control).await?;

        let mut engine = TransferEngine::new(
            control,
            self.config.inactivity_policy(),
            self.config.buffer_size,
            self.config.accept_timeout(),
        );
        Ok(engine
            .download(request, DataChannel::Passive(passive.stream), sink)
            .await?)
    }

    /// Leaves a passive connection ready for the next operation. A failure
    /// here does not undo the transfer that just finished.
    async fn prepare_next_passive(&mut self) {
        let Some(control) = self.control.as_mut() else {
            return;
        };
        match setup_passive_mode(control).await {
            Ok(passive) => self.data_stream = Some(passive.stream),
            Err(e) => warn!("Could not prepare the next passive connection: {}", e),
        }
    }

    /// Sends ABOR and drops the open data connection, if any, without an
    /// orderly shutdown.
    pub async fn abort(&mut self) -> Result<Reply, FtpClientError> {
        let data_stream = self.data_stream.take();
        let reply = self.execute(Command::ABOR).await;
        if data_stream.is_some() {
            debug!("Dropping data connection after ABOR");
        }
        drop(data_stream);
        reply
    }

    fn discard_data_stream(&mut self) {
        if self.data_stream.take().is_some() {
            debug!("Discarding prepared data connection");
        }
    }

    // --------------------
    // Simple command exchanges
    // --------------------

    async fn execute(&mut self, command: Command) -> Result<Reply, FtpClientError> {
        let control = self.control.as_mut().ok_or(FtpClientError::NotConnected)?;
        Ok(control.execute(&command).await?)
    }

    pub async fn noop(&mut self) -> Result<Reply, FtpClientError> {
        self.execute(Command::NOOP).await
    }

    pub async fn feat(&mut self) -> Result<Reply, FtpClientError> {
        self.execute(Command::FEAT).await
    }

    pub async fn help(&mut self, topic: Option<&str>) -> Result<Reply, FtpClientError> {
        self.execute(Command::HELP(topic.map(str::to_string))).await
    }

    /// Sends REIN; on success the session returns to its initial state.
    pub async fn rein(&mut self) -> Result<Reply, FtpClientError> {
        let reply = self.execute(Command::REIN).await?;
        if reply.is_positive_completion() {
            self.discard_data_stream();
            self.state.reset(self.config.default_mode);
        }
        Ok(reply)
    }

    pub async fn smnt(&mut self, path: &str) -> Result<Reply, FtpClientError> {
        self.execute(Command::SMNT(path.to_string())).await
    }

    pub async fn set_type(&mut self, transfer_type: TransferType) -> Result<Reply, FtpClientError> {
        self.execute(Command::TYPE(transfer_type)).await
    }

    pub async fn set_structure(&mut self, structure: FileStructure) -> Result<Reply, FtpClientError> {
        self.execute(Command::STRU(structure)).await
    }

    pub async fn set_transmission_mode(
        &mut self,
        mode: TransmissionMode,
    ) -> Result<Reply, FtpClientError> {
        self.execute(Command::MODE(mode)).await
    }

    pub async fn delete(&mut self, path: &str) -> Result<Reply, FtpClientError> {
        self.execute(Command::DELE(path.to_string())).await
    }

    pub async fn make_directory(&mut self, path: &str) -> Result<Reply, FtpClientError> {
        self.execute(Command::MKD(path.to_string())).await
    }

    pub async fn remove_directory(&mut self, path: &str) -> Result<Reply, FtpClientError> {
        self.execute(Command::RMD(path.to_string())).await
    }

    /// Sends PWD and records the quoted path of a 257 reply.
    pub async fn print_working_directory(&mut self) -> Result<Reply, FtpClientError> {
        let reply = self.execute(Command::PWD).await?;
        if reply.code() == PATH_CREATED {
            if let Some(path) = parse_quoted_path(reply.status_line()) {
                self.state.set_working_path(path);
            }
        }
        Ok(reply)
    }

    pub async fn change_directory(&mut self, path: &str) -> Result<Reply, FtpClientError> {
        let reply = self.execute(Command::CWD(path.to_string())).await?;
        if reply.code() == FILE_ACTION_OK {
            self.state.change_path(path);
        }
        Ok(reply)
    }

    pub async fn change_to_parent(&mut self) -> Result<Reply, FtpClientError> {
        let reply = self.execute(Command::CDUP).await?;
        if reply.is_positive_completion() {
            self.state.move_to_parent();
        }
        Ok(reply)
    }

    /// RNFR then RNTO. RNTO is only sent after a 350 RNFR reply.
    pub async fn rename(&mut self, from: &str, to: &str) -> Result<RenameResult, FtpClientError> {
        let from_reply = self.execute(Command::RNFR(from.to_string())).await?;
        if from_reply.code() != FILE_ACTION_PENDING {
            warn!("RNFR {} refused: {}", from, from_reply.status_line());
            return Ok(RenameResult {
                from_reply,
                to_reply: None,
            });
        }

        let to_reply = self.execute(Command::RNTO(to.to_string())).await?;
        if to_reply.code() != FILE_ACTION_OK {
            warn!("RNTO {} refused: {}", to, to_reply.status_line());
        }
        Ok(RenameResult {
            from_reply,
            to_reply: Some(to_reply),
        })
    }
}

/// Extracts the path from `257 "/some ""quoted"" dir" created`; doubled
/// quotes stand for one.
fn parse_quoted_path(line: &str) -> Option<String> {
    let start = line.find('"')? + 1;
    let mut path = String::new();
    let mut chars = line[start..].chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                path.push('"');
            } else {
                return Some(path);
            }
        } else {
            path.push(c);
        }
    }
    None
}
