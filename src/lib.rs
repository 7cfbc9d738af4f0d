//! RAX FTP Client
//!
//! An async FTP client implementing the control and data connection
//! handling of RFC 959, with passive and active data modes.

pub mod config;
pub mod control;
pub mod error;
pub mod session;
pub mod transfer;
pub mod utils;

pub use config::ClientConfig;
pub use error::FtpClientError;
pub use session::FtpSession;
