//! Session module for the FTP client
//!
//! The user-facing command surface and the per-session state it tracks.

pub mod core;
pub mod state;

pub use core::{FtpSession, LoginReplies, RenameResult};
pub use state::SessionState;
