//! FTP reply codes
//!
//! Reply codes the client inspects. Everything else is passed through to the
//! caller as text.

pub const LOGGED_IN: u16 = 230;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATH_CREATED: u16 = 257;
pub const FILE_ACTION_PENDING: u16 = 350;
