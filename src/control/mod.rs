//! Control channel
//!
//! Command rendering, reply assembly and the request/response connection.

pub mod channel;
pub mod codes;
pub mod commands;
pub mod reply;

pub use channel::{ChannelState, ControlChannel};
pub use commands::{Command, FileStructure, TransferType, TransmissionMode};
pub use reply::{Reply, ReplyBuilder};
