//! Transfer module for the FTP client
//!
//! Handles data channel negotiation, the per-transfer data connection and
//! the byte streaming engine.

pub mod data_channel;
pub mod engine;
pub mod file_ops;
pub mod modes;
pub mod operations;
pub mod results;

// Re-export key types and functions
pub use data_channel::{ActiveListener, close_data_stream, connect_data_stream};
pub use engine::{DataChannel, TransferEngine};
pub use file_ops::{InactivityPolicy, receive_until_idle, send_source};
pub use modes::{DataEndpoint, DataMode, decode_port, encode_port};
pub use operations::{parse_pasv_reply, setup_active_mode, setup_passive_mode};
pub use results::{Completion, PassiveModeResult, TransferRequest, TransferResult, TransferVerb};
