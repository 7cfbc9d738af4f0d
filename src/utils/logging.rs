//! Logging utilities
//!
//! Operator-facing log lines for the control connection.

use log::info;

use crate::control::{Command, Reply};

/// Setup logging for the client binary
pub fn setup_logging() {
    env_logger::init();
}

/// Log a command written to the server
pub fn log_command(server: &str, command: &Command) {
    info!("--> {} {}", server, command.loggable());
}

/// Log a reply read from the server
pub fn log_reply(server: &str, reply: &Reply) {
    for line in reply.lines() {
        info!("<-- {} {}", server, line);
    }
}
