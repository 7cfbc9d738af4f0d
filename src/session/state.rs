//! Module `state`
//!
//! Defines the `SessionState` struct holding the mutable per-session client
//! state: credentials, login status, data mode and remote working path.

use crate::transfer::DataMode;

/// Represents the state of one FTP session.
///
/// Tracks the credentials supplied at connect time, whether the server
/// accepted them, the sticky data mode, and the remote working path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    username: Option<String>,
    password: Option<String>,
    is_logged_in: bool,
    mode: DataMode,
    working_path: String,
}

impl SessionState {
    pub fn new(mode: DataMode) -> Self {
        Self {
            username: None,
            password: None,
            is_logged_in: false,
            mode,
            working_path: "/".to_string(),
        }
    }

    /// Resets the session state, clearing credentials and login status and
    /// returning to `mode` at the root path.
    pub fn reset(&mut self, mode: DataMode) {
        *self = Self::new(mode);
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns whether the server accepted the credentials.
    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    /// Returns the data mode used by the next transfer.
    pub fn mode(&self) -> DataMode {
        self.mode
    }

    /// Returns the remote working path as last known to the client.
    pub fn working_path(&self) -> &str {
        &self.working_path
    }

    // --------------------
    // Setter methods
    // --------------------

    pub fn set_credentials(&mut self, username: &str, password: &str) {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
    }

    pub fn set_logged_in(&mut self, logged_in: bool) {
        self.is_logged_in = logged_in;
    }

    pub fn set_mode(&mut self, mode: DataMode) {
        self.mode = mode;
    }

    pub fn set_working_path(&mut self, path: String) {
        self.working_path = path;
    }

    /// Moves the working path one segment up, stopping at the root.
    pub fn move_to_parent(&mut self) {
        let trimmed = self.working_path.trim_end_matches('/');
        self.working_path = match trimmed.rfind('/') {
            Some(0) | None => "/".to_string(),
            Some(index) => trimmed[..index].to_string(),
        };
    }

    /// Applies a CWD target: absolute paths replace, relative ones append.
    /// `.` and `..` segments are resolved; `..` stops at the root.
    pub fn change_path(&mut self, target: &str) {
        let mut segments: Vec<&str> = if target.starts_with('/') {
            Vec::new()
        } else {
            self.working_path.split('/').filter(|s| !s.is_empty()).collect()
        };

        for segment in target.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                name => segments.push(name),
            }
        }

        let path = format!("/{}", segments.join("/"));
        self.working_path = path;
    }
}
