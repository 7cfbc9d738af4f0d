//! Module `reply`
//!
//! Assembles FTP server replies from the lines read off the control
//! connection. A reply is either a single `ddd text` line or a multi-line
//! reply opened by `ddd-text` and closed by the first line that starts with
//! the same code followed by a space.

use std::fmt;

use crate::error::ControlError;

/// A complete server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    lines: Vec<String>,
}

impl Reply {
    pub fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Returns the three-digit reply code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Returns every line of the reply without line terminators.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns the closing line, the one carrying the final status.
    pub fn status_line(&self) -> &str {
        self.lines.last().map(String::as_str).unwrap_or("")
    }

    /// Returns the text of the closing line after the code.
    pub fn message(&self) -> &str {
        self.status_line().get(4..).unwrap_or("").trim()
    }

    /// Returns the whole reply joined with CRLF.
    pub fn text(&self) -> String {
        self.lines.join("\r\n")
    }

    /// 1xx: the command started, another reply is due.
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx
    pub fn is_positive_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// 4xx or 5xx
    pub fn is_negative(&self) -> bool {
        (400..600).contains(&self.code)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// Accumulates reply lines until the reply is complete.
#[derive(Debug, Default)]
pub struct ReplyBuilder {
    code: Option<u16>,
    lines: Vec<String>,
}

impl ReplyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line (terminator optional). Returns the reply once the line
    /// closing it has been pushed.
    pub fn push_line(&mut self, raw: &str) -> Result<Option<Reply>, ControlError> {
        let line = raw.trim_end_matches(['\r', '\n']).to_string();

        match self.code {
            None => {
                let code = parse_code(&line)
                    .ok_or_else(|| ControlError::MalformedReply(line.clone()))?;
                let continued = line.as_bytes().get(3) == Some(&b'-');
                self.lines.push(line);
                if continued {
                    self.code = Some(code);
                    Ok(None)
                } else {
                    Ok(Some(self.finish(code)))
                }
            }
            Some(code) => {
                let closes = parse_code(&line) == Some(code)
                    && matches!(line.as_bytes().get(3), None | Some(b' '));
                self.lines.push(line);
                if closes {
                    Ok(Some(self.finish(code)))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn finish(&mut self, code: u16) -> Reply {
        self.code = None;
        Reply::new(code, std::mem::take(&mut self.lines))
    }
}

/// Extracts the leading three-digit code of a reply line.
fn parse_code(line: &str) -> Option<u16> {
    let digits = line.get(..3)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match line.as_bytes().get(3) {
        None | Some(b' ') | Some(b'-') => digits.parse().ok(),
        Some(_) => None,
    }
}
