// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! STOMP 1.2 frame codec.
//!
//! Wire grammar: `COMMAND \n (HEADER ":" VALUE \n)* \n BODY \0`. Header names
//! and values carry the 1.2 escape set (`\r`, `\n`, `:`, `\`); bodies are
//! delimited by `content-length` when present and by the NUL terminator
//! otherwise.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Error type for frame encoding and parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The command line is not a recognized STOMP 1.2 command.
    #[error("Unexpected command '{0}'")]
    UnexpectedCommand(String),

    /// A required header is absent.
    #[error("Missing header '{0}'")]
    MissingHeader(String),

    /// A header contains an escape sequence outside the 1.2 escape set.
    #[error("Invalid escape sequence '{0}'")]
    InvalidEscape(String),

    /// The body does not agree with the `content-length` header, or contains
    /// a NUL octet without one.
    #[error("Content length mismatch: {0}")]
    LengthMismatch(String),

    /// The input ends before the frame is complete.
    #[error("Truncated frame")]
    Truncated,
}

/// The STOMP 1.2 command set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StompCommand {
    // Client-originated
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    // Server-originated
    Connected,
    Message,
    Receipt,
    Error,
}

impl StompCommand {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Connected => "CONNECTED",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StompCommand {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "STOMP" => Ok(Self::Stomp),
            "SEND" => Ok(Self::Send),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "DISCONNECT" => Ok(Self::Disconnect),
            "ACK" => Ok(Self::Ack),
            "NACK" => Ok(Self::Nack),
            "BEGIN" => Ok(Self::Begin),
            "COMMIT" => Ok(Self::Commit),
            "ABORT" => Ok(Self::Abort),
            "CONNECTED" => Ok(Self::Connected),
            "MESSAGE" => Ok(Self::Message),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            other => Err(FrameError::UnexpectedCommand(other.to_string())),
        }
    }
}

/// One STOMP frame. Headers keep insertion order; the first occurrence of a
/// name wins on lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StompFrame {
    pub command: StompCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    /// Creates an empty frame for `command`.
    #[must_use]
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Appends a header (builder style).
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body (builder style). The caller is responsible for adding a
    /// `content-length` header when the body may contain NUL octets.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the first occurrence of a header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serializes the frame to its wire form, escapes applied.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(&escape(name));
            out.push(':');
            out.push_str(&escape(value));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parses a frame from its wire form.
    pub fn parse(input: &str) -> Result<Self, FrameError> {
        let (command_line, rest) = input.split_once('\n').ok_or(FrameError::Truncated)?;
        let command = StompCommand::from_str(trim_cr(command_line))?;

        let mut headers: Vec<(String, String)> = Vec::new();
        let mut rest = rest;
        loop {
            let (line, remainder) = rest.split_once('\n').ok_or(FrameError::Truncated)?;
            rest = remainder;
            let line = trim_cr(line);
            if line.is_empty() {
                break;
            }
            // Real colons in names and values are escaped, so the first raw
            // colon is the delimiter.
            let (raw_name, raw_value) = line.split_once(':').ok_or(FrameError::Truncated)?;
            let name = unescape(raw_name)?;
            let value = unescape(raw_value)?;
            if !headers.iter().any(|(n, _)| n == &name) {
                headers.push((name, value));
            }
        }

        let content_length = headers
            .iter()
            .find(|(n, _)| n == "content-length")
            .map(|(_, v)| {
                v.parse::<usize>()
                    .map_err(|_| FrameError::LengthMismatch(format!("invalid content-length '{v}'")))
            })
            .transpose()?;

        let body = match content_length {
            Some(len) => {
                let bytes = rest.as_bytes();
                if bytes.len() <= len {
                    return Err(FrameError::Truncated);
                }
                if bytes[len] != 0 {
                    return Err(FrameError::LengthMismatch(format!(
                        "body not terminated after {len} octets",
                    )));
                }
                ensure_only_eol(&bytes[len + 1..])?;
                std::str::from_utf8(&bytes[..len])
                    .map_err(|_| {
                        FrameError::LengthMismatch("content-length splits a character".to_string())
                    })?
                    .to_string()
            }
            None => {
                let nul = rest.find('\0').ok_or(FrameError::Truncated)?;
                ensure_only_eol(&rest.as_bytes()[nul + 1..])?;
                rest[..nul].to_string()
            }
        };

        Ok(Self {
            command,
            headers,
            body,
        })
    }
}

/// Octets after the terminator may only be EOLs (heartbeats); anything else
/// means the body contained a NUL without a matching content-length.
fn ensure_only_eol(trailing: &[u8]) -> Result<(), FrameError> {
    if trailing.iter().all(|&b| b == b'\n' || b == b'\r') {
        Ok(())
    } else {
        Err(FrameError::LengthMismatch(
            "data after frame terminator".to_string(),
        ))
    }
}

fn trim_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(input: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some(other) => return Err(FrameError::InvalidEscape(format!("\\{other}"))),
            None => return Err(FrameError::InvalidEscape("\\".to_string())),
        }
    }
    Ok(out)
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_encode_then_parse_round_trip() {
        let frame = StompFrame::new(StompCommand::Send)
            .with_header("destination", "/quiet-route")
            .with_header("content-type", "application/json")
            .with_header("content-length", "13")
            .with_body("{\"start\": 1}\n");

        let parsed = StompFrame::parse(&frame.encode()).unwrap();

        assert_eq!(parsed, frame);
    }

    #[rstest]
    fn test_round_trip_with_escaped_header_characters() {
        let frame = StompFrame::new(StompCommand::Message)
            .with_header("colon:name", "value:with:colons")
            .with_header("newline", "line1\nline2")
            .with_header("carriage", "a\rb")
            .with_header("backslash", "c:\\temp");

        let parsed = StompFrame::parse(&frame.encode()).unwrap();

        assert_eq!(parsed, frame);
    }

    #[rstest]
    fn test_duplicate_headers_keep_first_occurrence() {
        let wire = "MESSAGE\nfoo:first\nfoo:second\n\n\0";

        let parsed = StompFrame::parse(wire).unwrap();

        assert_eq!(parsed.header("foo"), Some("first"));
        assert_eq!(parsed.headers.len(), 1);
    }

    #[rstest]
    fn test_body_without_content_length_runs_to_nul() {
        let wire = "SEND\ndestination:/quiet-route\n\nhello\0";

        let parsed = StompFrame::parse(wire).unwrap();

        assert_eq!(parsed.body, "hello");
    }

    #[rstest]
    fn test_body_with_nul_requires_content_length() {
        let body = "bi\0nary";
        let with_length = format!(
            "SEND\ndestination:/d\ncontent-length:{}\n\n{body}\0",
            body.len(),
        );
        let without_length = format!("SEND\ndestination:/d\n\n{body}\0");

        assert_eq!(StompFrame::parse(&with_length).unwrap().body, body);
        assert!(matches!(
            StompFrame::parse(&without_length),
            Err(FrameError::LengthMismatch(_)),
        ));
    }

    #[rstest]
    fn test_trailing_eols_after_terminator_are_tolerated() {
        let wire = "RECEIPT\nreceipt-id:r7\n\n\0\n\n";

        let parsed = StompFrame::parse(wire).unwrap();

        assert_eq!(parsed.header("receipt-id"), Some("r7"));
    }

    #[rstest]
    fn test_crlf_line_endings_are_accepted() {
        let wire = "CONNECTED\r\nversion:1.2\r\n\r\n\0";

        let parsed = StompFrame::parse(wire).unwrap();

        assert_eq!(parsed.command, StompCommand::Connected);
        assert_eq!(parsed.header("version"), Some("1.2"));
    }

    #[rstest]
    fn test_unknown_command_is_rejected() {
        let result = StompFrame::parse("FETCH\n\n\0");

        assert!(matches!(result, Err(FrameError::UnexpectedCommand(_))));
    }

    #[rstest]
    fn test_unknown_escape_is_rejected() {
        let result = StompFrame::parse("MESSAGE\nfoo:bad\\tescape\n\n\0");

        assert!(matches!(result, Err(FrameError::InvalidEscape(_))));
    }

    #[rstest]
    #[case::missing_terminator("SEND\ndestination:/d\n\nbody")]
    #[case::missing_blank_line("SEND\ndestination:/d")]
    #[case::empty("")]
    fn test_truncated_frames_are_rejected(#[case] wire: &str) {
        assert_eq!(StompFrame::parse(wire), Err(FrameError::Truncated));
    }

    #[rstest]
    fn test_content_length_mismatch_is_rejected() {
        let wire = "SEND\ncontent-length:10\n\nhi\0";

        assert!(matches!(
            StompFrame::parse(wire),
            Err(FrameError::Truncated) | Err(FrameError::LengthMismatch(_)),
        ));
    }

    #[rstest]
    fn test_content_length_not_followed_by_terminator() {
        let wire = "SEND\ncontent-length:2\n\nhello\0";

        assert!(matches!(
            StompFrame::parse(wire),
            Err(FrameError::LengthMismatch(_)),
        ));
    }

    #[rstest]
    fn test_header_line_without_colon_is_rejected() {
        let result = StompFrame::parse("MESSAGE\nnocolon\n\n\0");

        assert_eq!(result, Err(FrameError::Truncated));
    }

    #[rstest]
    fn test_command_from_str_covers_both_directions() {
        for command in [
            StompCommand::Connect,
            StompCommand::Stomp,
            StompCommand::Send,
            StompCommand::Subscribe,
            StompCommand::Unsubscribe,
            StompCommand::Disconnect,
            StompCommand::Ack,
            StompCommand::Nack,
            StompCommand::Begin,
            StompCommand::Commit,
            StompCommand::Abort,
            StompCommand::Connected,
            StompCommand::Message,
            StompCommand::Receipt,
            StompCommand::Error,
        ] {
            assert_eq!(command.as_str().parse::<StompCommand>().unwrap(), command);
        }
    }
}
