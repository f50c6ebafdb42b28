//! Newline-delimited text protocol shared by the hub and the client.
//!
//! Every field is one line ending in `\n`. The first line of a request is a
//! [`Verb`]; RELAY follows it with a message line and a recipient line.

use std::{fmt, io, str::FromStr};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::{error::ProtocolError, registry::SessionId};

/// Sent in reply to LIST when the caller is alone. Carries no newline.
pub const NO_OTHER_USERS: &str = "no other users are connected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Identity,
    List,
    Relay,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Identity => "IDENTITY",
            Verb::List => "LIST",
            Verb::Relay => "RELAY",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ProtocolError;

    /// Matches case-sensitively; the client upper-cases before sending.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDENTITY" => Ok(Verb::Identity),
            "LIST" => Ok(Verb::List),
            "RELAY" => Ok(Verb::Relay),
            other => Err(ProtocolError::UnknownVerb(other.to_string())),
        }
    }
}

/// Reads one line and returns it with surrounding whitespace trimmed.
///
/// `Ok(None)` means the peer closed the stream. A trailing fragment with no
/// newline before the close is discarded the same way. Bytes that are not
/// valid UTF-8 are replaced rather than failing the read.
pub async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let bytes = reader.read_until(b'\n', &mut line).await?;
    if bytes == 0 {
        return Ok(None);
    }
    let text = String::from_utf8_lossy(&line);
    if !line.ends_with(b"\n") {
        debug!(fragment = %text, "stream closed mid-line");
        return Ok(None);
    }
    Ok(Some(text.trim().to_string()))
}

/// Writes `text` verbatim and flushes.
pub async fn write_text<W>(writer: &mut W, text: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await
}

/// Splits a comma separated recipient line into session ids.
///
/// Fields that are blank or not unsigned integers are logged and skipped, so
/// one bad id never spoils the rest.
pub fn parse_recipients(line: &str) -> Vec<SessionId> {
    line.split(',')
        .map(str::trim)
        .filter_map(|field| match field.parse::<SessionId>() {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(field, error = %err, "skipping malformed recipient id");
                None
            }
        })
        .collect()
}

pub fn check_recipient_limit(count: usize, limit: usize) -> Result<(), ProtocolError> {
    if count > limit {
        return Err(ProtocolError::TooManyRecipients { count, limit });
    }
    Ok(())
}

pub fn identity_response(id: SessionId) -> String {
    format!("Your identity is: {id}\n")
}

/// LIST reply for the given ids, which the caller has already sorted.
pub fn list_response(others: &[SessionId]) -> String {
    if others.is_empty() {
        return NO_OTHER_USERS.to_string();
    }
    let ids = others
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    format!("The following user(s) are connected [{ids}]\n")
}

pub fn relay_line(sender: SessionId, message: &str) -> String {
    format!("Message from {sender} : {message}\n")
}

/// Builds the bytes a client sends for one command.
///
/// The message and recipient lines are only added when non-empty.
pub fn encode_request(cmd: &str, message: &str, to: &str) -> String {
    let mut request = format!("{cmd}\n");
    for field in [message, to] {
        if !field.is_empty() {
            request.push_str(field);
            request.push('\n');
        }
    }
    request
}
