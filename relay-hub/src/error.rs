use thiserror::Error;

/// Client requests the hub refuses to act on.
///
/// These never travel back over the wire; the hub logs them and either drops
/// the session or skips the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unrecognized command verb '{0}'")]
    UnknownVerb(String),
    #[error("too many message recipients: {count}, max {limit}")]
    TooManyRecipients { count: usize, limit: usize },
}
