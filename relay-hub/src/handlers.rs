//! IDENTITY, LIST and RELAY.
//!
//! Write failures are logged here and never returned; whether the session
//! survives is decided by its next read.

use std::io;

use tokio::io::AsyncBufRead;
use tracing::{debug, warn};

use crate::{
    codec,
    error::ProtocolError,
    hub::HubState,
    registry::{SessionId, SharedWriter},
};

#[derive(Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered(RelayReport),
    /// Nothing was sent to anyone.
    Rejected(ProtocolError),
}

/// Per-recipient results of one relay, in the order recipients were named.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: Vec<SessionId>,
    pub not_connected: Vec<SessionId>,
    pub failed: Vec<SessionId>,
}

pub async fn handle_identity(session: SessionId, writer: &SharedWriter) {
    debug!(session, "handling identity");
    reply(session, writer, &codec::identity_response(session)).await;
}

pub async fn handle_list(state: &HubState, session: SessionId, writer: &SharedWriter) {
    debug!(session, "handling list");
    let others = state.registry.other_ids(session).await;
    reply(session, writer, &codec::list_response(&others)).await;
}

/// Reads the message and recipient lines from the sender, then delivers.
///
/// Returns an error only when those two lines cannot be read.
pub async fn handle_relay<R>(
    state: &HubState,
    sender: SessionId,
    reader: &mut R,
) -> io::Result<RelayOutcome>
where
    R: AsyncBufRead + Unpin,
{
    debug!(session = sender, "handling relay");
    let message = read_relay_field(reader, "message").await?;
    let to = read_relay_field(reader, "recipients").await?;
    debug!(session = sender, %message, %to, "relay request");

    let recipients = codec::parse_recipients(&to);
    let limit = state.config.max_recipients;
    if let Err(err) = codec::check_recipient_limit(recipients.len(), limit) {
        warn!(session = sender, error = %err, "relay rejected");
        return Ok(RelayOutcome::Rejected(err));
    }

    let line = codec::relay_line(sender, &message);
    let mut report = RelayReport::default();

    for recipient in recipients {
        let Some(writer) = state.registry.lookup(recipient).await else {
            warn!(session = sender, recipient, "user is not connected");
            report.not_connected.push(recipient);
            continue;
        };

        let result = {
            let mut writer = writer.lock().await;
            codec::write_text(&mut *writer, &line).await
        };

        match result {
            Ok(()) => report.delivered.push(recipient),
            Err(err) => {
                warn!(session = sender, recipient, error = %err, "failed to deliver relay");
                report.failed.push(recipient);
                if state.config.prune_disconnected {
                    state.registry.remove(recipient).await;
                }
            }
        }
    }

    Ok(RelayOutcome::Delivered(report))
}

async fn read_relay_field<R>(reader: &mut R, field: &'static str) -> io::Result<String>
where
    R: AsyncBufRead + Unpin,
{
    codec::read_line(reader).await?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("connection closed before relay {field} line"),
        )
    })
}

async fn reply(session: SessionId, writer: &SharedWriter, text: &str) {
    let mut writer = writer.lock().await;
    if let Err(err) = codec::write_text(&mut *writer, text).await {
        warn!(session, error = %err, "cannot write to connection");
    }
}
