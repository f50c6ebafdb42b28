use std::io;

use tokio::io::AsyncBufRead;
use tracing::{debug, warn};

use crate::{
    codec::{self, Verb},
    error::ProtocolError,
    handlers::{self, RelayOutcome},
    hub::HubState,
    registry::{SessionId, SharedWriter},
};

/// Why a session's command loop stopped without a transport error.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed its side of the connection.
    Disconnected,
    /// The client sent something that is not a verb.
    Rejected(ProtocolError),
}

/// Serves commands from one session, strictly in the order they arrive.
///
/// Read errors end the loop with `Err`; everything else ends it with a
/// [`SessionEnd`].
pub async fn route_session<R>(
    state: &HubState,
    session: SessionId,
    reader: &mut R,
    writer: &SharedWriter,
) -> io::Result<SessionEnd>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let Some(line) = codec::read_line(reader).await? else {
            return Ok(SessionEnd::Disconnected);
        };

        let verb = match line.parse::<Verb>() {
            Ok(verb) => verb,
            Err(err) => {
                warn!(session, error = %err, "closing session");
                return Ok(SessionEnd::Rejected(err));
            }
        };

        debug!(session, %verb, "received message type");
        dispatch(state, session, verb, reader, writer).await?;
    }
}

async fn dispatch<R>(
    state: &HubState,
    session: SessionId,
    verb: Verb,
    reader: &mut R,
    writer: &SharedWriter,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    match verb {
        Verb::Identity => handlers::handle_identity(session, writer).await,
        Verb::List => handlers::handle_list(state, session, writer).await,
        Verb::Relay => {
            if let RelayOutcome::Delivered(report) =
                handlers::handle_relay(state, session, reader).await?
            {
                debug!(
                    session,
                    delivered = report.delivered.len(),
                    not_connected = report.not_connected.len(),
                    failed = report.failed.len(),
                    "relay finished"
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, time::Duration};

    use tokio::{
        io::{AsyncBufReadExt, BufReader, duplex, split},
        time::timeout,
    };

    use super::*;
    use crate::config::HubConfig;

    fn input(text: &str) -> BufReader<Cursor<Vec<u8>>> {
        raw_input(text.as_bytes())
    }

    fn raw_input(bytes: &[u8]) -> BufReader<Cursor<Vec<u8>>> {
        BufReader::new(Cursor::new(bytes.to_vec()))
    }

    #[tokio::test]
    async fn commands_are_answered_in_order() {
        let state = HubState::new(HubConfig::default());
        let (client, server) = duplex(4096);
        let (_server_read, server_write) = split(server);
        let (id, writer) = state.registry.register(server_write).await;
        state.registry.register(tokio::io::sink()).await;

        let mut reader = input("IDENTITY\nLIST\nIDENTITY\n");
        let end = route_session(&state, id, &mut reader, &writer)
            .await
            .expect("route");
        assert_eq!(end, SessionEnd::Disconnected);

        let mut client = BufReader::new(client);
        let mut lines = Vec::new();
        for _ in 0..3 {
            let mut line = String::new();
            timeout(Duration::from_secs(1), client.read_line(&mut line))
                .await
                .expect("timed out")
                .expect("read");
            lines.push(line);
        }
        assert_eq!(
            lines,
            vec![
                "Your identity is: 1\n",
                "The following user(s) are connected [2]\n",
                "Your identity is: 1\n",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_verb_ends_session() {
        let state = HubState::new(HubConfig::default());
        let (id, writer) = state.registry.register(tokio::io::sink()).await;

        let mut reader = input("UNKNOWN\nIDENTITY\n");
        let end = route_session(&state, id, &mut reader, &writer)
            .await
            .expect("route");
        assert_eq!(
            end,
            SessionEnd::Rejected(ProtocolError::UnknownVerb("UNKNOWN".into()))
        );
    }

    #[tokio::test]
    async fn lowercase_verb_is_not_recognized() {
        let state = HubState::new(HubConfig::default());
        let (id, writer) = state.registry.register(tokio::io::sink()).await;

        let mut reader = input("identity\n");
        let end = route_session(&state, id, &mut reader, &writer)
            .await
            .expect("route");
        assert!(matches!(end, SessionEnd::Rejected(_)));
    }

    #[tokio::test]
    async fn truncated_relay_is_a_read_error() {
        let state = HubState::new(HubConfig::default());
        let (id, writer) = state.registry.register(tokio::io::sink()).await;

        let mut reader = input("RELAY\nmessage only\n");
        let err = route_session(&state, id, &mut reader, &writer)
            .await
            .expect_err("relay without recipients");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn relay_does_not_stop_the_loop() {
        let state = HubState::new(HubConfig::default());
        let (id, writer) = state.registry.register(tokio::io::sink()).await;

        let mut reader = input("RELAY\nhi\n9,x\nRELAY\nhi\n1\nLIST\n");
        let end = route_session(&state, id, &mut reader, &writer)
            .await
            .expect("route");
        assert_eq!(end, SessionEnd::Disconnected);
    }

    #[tokio::test]
    async fn relay_with_invalid_utf8_is_still_delivered() {
        let state = HubState::new(HubConfig::default());
        let (client, server) = duplex(4096);
        let (_server_read, server_write) = split(server);
        let (id, writer) = state.registry.register(server_write).await;

        let mut reader = raw_input(b"RELAY\ncaf\xe9\n1\nIDENTITY\n");
        let end = route_session(&state, id, &mut reader, &writer)
            .await
            .expect("route");
        assert_eq!(end, SessionEnd::Disconnected);

        let mut client = BufReader::new(client);
        let mut relayed = String::new();
        let mut identity = String::new();
        for line in [&mut relayed, &mut identity] {
            timeout(Duration::from_secs(1), client.read_line(line))
                .await
                .expect("timed out")
                .expect("read");
        }
        assert_eq!(relayed, "Message from 1 : caf\u{FFFD}\n");
        assert_eq!(identity, "Your identity is: 1\n");
    }

    #[tokio::test]
    async fn reply_failures_do_not_stop_the_loop() {
        let state = HubState::new(HubConfig::default());
        let (client, server) = duplex(64);
        drop(client);
        let (id, writer) = state.registry.register(server).await;

        let mut reader = input("IDENTITY\nLIST\nIDENTITY\n");
        let end = route_session(&state, id, &mut reader, &writer)
            .await
            .expect("route");

        assert_eq!(end, SessionEnd::Disconnected);
        assert_eq!(reader.get_ref().position(), 23);
    }
}
