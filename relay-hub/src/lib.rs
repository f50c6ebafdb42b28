//! TCP relay hub speaking a newline-delimited text protocol.
//!
//! Clients connect, are handed a numeric id, and may then ask for their own
//! id (`IDENTITY`), the ids of everyone else (`LIST`), or have a message
//! delivered to a set of ids (`RELAY`). Each module focuses on one piece:
//!
//! - [`hub`] accepts TCP connections and spawns one task per session.
//! - [`registry`] maps session ids to their write halves and allocates ids.
//! - [`router`] reads verbs from a session and dispatches them.
//! - [`handlers`] implements the three commands.
//! - [`codec`] holds the line framing, parsing and response formats.
//! - [`config`] and [`cli`] describe how a hub is configured and launched.
//! - [`client`] is a small companion client that sends one command.
//!
//! Integration tests drive a real [`hub::Hub`] over loopback TCP.

pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod registry;
pub mod router;
