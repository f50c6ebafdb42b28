use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

use crate::config::MAX_RECIPIENTS;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay hub, accepting TCP connections.
    Hub(HubArgs),
    /// Send one command to a hub and print everything it sends back.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct HubArgs {
    /// Socket address the hub should bind to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "0.0.0.0:61000")]
    pub listen: SocketAddr,

    /// Maximum number of recipients a single RELAY may name.
    #[arg(long, default_value_t = MAX_RECIPIENTS)]
    pub max_recipients: usize,

    /// Keep sessions registered after their connection closes.
    #[arg(long)]
    pub retain_disconnected: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Address of the hub to connect to.
    #[arg(long, default_value = "127.0.0.1:61000")]
    pub server: SocketAddr,

    /// The command to perform: IDENTITY, LIST or RELAY.
    #[arg(long)]
    pub cmd: String,

    /// Message to relay, required for RELAY.
    #[arg(short = 'm', long = "message", default_value = "")]
    pub message: String,

    /// Comma separated recipient ids (1,2,3), required for RELAY.
    #[arg(long, default_value = "")]
    pub to: String,
}
