use std::net::{Ipv4Addr, SocketAddr};

use crate::cli::HubArgs;

/// Port the hub listens on when no address is given.
pub const DEFAULT_PORT: u16 = 61000;

/// Upper bound on recipients accepted by a single RELAY.
pub const MAX_RECIPIENTS: usize = 255;

/// Runtime settings for a hub instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Address the listener binds to.
    pub listen: SocketAddr,
    /// A RELAY naming more recipients than this is rejected without delivery.
    pub max_recipients: usize,
    /// Remove sessions from the registry once their connection is gone.
    ///
    /// When `false`, entries stay registered until shutdown and relays to them
    /// only log the failed write.
    pub prune_disconnected: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_recipients: MAX_RECIPIENTS,
            prune_disconnected: true,
        }
    }
}

impl HubConfig {
    /// Config bound to an explicit address, other settings at their defaults.
    pub fn with_listen(listen: SocketAddr) -> Self {
        Self {
            listen,
            ..Self::default()
        }
    }
}

impl From<&HubArgs> for HubConfig {
    fn from(args: &HubArgs) -> Self {
        Self {
            listen: args.listen,
            max_recipients: args.max_recipients,
            prune_disconnected: !args.retain_disconnected,
        }
    }
}
