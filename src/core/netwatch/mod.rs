// Network watchers.
// - `ip_watch.rs` notices when the public IP changes.
// - `port_monitor.rs` tracks reachability of configured host:port pairs.

pub mod ip_watch;
pub mod port_monitor;

use thiserror::Error;

use crate::core::settings::SettingsError;

#[derive(Debug, Error)]
pub enum NetwatchError {
    #[error("public IP lookup failed: {0}")]
    Lookup(String),
    #[error("`{0}` is not a valid HH:MM time")]
    InvalidTime(String),
    #[error("port must be between 1 and 65535, got {0}")]
    InvalidPort(i64),
    #[error("`{0}` is not a valid host")]
    InvalidHost(String),
    #[error("{0} is already monitored")]
    MonitorExists(String),
    #[error("{0} is not monitored")]
    MonitorNotFound(String),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub use ip_watch::{
    deliver_first, notification_text, notify_targets, IpCheck, IpNotifyTarget, IpWatchService,
    PublicIpSource,
};
pub use port_monitor::{PortMonitorService, PortProbe, PortTransition, TransitionKind};
