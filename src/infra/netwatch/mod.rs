pub mod ipify_client;
pub mod tcp_probe;

pub use ipify_client::IpifyClient;
pub use tcp_probe::TcpProbe;
