// mdmhook-api: Async Rust client for the MicroMDM command API

pub mod client;
pub mod command;
pub mod error;
pub mod transport;

pub use client::{API_USERNAME, CommandClient};
pub use command::{Command, INSTALLED_APPLICATION_LIST};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
