//! mdmhook -- MicroMDM webhook relay.
//!
//! The binary in `main.rs` is a thin shell over these modules so the
//! router and configuration can be exercised from tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod telemetry;
