//! Startup and runtime errors with miette diagnostics.

use std::net::SocketAddr;

use miette::Diagnostic;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
}

#[derive(Debug, Error, Diagnostic)]
pub enum RelayError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Missing required parameter --{flag}")]
    #[diagnostic(
        code(mdmhook::missing_parameter),
        help("Pass --{flag}, set {env}, or add `{key}` to the config file.")
    )]
    MissingParameter {
        flag: &'static str,
        env: &'static str,
        key: &'static str,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(mdmhook::validation))]
    Validation { field: String, reason: String },

    #[error("Config file not found: {path}")]
    #[diagnostic(
        code(mdmhook::config_not_found),
        help("Check the --config path or unset MDMHOOK_CONFIG.")
    )]
    ConfigNotFound { path: String },

    #[error("Failed to load config file {path}")]
    #[diagnostic(code(mdmhook::config_error))]
    Config {
        path: String,
        #[source]
        source: Box<figment::Error>,
    },

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("Could not set up the MicroMDM client")]
    #[diagnostic(
        code(mdmhook::client_setup),
        help("Check --ca-cert, or use --insecure for a self-signed server.")
    )]
    Client(#[from] mdmhook_api::Error),

    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(mdmhook::bind_failed),
        help("Ports below 1024 need elevated privileges. Try --port 8080.")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Webhook server failed")]
    #[diagnostic(code(mdmhook::server))]
    Server(#[source] std::io::Error),
}

impl RelayError {
    /// Map this error to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingParameter { .. }
            | Self::Validation { .. }
            | Self::ConfigNotFound { .. }
            | Self::Config { .. } => exit_code::USAGE,
            Self::Client(_) | Self::Bind { .. } | Self::Server(_) => exit_code::GENERAL,
        }
    }

    /// Whether the usage text should accompany this error.
    pub fn shows_usage(&self) -> bool {
        matches!(self, Self::MissingParameter { .. })
    }
}
