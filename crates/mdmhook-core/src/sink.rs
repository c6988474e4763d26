// ── Outbound command seam ──
//
// The router only needs "deliver this command". `CommandSink` is that
// contract; `CommandClient` implements it over HTTP.

use std::future::Future;

use thiserror::Error;

use mdmhook_api::{Command, CommandClient};

/// Why a command could not be delivered.
#[derive(Debug, Error)]
pub enum SendError {
    /// Timeout, connection failure, 5xx or rate limiting. Sending the
    /// same command later may succeed.
    #[error("{0}")]
    Retryable(#[source] mdmhook_api::Error),

    /// Bad credentials, rejected command or bad configuration.
    #[error("{0}")]
    Permanent(#[source] mdmhook_api::Error),
}

impl SendError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

impl From<mdmhook_api::Error> for SendError {
    fn from(err: mdmhook_api::Error) -> Self {
        if err.is_transient() {
            Self::Retryable(err)
        } else {
            Self::Permanent(err)
        }
    }
}

/// Something that can deliver a command to the management server.
pub trait CommandSink: Send + Sync {
    fn send(&self, command: &Command) -> impl Future<Output = Result<(), SendError>> + Send;
}

impl CommandSink for CommandClient {
    async fn send(&self, command: &Command) -> Result<(), SendError> {
        self.send_command(command).await.map_err(SendError::from)
    }
}
