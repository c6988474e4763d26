// ── Core error types ──
//
// Errors an event can end in. The ingress layer turns these into HTTP
// responses; none of them stop the process.

use thiserror::Error;

use crate::model::{PayloadKind, Topic};
use crate::sink::SendError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The topic's handler needs a payload the event did not carry.
    #[error("The event has no {expected}")]
    MissingPayload { topic: Topic, expected: PayloadKind },

    /// The follow-up command could not be delivered. Registry changes
    /// made before the send are kept.
    #[error("send {request_type} to device {udid}: {source}")]
    CommandDelivery {
        udid: String,
        request_type: String,
        #[source]
        source: SendError,
    },
}

impl CoreError {
    /// Returns `true` if the sender of the event is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingPayload { .. })
    }

    /// Returns `true` if redelivering the event may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CommandDelivery { source, .. } => source.is_retryable(),
            Self::MissingPayload { .. } => false,
        }
    }
}
