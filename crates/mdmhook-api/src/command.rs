// ── Command wire type ──

use serde::{Deserialize, Serialize};

/// Request type asking a device for its installed application inventory.
pub const INSTALLED_APPLICATION_LIST: &str = "InstalledApplicationList";

/// A command for the management server to queue for one device.
///
/// Serialized as `{"udid": "...", "request_type": "..."}`, the body the
/// `/v1/commands` endpoint expects. Constructed, sent, and dropped; the
/// relay never stores commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub udid: String,
    pub request_type: String,
}

impl Command {
    pub fn new(udid: impl Into<String>, request_type: impl Into<String>) -> Self {
        Self {
            udid: udid.into(),
            request_type: request_type.into(),
        }
    }

    /// `InstalledApplicationList` for the given device.
    pub fn installed_application_list(udid: impl Into<String>) -> Self {
        Self::new(udid, INSTALLED_APPLICATION_LIST)
    }
}
