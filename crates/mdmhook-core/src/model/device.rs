// ── Device domain type ──

/// A managed device as the relay knows it.
///
/// Created the first time any checkin event names its UDID, never
/// removed. `enrolled` is only `true` between a token update and the
/// next Authenticate or CheckOut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub udid: String,
    pub enrolled: bool,
}

impl Device {
    /// A freshly seen device, not yet enrolled.
    pub fn new(udid: impl Into<String>) -> Self {
        Self {
            udid: udid.into(),
            enrolled: false,
        }
    }
}
