//! Event handling core between the webhook ingress and `mdmhook-api`.
//!
//! - **[`EventRouter`]** — Classifies each inbound [`EventEnvelope`] by
//!   [`Topic`] and runs one handler. Authenticate and CheckOut clear the
//!   enrollment flag; TokenUpdate sets it and sends an
//!   `InstalledApplicationList` command; Connect logs inventory reports.
//!
//! - **[`DeviceRegistry`]** — Concurrent in-memory `UDID -> Device` map
//!   (`DashMap`). Upserts are atomic per device and say whether the
//!   record already existed.
//!
//! - **[`CommandSink`]** — The seam to the management server.
//!   `mdmhook_api::CommandClient` implements it; delivery failures come
//!   back as a typed [`SendError`] instead of ending the process.

pub mod error;
pub mod model;
pub mod router;
pub mod sink;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use model::{
    AcknowledgeEvent, CheckinEvent, Device, EventEnvelope, PayloadKind, RawPayload, Topic,
};
pub use router::{EventOutcome, EventRouter};
pub use sink::{CommandSink, SendError};
pub use store::{DeviceRegistry, Upserted};
