// ── Domain model ──

mod device;
mod event;

pub use device::Device;
pub use event::{
    AcknowledgeEvent, CheckinEvent, EventEnvelope, PayloadKind, RawPayload, Topic,
};
