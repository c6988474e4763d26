// ── In-memory state ──

mod registry;

pub use registry::{DeviceRegistry, Upserted};
