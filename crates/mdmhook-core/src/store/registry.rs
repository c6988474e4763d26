// ── Device registry ──
//
// Concurrent UDID -> Device map. Each upsert runs under the shard lock
// for its key, so look-up, mutate and write-back are one atomic step
// per device. Nothing is persisted.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::model::Device;

/// Result of [`DeviceRegistry::upsert`]: the record as written, and
/// whether it existed before the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    pub device: Device,
    pub existed: bool,
}

/// In-memory record of every device the relay has heard about.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: DashMap<String, Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create-or-update the record for `udid`.
    ///
    /// A missing record is created with [`Device::new`] before `mutate`
    /// runs. The returned copy is detached from the map, so callers may
    /// hold it across `.await` points.
    pub fn upsert(&self, udid: &str, mutate: impl FnOnce(&mut Device)) -> Upserted {
        match self.devices.entry(udid.to_owned()) {
            Entry::Occupied(mut entry) => {
                mutate(entry.get_mut());
                Upserted {
                    device: entry.get().clone(),
                    existed: true,
                }
            }
            Entry::Vacant(entry) => {
                let mut device = Device::new(udid);
                mutate(&mut device);
                let device = entry.insert(device).value().clone();
                Upserted {
                    device,
                    existed: false,
                }
            }
        }
    }

    /// Set the enrollment flag, creating the record if needed.
    pub fn set_enrolled(&self, udid: &str, enrolled: bool) -> Upserted {
        self.upsert(udid, |device| device.enrolled = enrolled)
    }

    /// Look up a device by UDID.
    pub fn get(&self, udid: &str) -> Option<Device> {
        self.devices.get(udid).map(|r| r.value().clone())
    }

    pub fn contains(&self, udid: &str) -> bool {
        self.devices.contains_key(udid)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Number of devices currently enrolled.
    pub fn enrolled_count(&self) -> usize {
        self.devices.iter().filter(|r| r.value().enrolled).count()
    }

    /// All records, sorted by UDID.
    pub fn snapshot(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.iter().map(|r| r.value().clone()).collect();
        devices.sort_by(|a, b| a.udid.cmp(&b.udid));
        devices
    }
}
