// ── Event classification and handlers ──
//
// One entry point, `EventRouter::handle`, picks the handler for the
// event's topic. Handlers validate their payload, update the registry
// and, for token updates, request the installed application list.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use mdmhook_api::{Command, INSTALLED_APPLICATION_LIST};

use crate::error::CoreError;
use crate::model::{AcknowledgeEvent, CheckinEvent, EventEnvelope, PayloadKind, Topic};
use crate::sink::CommandSink;
use crate::store::DeviceRegistry;

/// What handling an event did. Returned for callers and tests; the
/// HTTP layer only cares that it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Authenticate: device recorded as not enrolled.
    Enrolling { udid: String, new_device: bool },
    /// TokenUpdate: device enrolled and a command was sent.
    TokenUpdated { udid: String, request_type: String },
    /// Connect carrying an installed application list.
    InventoryReport { udid: String, report: String },
    /// Connect carrying any other command result.
    Acknowledged { udid: String },
    /// CheckOut: device recorded as not enrolled.
    CheckedOut { udid: String },
    /// Topic the relay does not handle.
    Ignored { topic: String },
}

/// Routes inbound events to their handlers.
///
/// Owns the [`DeviceRegistry`] for the life of the process and the
/// [`CommandSink`] used for follow-up commands.
pub struct EventRouter<S> {
    registry: Arc<DeviceRegistry>,
    sink: S,
}

impl<S: CommandSink> EventRouter<S> {
    pub fn new(sink: S) -> Self {
        Self::with_registry(Arc::new(DeviceRegistry::new()), sink)
    }

    pub fn with_registry(registry: Arc<DeviceRegistry>, sink: S) -> Self {
        Self { registry, sink }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Classify `event` by topic and run exactly one handler.
    ///
    /// Unknown topics are logged and succeed without touching state.
    pub async fn handle(&self, event: &EventEnvelope) -> Result<EventOutcome, CoreError> {
        info!(
            topic = %event.topic,
            udid = event.udid().unwrap_or("-"),
            event_id = event.event_id.as_deref().unwrap_or("-"),
            "handling event"
        );

        match &event.topic {
            Topic::Authenticate => Ok(self.authenticate(required_checkin(event)?)),
            Topic::TokenUpdate => self.token_update(required_checkin(event)?).await,
            Topic::Connect => Ok(Self::connect(required_acknowledge(event)?)),
            Topic::CheckOut => Ok(self.check_out(required_checkin(event)?)),
            Topic::Unknown(raw) => {
                warn!(
                    topic = %raw,
                    "event topic was not mdm.Authenticate, mdm.TokenUpdate, mdm.Connect or mdm.CheckOut"
                );
                Ok(EventOutcome::Ignored { topic: raw.clone() })
            }
        }
    }

    /// The device is installing the MDM payload. Not enrolled until its
    /// first token update.
    fn authenticate(&self, checkin: &CheckinEvent) -> EventOutcome {
        let result = self.registry.set_enrolled(&checkin.udid, false);

        if result.existed {
            info!(udid = %checkin.udid, "re-enrolling device");
        } else {
            info!(udid = %checkin.udid, "enrolling new device");
        }

        EventOutcome::Enrolling {
            udid: result.device.udid,
            new_device: !result.existed,
        }
    }

    /// Push token material changed. The device is reachable from here
    /// on, so this is where the inventory request goes out. Fires on
    /// every token update, not only the first.
    async fn token_update(&self, checkin: &CheckinEvent) -> Result<EventOutcome, CoreError> {
        let device = self.registry.set_enrolled(&checkin.udid, true).device;
        debug!(udid = %device.udid, "device enrolled");

        let command = Command::new(device.udid.clone(), INSTALLED_APPLICATION_LIST);
        if let Err(source) = self.sink.send(&command).await {
            error!(
                udid = %command.udid,
                request_type = %command.request_type,
                retryable = source.is_retryable(),
                error = %source,
                "send command to device"
            );
            return Err(CoreError::CommandDelivery {
                udid: command.udid,
                request_type: command.request_type,
                source,
            });
        }

        info!(
            udid = %command.udid,
            request_type = %command.request_type,
            "command sent"
        );
        Ok(EventOutcome::TokenUpdated {
            udid: command.udid,
            request_type: command.request_type,
        })
    }

    /// The device answered a command. Only inventory reports are of
    /// interest; they are logged verbatim.
    fn connect(ack: &AcknowledgeEvent) -> EventOutcome {
        if !ack.raw_payload.contains(INSTALLED_APPLICATION_LIST) {
            debug!(udid = %ack.udid, status = ack.status.as_deref().unwrap_or("-"), "command result");
            return EventOutcome::Acknowledged {
                udid: ack.udid.clone(),
            };
        }

        let report = ack.raw_payload.to_text();
        info!(udid = %ack.udid, "{report}");
        EventOutcome::InventoryReport {
            udid: ack.udid.clone(),
            report,
        }
    }

    /// The MDM profile was removed. The record stays.
    fn check_out(&self, checkin: &CheckinEvent) -> EventOutcome {
        let result = self.registry.set_enrolled(&checkin.udid, false);
        info!(udid = %checkin.udid, existed = result.existed, "device checked out");
        EventOutcome::CheckedOut {
            udid: result.device.udid,
        }
    }
}

fn required_checkin(event: &EventEnvelope) -> Result<&CheckinEvent, CoreError> {
    event
        .checkin()
        .ok_or_else(|| missing(event, PayloadKind::Checkin))
}

fn required_acknowledge(event: &EventEnvelope) -> Result<&AcknowledgeEvent, CoreError> {
    event
        .acknowledge()
        .ok_or_else(|| missing(event, PayloadKind::Acknowledge))
}

fn missing(event: &EventEnvelope, expected: PayloadKind) -> CoreError {
    error!(topic = %event.topic, "The event has no {expected}");
    CoreError::MissingPayload {
        topic: event.topic.clone(),
        expected,
    }
}
