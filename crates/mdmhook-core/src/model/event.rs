// ── Inbound webhook event types ──
//
// Mirrors the JSON the management server posts for every MDM event:
// a topic string plus one of two nested payload objects.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// Category of an inbound event. Decides which handler runs.
///
/// The wire names carry an `mdm.` prefix; the bare names are accepted
/// too. Anything else lands in [`Topic::Unknown`] with the raw string
/// kept for logging. A missing or `null` topic is `Unknown("")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum Topic {
    #[strum(serialize = "mdm.Authenticate", serialize = "Authenticate")]
    Authenticate,
    #[strum(serialize = "mdm.TokenUpdate", serialize = "TokenUpdate")]
    TokenUpdate,
    #[strum(serialize = "mdm.Connect", serialize = "Connect")]
    Connect,
    #[strum(serialize = "mdm.CheckOut", serialize = "CheckOut")]
    CheckOut,
    #[strum(default)]
    Unknown(String),
}

impl Topic {
    /// Canonical wire name (or the raw string for unknown topics).
    pub fn as_str(&self) -> &str {
        match self {
            Self::Authenticate => "mdm.Authenticate",
            Self::TokenUpdate => "mdm.TokenUpdate",
            Self::Connect => "mdm.Connect",
            Self::CheckOut => "mdm.CheckOut",
            Self::Unknown(raw) => raw,
        }
    }

    /// The payload variant a handler for this topic needs.
    pub fn required_payload(&self) -> Option<PayloadKind> {
        match self {
            Self::Authenticate | Self::TokenUpdate | Self::CheckOut => Some(PayloadKind::Checkin),
            Self::Connect => Some(PayloadKind::Acknowledge),
            Self::Unknown(_) => None,
        }
    }
}

impl From<String> for Topic {
    fn from(raw: String) -> Self {
        Self::from_str(&raw).unwrap_or(Self::Unknown(raw))
    }
}

impl From<Option<String>> for Topic {
    fn from(raw: Option<String>) -> Self {
        raw.map(Self::from).unwrap_or_default()
    }
}

impl Default for Topic {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        match topic {
            Topic::Unknown(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which nested payload object an event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PayloadKind {
    #[strum(to_string = "checkin_event")]
    Checkin,
    #[strum(to_string = "acknowledge_event")]
    Acknowledge,
}

const BINARY_PLIST_MAGIC: &[u8] = b"bplist";

/// Opaque bytes the device sent, usually an XML plist.
///
/// On the wire this is a base64 string. Markup, and anything that does
/// not decode to text or a binary plist, is kept verbatim so
/// hand-written payloads work too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPayload(Vec<u8>);

impl RawPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    fn from_wire(encoded: &str) -> Self {
        let trimmed = encoded.trim();
        if trimmed.starts_with('<') {
            return Self(encoded.as_bytes().to_vec());
        }

        match STANDARD.decode(trimmed) {
            Ok(bytes)
                if bytes.starts_with(BINARY_PLIST_MAGIC) || std::str::from_utf8(&bytes).is_ok() =>
            {
                Self(bytes)
            }
            _ => Self(encoded.as_bytes().to_vec()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The payload as text, with invalid UTF-8 replaced.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Whether the payload mentions `marker` anywhere.
    pub fn contains(&self, marker: &str) -> bool {
        self.to_text().contains(marker)
    }
}

impl Serialize for RawPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for RawPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?;
        Ok(encoded
            .map(|s| Self::from_wire(&s))
            .unwrap_or_default())
    }
}

/// Payload of Authenticate, TokenUpdate and CheckOut events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinEvent {
    #[serde(default)]
    pub udid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_params: Option<HashMap<String, String>>,
    #[serde(default)]
    pub raw_payload: RawPayload,
}

/// Payload of Connect events: the device's answer to a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgeEvent {
    #[serde(default)]
    pub udid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_params: Option<HashMap<String, String>>,
    #[serde(default)]
    pub raw_payload: RawPayload,
}

/// One webhook delivery from the management server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(default)]
    pub topic: Topic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "checkin", skip_serializing_if = "Option::is_none")]
    pub checkin_event: Option<CheckinEvent>,
    #[serde(default, alias = "acknowledge", skip_serializing_if = "Option::is_none")]
    pub acknowledge_event: Option<AcknowledgeEvent>,
}

impl EventEnvelope {
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            event_id: None,
            created_at: None,
            checkin_event: None,
            acknowledge_event: None,
        }
    }

    pub fn with_checkin(mut self, udid: impl Into<String>) -> Self {
        self.checkin_event = Some(CheckinEvent {
            udid: udid.into(),
            ..CheckinEvent::default()
        });
        self
    }

    pub fn with_acknowledge(mut self, udid: impl Into<String>, raw: impl Into<Vec<u8>>) -> Self {
        self.acknowledge_event = Some(AcknowledgeEvent {
            udid: udid.into(),
            raw_payload: RawPayload::new(raw),
            ..AcknowledgeEvent::default()
        });
        self
    }

    /// The checkin payload, if present and naming a device.
    pub fn checkin(&self) -> Option<&CheckinEvent> {
        self.checkin_event.as_ref().filter(|c| !c.udid.is_empty())
    }

    /// The acknowledge payload, if present and naming a device.
    pub fn acknowledge(&self) -> Option<&AcknowledgeEvent> {
        self.acknowledge_event
            .as_ref()
            .filter(|a| !a.udid.is_empty())
    }

    /// Best-effort device id for log lines.
    pub fn udid(&self) -> Option<&str> {
        self.checkin()
            .map(|c| c.udid.as_str())
            .or_else(|| self.acknowledge().map(|a| a.udid.as_str()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_prefixed_and_bare_topics() {
        assert_eq!(Topic::from("mdm.TokenUpdate".to_string()), Topic::TokenUpdate);
        assert_eq!(Topic::from("Authenticate".to_string()), Topic::Authenticate);
        assert_eq!(Topic::from("mdm.CheckOut".to_string()), Topic::CheckOut);
        assert_eq!(Topic::from("Connect".to_string()), Topic::Connect);
    }

    #[test]
    fn unknown_topic_keeps_raw_string() {
        let topic = Topic::from("mdm.UserAuthenticate".to_string());
        assert_eq!(topic, Topic::Unknown("mdm.UserAuthenticate".into()));
        assert_eq!(topic.as_str(), "mdm.UserAuthenticate");
        assert_eq!(topic.required_payload(), None);
    }

    #[test]
    fn topics_are_case_sensitive() {
        assert!(matches!(
            Topic::from("mdm.tokenupdate".to_string()),
            Topic::Unknown(_)
        ));
    }

    #[test]
    fn required_payload_per_topic() {
        assert_eq!(Topic::Authenticate.required_payload(), Some(PayloadKind::Checkin));
        assert_eq!(Topic::TokenUpdate.required_payload(), Some(PayloadKind::Checkin));
        assert_eq!(Topic::CheckOut.required_payload(), Some(PayloadKind::Checkin));
        assert_eq!(Topic::Connect.required_payload(), Some(PayloadKind::Acknowledge));
        assert_eq!(PayloadKind::Checkin.to_string(), "checkin_event");
        assert_eq!(PayloadKind::Acknowledge.to_string(), "acknowledge_event");
    }

    #[test]
    fn decodes_server_webhook_body() {
        let body = json!({
            "topic": "mdm.TokenUpdate",
            "event_id": "8e5c1b0c-2d5f-4d4e-9d0a-1f2e3d4c5b6a",
            "created_at": "2024-05-01T12:00:00.123456Z",
            "checkin_event": {
                "udid": "ABC",
                "url_params": null,
                "raw_payload": STANDARD.encode("<plist>token</plist>")
            }
        });

        let event: EventEnvelope = serde_json::from_value(body).unwrap();

        assert_eq!(event.topic, Topic::TokenUpdate);
        let checkin = event.checkin().unwrap();
        assert_eq!(checkin.udid, "ABC");
        assert_eq!(checkin.url_params, None);
        assert_eq!(checkin.raw_payload.to_text(), "<plist>token</plist>");
        assert!(event.created_at.is_some());
        assert!(event.acknowledge_event.is_none());
    }

    #[test]
    fn decodes_short_payload_aliases() {
        let body = json!({
            "topic": "Connect",
            "acknowledge": {
                "udid": "ABC",
                "status": "Acknowledged",
                "raw_payload": "<plist>InstalledApplicationList</plist>"
            }
        });

        let event: EventEnvelope = serde_json::from_value(body).unwrap();
        let ack = event.acknowledge().unwrap();

        assert_eq!(event.topic, Topic::Connect);
        assert_eq!(ack.status.as_deref(), Some("Acknowledged"));
        assert_eq!(
            ack.raw_payload.to_text(),
            "<plist>InstalledApplicationList</plist>"
        );
    }

    #[test]
    fn null_payload_counts_as_absent() {
        let body = json!({ "topic": "mdm.Authenticate", "checkin_event": null });
        let event: EventEnvelope = serde_json::from_value(body).unwrap();
        assert!(event.checkin().is_none());
    }

    #[test]
    fn payload_without_udid_counts_as_absent() {
        let body = json!({ "topic": "mdm.Authenticate", "checkin_event": {} });
        let event: EventEnvelope = serde_json::from_value(body).unwrap();
        assert!(event.checkin_event.is_some());
        assert!(event.checkin().is_none());
        assert_eq!(event.udid(), None);
    }

    #[test]
    fn missing_or_null_topic_is_unknown() {
        let missing: EventEnvelope =
            serde_json::from_value(json!({ "checkin_event": { "udid": "ABC" } })).unwrap();
        assert_eq!(missing.topic, Topic::Unknown(String::new()));
        assert_eq!(missing.checkin().unwrap().udid, "ABC");

        let null: EventEnvelope = serde_json::from_value(json!({ "topic": null })).unwrap();
        assert_eq!(null.topic, Topic::Unknown(String::new()));
        assert_eq!(null.topic.required_payload(), None);
    }

    #[test]
    fn plain_text_payload_is_kept_verbatim() {
        // Both of these happen to be valid base64.
        for raw in ["InstalledApplicationList", "Acknowledged"] {
            let event: EventEnvelope = serde_json::from_value(json!({
                "topic": "mdm.Connect",
                "acknowledge_event": { "udid": "ABC", "raw_payload": raw }
            }))
            .unwrap();
            assert_eq!(event.acknowledge().unwrap().raw_payload.to_text(), raw);
        }
    }

    #[test]
    fn base64_payload_is_decoded() {
        let plist = "<?xml version=\"1.0\"?><plist><dict/></plist>";
        let binary = b"bplist00\xd1\x01\x02";

        for (encoded, expected) in [
            (STANDARD.encode(plist), plist.as_bytes()),
            (STANDARD.encode(binary), binary.as_slice()),
        ] {
            let event: EventEnvelope = serde_json::from_value(json!({
                "topic": "mdm.Connect",
                "acknowledge_event": { "udid": "ABC", "raw_payload": encoded }
            }))
            .unwrap();
            assert_eq!(event.acknowledge().unwrap().raw_payload.as_bytes(), expected);
        }
    }

    #[test]
    fn serializes_with_wire_names() {
        let event = EventEnvelope::new(Topic::CheckOut).with_checkin("ABC");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["topic"], "mdm.CheckOut");
        assert_eq!(value["checkin_event"]["udid"], "ABC");
        assert_eq!(value["checkin_event"]["raw_payload"], "");
    }
}
