//! The in-memory program being edited

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::device::DeviceCatalog;
use crate::error::{Error, Result};

/// How a program is represented. Fixed for the lifetime of a loaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    /// Block diagram edited through the workspace
    Visual,
    /// Source text edited through the text buffer
    Textual,
}

impl RepresentationKind {
    /// Wire name used by the `save` and `sketches` messages
    pub fn wire_name(&self) -> &'static str {
        match self {
            RepresentationKind::Visual => "block",
            RepresentationKind::Textual => "code",
        }
    }

    /// Parse a wire name. Legacy hosts send the enum ordinal instead.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "block" | "0" => Some(RepresentationKind::Visual),
            "code" | "1" => Some(RepresentationKind::Textual),
            _ => None,
        }
    }

    pub fn is_visual(&self) -> bool {
        matches!(self, RepresentationKind::Visual)
    }
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl Serialize for RepresentationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for RepresentationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let text = match &value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "invalid representation kind: {}",
                    other
                )))
            }
        };
        RepresentationKind::from_wire(&text).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown representation kind: {}", text))
        })
    }
}

/// Opaque identifier of the target hardware, e.g. `cm:esp32:ringo`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidDeviceId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeviceId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        DeviceId::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authoritative program being edited.
///
/// `kind` has no setter: switching representation means loading a new document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    kind: RepresentationKind,
    device_id: DeviceId,
    payload: String,
    title: String,
    dirty: bool,
}

impl Document {
    pub(crate) fn new(
        kind: RepresentationKind,
        device_id: DeviceId,
        payload: String,
        title: String,
    ) -> Self {
        Self {
            kind,
            device_id,
            payload,
            title,
            dirty: false,
        }
    }

    /// Fresh untitled document seeded from the device's starter template
    pub fn create_from_template(
        device_id: DeviceId,
        kind: RepresentationKind,
        catalog: &DeviceCatalog,
    ) -> Result<Self> {
        let profile = catalog
            .lookup(&device_id)
            .ok_or_else(|| Error::unknown_device(device_id.as_str()))?;
        let payload = profile.template.payload_for(kind).to_string();
        Ok(Self::new(kind, device_id, payload, String::new()))
    }

    pub fn kind(&self) -> RepresentationKind {
        self.kind
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Empty title means the document has never been saved
    pub fn is_untitled(&self) -> bool {
        self.title.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the payload after a user edit. Does not touch the dirty flag.
    pub fn set_payload(&mut self, payload: impl Into<String>) {
        self.payload = payload.into();
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Record a successful save, optionally under a new title
    pub fn mark_clean(&mut self, new_title: Option<String>) {
        self.dirty = false;
        if let Some(title) = new_title {
            self.title = title;
        }
    }
}
