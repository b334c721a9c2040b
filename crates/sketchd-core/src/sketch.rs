//! Persisted sketch and its on-disk container format
//!
//! A visual sketch is stored as the workspace markup whose root element has two
//! extra leading children, always in this order:
//!
//! ```text
//! <xml xmlns="..."><device version="1">cm:esp32:ringo</device><snapshot>...</snapshot><block .../></xml>
//! ```
//!
//! Consumers key on the position of these nodes, not only their names. Textual
//! sketches are stored as the raw source text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::{DeviceId, RepresentationKind};
use crate::error::{Error, Result};

/// Newest container version this build can read and the one it writes
pub const SKETCH_FORMAT_VERSION: u32 = 1;

/// Root open tag, optionally preceded by an XML declaration
static ROOT_OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?s)(\s*(?:<\?.*?\?>\s*)?)<([A-Za-z_][\w:.\-]*)([^>]*?)(/?)>"#)
        .expect("root tag regex is valid")
});

static DEVICE_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?s)\s*<device(?:\s+version="(\d+)")?\s*>(.*?)</device>"#)
        .expect("device node regex is valid")
});

static SNAPSHOT_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?s)\s*(?:<snapshot\s*/>|<snapshot\s*>(.*?)</snapshot>)"#)
        .expect("snapshot node regex is valid")
});

/// The persisted form of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSketch {
    pub format_version: u32,
    pub device_id: DeviceId,
    #[serde(rename = "type")]
    pub kind: RepresentationKind,
    /// Empty means "use the starter template for `device_id`"
    pub payload: String,
    /// Rendered canvas markup; display and export only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_snapshot: Option<String>,
}

impl PersistedSketch {
    pub fn new(device_id: DeviceId, kind: RepresentationKind, payload: impl Into<String>) -> Self {
        Self {
            format_version: SKETCH_FORMAT_VERSION,
            device_id,
            kind,
            payload: payload.into(),
            visual_snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: Option<String>) -> Self {
        if self.kind.is_visual() {
            self.visual_snapshot = snapshot;
        }
        self
    }

    /// Only the exact empty string stands for the device's starter template
    pub fn is_template_sentinel(&self) -> bool {
        self.payload.is_empty()
    }

    /// Render the container text that is handed to the toolchain's `save` request
    pub fn to_container(&self) -> Result<String> {
        if self.kind == RepresentationKind::Textual || self.is_template_sentinel() {
            return Ok(self.payload.clone());
        }

        let caps = ROOT_OPEN_TAG
            .captures(&self.payload)
            .ok_or_else(|| Error::malformed_sketch("block markup has no root element"))?;

        let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let prolog = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let name = caps.get(2).map(|m| m.as_str()).unwrap_or("xml");
        let attrs = caps.get(3).map(|m| m.as_str()).unwrap_or("");
        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());

        let header = format!(
            r#"<device version="{}">{}</device><snapshot>{}</snapshot>"#,
            self.format_version,
            escape_text(self.device_id.as_str()),
            self.visual_snapshot.as_deref().unwrap_or("")
        );

        let mut out = String::with_capacity(self.payload.len() + header.len() + 16);
        out.push_str(prolog);
        out.push('<');
        out.push_str(name);
        out.push_str(attrs);
        out.push('>');
        out.push_str(&header);
        if self_closing {
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        out.push_str(&self.payload[whole..]);
        Ok(out)
    }

    /// Parse container text read back from the sketchbook.
    ///
    /// `fallback_device` is used when the text carries no device node: always for
    /// textual sketches, and for visual sketches saved by hosts that omit it.
    pub fn from_container(
        kind: RepresentationKind,
        text: &str,
        fallback_device: &DeviceId,
    ) -> Result<Self> {
        if kind == RepresentationKind::Textual || text.is_empty() {
            return Ok(Self::new(fallback_device.clone(), kind, text));
        }

        let caps = ROOT_OPEN_TAG
            .captures(text)
            .ok_or_else(|| Error::malformed_sketch("block markup has no root element"))?;
        let tag_end = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());

        if self_closing {
            return Ok(Self::new(fallback_device.clone(), kind, text));
        }

        let mut rest = &text[tag_end..];
        let mut device_id = fallback_device.clone();
        let mut format_version = SKETCH_FORMAT_VERSION;

        if let Some(device) = DEVICE_NODE.captures(rest) {
            if let Some(version) = device.get(1) {
                format_version = version.as_str().parse().map_err(|_| {
                    Error::malformed_sketch(format!("bad sketch version: {}", version.as_str()))
                })?;
            }
            if format_version > SKETCH_FORMAT_VERSION {
                return Err(Error::UnsupportedSketchVersion {
                    found: format_version,
                    supported: SKETCH_FORMAT_VERSION,
                });
            }
            let raw = device.get(2).map(|m| m.as_str()).unwrap_or("");
            device_id = DeviceId::new(unescape_text(raw.trim()))?;
            rest = &rest[device.get(0).map(|m| m.end()).unwrap_or(0)..];
        }

        let mut visual_snapshot = None;
        if let Some(snapshot) = SNAPSHOT_NODE.captures(rest) {
            visual_snapshot = snapshot
                .get(1)
                .map(|m| m.as_str().to_string())
                .filter(|s| !s.is_empty());
            rest = &rest[snapshot.get(0).map(|m| m.end()).unwrap_or(0)..];
        }

        let payload = format!("{}{}", &text[..tag_end], rest);

        Ok(Self {
            format_version,
            device_id,
            kind,
            payload,
            visual_snapshot,
        })
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_text(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
