//! Device catalog: display names, block palettes and starter templates per target

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::{DeviceId, RepresentationKind};

/// Empty-canvas markup shared by every built-in device
const EMPTY_FUNCTIONS_BLOCK: &str = r#"<xml xmlns="http://www.w3.org/1999/xhtml"><block type="arduino_functions" id="a2?I/d{0K_Umf.d2k4D0" x="40" y="50"></block></xml>"#;

const RINGO_CODE: &str = "#include <MAKERphone.h>

MAKERphone mp;

void setup() {
  mp.begin(1);
  mp.display.fillScreen(TFT_BLACK);
}

void loop() {
  mp.update();

}";

const ARDUINO_CODE: &str = "#include <Arduino.h>

void setup() {

}

void loop() {

}";

/// Block categories every device gets before its own hardware categories
const COMMON_PALETTE: &[&str] = &["Logic", "Loops", "Math", "Text", "Variables", "Functions", "Time"];

/// Starter pair used when a sketch is loaded with an empty payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarterTemplate {
    /// Block markup for an empty canvas
    pub blocks: String,
    /// Starter source text
    pub code: String,
}

impl StarterTemplate {
    pub fn payload_for(&self, kind: RepresentationKind) -> &str {
        match kind {
            RepresentationKind::Visual => &self.blocks,
            RepresentationKind::Textual => &self.code,
        }
    }
}

/// Everything the editor knows about one target device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    pub id: DeviceId,
    pub name: String,
    /// Block categories injected into the workspace for this device
    pub palette: Vec<String>,
    pub template: StarterTemplate,
}

impl DeviceProfile {
    fn builtin(id: &str, name: &str, hardware: &[&str], code: &str) -> Option<Self> {
        let id = DeviceId::new(id).ok()?;
        let palette = COMMON_PALETTE
            .iter()
            .chain(hardware.iter())
            .map(|s| s.to_string())
            .collect();
        Some(Self {
            id,
            name: name.to_string(),
            palette,
            template: StarterTemplate {
                blocks: EMPTY_FUNCTIONS_BLOCK.to_string(),
                code: code.to_string(),
            },
        })
    }
}

/// A device entry as written in `[[devices]]` of the config file.
///
/// Missing fields inherit from the built-in profile with the same id, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOverride {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Mapping from device id to profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCatalog {
    devices: BTreeMap<DeviceId, DeviceProfile>,
}

impl DeviceCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog of the devices the product ships with
    pub fn builtin() -> Self {
        let profiles = [
            DeviceProfile::builtin(
                "cm:esp32:ringo",
                "MAKERphone",
                &["Display", "Buttons", "LEDs", "Audio", "Phone"],
                RINGO_CODE,
            ),
            DeviceProfile::builtin(
                "cm:esp8266:nibble",
                "Nibble",
                &["Display", "Buttons", "Piezo"],
                ARDUINO_CODE,
            ),
            DeviceProfile::builtin(
                "cm:esp32:spencer",
                "Spencer",
                &["LEDs", "Speech", "Buttons"],
                ARDUINO_CODE,
            ),
        ];

        let mut catalog = Self::empty();
        for profile in profiles.into_iter().flatten() {
            catalog.insert(profile);
        }
        catalog
    }

    pub fn insert(&mut self, profile: DeviceProfile) {
        self.devices.insert(profile.id.clone(), profile);
    }

    pub fn lookup(&self, id: &DeviceId) -> Option<&DeviceProfile> {
        self.devices.get(id)
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.contains_key(id)
    }

    pub fn template_for(&self, id: &DeviceId, kind: RepresentationKind) -> Option<&str> {
        self.lookup(id).map(|p| p.template.payload_for(kind))
    }

    pub fn palette_for(&self, id: &DeviceId) -> &[String] {
        self.lookup(id).map(|p| p.palette.as_slice()).unwrap_or(&[])
    }

    /// Human name for notifications, falling back to the raw id
    pub fn display_name(&self, id: &DeviceId) -> String {
        self.lookup(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceProfile> {
        self.devices.values()
    }

    /// Apply config overrides on top of this catalog.
    ///
    /// Entries with an empty id are skipped. A new id without a template gets
    /// empty template strings, which `decode` treats as a normal payload.
    pub fn merge(&mut self, overrides: &[DeviceOverride]) {
        for entry in overrides {
            let Ok(id) = DeviceId::new(entry.id.clone()) else {
                tracing::warn!("Ignoring device override with empty id");
                continue;
            };

            let base = self.devices.get(&id).cloned().unwrap_or_else(|| DeviceProfile {
                id: id.clone(),
                name: id.to_string(),
                palette: COMMON_PALETTE.iter().map(|s| s.to_string()).collect(),
                template: StarterTemplate {
                    blocks: EMPTY_FUNCTIONS_BLOCK.to_string(),
                    code: String::new(),
                },
            });

            let profile = DeviceProfile {
                id: id.clone(),
                name: entry.name.clone().unwrap_or(base.name),
                palette: entry.palette.clone().unwrap_or(base.palette),
                template: StarterTemplate {
                    blocks: entry.blocks.clone().unwrap_or(base.template.blocks),
                    code: entry.code.clone().unwrap_or(base.template.code),
                },
            };

            tracing::debug!("Device profile registered: {} ({})", profile.name, id);
            self.insert(profile);
        }
    }
}
