//! Conversion between [`Document`] and [`PersistedSketch`]

use crate::device::DeviceCatalog;
use crate::document::{Document, RepresentationKind};
use crate::error::{Error, Result};
use crate::sketch::{PersistedSketch, SKETCH_FORMAT_VERSION};
use crate::workspace::SnapshotProvider;

/// Result of decoding a sketch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub document: Document,
    /// The payload came from a starter template, so the user should name it
    pub first_save_warranted: bool,
}

/// Capture the current document for saving.
///
/// Visual documents are read from the workspace; the document's own payload is
/// ignored for them. Textual documents persist their payload verbatim.
pub fn encode(document: &Document, provider: &dyn SnapshotProvider) -> Result<PersistedSketch> {
    match document.kind() {
        RepresentationKind::Visual => {
            if provider.block_count() == 0 {
                return Err(Error::EmptyWorkspace);
            }
            let sketch = PersistedSketch::new(
                document.device_id().clone(),
                RepresentationKind::Visual,
                provider.serialize_markup(),
            )
            .with_snapshot(provider.snapshot_markup());
            Ok(sketch)
        }
        RepresentationKind::Textual => Ok(PersistedSketch::new(
            document.device_id().clone(),
            RepresentationKind::Textual,
            document.payload(),
        )),
    }
}

/// Build a document from a persisted sketch, resolving the empty-payload sentinel.
///
/// The visual snapshot is never read.
pub fn decode(
    sketch: &PersistedSketch,
    title: impl Into<String>,
    catalog: &DeviceCatalog,
) -> Result<Decoded> {
    if sketch.format_version > SKETCH_FORMAT_VERSION {
        return Err(Error::UnsupportedSketchVersion {
            found: sketch.format_version,
            supported: SKETCH_FORMAT_VERSION,
        });
    }

    if sketch.is_template_sentinel() {
        let template = catalog
            .template_for(&sketch.device_id, sketch.kind)
            .ok_or_else(|| Error::unknown_device(sketch.device_id.as_str()))?;

        tracing::debug!(
            "Empty {} sketch for {}, using starter template",
            sketch.kind,
            sketch.device_id
        );

        return Ok(Decoded {
            document: Document::new(
                sketch.kind,
                sketch.device_id.clone(),
                template.to_string(),
                title.into(),
            ),
            first_save_warranted: true,
        });
    }

    Ok(Decoded {
        document: Document::new(
            sketch.kind,
            sketch.device_id.clone(),
            sketch.payload.clone(),
            title.into(),
        ),
        first_save_warranted: false,
    })
}

impl Document {
    /// Load a document from a persisted sketch; see [`decode`]
    pub fn create_from_sketch(
        sketch: &PersistedSketch,
        title: impl Into<String>,
        catalog: &DeviceCatalog,
    ) -> Result<Decoded> {
        decode(sketch, title, catalog)
    }
}
