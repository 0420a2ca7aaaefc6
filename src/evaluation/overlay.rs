//! Plot-ready overlay data.
//!
//! Rendering is left to an external plotting tool; this module only supplies
//! marker positions, match links and the image to draw them on.

use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::SkymatchError;

/// Everything a renderer needs to draw truth against detections.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PlotOverlay {
    /// Image the detections were made on, if one was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_image: Option<PathBuf>,
    pub truth: Vec<OverlayMarker>,
    pub detections: Vec<OverlayMarker>,
    /// Truth-to-detection segments, one per match.
    pub links: Vec<OverlayLink>,
}

/// A single source marker in pixel coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlayMarker {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub matched: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlayLink {
    pub truth_id: u64,
    pub detection_id: u64,
    pub from: [f64; 2],
    pub to: [f64; 2],
    pub distance: f64,
}

/// Writes an overlay as pretty-printed JSON.
pub fn write_overlay_json(path: &Path, overlay: &PlotOverlay) -> Result<(), SkymatchError> {
    let file = File::create(path).map_err(SkymatchError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, overlay).map_err(|source| SkymatchError::JsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Serializes an overlay to a JSON string.
pub fn to_overlay_json_string(overlay: &PlotOverlay) -> Result<String, SkymatchError> {
    serde_json::to_string_pretty(overlay).map_err(|source| SkymatchError::JsonWrite {
        path: PathBuf::from("<string>"),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_json_shape() {
        let overlay = PlotOverlay {
            source_image: None,
            truth: vec![OverlayMarker {
                id: 0,
                x: 1.0,
                y: 2.0,
                matched: true,
            }],
            detections: vec![],
            links: vec![OverlayLink {
                truth_id: 0,
                detection_id: 4,
                from: [1.0, 2.0],
                to: [1.5, 2.0],
                distance: 0.5,
            }],
        };
        let json: serde_json::Value =
            serde_json::from_str(&to_overlay_json_string(&overlay).unwrap()).unwrap();
        assert!(json.get("source_image").is_none());
        assert_eq!(json["links"][0]["detection_id"], 4);
        assert_eq!(json["truth"][0]["matched"], true);
    }
}
