use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};

/// One tracker output for a frame. `bbox: None` with zero confidence means
/// the track was not seen this frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    #[serde(rename = "id")]
    pub track_id: u32,
    pub bbox: Option<BBox<Ltrb>>,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class: i32,
}

impl Detection {
    #[inline]
    pub fn new(track_id: u32, bbox: BBox<Ltrb>, confidence: f32, class: i32) -> Self {
        Self {
            track_id,
            bbox: Some(bbox),
            confidence,
            class,
        }
    }

    #[inline]
    pub fn missed(track_id: u32) -> Self {
        Self {
            track_id,
            bbox: None,
            confidence: 0.0,
            class: 0,
        }
    }

    /// Present boxes must be finite with a positive area, absent boxes are
    /// fine. Confidence must lie in `[0, 1]`.
    #[inline]
    pub fn has_sane_geometry(&self) -> bool {
        self.bbox.map_or(true, |b| b.is_valid()) && (0.0..=1.0).contains(&self.confidence)
    }

    /// Detections lying wholly left of the panel boundary belong to the panel.
    #[inline]
    pub fn is_left_of(&self, boundary: Option<f32>) -> bool {
        match (self.bbox, boundary) {
            (Some(bbox), Some(x)) => bbox.is_left_of(x),
            _ => false,
        }
    }
}
