use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};

/// Raw recognizer output: a polygon in the coordinates of the image that was
/// handed to the recognizer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub polygon: Vec<[f32; 2]>,
    pub text: String,
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(polygon: Vec<[f32; 2]>, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            polygon,
            text: text.into(),
            confidence,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    #[serde(rename = "box")]
    pub bbox: BBox<Ltrb>,
    pub confidence: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bbox: BBox<Ltrb>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }

    /// Trimmed text with the polygon's bounding rectangle shifted right by
    /// `x_offset`. `None` for blank text or an empty or non-finite polygon.
    pub fn from_recognized(raw: &RecognizedText, x_offset: f32) -> Option<Self> {
        let text = raw.text.trim();
        if text.is_empty() {
            return None;
        }

        let bbox = BBox::enclosing(&raw.polygon)?;
        if !bbox.is_finite() {
            return None;
        }

        Some(Self::new(text, bbox.shifted(x_offset, 0.0), raw.confidence))
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        self.bbox.center().x
    }

    #[inline]
    pub fn center_y(&self) -> f32 {
        self.bbox.center().y
    }
}

/// Converts recognizer output into fragments, dropping anything below
/// `min_confidence` or without usable geometry. Order is preserved.
pub fn fragments(raw: &[RecognizedText], x_offset: f32, min_confidence: f32) -> Vec<TextFragment> {
    raw.iter()
        .filter(|r| r.confidence >= min_confidence)
        .filter_map(|r| {
            let fragment = TextFragment::from_recognized(r, x_offset);
            if fragment.is_none() {
                log::warn!(target: "text", "skipping unusable text fragment {:?}", r.text);
            }
            fragment
        })
        .collect()
}
