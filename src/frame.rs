use ndarray::ArrayView3;
use serde_derive::Serialize;

use crate::detection::Detection;
use crate::panel::PanelRecord;
use crate::text::TextFragment;

/// One video frame (BGR, `(height, width, channels)`) with its tracker output.
pub struct Frame<'a> {
    pub image: ArrayView3<'a, u8>,
    pub detections: Vec<Detection>,
}

impl<'a> Frame<'a> {
    pub fn new(image: ArrayView3<'a, u8>, detections: Vec<Detection>) -> Self {
        Self { image, detections }
    }
}

/// What the pipeline made of one frame, for rendering and reporting.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    pub panel_boundary: Option<usize>,
    pub map_texts: Vec<TextFragment>,
    /// Record read from the panel this frame, `None` without a panel.
    pub record: Option<PanelRecord>,
    pub selected: Option<u32>,
}
