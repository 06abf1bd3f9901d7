use ndarray::{Array2, ArrayView3, Axis};

use crate::config::SplitterConfig;
use crate::error::Error;

/// Value of one edge pixel, so column sums read like those of a binary
/// 0/255 edge map.
const EDGE: f32 = 255.0;

/// A frame cut into the side panel and the map.
#[derive(Debug, Clone)]
pub struct Split<'a> {
    pub panel: Option<ArrayView3<'a, u8>>,
    pub map: ArrayView3<'a, u8>,
    /// First map column, `None` when there is no panel.
    pub boundary: Option<usize>,
}

/// Locates the vertical border between the side panel and the map.
#[derive(Debug, Clone)]
pub struct PanelSplitter {
    config: SplitterConfig,
}

impl PanelSplitter {
    pub fn new(config: SplitterConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self { config })
    }

    /// Column with the most vertical edge pixels inside the search window,
    /// accepted only when strong enough for the image height.
    pub fn find_boundary(&self, image: ArrayView3<'_, u8>) -> Option<usize> {
        let (height, width, channels) = image.dim();
        if height == 0 || width < 2 || channels < 3 {
            return None;
        }

        let [from, to] = self.config.search_window;
        let start = ((width as f32 * from) as usize).max(1);
        let end = ((width as f32 * to) as usize).min(width);
        if start >= end {
            return None;
        }

        let gray = grayscale(&image);
        let threshold = self.config.gradient_threshold;

        let mut best: Option<(usize, f32)> = None;
        for x in start..end {
            let strength = gray
                .axis_iter(Axis(0))
                .filter(|row| (row[x] - row[x - 1]).abs() > threshold)
                .count() as f32
                * EDGE;

            if best.map_or(true, |(_, max)| strength > max) {
                best = Some((x, strength));
            }
        }

        let (x, strength) = best?;
        let normalized = strength / height as f32;

        if normalized >= self.config.edge_strength_threshold {
            log::debug!(target: "splitter", "panel boundary at x={} ({:.1})", x, normalized);
            Some(x)
        } else {
            log::trace!(target: "splitter", "strongest edge x={} too weak ({:.1})", x, normalized);
            None
        }
    }

    pub fn split<'a>(&self, image: ArrayView3<'a, u8>) -> Split<'a> {
        match self.find_boundary(image.view()) {
            Some(x) => {
                let (panel, map) = image.split_at(Axis(1), x);

                Split {
                    panel: Some(panel),
                    map,
                    boundary: Some(x),
                }
            }
            None => Split {
                panel: None,
                map: image,
                boundary: None,
            },
        }
    }
}

/// BT.601 luma of a BGR image.
fn grayscale(image: &ArrayView3<'_, u8>) -> Array2<f32> {
    image.map_axis(Axis(2), |px| {
        0.114 * px[0] as f32 + 0.587 * px[1] as f32 + 0.299 * px[2] as f32
    })
}
