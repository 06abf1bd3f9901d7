use ndarray::{s, ArrayView3, Axis};

use crate::bbox::{BBox, Ltrb};
use crate::config::SelectionConfig;
use crate::error::Error;
use crate::math;
use crate::registry::EntityRegistry;

/// Finds the entity the operator highlighted, i.e. the one whose box is on
/// average closest to the highlight color.
#[derive(Debug, Clone)]
pub struct SelectionFinder {
    target: [f32; 3],
    threshold: f32,
}

impl SelectionFinder {
    pub fn new(config: SelectionConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            target: config.target_bgr,
            threshold: config.threshold,
        })
    }

    /// `image` is BGR with shape `(height, width, channels)`.
    #[inline]
    pub fn select(&self, image: ArrayView3<'_, u8>, registry: &EntityRegistry) -> Option<u32> {
        self.select_from(image, registry.all_boxes())
    }

    /// Ties keep the box that came first.
    pub fn select_from<'a, I>(&self, image: ArrayView3<'_, u8>, boxes: I) -> Option<u32>
    where
        I: IntoIterator<Item = (u32, Option<&'a BBox<Ltrb>>)>,
    {
        if image.len_of(Axis(2)) < 3 {
            log::warn!(target: "selection", "expected a 3 channel image, got shape {:?}", image.shape());
            return None;
        }

        let mut best: Option<(u32, f32)> = None;

        for (id, bbox) in boxes {
            let color = match bbox.and_then(|b| mean_color(&image, b)) {
                Some(color) => color,
                None => continue,
            };

            let diff = math::manhattan(&color, &self.target);
            if best.map_or(true, |(_, min)| diff < min) {
                best = Some((id, diff));
            }
        }

        let (id, diff) = best?;
        log::trace!(target: "selection", "closest #{} at {:.1}", id, diff);

        if diff < self.threshold {
            Some(id)
        } else {
            None
        }
    }
}

/// Per-channel mean over the part of `bbox` inside the image.
fn mean_color(image: &ArrayView3<'_, u8>, bbox: &BBox<Ltrb>) -> Option<[f32; 3]> {
    let (height, width) = (image.len_of(Axis(0)), image.len_of(Axis(1)));
    let (x1, y1, x2, y2) = bbox.clip(width, height)?;
    let roi = image.slice(s![y1..y2, x1..x2, ..]);

    let mut color = [0.0; 3];
    for (ch, value) in color.iter_mut().enumerate() {
        *value = roi.index_axis(Axis(2), ch).mapv(f64::from).mean()? as f32;
    }

    Some(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::Detection;
    use ndarray::Array3;

    fn paint(image: &mut Array3<u8>, bbox: &BBox<Ltrb>, bgr: [u8; 3]) {
        let (x1, y1, x2, y2) = bbox.clip(image.len_of(Axis(1)), image.len_of(Axis(0))).unwrap();
        for (ch, v) in bgr.iter().enumerate() {
            image.slice_mut(s![y1..y2, x1..x2, ch]).fill(*v);
        }
    }

    fn finder() -> SelectionFinder {
        SelectionFinder::new(SelectionConfig::default()).unwrap()
    }

    #[test]
    fn picks_box_under_threshold() {
        let mut image = Array3::<u8>::zeros((100, 200, 3));
        let a = BBox::ltrb(10.0, 10.0, 30.0, 30.0);
        let b = BBox::ltrb(100.0, 10.0, 120.0, 30.0);

        // 139 and 141 away from (103, 94, 230)
        paint(&mut image, &a, [242, 94, 230]);
        paint(&mut image, &b, [103, 94, 89]);

        let f = finder();
        assert_eq!(f.select_from(image.view(), vec![(1, Some(&b)), (2, Some(&a))]), Some(2));
        assert_eq!(f.select_from(image.view(), vec![(1, Some(&b))]), None);
    }

    #[test]
    fn nothing_to_pick() {
        let image = Array3::<u8>::zeros((100, 200, 3));
        let f = finder();

        assert_eq!(f.select_from(image.view(), Vec::new()), None);
        assert_eq!(f.select_from(image.view(), vec![(1, None)]), None);

        let outside = BBox::ltrb(300.0, 300.0, 320.0, 320.0);
        assert_eq!(f.select_from(image.view(), vec![(1, Some(&outside))]), None);
    }

    #[test]
    fn tie_keeps_first() {
        let mut image = Array3::<u8>::zeros((100, 200, 3));
        let a = BBox::ltrb(10.0, 10.0, 30.0, 30.0);
        let b = BBox::ltrb(100.0, 10.0, 120.0, 30.0);
        paint(&mut image, &a, [103, 94, 230]);
        paint(&mut image, &b, [103, 94, 230]);

        let f = finder();
        assert_eq!(f.select_from(image.view(), vec![(4, Some(&b)), (3, Some(&a))]), Some(4));
    }

    #[test]
    fn partially_visible_box_uses_visible_pixels() {
        let mut image = Array3::<u8>::zeros((100, 200, 3));
        paint(&mut image, &BBox::ltrb(180.0, 80.0, 200.0, 100.0), [103, 94, 230]);

        let clipped = BBox::ltrb(180.0, 80.0, 260.0, 140.0);
        assert_eq!(finder().select_from(image.view(), vec![(1, Some(&clipped))]), Some(1));
    }

    #[test]
    fn selects_from_registry() {
        let mut image = Array3::<u8>::zeros((600, 800, 3));
        let pink = BBox::ltrb(400.0, 300.0, 420.0, 320.0);
        let dark = BBox::ltrb(100.0, 300.0, 120.0, 320.0);
        paint(&mut image, &pink, [110, 90, 225]);

        let mut registry = EntityRegistry::new(RegistryConfig::default()).unwrap();
        registry.update(
            &[Detection::new(1, dark, 0.9, 0), Detection::new(2, pink, 0.9, 0)],
            None,
            &[],
        );

        assert_eq!(finder().select(image.view(), &registry), Some(2));
    }

    #[test]
    fn grayscale_is_rejected() {
        let image = Array3::<u8>::zeros((10, 10, 1));
        let b = BBox::ltrb(0.0, 0.0, 5.0, 5.0);

        assert_eq!(finder().select_from(image.view(), vec![(1, Some(&b))]), None);
    }
}
