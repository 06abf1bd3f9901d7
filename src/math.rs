use crate::bbox::{BBox, Ltrb};
use nalgebra as na;

#[inline]
pub fn euclidean(a: &na::Point2<f32>, b: &na::Point2<f32>) -> f32 {
    na::distance(a, b)
}

/// Sum of absolute per-component differences.
#[inline]
pub fn manhattan<const N: usize>(a: &[f32; N], b: &[f32; N]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

/// Distance between the centers of two boxes, infinite when either is missing.
#[inline]
pub fn center_distance(a: Option<&BBox<Ltrb>>, b: Option<&BBox<Ltrb>>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => euclidean(&a.center(), &b.center()),
        _ => f32::INFINITY,
    }
}

/// Screen bearing of a displacement in degrees, `[0, 360)`.
///
/// Screen y grows downwards: up is 0, right 90, down 180, left 270.
#[inline]
pub fn bearing(dx: f32, dy: f32) -> f32 {
    // `+ 0.0` folds -0.0 so a standing object reads 0, not 180
    let deg = dx.atan2(-dy + 0.0).to_degrees();
    let deg = (deg + 360.0) % 360.0;

    // float rounding can land exactly on 360
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

/// Speed in pixels per frame and bearing between the centers of two
/// consecutive boxes. Both are `None` unless both boxes are present.
pub fn motion(prev: Option<&BBox<Ltrb>>, curr: Option<&BBox<Ltrb>>) -> (Option<f32>, Option<f32>) {
    let (prev, curr) = match (prev, curr) {
        (Some(p), Some(c)) => (p.center(), c.center()),
        _ => return (None, None),
    };

    let d = curr - prev;

    (Some(d.norm()), Some(bearing(d.x, d.y)))
}
