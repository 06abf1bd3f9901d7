use serde_derive::{Deserialize, Serialize};
use strum::Display;

use crate::bbox::{BBox, Ltrb};
use crate::config::ScreenBounds;
use crate::math;
use crate::panel::PanelRecord;

/// Visibility of a tracked object, re-evaluated on every registry update.
#[derive(Serialize, Deserialize, Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    #[strum(serialize = "Tracking")]
    Tracking,
    #[strum(serialize = "Lost now")]
    LostNow,
    #[strum(serialize = "Lost for a while")]
    LostContinued,
    #[strum(serialize = "Object occurs")]
    Reacquired,
    /// Lost right after heading through a screen edge.
    #[strum(serialize = "Current not in sight")]
    OutOfSight,
    #[strum(serialize = "Not in sight")]
    OutOfSightContinued,
    /// Lost next to a map label, i.e. reached that location.
    #[strum(serialize = "Reach the target")]
    LocatedAfterLoss,
}

impl EntityState {
    #[inline]
    pub fn is_lost(&self) -> bool {
        !matches!(self, EntityState::Tracking | EntityState::Reacquired)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    id: u32,
    bbox: Option<BBox<Ltrb>>,
    prev_bbox: Option<BBox<Ltrb>>,
    confidence: f32,
    max_confidence: f32,
    class: i32,
    lost_streak: u32,
    state: EntityState,
    velocity: Option<f32>,
    direction: Option<f32>,
    location: Option<String>,
    record: Option<PanelRecord>,
}

impl TrackedEntity {
    pub fn new(id: u32, bbox: Option<BBox<Ltrb>>, confidence: f32, class: i32) -> Self {
        Self {
            id,
            bbox,
            prev_bbox: None,
            confidence,
            max_confidence: confidence,
            class,
            lost_streak: 0,
            state: EntityState::Tracking,
            velocity: None,
            direction: None,
            location: None,
            record: None,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn bbox(&self) -> Option<&BBox<Ltrb>> {
        self.bbox.as_ref()
    }

    #[inline]
    pub fn prev_bbox(&self) -> Option<&BBox<Ltrb>> {
        self.prev_bbox.as_ref()
    }

    /// Current box, or the one seen right before the object vanished.
    #[inline]
    pub fn last_known_bbox(&self) -> Option<&BBox<Ltrb>> {
        self.bbox.as_ref().or(self.prev_bbox.as_ref())
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    #[inline]
    pub fn max_confidence(&self) -> f32 {
        self.max_confidence
    }

    #[inline]
    pub fn class(&self) -> i32 {
        self.class
    }

    #[inline]
    pub fn lost_streak(&self) -> u32 {
        self.lost_streak
    }

    #[inline]
    pub fn state(&self) -> EntityState {
        self.state
    }

    /// px per frame
    #[inline]
    pub fn velocity(&self) -> Option<f32> {
        self.velocity
    }

    /// Screen bearing in degrees, up is 0 and right is 90.
    #[inline]
    pub fn direction(&self) -> Option<f32> {
        self.direction
    }

    #[inline]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    #[inline]
    pub fn record(&self) -> Option<&PanelRecord> {
        self.record.as_ref()
    }

    /// One step of the visibility state machine. Zero `confidence` means the
    /// object was not observed this frame.
    pub(crate) fn update(
        &mut self,
        bbox: Option<BBox<Ltrb>>,
        confidence: f32,
        class: i32,
        bounds: &ScreenBounds,
    ) {
        let prior = self.state;
        // an unobserved object has no current box
        let bbox = if confidence == 0.0 { None } else { bbox };

        if confidence == 0.0 {
            if self.lost_streak == 0 {
                self.state = if self.is_in_sight(bounds) {
                    EntityState::LostNow
                } else {
                    EntityState::OutOfSight
                };
            } else if matches!(
                prior,
                EntityState::OutOfSight | EntityState::OutOfSightContinued
            ) {
                self.state = EntityState::OutOfSightContinued;
            } else {
                self.state = EntityState::LostContinued;
            }

            self.lost_streak += 1;
        } else if self.lost_streak != 0 {
            self.lost_streak = 0;
            self.state = EntityState::Reacquired;
        } else {
            self.state = EntityState::Tracking;
        }

        // speed is only followed for identified objects
        if self.record.is_some() {
            let (velocity, direction) = math::motion(self.prev_bbox.as_ref(), self.bbox.as_ref());
            self.velocity = velocity;
            self.direction = direction;
        }

        self.prev_bbox = self.bbox.take();
        self.bbox = bbox;
        self.direction = math::motion(self.prev_bbox.as_ref(), self.bbox.as_ref()).1;

        self.confidence = confidence;
        if confidence >= self.max_confidence {
            self.max_confidence = confidence;
            self.class = class;
        }

        if prior != self.state {
            log::debug!(target: "entity", "#{}: {} -> {}", self.id, prior, self.state);
        }
    }

    /// False when the last move points out through the screen edge the box
    /// is touching.
    fn is_in_sight(&self, bounds: &ScreenBounds) -> bool {
        let bbox = match self.bbox.as_ref() {
            Some(bbox) => bbox,
            None => return true,
        };

        match math::motion(self.prev_bbox.as_ref(), Some(bbox)).1 {
            Some(angle) => !heads_out(bbox, angle, bounds),
            None => true,
        }
    }

    pub(crate) fn locate(&mut self, label: &str) {
        self.location = Some(label.to_string());

        if self.state == EntityState::LostNow {
            log::debug!(target: "entity", "#{}: lost next to {:?}", self.id, label);
            self.state = EntityState::LocatedAfterLoss;
        }
    }

    pub(crate) fn set_record(&mut self, record: PanelRecord) {
        self.record = Some(record);
    }
}

/// Box touches a screen edge while its bearing points through it. Bearings
/// exactly on a diagonal (45, 135, 225, 315) point through no edge.
fn heads_out(bbox: &BBox<Ltrb>, angle: f32, bounds: &ScreenBounds) -> bool {
    (bbox.left() <= bounds.left && 225.0 < angle && angle < 315.0)
        || (bbox.right() >= bounds.right && 45.0 < angle && angle < 135.0)
        || (bbox.top() <= bounds.top && (angle > 315.0 || angle < 45.0))
        || (bbox.bottom() >= bounds.bottom && 135.0 < angle && angle < 225.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(x: f32, y: f32) -> Option<BBox<Ltrb>> {
        Some(BBox::ltrb(x, y, x + 10.0, y + 10.0))
    }

    fn bounds() -> ScreenBounds {
        ScreenBounds {
            left: 0.0,
            top: 0.0,
            right: 200.0,
            bottom: 100.0,
        }
    }

    fn approx(a: Option<f32>, b: f32) -> bool {
        a.map_or(false, |a| (a - b).abs() < 1e-3)
    }

    #[test]
    fn lost_streak_counts_missed_frames() {
        let mut e = TrackedEntity::new(1, b(50.0, 50.0), 0.9, 2);

        for n in 1..=7 {
            e.update(None, 0.0, 0, &bounds());
            assert_eq!(e.lost_streak(), n);
            assert!(e.state().is_lost());
        }

        assert_eq!(e.state(), EntityState::LostContinued);
        assert_eq!(e.class(), 2);
    }

    #[test]
    fn reacquired_after_any_streak() {
        for streak in 1..5 {
            let mut e = TrackedEntity::new(1, b(50.0, 50.0), 0.9, 0);
            for _ in 0..streak {
                e.update(None, 0.0, 0, &bounds());
            }

            e.update(b(52.0, 50.0), 0.8, 0, &bounds());
            assert_eq!(e.lost_streak(), 0);
            assert_eq!(e.state(), EntityState::Reacquired);

            e.update(b(54.0, 50.0), 0.8, 0, &bounds());
            assert_eq!(e.state(), EntityState::Tracking);
        }
    }

    #[test]
    fn first_loss_inside_screen_is_lost_now() {
        let mut e = TrackedEntity::new(1, b(50.0, 50.0), 0.9, 0);
        e.update(b(60.0, 50.0), 0.9, 0, &bounds());
        e.update(None, 0.0, 0, &bounds());

        assert_eq!(e.state(), EntityState::LostNow);
        assert_eq!(e.confidence(), 0.0);
    }

    #[test]
    fn leaving_through_an_edge_is_out_of_sight() {
        // moving right while touching the right edge
        let mut e = TrackedEntity::new(1, b(180.0, 50.0), 0.9, 0);
        e.update(b(190.0, 50.0), 0.9, 0, &bounds());
        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.state(), EntityState::OutOfSight);

        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.state(), EntityState::OutOfSightContinued);
        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.state(), EntityState::OutOfSightContinued);

        // moving up through the top edge
        let mut e = TrackedEntity::new(2, b(50.0, 5.0), 0.9, 0);
        e.update(b(50.0, 0.0), 0.9, 0, &bounds());
        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.state(), EntityState::OutOfSight);

        // moving left through the left edge
        let mut e = TrackedEntity::new(3, b(5.0, 50.0), 0.9, 0);
        e.update(b(0.0, 50.0), 0.9, 0, &bounds());
        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.state(), EntityState::OutOfSight);

        // moving down through the bottom edge
        let mut e = TrackedEntity::new(4, b(50.0, 85.0), 0.9, 0);
        e.update(b(50.0, 90.0), 0.9, 0, &bounds());
        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.state(), EntityState::OutOfSight);

        // just inside each exit range
        let corner = |x: f32, y: f32| BBox::ltrb(x, y, x + 10.0, y + 10.0);
        assert!(heads_out(&corner(190.0, 0.0), 44.9, &bounds()));
        assert!(heads_out(&corner(190.0, 0.0), 45.1, &bounds()));
        assert!(heads_out(&corner(190.0, 90.0), 134.9, &bounds()));
        assert!(heads_out(&corner(0.0, 90.0), 224.9, &bounds()));
        assert!(heads_out(&corner(0.0, 0.0), 315.1, &bounds()));
    }

    #[test]
    fn touching_an_edge_while_moving_away_stays_in_sight() {
        // touching the right edge but heading left
        let mut e = TrackedEntity::new(1, b(192.0, 50.0), 0.9, 0);
        e.update(b(190.0, 50.0), 0.9, 0, &bounds());
        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.state(), EntityState::LostNow);

        // touching the left edge but heading right
        let mut e = TrackedEntity::new(2, b(-3.0, 50.0), 0.9, 0);
        e.update(b(0.0, 50.0), 0.9, 0, &bounds());
        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.state(), EntityState::LostNow);

        // touching the bottom edge but heading up
        let mut e = TrackedEntity::new(3, b(50.0, 92.0), 0.9, 0);
        e.update(b(50.0, 90.0), 0.9, 0, &bounds());
        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.state(), EntityState::LostNow);

        // diagonals through a corner leave through neither edge
        let corner = |x: f32, y: f32| BBox::ltrb(x, y, x + 10.0, y + 10.0);
        assert!(!heads_out(&corner(190.0, 0.0), 45.0, &bounds()));
        assert!(!heads_out(&corner(190.0, 90.0), 135.0, &bounds()));
        assert!(!heads_out(&corner(0.0, 90.0), 225.0, &bounds()));
        assert!(!heads_out(&corner(0.0, 0.0), 315.0, &bounds()));
    }

    #[test]
    fn unknown_direction_is_in_sight() {
        let mut e = TrackedEntity::new(1, b(195.0, 50.0), 0.9, 0);
        e.update(None, 0.0, 0, &bounds());

        assert_eq!(e.state(), EntityState::LostNow);
    }

    #[test]
    fn direction_needs_two_boxes() {
        let mut e = TrackedEntity::new(1, b(50.0, 50.0), 0.9, 0);
        assert_eq!(e.direction(), None);

        e.update(b(50.0, 40.0), 0.9, 0, &bounds());
        assert!(approx(e.direction(), 0.0));
        e.update(b(60.0, 40.0), 0.9, 0, &bounds());
        assert!(approx(e.direction(), 90.0));
        e.update(b(60.0, 50.0), 0.9, 0, &bounds());
        assert!(approx(e.direction(), 180.0));
        e.update(b(50.0, 50.0), 0.9, 0, &bounds());
        assert!(approx(e.direction(), 270.0));

        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.direction(), None);
        e.update(b(50.0, 50.0), 0.9, 0, &bounds());
        assert_eq!(e.direction(), None);

        // velocity is only followed once a record is attached
        assert_eq!(e.velocity(), None);
    }

    #[test]
    fn velocity_tracked_with_record() {
        let mut e = TrackedEntity::new(1, b(0.0, 0.0), 0.9, 0);
        e.set_record(PanelRecord::default());

        e.update(b(3.0, 4.0), 0.9, 0, &bounds());
        // computed before the box advanced, no previous box yet
        assert_eq!(e.velocity(), None);

        e.update(b(6.0, 8.0), 0.9, 0, &bounds());
        assert!(approx(e.velocity(), 5.0));
        assert!(e.direction().unwrap() >= 0.0 && e.direction().unwrap() < 360.0);
    }

    #[test]
    fn class_follows_best_confidence() {
        let mut e = TrackedEntity::new(1, b(0.0, 0.0), 0.7, 1);

        e.update(b(0.0, 0.0), 0.6, 2, &bounds());
        assert_eq!((e.class(), e.max_confidence()), (1, 0.7));

        e.update(b(0.0, 0.0), 0.7, 3, &bounds());
        assert_eq!((e.class(), e.max_confidence()), (3, 0.7));

        e.update(None, 0.0, 4, &bounds());
        assert_eq!((e.class(), e.max_confidence()), (3, 0.7));

        e.update(b(0.0, 0.0), 0.95, 5, &bounds());
        assert_eq!((e.class(), e.max_confidence()), (5, 0.95));
    }

    #[test]
    fn previous_box_trails_by_one_update() {
        let mut e = TrackedEntity::new(1, b(0.0, 0.0), 0.9, 0);
        assert_eq!(e.prev_bbox(), None);

        e.update(b(5.0, 0.0), 0.9, 0, &bounds());
        assert_eq!(e.prev_bbox().copied(), b(0.0, 0.0));
        assert_eq!(e.bbox().copied(), b(5.0, 0.0));

        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.prev_bbox().copied(), b(5.0, 0.0));
        assert_eq!(e.last_known_bbox().copied(), b(5.0, 0.0));
    }

    #[test]
    fn locating_a_just_lost_entity() {
        let mut e = TrackedEntity::new(1, b(50.0, 50.0), 0.9, 0);
        e.locate("BCN");
        assert_eq!(e.state(), EntityState::Tracking);
        assert_eq!(e.location(), Some("BCN"));

        e.update(None, 0.0, 0, &bounds());
        e.locate("CPH");
        assert_eq!(e.state(), EntityState::LocatedAfterLoss);
        assert_eq!(e.location(), Some("CPH"));

        e.update(None, 0.0, 0, &bounds());
        assert_eq!(e.state(), EntityState::LostContinued);
    }

    #[test]
    fn state_names() {
        assert_eq!(EntityState::LostNow.to_string(), "Lost now");
        assert_eq!(EntityState::LocatedAfterLoss.to_string(), "Reach the target");
    }
}
