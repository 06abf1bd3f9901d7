use std::collections::{BTreeMap, HashSet};

use crate::bbox::{BBox, Ltrb};
use crate::config::RegistryConfig;
use crate::entity::{EntityState, TrackedEntity};
use crate::error::Error;
use crate::math;
use crate::panel::PanelRecord;
use crate::text::TextFragment;
use crate::Detection;

/// All entities currently known, keyed by tracker id. Iteration is in
/// ascending id order.
#[derive(Debug)]
pub struct EntityRegistry {
    config: RegistryConfig,
    entities: BTreeMap<u32, TrackedEntity>,
}

impl EntityRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            config,
            entities: BTreeMap::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Reconciles one frame of detections with the known entities.
    ///
    /// `panel_boundary` drops detections lying wholly left of it. Known ids
    /// missing from the frame get a zero-confidence update, entities unseen
    /// for longer than the retention window are evicted, and finally map
    /// texts close to an entity become its location.
    pub fn update(
        &mut self,
        detections: &[Detection],
        panel_boundary: Option<f32>,
        texts: &[TextFragment],
    ) {
        let bounds = self.config.bounds;
        let mut seen = HashSet::with_capacity(detections.len());

        for det in detections {
            if det.is_left_of(panel_boundary) {
                continue;
            }

            if !det.has_sane_geometry() {
                log::warn!(target: "registry", "skipping malformed detection {:?}", det);
                continue;
            }

            if let Some(entity) = self.entities.get_mut(&det.track_id) {
                if seen.insert(det.track_id) {
                    entity.update(det.bbox, det.confidence, det.class, &bounds);
                }
            } else if det.confidence > self.config.admission_threshold {
                log::debug!(target: "registry", "admitting #{} ({:.2})", det.track_id, det.confidence);

                seen.insert(det.track_id);
                self.entities.insert(
                    det.track_id,
                    TrackedEntity::new(det.track_id, det.bbox, det.confidence, det.class),
                );
            }
        }

        for (id, entity) in self.entities.iter_mut() {
            if !seen.contains(id) {
                entity.update(None, 0.0, 0, &bounds);
            }
        }

        let window = self.config.retention_window;
        self.entities.retain(|id, entity| {
            let keep = entity.lost_streak() <= window;
            if !keep {
                log::debug!(target: "registry", "evicting #{} after {} missed frames", id, entity.lost_streak());
            }
            keep
        });

        self.associate(texts);
    }

    /// Last match wins, in fragment order then id order.
    fn associate(&mut self, texts: &[TextFragment]) {
        let threshold = self.config.association_distance;

        for text in texts {
            for entity in self.entities.values_mut() {
                // a just lost entity is placed where it was last seen
                let bbox = if entity.state() == EntityState::LostNow {
                    entity.last_known_bbox()
                } else {
                    entity.bbox()
                };

                if math::center_distance(bbox, Some(&text.bbox)) < threshold {
                    entity.locate(&text.text);
                }
            }
        }
    }

    /// Attaches `record` to entity `id`, replacing any previous one. Callers
    /// wanting the first record to stick check [`TrackedEntity::record`]
    /// first.
    ///
    /// Returns `Ok(false)` when either input is missing.
    pub fn attach_record(&mut self, id: Option<u32>, record: Option<PanelRecord>) -> Result<bool, Error> {
        let (id, record) = match (id, record) {
            (Some(id), Some(record)) => (id, record),
            _ => return Ok(false),
        };

        let entity = self.entities.get_mut(&id).ok_or(Error::UnknownEntity(id))?;
        log::info!(target: "registry", "#{}: attached {}", id, record);
        entity.set_record(record);

        Ok(true)
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&TrackedEntity> {
        self.entities.get(&id)
    }

    #[inline]
    pub fn try_get(&self, id: u32) -> Result<&TrackedEntity, Error> {
        self.get(id).ok_or(Error::UnknownEntity(id))
    }

    #[inline]
    pub fn all(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entities.values()
    }

    #[inline]
    pub fn all_boxes(&self) -> impl Iterator<Item = (u32, Option<&BBox<Ltrb>>)> {
        self.entities.iter().map(|(&id, e)| (id, e.bbox()))
    }

    pub fn remove(&mut self, id: u32) -> bool {
        self.entities.remove(&id).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
