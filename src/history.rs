use serde_derive::Serialize;
use std::collections::BTreeMap;

use crate::entity::{EntityState, TrackedEntity};
use crate::error::Error;
use crate::panel::PanelRecord;
use crate::registry::EntityRegistry;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub frame: u64,
    pub location: Option<String>,
    pub direction: Option<f32>,
    pub velocity: Option<f32>,
    pub state: EntityState,
}

impl Snapshot {
    fn of(frame: u64, entity: &TrackedEntity) -> Self {
        Self {
            frame,
            location: entity.location().map(str::to_string),
            direction: entity.direction(),
            velocity: entity.velocity(),
            state: entity.state(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EntityHistory {
    pub class: i32,
    /// First record ever seen on the entity.
    pub record: Option<PanelRecord>,
    pub timeline: Vec<Snapshot>,
}

/// Timeline of every entity across the processed frames, the raw material
/// for reports. Outlives eviction from the registry.
#[derive(Serialize, Debug, Clone, Default)]
pub struct History {
    frame: u64,
    entities: BTreeMap<u32, EntityHistory>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame number of the last logged frame.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advances the frame counter by `stride` and snapshots every entity.
    pub fn log(&mut self, stride: u32, registry: &EntityRegistry) {
        self.frame += u64::from(stride);

        for entity in registry.all() {
            let history = self
                .entities
                .entry(entity.id())
                .or_insert_with(|| EntityHistory {
                    class: entity.class(),
                    record: None,
                    timeline: Vec::new(),
                });

            if history.record.is_none() {
                history.record = entity.record().cloned();
            }

            history.timeline.push(Snapshot::of(self.frame, entity));
        }
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&EntityHistory> {
        self.entities.get(&id)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&u32, &EntityHistory)> {
        self.entities.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
