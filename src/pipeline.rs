use ndarray::ArrayView3;

use crate::config::{Config, TextConfig};
use crate::error::Error;
use crate::frame::{Frame, FrameOutcome};
use crate::history::History;
use crate::panel::PanelFieldExtractor;
use crate::registry::EntityRegistry;
use crate::selection::SelectionFinder;
use crate::splitter::PanelSplitter;
use crate::text::{self, RecognizedText};

/// External text recognition engine.
pub trait TextRecognizer {
    /// Polygons are relative to `image`.
    fn recognize(&mut self, image: ArrayView3<'_, u8>) -> Result<Vec<RecognizedText>, Error>;
}

/// Per-stream processing state. Frames must be fed in order, one at a time.
pub struct Pipeline {
    text: TextConfig,
    frame_stride: u32,
    registry: EntityRegistry,
    finder: SelectionFinder,
    extractor: PanelFieldExtractor,
    splitter: PanelSplitter,
    history: History,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            registry: EntityRegistry::new(config.registry)?,
            finder: SelectionFinder::new(config.selection)?,
            extractor: PanelFieldExtractor::new(config.panel)?,
            splitter: PanelSplitter::new(config.splitter)?,
            text: config.text,
            frame_stride: config.frame_stride,
            history: History::new(),
        })
    }

    #[inline]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    #[inline]
    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }

    /// Runs one frame through split, recognition, tracking, selection and
    /// panel extraction. Recognition happens before any state is touched, so
    /// a recognizer failure leaves the pipeline as it was.
    pub fn process<R>(&mut self, frame: &Frame<'_>, recognizer: &mut R) -> Result<FrameOutcome, Error>
    where
        R: TextRecognizer + ?Sized,
    {
        let split = self.splitter.split(frame.image.view());
        let offset = split.boundary.map_or(0.0, |x| x as f32);

        let raw = recognizer.recognize(split.map.view())?;
        let map_texts = text::fragments(&raw, offset, self.text.map_min_confidence);

        let panel_texts = match &split.panel {
            Some(panel) => {
                let raw = recognizer.recognize(panel.view())?;
                Some(text::fragments(&raw, 0.0, self.text.panel_min_confidence))
            }
            None => None,
        };

        self.registry.update(
            &frame.detections,
            split.boundary.map(|x| x as f32),
            &map_texts,
        );

        let selected = self.finder.select(frame.image.view(), &self.registry);
        let record = panel_texts.map(|texts| self.extractor.extract(&texts));

        if let (Some(id), Some(record)) = (selected, &record) {
            let unassigned = self
                .registry
                .get(id)
                .map_or(false, |entity| entity.record().is_none());

            // first recognizable record sticks to the entity
            if unassigned && !record.is_empty() {
                self.registry.attach_record(Some(id), Some(record.clone()))?;
            }
        }

        self.history.log(self.frame_stride, &self.registry);

        log::trace!(
            target: "pipeline",
            "frame {}: {} entities, selected {:?}",
            self.history.frame(),
            self.registry.len(),
            selected
        );

        Ok(FrameOutcome {
            panel_boundary: split.boundary,
            map_texts,
            record,
            selected,
        })
    }
}
