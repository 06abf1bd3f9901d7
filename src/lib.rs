pub mod bbox;
pub mod config;
pub mod detection;
pub mod entity;
pub mod error;
pub mod frame;
pub mod history;
pub mod math;
pub mod panel;
pub mod pipeline;
pub mod registry;
pub mod selection;
pub mod splitter;
pub mod text;

pub use bbox::BBox;
pub use config::Config;
pub use detection::Detection;
pub use entity::{EntityState, TrackedEntity};
pub use error::Error;
pub use frame::{Frame, FrameOutcome};
pub use history::History;
pub use panel::{PanelFieldExtractor, PanelRecord};
pub use pipeline::{Pipeline, TextRecognizer};
pub use registry::EntityRegistry;
pub use selection::SelectionFinder;
pub use splitter::PanelSplitter;
pub use text::{RecognizedText, TextFragment};
