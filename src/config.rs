use serde_derive::{Deserialize, Serialize};
use std::io::Read;

use crate::error::Error;
use crate::panel::AircraftField;

fn non_negative(field: &'static str, value: f32) -> Result<(), Error> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid(field, format!("expected a finite value >= 0, got {}", value)));
    }

    Ok(())
}

fn ordered(field: &'static str, [lo, hi]: [f32; 2]) -> Result<(), Error> {
    non_negative(field, lo)?;
    non_negative(field, hi)?;

    if lo >= hi {
        return Err(Error::invalid(field, format!("empty range [{}, {})", lo, hi)));
    }

    Ok(())
}

/// Edges of the observed region, used to decide whether a lost object left
/// the screen.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ScreenBounds {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for ScreenBounds {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            right: 1920.0,
            bottom: 1080.0,
        }
    }
}

impl ScreenBounds {
    pub fn validate(&self) -> Result<(), Error> {
        if ![self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(Error::invalid("bounds", "coordinates must be finite"));
        }

        if self.left >= self.right || self.top >= self.bottom {
            return Err(Error::invalid("bounds", "inverted or empty region"));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// A new entity is only admitted above this confidence.
    pub admission_threshold: f32,
    /// Consecutive unseen frames an entity survives.
    pub retention_window: u32,
    /// Max pixel distance between a map text and an entity it labels.
    pub association_distance: f32,
    pub bounds: ScreenBounds,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            admission_threshold: 0.5,
            retention_window: 30,
            association_distance: 100.0,
            bounds: ScreenBounds::default(),
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<(), Error> {
        non_negative("registry.admission_threshold", self.admission_threshold)?;
        if self.admission_threshold >= 1.0 {
            return Err(Error::invalid(
                "registry.admission_threshold",
                "must be below 1.0, nothing could be admitted",
            ));
        }

        non_negative("registry.association_distance", self.association_distance)?;
        self.bounds.validate()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Highlight color in BGR channel order.
    pub target_bgr: [f32; 3],
    pub threshold: f32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            target_bgr: [103.0, 94.0, 230.0],
            threshold: 140.0,
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> Result<(), Error> {
        for c in self.target_bgr {
            non_negative("selection.target_bgr", c)?;
            if c > 255.0 {
                return Err(Error::invalid("selection.target_bgr", "channel above 255"));
            }
        }

        non_negative("selection.threshold", self.threshold)
    }
}

/// Case-insensitive substring mapped onto a canonical value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KeywordRule {
    pub pattern: String,
    pub canonical: String,
}

impl KeywordRule {
    pub fn new(pattern: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            canonical: canonical.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CityRole {
    Departure,
    Arrival,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CityRule {
    #[serde(flatten)]
    pub keyword: KeywordRule,
    pub role: CityRole,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LabelRule {
    pub label: String,
    pub field: AircraftField,
}

impl LabelRule {
    pub fn new(label: impl Into<String>, field: AircraftField) -> Self {
        Self {
            label: label.into(),
            field,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    pub airlines: Vec<KeywordRule>,
    pub cities: Vec<CityRule>,
    /// Exclusive vertical band for the center of airport code fragments.
    pub airport_code_band: [f32; 2],
    /// Searched in this order.
    pub labels: Vec<LabelRule>,
    pub below_x_tolerance: f32,
    pub below_max_gap: f32,
    pub right_x_buffer: f32,
    pub right_max_gap: f32,
    pub right_y_tolerance_ratio: f32,
    pub right_y_tolerance_pad: f32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            airlines: vec![KeywordRule::new("vueling", "Vueling")],
            cities: vec![
                CityRule {
                    keyword: KeywordRule::new("barcelona", "BARCELONA"),
                    role: CityRole::Departure,
                },
                CityRule {
                    keyword: KeywordRule::new("copenhagen", "COPENHAGEN"),
                    role: CityRole::Arrival,
                },
            ],
            airport_code_band: [250.0, 320.0],
            labels: vec![
                LabelRule::new("AIRCRAFT TYPE", AircraftField::Type),
                LabelRule::new("REGISTRATION", AircraftField::Registration),
                LabelRule::new("COUNTRY OF REG", AircraftField::CountryOfReg),
                LabelRule::new("AIRCRAFT CATEGORY", AircraftField::Category),
            ],
            below_x_tolerance: 70.0,
            below_max_gap: 50.0,
            right_x_buffer: 5.0,
            right_max_gap: 150.0,
            right_y_tolerance_ratio: 0.8,
            right_y_tolerance_pad: 10.0,
        }
    }
}

impl PanelConfig {
    pub fn validate(&self) -> Result<(), Error> {
        ordered("panel.airport_code_band", self.airport_code_band)?;
        non_negative("panel.below_x_tolerance", self.below_x_tolerance)?;
        non_negative("panel.below_max_gap", self.below_max_gap)?;
        non_negative("panel.right_x_buffer", self.right_x_buffer)?;
        non_negative("panel.right_max_gap", self.right_max_gap)?;
        non_negative("panel.right_y_tolerance_ratio", self.right_y_tolerance_ratio)?;
        non_negative("panel.right_y_tolerance_pad", self.right_y_tolerance_pad)?;

        let keywords = self
            .airlines
            .iter()
            .chain(self.cities.iter().map(|c| &c.keyword));

        for rule in keywords {
            if rule.pattern.trim().is_empty() {
                return Err(Error::invalid("panel.keywords", "empty pattern"));
            }
        }

        for rule in &self.labels {
            if rule.label.trim().is_empty() {
                return Err(Error::invalid("panel.labels", "empty label"));
            }
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SplitterConfig {
    /// Minimum column edge sum, normalized by image height.
    pub edge_strength_threshold: f32,
    /// Searched columns as fractions of the image width, `[start, end)`.
    pub search_window: [f32; 2],
    /// Horizontal intensity step that makes a pixel an edge.
    pub gradient_threshold: f32,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            // tuned for 255-valued edge pixels, i.e. about a quarter of the
            // rows must carry an edge
            edge_strength_threshold: 65.0,
            search_window: [0.15, 0.55],
            gradient_threshold: 50.0,
        }
    }
}

impl SplitterConfig {
    pub fn validate(&self) -> Result<(), Error> {
        non_negative("splitter.edge_strength_threshold", self.edge_strength_threshold)?;
        non_negative("splitter.gradient_threshold", self.gradient_threshold)?;
        ordered("splitter.search_window", self.search_window)?;

        if self.search_window[1] > 1.0 {
            return Err(Error::invalid("splitter.search_window", "extends past the image"));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TextConfig {
    pub map_min_confidence: f32,
    pub panel_min_confidence: f32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            map_min_confidence: 0.8,
            panel_min_confidence: 0.4,
        }
    }
}

impl TextConfig {
    pub fn validate(&self) -> Result<(), Error> {
        non_negative("text.map_min_confidence", self.map_min_confidence)?;
        non_negative("text.panel_min_confidence", self.panel_min_confidence)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub selection: SelectionConfig,
    pub panel: PanelConfig,
    pub splitter: SplitterConfig,
    pub text: TextConfig,
    /// Source frames between two processed frames.
    pub frame_stride: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            selection: SelectionConfig::default(),
            panel: PanelConfig::default(),
            splitter: SplitterConfig::default(),
            text: TextConfig::default(),
            frame_stride: 30,
        }
    }
}

impl Config {
    pub fn from_json(src: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(src)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.registry.validate()?;
        self.selection.validate()?;
        self.panel.validate()?;
        self.splitter.validate()?;
        self.text.validate()?;

        if self.frame_stride == 0 {
            return Err(Error::invalid("frame_stride", "must be at least 1"));
        }

        Ok(())
    }
}
