use regex::Regex;
use serde_derive::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::config::{CityRole, CityRule, KeywordRule, PanelConfig};
use crate::error::Error;
use crate::text::TextFragment;

const FLIGHT_NUMBER_PATTERN: &str = r"^[A-Z]{2}\d{3,4}$";
const AIRPORT_CODE_PATTERN: &str = r"^[A-Z]{3}$";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AircraftField {
    Type,
    Registration,
    CountryOfReg,
    Category,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FlightInfo {
    pub flight_number: Option<String>,
    pub airline: Option<String>,
    pub departure_code: Option<String>,
    pub arrival_code: Option<String>,
    pub departure_city: Option<String>,
    pub arrival_city: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AircraftDetails {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub registration: Option<String>,
    pub country_of_reg: Option<String>,
    pub category: Option<String>,
}

impl AircraftDetails {
    pub fn get(&self, field: AircraftField) -> Option<&str> {
        match field {
            AircraftField::Type => self.kind.as_deref(),
            AircraftField::Registration => self.registration.as_deref(),
            AircraftField::CountryOfReg => self.country_of_reg.as_deref(),
            AircraftField::Category => self.category.as_deref(),
        }
    }

    fn set(&mut self, field: AircraftField, value: String) {
        let slot = match field {
            AircraftField::Type => &mut self.kind,
            AircraftField::Registration => &mut self.registration,
            AircraftField::CountryOfReg => &mut self.country_of_reg,
            AircraftField::Category => &mut self.category,
        };

        *slot = Some(value);
    }
}

/// Identifying information read from the side panel of one frame.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PanelRecord {
    pub flight_info: FlightInfo,
    pub aircraft_details: AircraftDetails,
    pub unassigned_texts: Vec<TextFragment>,
}

impl PanelRecord {
    #[inline]
    pub fn flight_number(&self) -> Option<&str> {
        self.flight_info.flight_number.as_deref()
    }

    #[inline]
    pub fn airline(&self) -> Option<&str> {
        self.flight_info.airline.as_deref()
    }

    #[inline]
    pub fn departure_code(&self) -> Option<&str> {
        self.flight_info.departure_code.as_deref()
    }

    #[inline]
    pub fn arrival_code(&self) -> Option<&str> {
        self.flight_info.arrival_code.as_deref()
    }

    #[inline]
    pub fn departure_city(&self) -> Option<&str> {
        self.flight_info.departure_city.as_deref()
    }

    #[inline]
    pub fn arrival_city(&self) -> Option<&str> {
        self.flight_info.arrival_city.as_deref()
    }

    #[inline]
    pub fn aircraft_type(&self) -> Option<&str> {
        self.aircraft_details.kind.as_deref()
    }

    #[inline]
    pub fn registration(&self) -> Option<&str> {
        self.aircraft_details.registration.as_deref()
    }

    #[inline]
    pub fn country_of_reg(&self) -> Option<&str> {
        self.aircraft_details.country_of_reg.as_deref()
    }

    #[inline]
    pub fn category(&self) -> Option<&str> {
        self.aircraft_details.category.as_deref()
    }

    /// No structured field was recognized.
    pub fn is_empty(&self) -> bool {
        self.flight_info == FlightInfo::default() && self.aircraft_details == AircraftDetails::default()
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for PanelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<PanelRecord flight='{}', registration='{}'>",
            self.flight_number().unwrap_or("N/A"),
            self.registration().unwrap_or("N/A")
        )
    }
}

/// Turns the text fragments of a side panel into a [`PanelRecord`].
///
/// Fragments are consumed greedily: pattern matches first, then label/value
/// pairs. Every consumed fragment is claimed for the rest of the call, what
/// is never claimed ends up in `unassigned_texts` in input order.
#[derive(Debug)]
pub struct PanelFieldExtractor {
    config: PanelConfig,
    flight_number: Regex,
    airport_code: Regex,
}

impl PanelFieldExtractor {
    pub fn new(mut config: PanelConfig) -> Result<Self, Error> {
        config.validate()?;

        for rule in config.airlines.iter_mut() {
            rule.pattern = rule.pattern.to_lowercase();
        }

        for rule in config.cities.iter_mut() {
            rule.keyword.pattern = rule.keyword.pattern.to_lowercase();
        }

        let compile =
            |src: &str| Regex::new(src).map_err(|err| Error::invalid("panel.patterns", err.to_string()));

        Ok(Self {
            flight_number: compile(FLIGHT_NUMBER_PATTERN)?,
            airport_code: compile(AIRPORT_CODE_PATTERN)?,
            config,
        })
    }

    pub fn extract(&self, fragments: &[TextFragment]) -> PanelRecord {
        let mut record = PanelRecord::default();
        let mut claimed = vec![false; fragments.len()];

        let codes = self.match_patterns(fragments, &mut record, &mut claimed);
        self.assign_airport_codes(fragments, codes, &mut record);
        self.pair_labels(fragments, &mut record, &mut claimed);

        record.unassigned_texts = fragments
            .iter()
            .zip(claimed.iter())
            .filter(|(_, &c)| !c)
            .map(|(f, _)| f.clone())
            .collect();

        log::debug!(target: "panel", "extracted {}", record);

        record
    }

    /// Returns the indexes of airport code candidates. Every candidate is
    /// claimed, assigned or not.
    fn match_patterns(
        &self,
        fragments: &[TextFragment],
        record: &mut PanelRecord,
        claimed: &mut [bool],
    ) -> Vec<usize> {
        let info = &mut record.flight_info;
        let mut codes = Vec::new();

        for (idx, fragment) in fragments.iter().enumerate() {
            let text = fragment.text.as_str();
            let lower = text.to_lowercase();

            if info.flight_number.is_none() && self.flight_number.is_match(text) {
                info.flight_number = Some(text.to_string());
                claimed[idx] = true;
            } else if let Some(rule) = self.airline(&lower) {
                info.airline = Some(rule.canonical.clone());
                claimed[idx] = true;
            } else if self.airport_code.is_match(text) && self.in_code_band(fragment) {
                codes.push(idx);
                claimed[idx] = true;
            } else if let Some(rule) = self.city(&lower) {
                let slot = match rule.role {
                    CityRole::Departure => &mut info.departure_city,
                    CityRole::Arrival => &mut info.arrival_city,
                };

                *slot = Some(rule.keyword.canonical.clone());
                claimed[idx] = true;
            }
        }

        codes
    }

    fn assign_airport_codes(
        &self,
        fragments: &[TextFragment],
        mut codes: Vec<usize>,
        record: &mut PanelRecord,
    ) {
        if codes.len() < 2 {
            return;
        }

        codes.sort_by(|&a, &b| {
            fragments[a]
                .bbox
                .left()
                .partial_cmp(&fragments[b].bbox.left())
                .unwrap_or(Ordering::Equal)
        });

        let (dep, arr) = (codes[0], codes[1]);
        record.flight_info.departure_code = Some(fragments[dep].text.clone());
        record.flight_info.arrival_code = Some(fragments[arr].text.clone());
    }

    fn pair_labels(&self, fragments: &[TextFragment], record: &mut PanelRecord, claimed: &mut [bool]) {
        for rule in &self.config.labels {
            let needle = rule.label.to_lowercase();

            let label = (0..fragments.len())
                .find(|&idx| !claimed[idx] && fragments[idx].text.to_lowercase().contains(&needle));

            let label = match label {
                Some(label) => label,
                None => continue,
            };

            if let Some(value) = self.find_value(fragments, label, claimed) {
                log::trace!(
                    target: "panel",
                    "{:?}: {:?} -> {:?}",
                    rule.field,
                    fragments[label].text,
                    fragments[value].text
                );

                record
                    .aircraft_details
                    .set(rule.field, fragments[value].text.clone());
                claimed[label] = true;
                claimed[value] = true;
            }
        }
    }

    /// Closest unclaimed fragment below the label, or failing that to its right.
    fn find_value(&self, fragments: &[TextFragment], label: usize, claimed: &[bool]) -> Option<usize> {
        let cfg = &self.config;
        let lb = &fragments[label].bbox;
        let lc = lb.center();
        let y_tolerance = lb.height() * cfg.right_y_tolerance_ratio + cfg.right_y_tolerance_pad;

        let mut below: Option<(usize, f32)> = None;
        let mut right: Option<(usize, f32)> = None;

        for (idx, fragment) in fragments.iter().enumerate() {
            if idx == label || claimed[idx] {
                continue;
            }

            let b = &fragment.bbox;
            let c = b.center();

            if b.top() > lb.bottom() && (c.x - lc.x).abs() < cfg.below_x_tolerance {
                let gap = b.top() - lb.bottom();
                if gap < cfg.below_max_gap && below.map_or(true, |(_, best)| gap < best) {
                    below = Some((idx, gap));
                }
            }

            if b.left() > lb.right() + cfg.right_x_buffer && (c.y - lc.y).abs() < y_tolerance {
                let gap = b.left() - lb.right();
                if gap < cfg.right_max_gap && right.map_or(true, |(_, best)| gap < best) {
                    right = Some((idx, gap));
                }
            }
        }

        below.or(right).map(|(idx, _)| idx)
    }

    fn airline(&self, lower: &str) -> Option<&KeywordRule> {
        self.config
            .airlines
            .iter()
            .find(|rule| lower.contains(rule.pattern.as_str()))
    }

    fn city(&self, lower: &str) -> Option<&CityRule> {
        self.config
            .cities
            .iter()
            .find(|rule| lower.contains(rule.keyword.pattern.as_str()))
    }

    fn in_code_band(&self, fragment: &TextFragment) -> bool {
        let [lo, hi] = self.config.airport_code_band;
        let cy = fragment.center_y();

        lo < cy && cy < hi
    }
}
