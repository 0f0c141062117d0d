use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ColorIndex, Point};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Region {
    pub id: String,
    #[serde(alias = "color_num")]
    pub color_number: ColorIndex,
    pub boundary: Vec<Point>,
    pub centroid: Point,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PaletteColor {
    #[serde(alias = "num")]
    pub index: ColorIndex,
    pub rgb: [u8; 3],
    pub hex: String,
}

/// Generator statistics carried along with a template. Informational only.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct TemplateMetadata {
    #[serde(default)]
    pub num_colors: Option<u32>,
    #[serde(default)]
    pub num_regions: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Immutable geometry and palette of one project.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CanvasTemplate {
    pub dimensions: Dimensions,
    pub regions: Vec<Region>,
    #[serde(alias = "colors")]
    pub palette: Vec<PaletteColor>,
    #[serde(default)]
    pub metadata: Option<TemplateMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    EmptyDimensions { width: u32, height: u32 },
    TooFewPoints { region: String, points: usize },
    NonFinitePoint { region: String },
    InvalidColorNumber { region: String },
    DuplicateRegion(String),
    DuplicateColor(ColorIndex),
    UnknownColor { region: String, color: ColorIndex },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::EmptyDimensions { width, height } => {
                write!(f, "template dimensions {width}x{height} are empty")
            }
            TemplateError::TooFewPoints { region, points } => {
                write!(f, "region {region} has {points} boundary points, at least 3 required")
            }
            TemplateError::NonFinitePoint { region } => {
                write!(f, "region {region} has a non-finite coordinate")
            }
            TemplateError::InvalidColorNumber { region } => {
                write!(f, "region {region} has color number 0")
            }
            TemplateError::DuplicateRegion(id) => write!(f, "region id {id} is not unique"),
            TemplateError::DuplicateColor(index) => {
                write!(f, "palette index {index} is not unique")
            }
            TemplateError::UnknownColor { region, color } => {
                write!(f, "region {region} uses color {color} which is not in the palette")
            }
        }
    }
}

impl std::error::Error for TemplateError {}

impl CanvasTemplate {
    pub fn validate(&self) -> Result<(), TemplateError> {
        let Dimensions { width, height } = self.dimensions;
        if width == 0 || height == 0 {
            return Err(TemplateError::EmptyDimensions { width, height });
        }

        let mut palette = HashSet::new();
        for color in &self.palette {
            if !palette.insert(color.index) {
                return Err(TemplateError::DuplicateColor(color.index));
            }
        }

        let mut ids = HashSet::new();
        for region in &self.regions {
            if !ids.insert(region.id.as_str()) {
                return Err(TemplateError::DuplicateRegion(region.id.clone()));
            }
            if region.boundary.len() < 3 {
                return Err(TemplateError::TooFewPoints {
                    region: region.id.clone(),
                    points: region.boundary.len(),
                });
            }
            if !region.centroid.is_finite() || region.boundary.iter().any(|p| !p.is_finite()) {
                return Err(TemplateError::NonFinitePoint {
                    region: region.id.clone(),
                });
            }
            if region.color_number == 0 {
                return Err(TemplateError::InvalidColorNumber {
                    region: region.id.clone(),
                });
            }
            if !palette.contains(&region.color_number) {
                return Err(TemplateError::UnknownColor {
                    region: region.id.clone(),
                    color: region.color_number,
                });
            }
        }
        Ok(())
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.id == id)
    }

    pub fn contains_region(&self, id: &str) -> bool {
        self.region(id).is_some()
    }

    pub fn color(&self, index: ColorIndex) -> Option<&PaletteColor> {
        self.palette.iter().find(|color| color.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(id: &str, color_number: ColorIndex) -> Region {
        Region {
            id: id.to_string(),
            color_number,
            boundary: vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 1.0),
            ],
            centroid: Point::new(0.5, 0.5),
        }
    }

    fn template(regions: Vec<Region>) -> CanvasTemplate {
        CanvasTemplate {
            dimensions: Dimensions {
                width: 10,
                height: 10,
            },
            regions,
            palette: vec![PaletteColor {
                index: 1,
                rgb: [255, 0, 0],
                hex: "#ff0000".to_string(),
            }],
            metadata: None,
        }
    }

    #[test]
    fn accepts_generator_field_names() {
        let json = r##"{
            "dimensions": {"width": 4, "height": 3},
            "regions": [{"id": "region_1", "color_num": 1,
                "boundary": [{"x": 0, "y": 0}, {"x": 2, "y": 0}, {"x": 2, "y": 2}],
                "centroid": {"x": 1, "y": 1}}],
            "colors": [{"num": 1, "rgb": [10, 20, 30], "hex": "#0a141e"}],
            "metadata": {"num_colors": 1, "num_regions": 1, "difficulty": "easy"}
        }"##;
        let template: CanvasTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.regions[0].color_number, 1);
        assert_eq!(template.palette[0].index, 1);
        assert_eq!(
            template.metadata.and_then(|m| m.difficulty).as_deref(),
            Some("easy")
        );
    }

    #[test]
    fn validate_accepts_consistent_template() {
        assert_eq!(template(vec![square("a", 1), square("b", 1)]).validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_duplicate_region_ids() {
        let result = template(vec![square("a", 1), square("a", 1)]).validate();
        assert_eq!(result, Err(TemplateError::DuplicateRegion("a".into())));
    }

    #[test]
    fn validate_rejects_unresolvable_color() {
        let result = template(vec![square("a", 7)]).validate();
        assert_eq!(
            result,
            Err(TemplateError::UnknownColor {
                region: "a".into(),
                color: 7
            })
        );
    }

    #[test]
    fn validate_rejects_degenerate_boundary() {
        let mut region = square("a", 1);
        region.boundary.truncate(2);
        assert!(matches!(
            template(vec![region]).validate(),
            Err(TemplateError::TooFewPoints { points: 2, .. })
        ));
    }

    #[test]
    fn validate_rejects_empty_dimensions() {
        let mut t = template(vec![square("a", 1)]);
        t.dimensions.height = 0;
        assert!(matches!(
            t.validate(),
            Err(TemplateError::EmptyDimensions { .. })
        ));
    }
}
