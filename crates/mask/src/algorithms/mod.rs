pub mod preprocessing;
pub mod extraction;
pub mod simplification;

pub use preprocessing::*;
pub use extraction::*;
pub use simplification::*;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::traits::{ContourExtractor, ShapeSimplifier};

/// Selectable contour tracing algorithm
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContourMethod {
    /// Half-intensity iso-lines between pixel centers
    #[default]
    MarchingSquares,
    /// Pixel border following (imageproc)
    BorderFollowing,
}

impl ContourMethod {
    pub fn extractor(self) -> Box<dyn ContourExtractor> {
        match self {
            Self::MarchingSquares => Box::new(MarchingSquaresContourExtractor),
            Self::BorderFollowing => Box::new(ImageprocContourExtractor),
        }
    }
}

/// Selectable polygon simplification algorithm
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SimplificationMethod {
    #[default]
    DouglasPeucker,
    VisvalingamWhyatt,
    None,
}

impl SimplificationMethod {
    pub fn simplifier(self) -> Box<dyn ShapeSimplifier> {
        match self {
            Self::DouglasPeucker => Box::new(DouglasPeuckerSimplifier),
            Self::VisvalingamWhyatt => Box::new(VisvalingamWhyattSimplifier),
            Self::None => Box::new(NoSimplifier),
        }
    }
}
