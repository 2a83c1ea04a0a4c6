use image::{GrayImage, RgbImage};
use crate::{
    category::MaskColor,
    error::Result,
    submask::SubMask,
    types::{Keypoint, Polygon},
};

/// Trait for mask preprocessing algorithms
pub trait MaskPreprocessor: Send + Sync {
    /// Preprocess the color mask (e.g. snap anti-aliased colors)
    fn preprocess(&self, image: &RgbImage) -> Result<RgbImage>;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Trace closed contours of a padded binary sub-mask, returned in unpadded image coordinates
    fn extract_contours(&self, sub_mask: &GrayImage) -> Result<Vec<Vec<[f64; 2]>>>;
}

/// Trait for polygon simplification algorithms
pub trait ShapeSimplifier: Send + Sync {
    /// Simplify one closed ring; `MaskError::EmptyPolygon` when nothing usable is left
    fn simplify(&self, ring: &[[f64; 2]], tolerance: f64) -> Result<Polygon>;
}

/// What the operator is asked to annotate
#[derive(Debug, Clone, Copy)]
pub struct PointRequest<'a> {
    pub color: MaskColor,
    pub category_id: u32,
    pub sub_mask: &'a SubMask,
}

/// Blocking source of manual keypoint clicks.
///
/// Called once per sub-mask; the conversion waits for the answer.
pub trait KeypointPrompt {
    fn prompt_point(&mut self, request: &PointRequest<'_>) -> Result<Keypoint>;
}

impl<F> KeypointPrompt for F
where
    F: FnMut(&PointRequest<'_>) -> Result<Keypoint>,
{
    fn prompt_point(&mut self, request: &PointRequest<'_>) -> Result<Keypoint> {
        self(request)
    }
}
