pub mod builder;

use std::borrow::Cow;
use std::sync::Arc;

use image::RgbImage;
use tracing::debug;
use crate::{
    category::CategoryTable,
    error::{MaskError, Result},
    submask::{extract_sub_masks, SubMask},
    traits::{ContourExtractor, KeypointPrompt, MaskPreprocessor, PointRequest, ShapeSimplifier},
    types::{Instance, MaskAnnotations, Polygon},
};

/// Simplification tolerance applied to traced contours, in pixels
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// Per-image conversion: color mask in, annotation instances out
pub struct Pipeline {
    table: Arc<CategoryTable>,
    preprocessors: Vec<Box<dyn MaskPreprocessor>>,
    contour_extractor: Box<dyn ContourExtractor>,
    simplifier: Box<dyn ShapeSimplifier>,
    tolerance: f64,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder(table: CategoryTable) -> builder::PipelineBuilder {
        builder::PipelineBuilder::new(table)
    }

    /// Create a new pipeline with the given components
    pub fn new(
        table: Arc<CategoryTable>,
        preprocessors: Vec<Box<dyn MaskPreprocessor>>,
        contour_extractor: Box<dyn ContourExtractor>,
        simplifier: Box<dyn ShapeSimplifier>,
        tolerance: f64,
    ) -> Self {
        Self {
            table,
            preprocessors,
            contour_extractor,
            simplifier,
            tolerance,
        }
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Convert one mask image without keypoints
    pub fn process(&self, image: &RgbImage) -> Result<MaskAnnotations> {
        self.process_with_prompt(image, None)
    }

    /// Convert one mask image.
    ///
    /// Fails as a whole on the first color missing from the category table,
    /// before any contour is traced or the operator is prompted. When a
    /// prompt is given, it is asked once for every sub-mask that produced
    /// at least one polygon.
    pub fn process_with_prompt(
        &self,
        image: &RgbImage,
        mut prompt: Option<&mut dyn KeypointPrompt>,
    ) -> Result<MaskAnnotations> {
        // Step 1: Apply all preprocessors in sequence
        let mut processed = Cow::Borrowed(image);
        for preprocessor in &self.preprocessors {
            processed = Cow::Owned(preprocessor.preprocess(&processed)?);
        }

        // Step 2: Split into sub-masks and resolve their categories
        let resolved = extract_sub_masks(&processed, &self.table)
            .into_iter()
            .map(|sub_mask| {
                let category_id = self.table.category_of(sub_mask.color)?;
                Ok((sub_mask, category_id))
            })
            .collect::<Result<Vec<(SubMask, u32)>>>()?;

        // Step 3: Trace, simplify and group polygons per category
        let mut instances = Vec::new();
        for (sub_mask, category_id) in resolved {
            let polygons = self.trace(&sub_mask)?;
            debug!(
                color = %sub_mask.color,
                category_id,
                polygons = polygons.len(),
                "traced sub-mask"
            );
            if polygons.is_empty() {
                continue;
            }

            let keypoints = match prompt.as_deref_mut() {
                Some(prompt) => {
                    let request = PointRequest {
                        color: sub_mask.color,
                        category_id,
                        sub_mask: &sub_mask,
                    };
                    vec![prompt.prompt_point(&request)?]
                }
                None => Vec::new(),
            };

            if self.table.is_multipolygon(category_id) {
                instances.push(Instance {
                    category_id,
                    polygons,
                    keypoints,
                });
            } else {
                instances.extend(polygons.into_iter().map(|polygon| Instance {
                    category_id,
                    polygons: vec![polygon],
                    keypoints: keypoints.clone(),
                }));
            }
        }

        Ok(MaskAnnotations {
            instances,
            image_width: image.width(),
            image_height: image.height(),
        })
    }

    fn trace(&self, sub_mask: &SubMask) -> Result<Vec<Polygon>> {
        let contours = self.contour_extractor.extract_contours(&sub_mask.mask)?;

        let mut polygons = Vec::with_capacity(contours.len());
        for contour in contours {
            match self.simplifier.simplify(&contour, self.tolerance) {
                Ok(polygon) => polygons.push(polygon),
                Err(MaskError::EmptyPolygon) => {
                    debug!(color = %sub_mask.color, points = contour.len(), "dropping empty polygon");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(polygons)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: {} categories, {} preprocessors, simplification tolerance {}",
            self.table.categories().len(),
            self.preprocessors.len(),
            self.tolerance
        )
    }
}
