use std::sync::Arc;

use crate::{
    algorithms::{
        ColorSnapPreprocessor,
        ContourMethod,
        DouglasPeuckerSimplifier,
        MarchingSquaresContourExtractor,
        NoSimplifier,
        SimplificationMethod,
        VisvalingamWhyattSimplifier,
    },
    category::CategoryTable,
    pipeline::{Pipeline, DEFAULT_TOLERANCE},
    traits::{ContourExtractor, MaskPreprocessor, ShapeSimplifier},
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    table: Arc<CategoryTable>,
    preprocessors: Vec<Box<dyn MaskPreprocessor>>,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
    simplifier: Option<Box<dyn ShapeSimplifier>>,
    tolerance: f64,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new(table: CategoryTable) -> Self {
        Self::shared(Arc::new(table))
    }

    /// Create a builder around a table that is already shared
    pub fn shared(table: Arc<CategoryTable>) -> Self {
        Self {
            table,
            preprocessors: Vec::new(),
            contour_extractor: None,
            simplifier: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Add a preprocessor to the pipeline
    pub fn add_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: MaskPreprocessor + 'static,
    {
        self.preprocessors.push(Box::new(preprocessor));
        self
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Set the simplifier (replaces any existing one)
    pub fn set_simplifier<S>(mut self, simplifier: S) -> Self
    where
        S: ShapeSimplifier + 'static,
    {
        self.simplifier = Some(Box::new(simplifier));
        self
    }

    /// Snap anti-aliased mask colors before extraction
    pub fn with_color_snapping(self) -> Self {
        self.add_preprocessor(ColorSnapPreprocessor::default())
    }

    /// Douglas-Peucker simplification with the given tolerance
    pub fn with_simplification(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self.set_simplifier(DouglasPeuckerSimplifier)
    }

    /// Visvalingam-Whyatt simplification with the given area tolerance
    pub fn with_vw_simplification(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self.set_simplifier(VisvalingamWhyattSimplifier)
    }

    /// Keep every traced vertex
    pub fn without_simplification(self) -> Self {
        self.set_simplifier(NoSimplifier)
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_contour_method(mut self, method: ContourMethod) -> Self {
        self.contour_extractor = Some(method.extractor());
        self
    }

    pub fn with_simplification_method(mut self, method: SimplificationMethod) -> Self {
        self.simplifier = Some(method.simplifier());
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let contour_extractor = self.contour_extractor
            .unwrap_or_else(|| Box::new(MarchingSquaresContourExtractor));

        let simplifier = self.simplifier
            .unwrap_or_else(|| Box::new(DouglasPeuckerSimplifier));

        Pipeline::new(
            self.table,
            self.preprocessors,
            contour_extractor,
            simplifier,
            self.tolerance,
        )
    }
}
