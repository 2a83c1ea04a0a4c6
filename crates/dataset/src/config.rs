use std::path::PathBuf;

use mask::{CategoryTable, ContourMethod, Pipeline, SimplificationMethod, DEFAULT_TOLERANCE};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::error::{DatasetError, Result};
use crate::yolo::YoloMode;

/// Annotation formats a conversion can produce
#[derive(
    Debug, Clone, Copy,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq, Hash
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputFormat {
    /// COCO detection JSON under `<root>_coco`
    Coco,
    /// COCO panoptic JSON plus masks under `<root>_coco_panoptic`
    CocoPanoptic,
    /// YOLO label files under `<root>_yolo`
    Yolo,
}

/// Options of a dataset conversion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConvertConfig {
    /// Directory holding `images/` and `masks/`
    pub dataset_path: PathBuf,
    /// Leave the background color out of the annotations
    pub ignore_background: bool,
    /// Annotate every non-background color as the same category
    pub one_class: bool,
    /// Ask for one manual keypoint per sub-mask
    pub include_keypoints: bool,
    /// Fraction of images used for training, in (0, 1]
    pub train_val_split: f64,
    /// Seed for a reproducible split
    pub seed: Option<u64>,
    pub formats: Vec<OutputFormat>,
    pub yolo_mode: YoloMode,
    /// Quantise anti-aliased mask colors before conversion
    pub snap_colors: bool,
    pub contour_method: ContourMethod,
    pub simplification: SimplificationMethod,
    pub tolerance: f64,
    /// Worker threads; all cores when unset
    pub jobs: Option<usize>,
    /// Custom color table; the built-in tip table when unset
    pub categories: Option<CategoryTable>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("."),
            ignore_background: true,
            one_class: false,
            include_keypoints: false,
            train_val_split: 0.8,
            seed: None,
            formats: vec![OutputFormat::Coco],
            yolo_mode: YoloMode::default(),
            snap_colors: false,
            contour_method: ContourMethod::default(),
            simplification: SimplificationMethod::default(),
            tolerance: DEFAULT_TOLERANCE,
            jobs: None,
            categories: None,
        }
    }
}

impl ConvertConfig {
    pub fn new(dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.train_val_split > 0.0 && self.train_val_split <= 1.0) {
            return Err(DatasetError::InvalidSplit(self.train_val_split));
        }
        if self.formats.is_empty() {
            return Err(DatasetError::InvalidConfig("no output format selected".to_string()));
        }
        if !(self.tolerance >= 0.0) {
            return Err(DatasetError::InvalidConfig(format!(
                "simplification tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if self.jobs == Some(0) {
            return Err(DatasetError::InvalidConfig("jobs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn wants(&self, format: OutputFormat) -> bool {
        self.formats.contains(&format)
    }

    /// The table every worker shares, with `one_class` and `ignore_background` applied.
    pub fn category_table(&self) -> Result<CategoryTable> {
        let table = match &self.categories {
            Some(table) => {
                table.validate().map_err(DatasetError::Categories)?;
                table.clone()
            }
            None => CategoryTable::tips(),
        };

        let table = if self.one_class {
            table.collapse_to_one_class()
        } else {
            table
        };

        Ok(table.with_ignore_background(self.ignore_background))
    }

    pub fn pipeline(&self, table: CategoryTable) -> Pipeline {
        let mut builder = Pipeline::builder(table)
            .with_contour_method(self.contour_method)
            .with_simplification_method(self.simplification)
            .with_tolerance(self.tolerance);
        if self.snap_colors {
            builder = builder.with_color_snapping();
        }
        builder.build()
    }
}
