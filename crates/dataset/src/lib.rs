//! # Annotation Dataset Builder
//!
//! Drives the `mask` pipeline over a directory of microscope images and their
//! hand-painted masks and writes the result as COCO detection, COCO panoptic
//! and YOLO annotations.
//!
//! ```rust,no_run
//! use dataset::{convert_dataset, ConvertConfig, OutputFormat};
//!
//! let mut config = ConvertConfig::new("sem_data");
//! config.formats = vec![OutputFormat::Coco, OutputFormat::Yolo];
//! config.seed = Some(42);
//!
//! let summary = convert_dataset(&config, None)?;
//! println!("{summary}");
//! # Ok::<(), dataset::DatasetError>(())
//! ```

pub mod error;
pub mod model;
pub mod ids;
pub mod emit;
pub mod yolo;
pub mod layout;
pub mod split;
pub mod config;
pub mod convert;
pub mod merge;
pub mod validation;

pub use error::{DatasetError, Result};
pub use model::*;
pub use ids::IdSequence;
pub use emit::AnnotationEmitter;
pub use yolo::{format_g, merge_multi_segment, normalize_bbox, write_labels, YoloMode, YoloOptions};
pub use layout::{DatasetEntry, DatasetLayout};
pub use split::split_train_val;
pub use config::{ConvertConfig, OutputFormat};
pub use convert::{convert_dataset, convert_entry, convert_split, ConversionSummary, ImageFailure, SplitSummary};
pub use merge::{merge_datasets, merge_files};
pub use validation::{validate_dataset, IssueCode, Severity, ValidationIssue, ValidationReport};
