//! Batch conversion of a `images/` + `masks/` dataset into annotation files.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use mask::{load_mask, KeypointPrompt, MaskAnnotations, MaskError, Pipeline};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{info, warn};

use crate::config::{ConvertConfig, OutputFormat};
use crate::emit::AnnotationEmitter;
use crate::error::{DatasetError, Result};
use crate::layout::{DatasetEntry, DatasetLayout};
use crate::model::{CocoDataset, PanopticDataset};
use crate::split::split_train_val;
use crate::yolo::{write_labels, YoloOptions};

pub const TRAIN_SPLIT: &str = "train";
pub const VAL_SPLIT: &str = "val";

/// An image left out of the output
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Annotations of one split, ready to be written
#[derive(Debug, Clone)]
pub struct ConvertedSplit {
    pub name: String,
    pub detection: CocoDataset,
    pub panoptic: PanopticDataset,
    /// Entries that made it into the documents, in id order
    pub entries: Vec<DatasetEntry>,
    pub failures: Vec<ImageFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct SplitSummary {
    pub name: String,
    pub images: usize,
    pub annotations: usize,
    pub failures: Vec<ImageFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct ConversionSummary {
    pub splits: Vec<SplitSummary>,
    pub outputs: Vec<PathBuf>,
}

impl ConversionSummary {
    pub fn succeeded(&self) -> usize {
        self.splits.iter().map(|s| s.images).sum()
    }

    pub fn failed(&self) -> usize {
        self.splits.iter().map(|s| s.failures.len()).sum()
    }

    pub fn annotations(&self) -> usize {
        self.splits.iter().map(|s| s.annotations).sum()
    }
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Converted {} of {} images ({} failed), {} annotations created",
            self.succeeded(),
            self.succeeded() + self.failed(),
            self.failed(),
            self.annotations()
        )?;

        for split in &self.splits {
            writeln!(
                f,
                "  {}: {} images, {} annotations, {} failed",
                split.name,
                split.images,
                split.annotations,
                split.failures.len()
            )?;
            for failure in &split.failures {
                writeln!(f, "    {}: {}", failure.path.display(), failure.reason)?;
            }
        }

        for output in &self.outputs {
            writeln!(f, "  wrote {}", output.display())?;
        }
        Ok(())
    }
}

/// Convert the mask of one entry.
pub fn convert_entry(
    pipeline: &Pipeline,
    entry: &DatasetEntry,
    prompt: Option<&mut dyn KeypointPrompt>,
) -> Result<MaskAnnotations> {
    entry.check()?;
    let mask_error = |source: MaskError| DatasetError::Mask {
        path: entry.mask_path.clone(),
        source,
    };

    let image = load_mask(&entry.mask_path).map_err(mask_error)?;
    pipeline.process_with_prompt(&image, prompt).map_err(mask_error)
}

/// Convert every entry of a split and collect the successful ones.
///
/// Without a prompt the masks are converted in parallel. Results are always
/// emitted in entry order, so ids do not depend on scheduling.
pub fn convert_split(
    name: &str,
    pipeline: &Pipeline,
    entries: &[DatasetEntry],
    include_keypoints: bool,
    prompt: Option<&mut dyn KeypointPrompt>,
) -> ConvertedSplit {
    let results: Vec<Result<MaskAnnotations>> = match prompt {
        Some(prompt) => entries
            .iter()
            .map(|entry| convert_entry(pipeline, entry, Some(&mut *prompt)))
            .collect(),
        None => entries
            .par_iter()
            .map(|entry| convert_entry(pipeline, entry, None))
            .collect(),
    };

    let mut emitter = AnnotationEmitter::new(pipeline.table(), include_keypoints);
    let mut converted = Vec::new();
    let mut failures = Vec::new();
    let total = entries.len();

    for (index, (entry, result)) in entries.iter().zip(results).enumerate() {
        match result {
            Ok(annotations) => {
                info!(
                    split = name,
                    path = %entry.mask_path.display(),
                    annotations = annotations.annotation_count(),
                    "[{}/{}] converted",
                    index + 1,
                    total
                );
                emitter.push_image(&entry.file_name, &annotations);
                converted.push(entry.clone());
            }
            Err(e) => {
                warn!(split = name, path = %entry.mask_path.display(), error = %e, "skipping image");
                failures.push(ImageFailure {
                    path: entry.mask_path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let (detection, panoptic) = emitter.finish();
    ConvertedSplit {
        name: name.to_string(),
        detection,
        panoptic,
        entries: converted,
        failures,
    }
}

/// Output roots next to the dataset directory
#[derive(Debug, Clone)]
pub struct OutputDirs {
    pub coco: Option<PathBuf>,
    pub panoptic: Option<PathBuf>,
    pub yolo: Option<PathBuf>,
}

impl OutputDirs {
    pub fn for_layout(layout: &DatasetLayout, config: &ConvertConfig) -> Self {
        Self {
            coco: config
                .wants(OutputFormat::Coco)
                .then(|| layout.sibling("_coco")),
            panoptic: config
                .wants(OutputFormat::CocoPanoptic)
                .then(|| layout.sibling("_coco_panoptic")),
            yolo: config
                .wants(OutputFormat::Yolo)
                .then(|| layout.sibling("_yolo")),
        }
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        [&self.coco, &self.panoptic, &self.yolo]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn write_split(&self, split: &ConvertedSplit, yolo: YoloOptions) -> Result<()> {
        let images: Vec<&Path> = split.entries.iter().map(|e| e.image_path.as_path()).collect();

        if let Some(root) = &self.coco {
            let annotations = root.join("annotations");
            split.detection.write(&annotations.join(format!("{}.json", split.name)))?;
            copy_files(&images, &root.join("images"))?;
        }

        if let Some(root) = &self.panoptic {
            let annotations = root.join("annotations");
            split.panoptic.write(&annotations.join(format!("{}.json", split.name)))?;
            copy_files(&images, &root.join("images"))?;

            let masks: Vec<&Path> = split.entries.iter().map(|e| e.mask_path.as_path()).collect();
            copy_files(&masks, &annotations.join("masks"))?;
        }

        if let Some(root) = &self.yolo {
            let split_dir = root.join(&split.name);
            write_labels(&split.detection, &split_dir.join("labels"), yolo)?;
            copy_files(&images, &split_dir.join("images"))?;
        }

        Ok(())
    }
}

fn copy_files(files: &[&Path], dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(DatasetError::io(dir))?;
    for file in files {
        let Some(name) = file.file_name() else {
            continue;
        };
        fs::copy(file, dir.join(name)).map_err(DatasetError::io(*file))?;
    }
    Ok(())
}

fn thread_pool(jobs: Option<usize>) -> Result<Option<ThreadPool>> {
    jobs.map(|jobs| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| DatasetError::InvalidConfig(format!("cannot start {} workers: {}", jobs, e)))
    })
    .transpose()
}

/// Convert a whole dataset: discover, split, convert, write every requested format.
///
/// Keypoint mode needs a prompt and runs sequentially; the prompt is not
/// used otherwise.
pub fn convert_dataset(
    config: &ConvertConfig,
    prompt: Option<&mut dyn KeypointPrompt>,
) -> Result<ConversionSummary> {
    config.validate()?;

    let mut prompt = if config.include_keypoints {
        match prompt {
            Some(prompt) => Some(prompt),
            None => {
                return Err(DatasetError::InvalidConfig(
                    "keypoint mode needs an interactive prompt".to_string(),
                ))
            }
        }
    } else {
        None
    };

    let table = config.category_table()?;
    let yolo = YoloOptions::new(config.yolo_mode, table.ignores_background());
    let pipeline = config.pipeline(table);
    info!("{}", pipeline.info());

    let layout = DatasetLayout::discover(&config.dataset_path)?;
    let (train, val) = split_train_val(layout.entries(), config.train_val_split, config.seed)?;
    info!(
        root = %layout.root().display(),
        train = train.len(),
        val = val.len(),
        "starting conversion"
    );

    let outputs = OutputDirs::for_layout(&layout, config);
    let pool = thread_pool(config.jobs)?;
    let mut summary = ConversionSummary {
        outputs: outputs.roots(),
        ..Default::default()
    };

    for (name, entries) in [(TRAIN_SPLIT, train), (VAL_SPLIT, val)] {
        let split = match (&pool, prompt.as_deref_mut()) {
            (Some(pool), None) => pool.install(|| {
                convert_split(name, &pipeline, &entries, config.include_keypoints, None)
            }),
            (_, prompt) => convert_split(
                name,
                &pipeline,
                &entries,
                config.include_keypoints,
                prompt.map(|p| -> &mut dyn KeypointPrompt { p }),
            ),
        };

        outputs.write_split(&split, yolo)?;

        summary.splits.push(SplitSummary {
            name: split.name.clone(),
            images: split.detection.images.len(),
            annotations: split.detection.annotations.len(),
            failures: split.failures,
        });
    }

    info!(
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        annotations = summary.annotations(),
        "conversion finished"
    );
    Ok(summary)
}
