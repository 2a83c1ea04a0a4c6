use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::model::CocoDataset;

/// Concatenate COCO detection documents into one.
///
/// Image and annotation ids of every input are shifted past the largest id
/// merged so far; annotation `image_id`s move with their images. Categories
/// are taken from the last input.
pub fn merge_datasets(datasets: impl IntoIterator<Item = CocoDataset>) -> CocoDataset {
    let mut merged = CocoDataset::default();

    for dataset in datasets {
        let image_offset = merged.max_image_id().map_or(0, |id| id + 1);
        let annotation_offset = merged.max_annotation_id().map_or(0, |id| id + 1);

        merged.images.extend(dataset.images.into_iter().map(|mut image| {
            image.id += image_offset;
            image
        }));
        merged.annotations.extend(dataset.annotations.into_iter().map(|mut annotation| {
            annotation.id += annotation_offset;
            annotation.image_id += image_offset;
            annotation
        }));

        merged.categories = dataset.categories;
        if !dataset.info.is_empty() {
            merged.info = dataset.info;
        }
        merged.licenses.extend(dataset.licenses);
    }

    merged
}

/// Read every input file, merge and write the result.
pub fn merge_files<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Result<CocoDataset> {
    let datasets = inputs
        .iter()
        .map(|path| CocoDataset::read(path.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let merged = merge_datasets(datasets);
    merged.write(output)?;

    info!(
        inputs = inputs.len(),
        images = merged.images.len(),
        annotations = merged.annotations.len(),
        output = %output.display(),
        "merged COCO files"
    );
    Ok(merged)
}
