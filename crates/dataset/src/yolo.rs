//! YOLO label export.
//!
//! Labels are derived from a finished COCO detection document: one text file
//! per image, one line per object, coordinates normalised to `[0, 1]`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use tracing::{debug, warn};

use crate::error::{DatasetError, Result};
use crate::model::{CocoAnnotation, CocoDataset, CocoImage};

/// What each YOLO label line carries
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum YoloMode {
    /// `class x1 y1 ... xn yn`
    #[default]
    Segments,
    /// `class cx cy w h`
    Boxes,
}

#[derive(Debug, Clone, Copy)]
pub struct YoloOptions {
    pub mode: YoloMode,
    /// Subtracted from the category id to get the class index
    pub class_offset: u32,
}

impl YoloOptions {
    /// Class indices start at zero: shifted by one when the background category is excluded.
    pub fn new(mode: YoloMode, ignore_background: bool) -> Self {
        Self {
            mode,
            class_offset: u32::from(ignore_background),
        }
    }
}

/// COCO `[x, y, w, h]` in pixels to YOLO `[cx, cy, w, h]` relative to the image size.
pub fn normalize_bbox(bbox: [f64; 4], width: f64, height: f64) -> [f64; 4] {
    let [x, y, w, h] = bbox;
    [
        (x + w / 2.0) / width,
        (y + h / 2.0) / height,
        w / width,
        h / height,
    ]
}

/// Format a number like C's `%g`: six significant digits, trailing zeros
/// removed, exponent notation for very small or very large magnitudes.
pub fn format_g(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let scientific = format!("{:.5e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (5 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

fn squared_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

/// Indices of the closest pair of points between two rings (first minimum, row-major).
pub fn min_index(a: &[[f64; 2]], b: &[[f64; 2]]) -> (usize, usize) {
    let mut best = (0, 0);
    let mut best_distance = f64::INFINITY;
    for (i, &p) in a.iter().enumerate() {
        for (j, &q) in b.iter().enumerate() {
            let distance = squared_distance(p, q);
            if distance < best_distance {
                best_distance = distance;
                best = (i, j);
            }
        }
    }
    best
}

/// Join several rings into one outline by bridging each ring to the next at
/// their closest points, walking forward through the rings and back again.
///
/// Best effort: the result can self-intersect.
pub fn merge_multi_segment(segments: &[Vec<f64>]) -> Vec<[f64; 2]> {
    let mut rings: Vec<Vec<[f64; 2]>> = segments
        .iter()
        .map(|segment| segment.chunks_exact(2).map(|c| [c[0], c[1]]).collect::<Vec<_>>())
        .filter(|ring| !ring.is_empty())
        .collect();

    let count = rings.len();
    if count <= 1 {
        return rings.into_iter().flatten().collect();
    }

    let mut links: Vec<Vec<usize>> = vec![Vec::new(); count];
    for i in 1..count {
        let (a, b) = min_index(&rings[i - 1], &rings[i]);
        links[i - 1].push(a);
        links[i].push(b);
    }

    let last = count - 1;
    let mut pieces: Vec<Vec<[f64; 2]>> = Vec::with_capacity(2 * count);

    for (i, link) in links.iter_mut().enumerate() {
        if link.len() == 2 && link[0] > link[1] {
            link.reverse();
            rings[i].reverse();
        }

        let ring = &mut rings[i];
        ring.rotate_left(link[0]);
        let first = ring[0];
        ring.push(first);

        if i == 0 || i == last {
            pieces.push(ring.clone());
        } else {
            pieces.push(ring[..=link[1] - link[0]].to_vec());
        }
    }

    for i in (1..last).rev() {
        let start = links[i][0].abs_diff(links[i][1]);
        pieces.push(rings[i][start..].to_vec());
    }

    pieces.concat()
}

fn format_line(class_id: u32, values: impl IntoIterator<Item = f64>) -> String {
    let mut line = class_id.to_string();
    for value in values {
        line.push(' ');
        line.push_str(&format_g(value));
    }
    line
}

/// Label lines for one image, duplicates removed, in annotation order.
pub fn label_lines(image: &CocoImage, annotations: &[&CocoAnnotation], options: YoloOptions) -> Vec<String> {
    let width = f64::from(image.width);
    let height = f64::from(image.height);

    let mut seen = HashSet::new();
    let mut lines = Vec::new();

    for annotation in annotations {
        if annotation.iscrowd != 0 {
            continue;
        }

        let bbox = normalize_bbox(annotation.bbox, width, height);
        if bbox[2] <= 0.0 || bbox[3] <= 0.0 {
            continue;
        }

        let Some(class_id) = annotation.category_id.checked_sub(options.class_offset) else {
            warn!(
                file_name = %image.file_name,
                category_id = annotation.category_id,
                "category has no YOLO class"
            );
            continue;
        };

        let line = match options.mode {
            YoloMode::Segments if !annotation.segmentation.is_empty() => {
                let points: Vec<[f64; 2]> = if annotation.segmentation.len() > 1 {
                    merge_multi_segment(&annotation.segmentation)
                } else {
                    annotation.segmentation[0]
                        .chunks_exact(2)
                        .map(|c| [c[0], c[1]])
                        .collect()
                };
                format_line(
                    class_id,
                    points.iter().flat_map(|&[x, y]| [x / width, y / height]),
                )
            }
            _ => format_line(class_id, bbox),
        };

        if seen.insert(line.clone()) {
            lines.push(line);
        }
    }

    lines
}

fn label_file_name(image: &CocoImage) -> String {
    let stem = Path::new(&image.file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.file_name.clone());
    format!("{}.txt", stem)
}

/// Write one `<stem>.txt` per image into `labels_dir`; returns the number of label lines.
///
/// Existing label files are truncated. Images without objects get an empty file.
/// Two images sharing a file stem are rejected before anything is written.
pub fn write_labels(dataset: &CocoDataset, labels_dir: &Path, options: YoloOptions) -> Result<usize> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for image in &dataset.images {
        let label = label_file_name(image);
        if let Some(other) = owners.insert(label.clone(), &image.file_name) {
            return Err(DatasetError::Layout {
                path: labels_dir.join(&label),
                reason: format!("{} and {} would share this label file", other, image.file_name),
            });
        }
    }

    fs::create_dir_all(labels_dir).map_err(DatasetError::io(labels_dir))?;

    let mut per_image: BTreeMap<u64, Vec<&CocoAnnotation>> = BTreeMap::new();
    for annotation in &dataset.annotations {
        per_image.entry(annotation.image_id).or_default().push(annotation);
    }

    let mut total = 0;
    for image in &dataset.images {
        let annotations = per_image.get(&image.id).map(Vec::as_slice).unwrap_or_default();
        let lines = label_lines(image, annotations, options);

        let path = labels_dir.join(label_file_name(image));

        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(&path, content).map_err(DatasetError::io(&path))?;

        debug!(path = %path.display(), lines = lines.len(), "wrote YOLO labels");
        total += lines.len();
    }

    Ok(total)
}
