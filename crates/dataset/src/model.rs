//! COCO detection and COCO panoptic document types.
//!
//! Field order follows the JSON layout the files are written in, so a
//! document survives a read/write cycle unchanged.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DatasetError, Result};

/// Name used for the single keypoint of keypoint-mode categories
pub const KEYPOINT_NAME: &str = "front";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoDataset {
    #[serde(default)]
    pub info: BTreeMap<String, Value>,
    #[serde(default)]
    pub licenses: Vec<Value>,
    pub images: Vec<CocoImage>,
    pub categories: Vec<CocoCategory>,
    pub annotations: Vec<CocoAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    pub file_name: String,
    pub height: u32,
    pub width: u32,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub supercategory: String,
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypoints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<Vec<[u32; 2]>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub segmentation: Vec<Vec<f64>>,
    pub area: f64,
    #[serde(default)]
    pub iscrowd: u8,
    pub image_id: u64,
    /// `[x, y, width, height]`
    pub bbox: [f64; 4],
    pub category_id: u32,
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypoints: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_keypoints: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanopticDataset {
    #[serde(default)]
    pub info: BTreeMap<String, Value>,
    #[serde(default)]
    pub licenses: Vec<Value>,
    pub images: Vec<CocoImage>,
    pub categories: Vec<PanopticCategory>,
    pub annotations: Vec<PanopticAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanopticCategory {
    pub supercategory: String,
    pub id: u32,
    pub name: String,
    /// 1 for object categories, 0 for the background
    pub isthing: u8,
    pub color: [u8; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypoints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skeleton: Option<Vec<[u32; 2]>>,
}

/// Panoptic record for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanopticAnnotation {
    pub image_id: u64,
    pub file_name: String,
    pub segments_info: Vec<SegmentInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub id: u64,
    pub category_id: u32,
    #[serde(default)]
    pub iscrowd: u8,
    pub bbox: [f64; 4],
    pub area: f64,
}

impl CocoDataset {
    pub fn read(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    pub fn max_image_id(&self) -> Option<u64> {
        self.images.iter().map(|image| image.id).max()
    }

    pub fn max_annotation_id(&self) -> Option<u64> {
        self.annotations.iter().map(|annotation| annotation.id).max()
    }
}

impl PanopticDataset {
    pub fn read(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(DatasetError::io(path))?;
    serde_json::from_str(&content).map_err(|source| DatasetError::JsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Pretty-print `value` to `path`, creating parent directories as needed.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(DatasetError::io(parent))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| DatasetError::JsonWrite {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(DatasetError::io(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_fields_omitted_when_absent() {
        let annotation = CocoAnnotation {
            segmentation: vec![vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0]],
            area: 0.5,
            iscrowd: 0,
            image_id: 0,
            bbox: [0.0, 0.0, 1.0, 1.0],
            category_id: 1,
            id: 0,
            keypoints: None,
            num_keypoints: None,
        };

        let json = serde_json::to_value(&annotation).unwrap();
        assert!(json.get("keypoints").is_none());
        assert!(json.get("num_keypoints").is_none());
        assert_eq!(json["iscrowd"], 0);
    }

    #[test]
    fn test_dataset_reads_minimal_document() {
        let json = r#"{
            "images": [{"file_name": "a.tif", "height": 4, "width": 4, "id": 0}],
            "categories": [{"supercategory": "tip1", "id": 1, "name": "tip1"}],
            "annotations": []
        }"#;

        let dataset: CocoDataset = serde_json::from_str(json).unwrap();
        assert!(dataset.info.is_empty());
        assert!(dataset.licenses.is_empty());
        assert_eq!(dataset.max_image_id(), Some(0));
        assert_eq!(dataset.max_annotation_id(), None);
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations").join("train.json");

        let dataset = CocoDataset::default();
        dataset.write(&path).unwrap();

        assert_eq!(CocoDataset::read(&path).unwrap(), dataset);
    }
}
