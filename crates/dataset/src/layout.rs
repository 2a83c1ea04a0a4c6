use std::fs;
use std::path::{Path, PathBuf};

use mask::has_mask_extension;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{DatasetError, Result};

pub const IMAGES_DIR: &str = "images";
pub const MASKS_DIR: &str = "masks";

/// One microscope image and the mask painted for it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DatasetEntry {
    pub file_name: String,
    pub image_path: PathBuf,
    pub mask_path: PathBuf,
}

impl DatasetEntry {
    /// The mask must exist under the same file name as the image.
    pub fn check(&self) -> Result<()> {
        if self.mask_path.is_file() {
            Ok(())
        } else {
            Err(DatasetError::Layout {
                path: self.mask_path.clone(),
                reason: format!("no mask for image {}", self.file_name),
            })
        }
    }
}

/// `<root>/images` + `<root>/masks`, paired by file name
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
    entries: Vec<DatasetEntry>,
}

impl DatasetLayout {
    pub fn discover(root: &Path) -> Result<Self> {
        let root = fs::canonicalize(root).map_err(|e| DatasetError::Layout {
            path: root.to_path_buf(),
            reason: format!("dataset directory not accessible: {}", e),
        })?;

        let images_dir = root.join(IMAGES_DIR);
        let masks_dir = root.join(MASKS_DIR);
        for dir in [&images_dir, &masks_dir] {
            if !dir.is_dir() {
                return Err(DatasetError::Layout {
                    path: dir.clone(),
                    reason: "required directory is missing".to_string(),
                });
            }
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&images_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| DatasetError::Layout {
                path: images_dir.clone(),
                reason: e.to_string(),
            })?;

            if !entry.file_type().is_file() || !has_mask_extension(entry.path()) {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy().into_owned();
            entries.push(DatasetEntry {
                mask_path: masks_dir.join(&file_name),
                image_path: entry.into_path(),
                file_name,
            });
        }

        debug!(root = %root.display(), images = entries.len(), "discovered dataset");
        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    /// `<root><suffix>` next to the dataset, e.g. `data_coco` for `data`
    pub fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .root
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.root.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_discover_pairs_images_with_masks() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        fs::create_dir_all(root.join("images")).unwrap();
        fs::create_dir_all(root.join("masks")).unwrap();

        touch(&root.join("images/b.tif"));
        touch(&root.join("images/a.png"));
        touch(&root.join("images/notes.txt"));
        touch(&root.join("masks/a.png"));

        let layout = DatasetLayout::discover(&root).unwrap();
        let names: Vec<&str> = layout.entries().iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.tif"]);

        assert!(layout.entries()[0].check().is_ok());
        match layout.entries()[1].check() {
            Err(DatasetError::Layout { reason, .. }) => assert!(reason.contains("b.tif")),
            other => panic!("expected layout error, got {other:?}"),
        }

        let coco = layout.sibling("_coco");
        assert_eq!(coco.file_name().unwrap(), "data_coco");
        assert_eq!(coco.parent(), layout.root().parent());
    }

    #[test]
    fn test_missing_masks_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("images")).unwrap();

        let err = DatasetLayout::discover(dir.path()).unwrap_err();
        assert!(matches!(err, DatasetError::Layout { .. }));
    }
}
