use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use dataset::ConvertConfig;
use mask::{
    has_mask_extension, load_mask, save_mask, ColorSnapPreprocessor, Keypoint, KeypointPrompt,
    MaskError, PointRequest, Visibility,
};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    MaskError(#[from] MaskError),
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Load a conversion config from TOML string
pub fn config_from_toml(content: &str) -> Result<ConvertConfig, CliError> {
    Ok(toml::from_str(content)?)
}

/// Load a conversion config from JSON string
pub fn config_from_json(content: &str) -> Result<ConvertConfig, CliError> {
    Ok(serde_json::from_str(content)?)
}

/// Auto-detect file format and load configuration
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ConvertConfig, CliError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => config_from_toml(&fs::read_to_string(path)?),
        Some("json") => config_from_json(&fs::read_to_string(path)?),
        _ => Err(CliError::UnsupportedFileFormat),
    }
}

/// Save a conversion config, format picked from the extension
pub fn save_config<P: AsRef<Path>>(config: &ConvertConfig, path: P) -> Result<(), CliError> {
    let path = path.as_ref();
    let content = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::to_string_pretty(config)?,
        Some("json") => serde_json::to_string_pretty(config)?,
        _ => return Err(CliError::UnsupportedFileFormat),
    };
    fs::write(path, content)?;
    Ok(())
}

/// JSON schema of the conversion config
pub fn config_schema() -> Result<String, CliError> {
    let schema = schemars::schema_for!(ConvertConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}

/// Parse an operator answer `x y [l|r]`: left click marks the point visible,
/// right click occluded. Coordinates must lie inside the image.
pub fn parse_click(line: &str, width: u32, height: u32) -> Result<Keypoint, String> {
    let mut parts = line.split_whitespace();
    let mut coordinate = |axis: &str, limit: u32| -> Result<u32, String> {
        let value: u32 = parts
            .next()
            .ok_or_else(|| format!("missing {} coordinate", axis))?
            .parse()
            .map_err(|_| format!("{} must be a non-negative integer", axis))?;
        if value >= limit {
            return Err(format!("{} = {} is outside 0..{}", axis, value, limit));
        }
        Ok(value)
    };

    let x = coordinate("x", width)?;
    let y = coordinate("y", height)?;

    let visibility = match parts.next() {
        None | Some("l") => Visibility::Visible,
        Some("r") => Visibility::Occluded,
        Some(other) => return Err(format!("unknown button '{}', use l or r", other)),
    };

    Ok(Keypoint { x, y, visibility })
}

/// Asks for keypoints on a terminal.
///
/// Every request writes the sub-mask as a PNG the operator can open, then
/// blocks until a valid `x y [l|r]` line is read.
pub struct TerminalPointPrompt<R, W> {
    input: R,
    output: W,
    preview_dir: PathBuf,
    asked: usize,
}

impl<R: BufRead, W: Write> TerminalPointPrompt<R, W> {
    pub fn new(input: R, output: W, preview_dir: impl Into<PathBuf>) -> Self {
        Self {
            input,
            output,
            preview_dir: preview_dir.into(),
            asked: 0,
        }
    }
}

impl<R: BufRead, W: Write> KeypointPrompt for TerminalPointPrompt<R, W> {
    fn prompt_point(&mut self, request: &PointRequest<'_>) -> mask::Result<Keypoint> {
        let preview = request.sub_mask.unpadded();
        fs::create_dir_all(&self.preview_dir)?;
        let path = self
            .preview_dir
            .join(format!("keypoint_{:04}_category_{}.png", self.asked, request.category_id));
        preview.save(&path)?;
        self.asked += 1;

        writeln!(
            self.output,
            "Category {} color {}: open {} and enter the front point as `x y [l|r]`",
            request.category_id,
            request.color,
            path.display()
        )?;

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(MaskError::Prompt("input closed before a point was given".to_string()));
            }

            match parse_click(&line, preview.width(), preview.height()) {
                Ok(keypoint) => {
                    debug!(x = keypoint.x, y = keypoint.y, "keypoint recorded");
                    return Ok(keypoint);
                }
                Err(reason) => writeln!(self.output, "{}", reason)?,
            }
        }
    }
}

/// Quantise the colors of every mask in `input`, writing to `output` (or in place).
/// Returns the number of files written and of pixels changed.
pub fn snap_directory(input: &Path, output: Option<&Path>) -> Result<(usize, usize), CliError> {
    let snapper = ColorSnapPreprocessor::default();
    let mut files = 0;
    let mut pixels = 0;

    for entry in WalkDir::new(input).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| CliError::Walk {
            path: input.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() || !has_mask_extension(entry.path()) {
            continue;
        }

        let mut image = load_mask(entry.path())?;
        let changed = snapper.snap_in_place(&mut image);

        let target = match output {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                dir.join(entry.file_name())
            }
            None => entry.path().to_path_buf(),
        };
        save_mask(&image, &target)?;

        debug!(path = %target.display(), changed, "snapped mask colors");
        files += 1;
        pixels += changed;
    }

    info!(files, pixels, "color snapping finished");
    Ok((files, pixels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use mask::{MaskColor, SubMask};
    use std::io::Cursor;

    #[test]
    fn test_config_from_toml() {
        let config = config_from_toml(
            r#"
            dataset_path = "sem"
            ignore_background = false
            formats = ["coco", "yolo"]
            train_val_split = 0.75
            seed = 9
            "#,
        )
        .unwrap();

        assert_eq!(config.dataset_path, PathBuf::from("sem"));
        assert!(!config.ignore_background);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.train_val_split, 0.75);
    }

    #[test]
    fn test_config_with_custom_categories() {
        let config = config_from_json(
            r#"{
                "dataset_path": "sem",
                "categories": {
                    "categories": [{"id": 0, "name": "background"}, {"id": 1, "name": "tip"}],
                    "colors": [
                        {"color": [0, 0, 0], "category": 0},
                        {"color": [255, 0, 0], "category": 1}
                    ]
                }
            }"#,
        )
        .unwrap();

        let table = config.category_table().unwrap();
        assert_eq!(table.categories().len(), 1);
        assert_eq!(table.category_of(MaskColor::new(255, 0, 0)).unwrap(), 1);
        assert!(!table.is_multipolygon(1));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ConvertConfig::new("data");
        config.seed = Some(1);

        for name in ["config.toml", "config.json"] {
            let path = dir.path().join(name);
            save_config(&config, &path).unwrap();
            assert_eq!(load_config(&path).unwrap(), config);
        }

        assert!(matches!(
            load_config(dir.path().join("config.yaml")),
            Err(CliError::UnsupportedFileFormat)
        ));
    }

    #[test]
    fn test_schema_names_fields() {
        let schema = config_schema().unwrap();
        assert!(schema.contains("train_val_split"));
        assert!(schema.contains("ignore_background"));
    }

    #[test]
    fn test_parse_click() {
        let keypoint = parse_click("3 4", 10, 10).unwrap();
        assert_eq!(keypoint.to_triple(), [3, 4, 2]);

        let keypoint = parse_click(" 0 9 r\n", 10, 10).unwrap();
        assert_eq!(keypoint.to_triple(), [0, 9, 1]);

        assert!(parse_click("10 0", 10, 10).is_err());
        assert!(parse_click("1", 10, 10).is_err());
        assert!(parse_click("a b", 10, 10).is_err());
        assert!(parse_click("1 1 m", 10, 10).is_err());
    }

    fn sub_mask() -> SubMask {
        let mut mask = GrayImage::new(6, 5);
        mask.put_pixel(2, 2, Luma([255]));
        SubMask {
            color: MaskColor::new(255, 0, 0),
            mask,
        }
    }

    #[test]
    fn test_terminal_prompt_retries_until_valid() {
        let dir = tempfile::tempdir().unwrap();
        let input = Cursor::new("99 1\n1 2 r\n");
        let mut output = Vec::new();

        let sub_mask = sub_mask();
        let request = PointRequest {
            color: sub_mask.color,
            category_id: 1,
            sub_mask: &sub_mask,
        };

        let keypoint = {
            let mut prompt = TerminalPointPrompt::new(input, &mut output, dir.path());
            prompt.prompt_point(&request).unwrap()
        };

        assert_eq!(keypoint.to_triple(), [1, 2, 1]);
        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("outside"));
        assert!(dir.path().join("keypoint_0000_category_1.png").is_file());
    }

    #[test]
    fn test_terminal_prompt_closed_input() {
        let dir = tempfile::tempdir().unwrap();
        let sub_mask = sub_mask();
        let request = PointRequest {
            color: sub_mask.color,
            category_id: 3,
            sub_mask: &sub_mask,
        };

        let mut prompt = TerminalPointPrompt::new(Cursor::new(""), Vec::new(), dir.path());
        assert!(matches!(prompt.prompt_point(&request), Err(MaskError::Prompt(_))));
    }

    #[test]
    fn test_snap_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("masks");
        let output = dir.path().join("snapped");
        fs::create_dir_all(&input).unwrap();

        let mut image = RgbImage::new(3, 3);
        image.put_pixel(0, 0, Rgb([250, 5, 130]));
        image.save(input.join("a.png")).unwrap();
        fs::write(input.join("readme.txt"), "not a mask").unwrap();

        let (files, pixels) = snap_directory(&input, Some(&output)).unwrap();
        assert_eq!(files, 1);
        assert_eq!(pixels, 1);

        let snapped = load_mask(output.join("a.png")).unwrap();
        assert_eq!(snapped.get_pixel(0, 0), &Rgb([255, 0, 128]));
    }
}
