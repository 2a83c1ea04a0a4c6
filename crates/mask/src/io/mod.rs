use std::path::Path;

use image::RgbImage;
use crate::error::Result;

/// File extensions accepted for mask and microscope images
pub const MASK_EXTENSIONS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg", "bmp"];

/// Load a mask image from file, converted to RGB
pub fn load_mask<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let img = image::open(path)?;
    Ok(img.to_rgb8())
}

/// Save a mask image, format picked from the extension
pub fn save_mask<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    image.save(path)?;
    Ok(())
}

/// Case-insensitive check against [`MASK_EXTENSIONS`]
pub fn has_mask_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MASK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
