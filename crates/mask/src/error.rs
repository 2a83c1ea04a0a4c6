use thiserror::Error;

use crate::category::MaskColor;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Unknown mask color {color}: not registered in the category table")]
    UnknownColor { color: MaskColor },

    #[error("Contour simplified to an empty polygon")]
    EmptyPolygon,

    #[error("Invalid category table: {0}")]
    InvalidCategoryTable(String),

    #[error("Invalid color '{0}': expected \"(r, g, b)\" or \"r,g,b\"")]
    InvalidColor(String),

    #[error("Keypoint prompt failed: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MaskError>;
