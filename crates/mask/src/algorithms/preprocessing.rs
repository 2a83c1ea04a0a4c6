use image::RgbImage;
use crate::{error::Result, traits::MaskPreprocessor};

/// Snaps every channel to 0, 128 or 255.
///
/// Hand-painted masks saved through lossy or anti-aliasing tools pick up
/// in-between shades that would otherwise show up as unknown colors.
#[derive(Debug, Clone)]
pub struct ColorSnapPreprocessor {
    /// Channels below this become 0
    pub low: u8,
    /// Channels in `low..=high` become 128, above become 255
    pub high: u8,
}

impl Default for ColorSnapPreprocessor {
    fn default() -> Self {
        Self { low: 120, high: 135 }
    }
}

impl ColorSnapPreprocessor {
    pub fn snap_channel(&self, value: u8) -> u8 {
        if value < self.low {
            0
        } else if value <= self.high {
            128
        } else {
            255
        }
    }

    /// Snap in place, returns how many pixels changed
    pub fn snap_in_place(&self, image: &mut RgbImage) -> usize {
        let mut changed = 0;
        for pixel in image.pixels_mut() {
            let snapped = pixel.0.map(|c| self.snap_channel(c));
            if snapped != pixel.0 {
                pixel.0 = snapped;
                changed += 1;
            }
        }
        changed
    }
}

impl MaskPreprocessor for ColorSnapPreprocessor {
    fn preprocess(&self, image: &RgbImage) -> Result<RgbImage> {
        let mut snapped = image.clone();
        self.snap_in_place(&mut snapped);
        Ok(snapped)
    }
}
