use std::collections::HashMap;

use image::{GrayImage, Luma, RgbImage};

use crate::category::{CategoryTable, MaskColor};

/// Padding added on every side of a sub-mask so contours never touch the border.
pub const PAD: u32 = 1;

/// Foreground value of a sub-mask pixel.
pub const FOREGROUND: u8 = 255;

/// Binary mask isolating one color of a mask image.
#[derive(Debug, Clone, PartialEq)]
pub struct SubMask {
    pub color: MaskColor,
    /// `(width + 2) x (height + 2)`, foreground pixels set to [`FOREGROUND`]
    pub mask: GrayImage,
}

impl SubMask {
    fn empty(color: MaskColor, width: u32, height: u32) -> Self {
        Self {
            color,
            mask: GrayImage::new(width + 2 * PAD, height + 2 * PAD),
        }
    }

    /// Width and height of the source image
    pub fn image_dimensions(&self) -> (u32, u32) {
        (self.mask.width() - 2 * PAD, self.mask.height() - 2 * PAD)
    }

    /// The mask in source image coordinates (padding removed)
    pub fn unpadded(&self) -> GrayImage {
        let (width, height) = self.image_dimensions();
        GrayImage::from_fn(width, height, |x, y| *self.mask.get_pixel(x + PAD, y + PAD))
    }
}

/// Split a mask image into one padded sub-mask per distinct color.
///
/// Colors are bucketed before any category lookup, so unknown colors get a
/// sub-mask too. The background is skipped when the table ignores it.
/// Buckets come out in order of first appearance, scanning column by column.
pub fn extract_sub_masks(image: &RgbImage, table: &CategoryTable) -> Vec<SubMask> {
    let (width, height) = image.dimensions();
    let skip = table.ignores_background().then(|| table.background());

    let mut index: HashMap<MaskColor, usize> = HashMap::new();
    let mut sub_masks: Vec<SubMask> = Vec::new();

    for x in 0..width {
        for y in 0..height {
            let color = MaskColor::from(*image.get_pixel(x, y));
            if Some(color) == skip {
                continue;
            }

            let slot = *index.entry(color).or_insert_with(|| {
                sub_masks.push(SubMask::empty(color, width, height));
                sub_masks.len() - 1
            });

            sub_masks[slot]
                .mask
                .put_pixel(x + PAD, y + PAD, Luma([FOREGROUND]));
        }
    }

    sub_masks
}
