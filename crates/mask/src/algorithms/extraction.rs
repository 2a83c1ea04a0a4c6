use std::collections::HashMap;

use image::GrayImage;
use crate::{error::Result, submask::PAD, traits::ContourExtractor};

/// Pixels above this value are foreground (half of the 0..=255 range)
const LEVEL: u8 = 127;

/// Iso-line tracer at half intensity (marching squares).
///
/// Contour points sit halfway between a foreground and a background pixel
/// center. In saddle cells the two foreground corners stay disconnected.
/// Every ring keeps the foreground on the same side, so outer boundaries
/// come out with positive signed area and holes with negative.
#[derive(Debug, Clone, Default)]
pub struct MarchingSquaresContourExtractor;

/// Edge midpoint in doubled pixel coordinates, `(2x, 2y)`
type HalfPoint = (i64, i64);

impl MarchingSquaresContourExtractor {
    fn segments(image: &GrayImage) -> Vec<(HalfPoint, HalfPoint)> {
        let (width, height) = image.dimensions();
        let on = |x: u32, y: u32| image.get_pixel(x, y).0[0] > LEVEL;
        let mut segments = Vec::new();

        for r in 0..height.saturating_sub(1) {
            for c in 0..width.saturating_sub(1) {
                let case = (on(c, r) as u8)
                    | (on(c + 1, r) as u8) << 1
                    | (on(c + 1, r + 1) as u8) << 2
                    | (on(c, r + 1) as u8) << 3;

                let (x, y) = (2 * c as i64, 2 * r as i64);
                let top = (x + 1, y);
                let right = (x + 2, y + 1);
                let bottom = (x + 1, y + 2);
                let left = (x, y + 1);

                match case {
                    1 => segments.push((top, left)),
                    2 => segments.push((right, top)),
                    3 => segments.push((right, left)),
                    4 => segments.push((bottom, right)),
                    5 => {
                        segments.push((top, left));
                        segments.push((bottom, right));
                    }
                    6 => segments.push((bottom, top)),
                    7 => segments.push((bottom, left)),
                    8 => segments.push((left, bottom)),
                    9 => segments.push((top, bottom)),
                    10 => {
                        segments.push((right, top));
                        segments.push((left, bottom));
                    }
                    11 => segments.push((right, bottom)),
                    12 => segments.push((left, right)),
                    13 => segments.push((top, right)),
                    14 => segments.push((left, top)),
                    _ => {}
                }
            }
        }

        segments
    }

    /// Chain segments into rings, starting from the first unused segment in scan order
    fn assemble(segments: &[(HalfPoint, HalfPoint)]) -> Vec<Vec<HalfPoint>> {
        let starts: HashMap<HalfPoint, usize> = segments
            .iter()
            .enumerate()
            .map(|(i, (start, _))| (*start, i))
            .collect();

        let mut used = vec![false; segments.len()];
        let mut rings = Vec::new();

        for first in 0..segments.len() {
            if used[first] {
                continue;
            }

            let origin = segments[first].0;
            let mut ring = vec![origin];
            let mut current = first;

            loop {
                used[current] = true;
                let end = segments[current].1;
                ring.push(end);
                if end == origin {
                    break;
                }
                match starts.get(&end) {
                    Some(&next) if !used[next] => current = next,
                    // open line: only possible when the input touches the border
                    _ => break,
                }
            }

            rings.push(ring);
        }

        rings
    }
}

fn unpad_half((x, y): HalfPoint) -> [f64; 2] {
    [x as f64 / 2.0 - PAD as f64, y as f64 / 2.0 - PAD as f64]
}

impl ContourExtractor for MarchingSquaresContourExtractor {
    fn extract_contours(&self, sub_mask: &GrayImage) -> Result<Vec<Vec<[f64; 2]>>> {
        let segments = Self::segments(sub_mask);
        let contours = Self::assemble(&segments)
            .into_iter()
            .map(|ring| ring.into_iter().map(unpad_half).collect())
            .collect();

        Ok(contours)
    }
}

/// Imageproc-based contour extractor (pixel border following)
#[derive(Debug, Clone, Default)]
pub struct ImageprocContourExtractor;

impl ContourExtractor for ImageprocContourExtractor {
    fn extract_contours(&self, binary_image: &GrayImage) -> Result<Vec<Vec<[f64; 2]>>> {
        let contours = imageproc::contours::find_contours::<i32>(binary_image);
        let pad = PAD as f64;

        let result = contours
            .into_iter()
            .filter(|contour| !contour.points.is_empty())
            .map(|contour| {
                let mut ring: Vec<[f64; 2]> = contour.points
                    .iter()
                    .map(|p| [p.x as f64 - pad, p.y as f64 - pad])
                    .collect();
                ring.push(ring[0]);
                ring
            })
            .collect();

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submask::FOREGROUND;
    use crate::types::Polygon;
    use image::Luma;

    /// Padded sub-mask with the given unpadded pixels set
    fn padded(width: u32, height: u32, pixels: &[(u32, u32)]) -> GrayImage {
        let mut image = GrayImage::new(width + 2 * PAD, height + 2 * PAD);
        for &(x, y) in pixels {
            image.put_pixel(x + PAD, y + PAD, Luma([FOREGROUND]));
        }
        image
    }

    fn rect(x0: u32, y0: u32, x1: u32, y1: u32) -> Vec<(u32, u32)> {
        (x0..x1).flat_map(|x| (y0..y1).map(move |y| (x, y))).collect()
    }

    #[test]
    fn test_square_contour_is_closed_octagon() {
        let image = padded(4, 4, &rect(0, 0, 2, 2));
        let contours = MarchingSquaresContourExtractor.extract_contours(&image).unwrap();

        assert_eq!(contours.len(), 1);
        let ring = &contours[0];
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring.len(), 9);
        assert_eq!(ring[0], [-0.5, 0.0]);

        let polygon = Polygon::new(ring.clone());
        let bbox = polygon.bounding_box().unwrap();
        assert_eq!(bbox.to_array(), [-0.5, -0.5, 2.0, 2.0]);
        assert_eq!(polygon.area(), 3.5);
    }

    #[test]
    fn test_empty_mask_has_no_contours() {
        let image = padded(5, 5, &[]);
        let contours = MarchingSquaresContourExtractor.extract_contours(&image).unwrap();
        assert!(contours.is_empty());
    }

    #[test]
    fn test_separate_regions() {
        let mut pixels = rect(0, 0, 2, 2);
        pixels.extend(rect(5, 5, 8, 7));
        let image = padded(8, 8, &pixels);
        let contours = MarchingSquaresContourExtractor.extract_contours(&image).unwrap();
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn test_diagonal_pixels_stay_separate() {
        let image = padded(2, 2, &[(0, 0), (1, 1)]);
        let contours = MarchingSquaresContourExtractor.extract_contours(&image).unwrap();
        assert_eq!(contours.len(), 2);
        for ring in &contours {
            assert_eq!(ring.len(), 5);
        }
    }

    #[test]
    fn test_hole_has_opposite_orientation() {
        let mut pixels = rect(0, 0, 5, 5);
        pixels.retain(|&p| p != (2, 2));
        let image = padded(5, 5, &pixels);

        let contours = MarchingSquaresContourExtractor.extract_contours(&image).unwrap();
        assert_eq!(contours.len(), 2);

        let areas: Vec<f64> = contours
            .iter()
            .map(|ring| Polygon::new(ring.clone()).signed_area())
            .collect();
        assert!(areas.iter().any(|a| *a > 0.0));
        assert!(areas.iter().any(|a| *a < 0.0));
    }

    #[test]
    fn test_region_touching_border() {
        let image = padded(3, 3, &rect(0, 0, 3, 3));
        let contours = MarchingSquaresContourExtractor.extract_contours(&image).unwrap();
        assert_eq!(contours.len(), 1);
        let bbox = Polygon::new(contours[0].clone()).bounding_box().unwrap();
        assert_eq!(bbox.to_array(), [-0.5, -0.5, 3.0, 3.0]);
    }

    #[test]
    fn test_imageproc_extractor_unpads() {
        let image = padded(4, 4, &rect(1, 1, 3, 3));
        let contours = ImageprocContourExtractor.extract_contours(&image).unwrap();
        assert_eq!(contours.len(), 1);
        let ring = &contours[0];
        assert_eq!(ring.first(), ring.last());
        assert!(ring.iter().all(|&[x, y]| (1.0..=2.0).contains(&x) && (1.0..=2.0).contains(&y)));
    }
}
