//! # Color Mask Annotation Library
//!
//! Turns hand-painted, color-coded mask images into polygon annotations.
//! Each distinct color is isolated into a padded binary sub-mask, its
//! boundaries are traced and simplified into polygons, and the polygons are
//! grouped into annotation instances per category.
//!
//! ## Core Features
//!
//! - **Category Table**: explicit color → category mapping, shared read-only
//! - **Sub-mask Extraction**: one padded binary mask per color present
//! - **Contour Tracing**: half-intensity marching squares or pixel border following
//! - **Simplification**: Douglas-Peucker / Visvalingam-Whyatt via `geo`
//! - **Keypoints**: optional manual click per sub-mask through an injected prompt
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mask::{CategoryTable, Pipeline, load_mask};
//!
//! let table = CategoryTable::tips().with_ignore_background(true);
//! let pipeline = Pipeline::builder(table).build();
//!
//! let image = load_mask("mask.tif")?;
//! let result = pipeline.process(&image)?;
//! for instance in &result.instances {
//!     println!("category {} bbox {:?}", instance.category_id, instance.bounding_box());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod category;
pub mod types;
pub mod submask;
pub mod traits;
pub mod algorithms;
pub mod pipeline;
pub mod io;

// Re-exports for convenience
pub use error::{MaskError, Result};
pub use category::{Category, CategoryTable, ColorEntry, MaskColor};
pub use types::{BoundingBox, Instance, Keypoint, MaskAnnotations, Polygon, Visibility};
pub use submask::{extract_sub_masks, SubMask};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{Pipeline, builder::PipelineBuilder, DEFAULT_TOLERANCE};
pub use io::*;

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    fn paint(image: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
        for x in x0..x1 {
            for y in y0..y1 {
                image.put_pixel(x, y, color);
            }
        }
    }

    fn tips_pipeline() -> Pipeline {
        Pipeline::builder(CategoryTable::tips().with_ignore_background(true)).build()
    }

    fn single_instance_table() -> CategoryTable {
        CategoryTable::new(
            vec![
                Category { id: 0, name: "background".into() },
                Category { id: 1, name: "tip".into() },
            ],
            vec![
                ColorEntry { color: MaskColor::BLACK, category: 0 },
                ColorEntry { color: MaskColor::new(255, 0, 0), category: 1 },
            ],
            MaskColor::BLACK,
            [],
        )
        .unwrap()
        .with_ignore_background(true)
    }

    #[test]
    fn test_background_only_yields_no_annotations() {
        let image = RgbImage::new(16, 16);
        let result = tips_pipeline().process(&image).expect("Should process successfully");
        assert_eq!(result.annotation_count(), 0);
        assert_eq!(result.image_width, 16);
        assert_eq!(result.image_height, 16);
    }

    #[test]
    fn test_red_square_scenario() {
        let mut image = RgbImage::new(4, 4);
        paint(&mut image, 0, 0, 2, 2, RED);

        let result = tips_pipeline().process(&image).expect("Should process successfully");
        assert_eq!(result.instances.len(), 1);

        let instance = &result.instances[0];
        assert_eq!(instance.category_id, 1);
        let bbox = instance.bounding_box().unwrap();
        assert!((bbox.area() - 4.0).abs() <= 1.0);
        assert_eq!(bbox.to_array(), [-0.5, -0.5, 2.0, 2.0]);

        let segmentation = instance.segmentation();
        assert_eq!(segmentation.len(), 1);
        assert_eq!(segmentation[0].len(), 10);
    }

    #[test]
    fn test_unknown_color_fails_image() {
        let mut image = RgbImage::new(6, 6);
        paint(&mut image, 0, 0, 3, 3, RED);
        paint(&mut image, 3, 3, 6, 6, Rgb([1, 2, 3]));

        let err = tips_pipeline().process(&image).unwrap_err();
        match err {
            MaskError::UnknownColor { color } => assert_eq!(color, MaskColor::new(1, 2, 3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_multipolygon_category_merges_regions() {
        let mut image = RgbImage::new(12, 12);
        paint(&mut image, 0, 0, 3, 3, RED);
        paint(&mut image, 7, 6, 11, 10, RED);

        let result = tips_pipeline().process(&image).unwrap();
        assert_eq!(result.instances.len(), 1);

        let instance = &result.instances[0];
        assert_eq!(instance.polygons.len(), 2);

        let union = instance
            .polygons
            .iter()
            .filter_map(Polygon::bounding_box)
            .reduce(|a, b| a.union(&b))
            .unwrap();
        assert_eq!(instance.bounding_box().unwrap(), union);

        let summed: f64 = instance.polygons.iter().map(Polygon::area).sum();
        assert!((instance.area() - summed).abs() < 1e-9);
    }

    #[test]
    fn test_single_instance_category_splits_regions() {
        let mut image = RgbImage::new(12, 12);
        paint(&mut image, 0, 0, 3, 3, RED);
        paint(&mut image, 7, 6, 11, 10, RED);

        let pipeline = Pipeline::builder(single_instance_table()).build();
        let result = pipeline.process(&image).unwrap();
        assert_eq!(result.instances.len(), 2);
        assert!(result.instances.iter().all(|i| i.polygons.len() == 1));
    }

    #[test]
    fn test_keypoint_prompt_called_per_sub_mask() {
        let mut image = RgbImage::new(10, 10);
        paint(&mut image, 0, 0, 3, 3, RED);
        paint(&mut image, 5, 5, 9, 9, Rgb([0, 255, 0]));

        let mut asked = Vec::new();
        let mut prompt = |request: &PointRequest<'_>| -> Result<Keypoint> {
            asked.push(request.category_id);
            assert_eq!(request.sub_mask.image_dimensions(), (10, 10));
            Ok(Keypoint { x: 1, y: 2, visibility: Visibility::Occluded })
        };

        let result = tips_pipeline()
            .process_with_prompt(&image, Some(&mut prompt))
            .unwrap();

        assert_eq!(asked, vec![1, 7]);
        assert_eq!(result.instances.len(), 2);
        for instance in &result.instances {
            assert_eq!(instance.keypoints.len(), 1);
            assert_eq!(instance.keypoints[0].to_triple(), [1, 2, 1]);
        }
    }

    #[test]
    fn test_prompt_not_called_for_failed_image() {
        let mut image = RgbImage::new(6, 6);
        paint(&mut image, 0, 0, 3, 3, RED);
        paint(&mut image, 3, 3, 6, 6, Rgb([9, 9, 9]));

        let mut calls = 0;
        let mut prompt = |_: &PointRequest<'_>| -> Result<Keypoint> {
            calls += 1;
            Ok(Keypoint { x: 0, y: 0, visibility: Visibility::Visible })
        };

        assert!(tips_pipeline().process_with_prompt(&image, Some(&mut prompt)).is_err());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_processing_is_deterministic() {
        let mut image = RgbImage::new(20, 20);
        paint(&mut image, 2, 2, 9, 7, RED);
        paint(&mut image, 12, 3, 18, 17, Rgb([128, 0, 255]));

        let pipeline = tips_pipeline();
        let first = pipeline.process(&image).unwrap();
        let second = pipeline.process(&image).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_color_snapping_recovers_shaded_pixels() {
        let mut image = RgbImage::new(6, 6);
        paint(&mut image, 0, 0, 4, 4, Rgb([250, 3, 2]));

        assert!(tips_pipeline().process(&image).is_err());

        let pipeline = Pipeline::builder(CategoryTable::tips().with_ignore_background(true))
            .with_color_snapping()
            .build();
        let result = pipeline.process(&image).unwrap();
        assert_eq!(result.instances.len(), 1);
        assert_eq!(result.instances[0].category_id, 1);
    }

    #[test]
    fn test_border_following_pipeline() {
        let mut image = RgbImage::new(10, 10);
        paint(&mut image, 1, 1, 8, 8, RED);

        let pipeline = Pipeline::builder(CategoryTable::tips().with_ignore_background(true))
            .with_contour_method(ContourMethod::BorderFollowing)
            .build();
        let result = pipeline.process(&image).unwrap();
        assert_eq!(result.instances.len(), 1);
        let bbox = result.instances[0].bounding_box().unwrap();
        assert_eq!(bbox.to_array(), [1.0, 1.0, 6.0, 6.0]);
    }
}
