use std::collections::HashSet;

use dataset::{format_g, normalize_bbox, validate_dataset, AnnotationEmitter};
use mask::{CategoryTable, Instance, MaskAnnotations, Polygon};
use proptest::prelude::*;

fn square(offset: f64) -> Polygon {
    Polygon::new(vec![
        [offset, offset],
        [offset + 2.0, offset],
        [offset + 2.0, offset + 2.0],
        [offset, offset + 2.0],
        [offset, offset],
    ])
}

fn image(instances: usize) -> MaskAnnotations {
    MaskAnnotations {
        instances: (0..instances)
            .map(|i| Instance {
                category_id: (i % 8) as u32 + 1,
                polygons: vec![square(i as f64)],
                keypoints: vec![],
            })
            .collect(),
        image_width: 32,
        image_height: 32,
    }
}

proptest! {
    #[test]
    fn emitted_ids_are_unique_and_consistent(counts in proptest::collection::vec(0usize..6, 0..12)) {
        let table = CategoryTable::tips().with_ignore_background(true);
        let mut emitter = AnnotationEmitter::new(&table, false);
        for (i, count) in counts.iter().enumerate() {
            emitter.push_image(&format!("{i}.tif"), &image(*count));
        }

        let (detection, panoptic) = emitter.finish();
        prop_assert_eq!(detection.images.len(), counts.len());
        prop_assert_eq!(detection.annotations.len(), counts.iter().sum::<usize>());

        let ids: HashSet<u64> = detection.annotations.iter().map(|a| a.id).collect();
        prop_assert_eq!(ids.len(), detection.annotations.len());
        prop_assert!(validate_dataset(&detection).is_ok());
        prop_assert_eq!(panoptic.annotations.len(), counts.len());
    }

    #[test]
    fn normalized_box_inside_unit_square(
        x in 0u32..100, y in 0u32..100, w in 1u32..100, h in 1u32..100,
    ) {
        let (width, height) = (f64::from(x + w), f64::from(y + h));
        let [cx, cy, nw, nh] = normalize_bbox(
            [f64::from(x), f64::from(y), f64::from(w), f64::from(h)],
            width,
            height,
        );
        prop_assert!(cx > 0.0 && cx < 1.0);
        prop_assert!(cy > 0.0 && cy < 1.0);
        prop_assert!(nw > 0.0 && nw <= 1.0);
        prop_assert!(nh > 0.0 && nh <= 1.0);
    }

    #[test]
    fn format_g_keeps_six_significant_digits(value in -1.0e7f64..1.0e7) {
        let parsed: f64 = format_g(value).parse().unwrap();
        prop_assert!((parsed - value).abs() <= value.abs() * 1e-5 + 1e-12);
    }
}
