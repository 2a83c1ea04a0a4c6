use mask::{CategoryTable, Instance, MaskAnnotations};
use tracing::debug;

use crate::ids::IdSequence;
use crate::model::{
    CocoAnnotation, CocoCategory, CocoDataset, CocoImage, PanopticAnnotation, PanopticCategory,
    PanopticDataset, SegmentInfo, KEYPOINT_NAME,
};

/// Builds the COCO detection and panoptic documents of one split side by side.
///
/// Image and annotation ids come from a single [`IdSequence`], so the two
/// documents always agree on them.
#[derive(Debug, Clone)]
pub struct AnnotationEmitter {
    include_keypoints: bool,
    ids: IdSequence,
    detection: CocoDataset,
    panoptic: PanopticDataset,
}

impl AnnotationEmitter {
    pub fn new(table: &CategoryTable, include_keypoints: bool) -> Self {
        let keypoints = || include_keypoints.then(|| vec![KEYPOINT_NAME.to_string()]);
        let skeleton = || include_keypoints.then(Vec::new);

        let detection = CocoDataset {
            categories: table
                .categories()
                .iter()
                .map(|category| CocoCategory {
                    supercategory: category.name.clone(),
                    id: category.id,
                    name: category.name.clone(),
                    keypoints: keypoints(),
                    skeleton: skeleton(),
                })
                .collect(),
            ..Default::default()
        };

        let panoptic = PanopticDataset {
            categories: table
                .categories()
                .iter()
                .map(|category| PanopticCategory {
                    supercategory: category.name.clone(),
                    id: category.id,
                    name: category.name.clone(),
                    isthing: u8::from(category.id > 0),
                    color: table
                        .representative_color(category.id)
                        .map(|color| color.0)
                        .unwrap_or([0, 0, 0]),
                    keypoints: keypoints(),
                    skeleton: skeleton(),
                })
                .collect(),
            ..Default::default()
        };

        Self {
            include_keypoints,
            ids: IdSequence::new(),
            detection,
            panoptic,
        }
    }

    /// Record one successfully converted image and return its id.
    pub fn push_image(&mut self, file_name: &str, annotations: &MaskAnnotations) -> u64 {
        let image_id = self.ids.next_image_id();
        let image = CocoImage {
            file_name: file_name.to_string(),
            height: annotations.image_height,
            width: annotations.image_width,
            id: image_id,
        };
        self.detection.images.push(image.clone());
        self.panoptic.images.push(image);

        let mut segments_info = Vec::with_capacity(annotations.instances.len());
        for instance in &annotations.instances {
            let Some(annotation) = self.annotation(image_id, instance) else {
                debug!(file_name, category_id = instance.category_id, "skipping instance without geometry");
                continue;
            };

            segments_info.push(SegmentInfo {
                id: annotation.id,
                category_id: annotation.category_id,
                iscrowd: annotation.iscrowd,
                bbox: annotation.bbox,
                area: annotation.area,
            });
            self.detection.annotations.push(annotation);
        }

        self.panoptic.annotations.push(PanopticAnnotation {
            image_id,
            file_name: file_name.to_string(),
            segments_info,
        });

        image_id
    }

    fn annotation(&mut self, image_id: u64, instance: &Instance) -> Option<CocoAnnotation> {
        let bbox = instance.bounding_box()?;
        let keypoints = self.include_keypoints.then(|| {
            instance
                .keypoints
                .iter()
                .flat_map(|keypoint| keypoint.to_triple())
                .collect::<Vec<u32>>()
        });

        Some(CocoAnnotation {
            segmentation: instance.segmentation(),
            area: instance.area(),
            iscrowd: 0,
            image_id,
            bbox: bbox.to_array(),
            category_id: instance.category_id,
            id: self.ids.next_annotation_id(),
            num_keypoints: self.include_keypoints.then_some(instance.keypoints.len()),
            keypoints,
        })
    }

    pub fn image_count(&self) -> usize {
        self.detection.images.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.detection.annotations.len()
    }

    pub fn detection(&self) -> &CocoDataset {
        &self.detection
    }

    pub fn panoptic(&self) -> &PanopticDataset {
        &self.panoptic
    }

    pub fn finish(self) -> (CocoDataset, PanopticDataset) {
        (self.detection, self.panoptic)
    }
}
