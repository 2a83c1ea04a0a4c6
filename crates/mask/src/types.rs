use serde::{Deserialize, Serialize};
use geo_types::{Coord, LineString, MultiPolygon, Polygon as GeoPolygon};

/// Annotations extracted from one mask image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskAnnotations {
    /// One entry per annotation instance, in sub-mask order
    pub instances: Vec<Instance>,
    /// Original image dimensions
    pub image_width: u32,
    pub image_height: u32,
}

impl MaskAnnotations {
    pub fn annotation_count(&self) -> usize {
        self.instances.len()
    }
}

/// One simplified contour as a closed ring (first point repeated last)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<[f64; 2]>,
}

impl Polygon {
    pub fn new(exterior: Vec<[f64; 2]>) -> Self {
        Self { exterior }
    }

    /// Convert to geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> GeoPolygon<f64> {
        let coords: Vec<Coord<f64>> = self.exterior
            .iter()
            .map(|&[x, y]| Coord { x, y })
            .collect();

        GeoPolygon::new(LineString::new(coords), vec![])
    }

    /// Planar area of the ring
    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }

    /// Signed area; exterior and hole rings traced by the same extractor have opposite signs
    pub fn signed_area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().signed_area()
    }

    /// Axis-aligned bounding box of the vertices
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        use geo::BoundingRect;
        self.to_geo_polygon().bounding_rect().map(BoundingBox::from)
    }

    /// Flattened `x1, y1, x2, y2, ...` list as used by COCO segmentations
    pub fn flatten(&self) -> Vec<f64> {
        self.exterior.iter().flat_map(|&[x, y]| [x, y]).collect()
    }

    pub fn is_degenerate(&self) -> bool {
        self.exterior.len() < 4 || self.area() == 0.0
    }
}

/// COCO-style box: top-left corner plus extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::from_bounds(
            self.x.min(other.x),
            self.y.min(other.y),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }
}

impl From<geo_types::Rect<f64>> for BoundingBox {
    fn from(rect: geo_types::Rect<f64>) -> Self {
        let min = rect.min();
        let max = rect.max();
        BoundingBox::from_bounds(min.x, min.y, max.x, max.y)
    }
}

/// COCO keypoint visibility flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Secondary click: labeled but occluded
    Occluded = 1,
    /// Primary click: labeled and visible
    Visible = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: u32,
    pub y: u32,
    pub visibility: Visibility,
}

impl Keypoint {
    /// `[x, y, v]` triple in COCO order
    pub fn to_triple(&self) -> [u32; 3] {
        [self.x, self.y, self.visibility as u32]
    }
}

/// A single annotation instance: one polygon, or several rings merged into a multi-polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub category_id: u32,
    pub polygons: Vec<Polygon>,
    pub keypoints: Vec<Keypoint>,
}

impl Instance {
    pub fn to_geo_multi_polygon(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(self.polygons.iter().map(Polygon::to_geo_polygon).collect())
    }

    /// Sum of the member polygon areas
    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_multi_polygon().unsigned_area()
    }

    /// Bounding box of all member polygons
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        use geo::BoundingRect;
        self.to_geo_multi_polygon().bounding_rect().map(BoundingBox::from)
    }

    /// One flattened ring per member polygon
    pub fn segmentation(&self) -> Vec<Vec<f64>> {
        self.polygons.iter().map(Polygon::flatten).collect()
    }
}
