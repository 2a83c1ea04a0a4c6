use geo_types::{Coord, LineString};
use crate::{
    error::{MaskError, Result},
    traits::ShapeSimplifier,
    types::Polygon,
};

fn to_line_string(ring: &[[f64; 2]]) -> LineString<f64> {
    let coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&[x, y]| Coord { x, y })
        .collect();
    LineString::new(coords)
}

fn to_polygon(line: LineString<f64>) -> Result<Polygon> {
    let polygon = Polygon::new(line.coords().map(|c| [c.x, c.y]).collect());
    if polygon.is_degenerate() {
        return Err(MaskError::EmptyPolygon);
    }
    Ok(polygon)
}

/// Douglas-Peucker simplifier using geo crate's implementation.
///
/// The ring is simplified as a plain closed line: topology is not preserved,
/// so small rings collapse and are reported as empty.
#[derive(Debug, Clone, Default)]
pub struct DouglasPeuckerSimplifier;

impl ShapeSimplifier for DouglasPeuckerSimplifier {
    fn simplify(&self, ring: &[[f64; 2]], tolerance: f64) -> Result<Polygon> {
        use geo::Simplify;
        to_polygon(to_line_string(ring).simplify(&tolerance))
    }
}

/// Visvalingam-Whyatt simplifier using geo crate's implementation
#[derive(Debug, Clone, Default)]
pub struct VisvalingamWhyattSimplifier;

impl ShapeSimplifier for VisvalingamWhyattSimplifier {
    fn simplify(&self, ring: &[[f64; 2]], tolerance: f64) -> Result<Polygon> {
        use geo::SimplifyVw;
        to_polygon(to_line_string(ring).simplify_vw(&tolerance))
    }
}

/// Keeps every traced vertex; degenerate rings are still rejected
#[derive(Debug, Clone, Default)]
pub struct NoSimplifier;

impl ShapeSimplifier for NoSimplifier {
    fn simplify(&self, ring: &[[f64; 2]], _tolerance: f64) -> Result<Polygon> {
        to_polygon(to_line_string(ring))
    }
}
