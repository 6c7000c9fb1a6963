// Polygon ring orientation and exterior/interior grouping.
use geo_types::{Coord, LineString, Polygon};
use tracing::warn;

use crate::error::DecodeWarning;

/// A ring as decoded: raw tile positions alongside their projections.
///
/// Orientation is decided on `raw`, since the projection flips the y axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ring {
    pub raw: Vec<(i64, i64)>,
    pub coords: Vec<Coord<f64>>,
}

impl Ring {
    pub fn push(&mut self, raw: (i64, i64), coord: Coord<f64>) {
        self.raw.push(raw);
        self.coords.push(coord);
    }

    // Appends a copy of the ring's own first point.
    pub fn close(&mut self) {
        if let (Some(&raw), Some(&coord)) = (self.raw.first(), self.coords.first()) {
            self.push(raw, coord);
        }
    }

    pub fn kind(&self) -> RingKind {
        RingKind::from_area(ring_area(&self.raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingKind {
    Exterior,
    Interior,
}

impl RingKind {
    pub fn from_area(area: f64) -> Self {
        if area >= 0.0 {
            RingKind::Exterior
        } else {
            RingKind::Interior
        }
    }
}

/// Shoelace signed area of an implicitly closed vertex list.
pub fn signed_area(points: &[(i64, i64)]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let mut twice_area: i128 = 0;
    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        twice_area += i128::from(xi) * i128::from(yj) - i128::from(xj) * i128::from(yi);
    }
    twice_area as f64 * 0.5
}

// Area of a ring that may carry its closing duplicate.
pub fn ring_area(points: &[(i64, i64)]) -> f64 {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 1 && first == last => {
            signed_area(&points[..points.len() - 1])
        }
        _ => signed_area(points),
    }
}

/// Groups rings into polygons in encounter order.
///
/// An exterior ring opens a polygon and each following interior ring joins
/// the latest one. Interior rings seen before any exterior are dropped.
pub fn group_rings(
    feature: usize,
    rings: Vec<Ring>,
    warnings: &mut Vec<DecodeWarning>,
) -> Vec<Polygon<f64>> {
    let mut groups: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for (index, ring) in rings.into_iter().enumerate() {
        let kind = ring.kind();
        let line = LineString::new(ring.coords);
        if kind == RingKind::Exterior {
            groups.push((line, Vec::new()));
            continue;
        }
        match groups.last_mut() {
            Some((_, interiors)) => interiors.push(line),
            None => {
                warn!(feature, ring = index, "Interior ring found before any exterior ring, ignoring it");
                warnings.push(DecodeWarning::OrphanInteriorRing {
                    feature,
                    ring: index,
                });
            }
        }
    }

    groups
        .into_iter()
        .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
        .collect()
}
