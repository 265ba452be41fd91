use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

/// Latitude limit of the web-mercator world, used for the default world box.
pub const MERCATOR_MAX_LAT: f64 = 85.05113;

/// An axis-aligned bounding box in west/south/east/north order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    /// Build a box from two opposite corners in any order.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west: west.min(east),
            south: south.min(north),
            east: west.max(east),
            north: south.max(north),
        }
    }

    /// Build a box from north/south/east/west edges (the query surface order).
    pub fn from_nsew(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self::new(west, south, east, north)
    }

    /// The world box used when a layer publishes no extent.
    pub fn world() -> Self {
        Self::new(-180.0, -MERCATOR_MAX_LAT, 180.0, MERCATOR_MAX_LAT)
    }

    /// A zero-area box around a single point.
    pub fn point(x: f64, y: f64) -> Self { Self::new(x, y, x, y) }

    /// Get the arithmetic midpoint of the box.
    #[inline]
    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: self.west + (self.east - self.west) / 2.0,
            y: self.south + (self.north - self.south) / 2.0,
        }
    }

    #[inline] pub fn south_west(&self) -> Coord<f64> { Coord { x: self.west, y: self.south } }

    #[inline] pub fn north_east(&self) -> Coord<f64> { Coord { x: self.east, y: self.north } }

    /// Check that every edge is a finite number.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.west.is_finite() && self.south.is_finite() && self.east.is_finite() && self.north.is_finite()
    }

    /// Check that the box lies within the longitude/latitude domain.
    #[inline]
    pub fn is_geographic(&self) -> bool {
        self.is_finite()
            && self.west >= -180.0 && self.east <= 180.0
            && self.south >= -90.0 && self.north <= 90.0
    }

    /// Check whether two boxes overlap (touching edges count).
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.west <= other.east && other.west <= self.east
            && self.south <= other.north && other.south <= self.north
    }

    /// Grow the box to cover another one.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    /// Smallest box covering every coordinate, or None for an empty input.
    pub fn enclosing(coords: impl IntoIterator<Item = Coord<f64>>) -> Option<Bounds> {
        coords.into_iter()
            .map(|c| Bounds::point(c.x, c.y))
            .reduce(|a, b| a.union(&b))
    }

    /// Get the box as a `geo::Rect`.
    #[inline]
    pub fn to_rect(&self) -> Rect<f64> { Rect::new(self.south_west(), self.north_east()) }

    /// Points sampled along the box outline (corners, edge midpoints and the center),
    /// used to carry the box through a non-linear reprojection.
    /// Points along the outline, `segments` per edge, plus the center.
    pub(crate) fn outline_points(&self, segments: usize) -> Vec<Coord<f64>> {
        let n = segments.max(1);
        let (w, h) = (self.east - self.west, self.north - self.south);
        let mut points = Vec::with_capacity(4 * n + 1);
        for i in 0..n {
            let t = i as f64 / n as f64;
            points.push(Coord { x: self.west + w * t, y: self.south });
            points.push(Coord { x: self.east, y: self.south + h * t });
            points.push(Coord { x: self.east - w * t, y: self.north });
            points.push(Coord { x: self.west, y: self.north - h * t });
        }
        points.push(self.center());
        points
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}
