mod bbox;
mod blob;
mod kind;
mod wkb;

use geo::{Centroid, Geometry, Point};

pub use bbox::{Bounds, MERCATOR_MAX_LAT};
pub use blob::{decode_blob, encode_blob, BlobFormat, DecodedBlob};
pub(crate) use kind::dimension_suffix;
pub use kind::{Dimension, GeometryType};
pub use wkb::{geometry_from_wkb, geometry_to_wkb};

/// Compute the centroid of a decoded geometry, or None when it is empty.
#[inline]
pub fn centroid(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    geometry.centroid()
}
