mod read;
mod write;

pub(crate) use read::{read_body, read_wkb, ByteReader};
pub(crate) use write::{geometry_type_of, write_body, write_wkb};
pub use read::geometry_from_wkb;
pub use write::geometry_to_wkb;

/// WKB byte order: little endian
pub(crate) const WKB_LE: u8 = 1;
/// Spatialite marker preceding every entity nested in a collection.
pub(crate) const ENTITY_MARKER: u8 = 0x69;

/// EWKB flag bits carried in the geometry type word.
pub(crate) const EWKB_Z: u32 = 0x8000_0000;
pub(crate) const EWKB_M: u32 = 0x4000_0000;
pub(crate) const EWKB_SRID: u32 = 0x2000_0000;

/// How nested members of a collection are introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// Each member carries its own byte order and type word.
    Wkb,
    /// Each member is `0x69` + class type, in the container's byte order.
    Spatialite,
}
