mod lookup;
mod normalize;
mod proj;

pub use lookup::{is_unset_srid, BuiltinSrs, DatabaseSrs, ProjLookup, WGS84};
pub use normalize::{normalize_extent, Wgs84Extent};
pub use proj::Reprojection;
