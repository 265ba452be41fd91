#![doc = "Fieldmap public API"]
mod basemap;
mod catalog;
mod db;
mod geom;
mod query;
mod srs;

#[doc(inline)]
pub use db::{Dialect, OpenMode, OpenOptions, SpatialDatabase, VectorQueryMode};

#[doc(inline)]
pub use catalog::{MapType, RasterTable, Style, VectorTable};

#[doc(inline)]
pub use query::{Attributes, BoundsQuery, BoundsStatement, GeometryCursor};

#[doc(inline)]
pub use geom::{
    centroid, decode_blob, encode_blob, geometry_from_wkb, geometry_to_wkb, BlobFormat, Bounds, DecodedBlob,
    Dimension, GeometryType, MERCATOR_MAX_LAT,
};

#[doc(inline)]
pub use srs::{is_unset_srid, normalize_extent, BuiltinSrs, DatabaseSrs, ProjLookup, Reprojection, Wgs84Extent, WGS84};

#[doc(inline)]
pub use basemap::{
    keys as pref_keys, BaseMapEntry, BaseMapRegistry, JsonFilePreferences, MemoryPreferences, PreferenceStore,
    RegistryConfig, RegistryState, TileSurface,
};
