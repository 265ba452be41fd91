mod contents;
mod format;
mod raster;
mod style;
mod vector;

pub use format::MapType;
pub use raster::RasterTable;
pub use style::Style;
pub use vector::VectorTable;
