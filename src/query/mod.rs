mod builder;
mod cursor;
mod ops;

pub use builder::BoundsQuery;
pub use cursor::{BoundsStatement, GeometryCursor};
pub use ops::Attributes;

pub(crate) use ops::scan_extent;
