mod database;
mod dialect;
mod snapshot;
mod sql;

pub use database::{OpenMode, OpenOptions, SpatialDatabase, VectorQueryMode};
pub use dialect::Dialect;

pub(crate) use dialect::{resolve as resolve_dialect, ColumnMap};
pub(crate) use sql::{find_table, quote_ident, table_columns, table_exists, value_real, value_text, SpatialIndex};
