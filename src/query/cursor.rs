use std::iter::FusedIterator;

use anyhow::{anyhow, bail, Result};
use geo::Geometry;
use rusqlite::{params_from_iter, types::ValueRef, Rows, Statement};
use tracing::warn;

use crate::db::value_text;
use crate::query::builder::{BoundsFilter, PlannedQuery};

/// One accepted row: its geometry and the selected attribute values.
pub(crate) struct Match {
    pub geometry: Geometry<f64>,
    pub attributes: Vec<Option<String>>,
}

/// Advance to the next row that passes the filter.
///
/// Malformed blobs are logged and skipped; only engine errors are returned.
pub(crate) fn next_match(
    rows: &mut Rows<'_>,
    filter: &BoundsFilter,
    table: &str,
    attributes: usize,
) -> rusqlite::Result<Option<Match>> {
    while let Some(row) = rows.next()? {
        let ValueRef::Blob(blob) = row.get_ref(0)? else { continue };
        match filter.accept(blob) {
            Ok(Some(geometry)) => {
                let attributes = (1..=attributes)
                    .map(|i| row.get_ref(i).map(value_text))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                return Ok(Some(Match { geometry, attributes }));
            }
            Ok(None) => {}
            Err(e) => warn!(table, error = %e, "skipping malformed geometry"),
        }
    }
    Ok(None)
}

/// A prepared bounding-box query.
///
/// It can be run once: the cursor it hands out borrows it, and the
/// underlying statement is reset when the cursor is closed or dropped.
pub struct BoundsStatement<'conn> {
    stmt: Statement<'conn>,
    params: Option<[f64; 4]>,
    filter: BoundsFilter,
    table: String,
    started: bool,
}

impl<'conn> BoundsStatement<'conn> {
    pub(crate) fn new(stmt: Statement<'conn>, planned: PlannedQuery, table: &str) -> Self {
        let PlannedQuery { params, filter, .. } = planned;
        Self { stmt, params, filter, table: table.to_string(), started: false }
    }

    #[inline] pub fn table(&self) -> &str { &self.table }

    /// Execute the query and get a forward-only cursor over matching geometries.
    pub fn cursor(&mut self) -> Result<GeometryCursor<'_>> {
        let (rows, filter, table) = self.execute()?;
        Ok(GeometryCursor { rows: Some(rows), filter, table })
    }

    /// Execute the query, handing out the raw rows and the filter to apply to them.
    pub(crate) fn execute(&mut self) -> Result<(Rows<'_>, &BoundsFilter, &str)> {
        if self.started {
            bail!("[query::cursor] query on {} was already run", self.table);
        }
        self.started = true;
        let rows = match self.params {
            Some(p) => self.stmt.query(params_from_iter(p)),
            None => self.stmt.query([]),
        }
        .map_err(|e| anyhow!(e).context(format!("[query::cursor] Failed to run query on {}", self.table)))?;
        Ok((rows, &self.filter, &self.table))
    }
}

/// Lazily decoded geometries of a bounding-box query, one row per pull.
///
/// Rows whose blob cannot be decoded are skipped. An execution error is
/// yielded once, after which the cursor is closed.
pub struct GeometryCursor<'s> {
    rows: Option<Rows<'s>>,
    filter: &'s BoundsFilter,
    table: &'s str,
}

impl GeometryCursor<'_> {
    /// Release the underlying rows. Further pulls yield nothing.
    #[inline] pub fn close(&mut self) { self.rows = None }

    #[inline] pub fn is_closed(&self) -> bool { self.rows.is_none() }
}

impl Iterator for GeometryCursor<'_> {
    type Item = Result<Geometry<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        let rows = self.rows.as_mut()?;
        match next_match(rows, self.filter, self.table, 0) {
            Ok(Some(found)) => Some(Ok(found.geometry)),
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(anyhow!(e).context(format!("[query::cursor] query on {} failed", self.table))))
            }
        }
    }
}

impl FusedIterator for GeometryCursor<'_> {}
