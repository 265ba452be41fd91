use std::sync::Arc;

use anyhow::Result;

/// A lazily built list with explicit invalidation.
///
/// Readers get a shared `Arc` of the current list; the version increases on
/// every rebuild and every in-place modification.
#[derive(Debug)]
pub(crate) struct Snapshot<T> {
    value: Option<Arc<Vec<T>>>,
    version: u64,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self { Self { value: None, version: 0 } }
}

impl<T: Clone> Snapshot<T> {
    /// Return the cached list, building it with `load` when empty or when `force` is set.
    pub(crate) fn get_or_try_load(&mut self, force: bool, load: impl FnOnce() -> Result<Vec<T>>) -> Result<Arc<Vec<T>>> {
        if force { self.invalidate() }
        if let Some(value) = &self.value {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(load()?);
        self.value = Some(Arc::clone(&value));
        self.version += 1;
        Ok(value)
    }

    #[inline] pub(crate) fn invalidate(&mut self) { self.value = None }

    #[inline] pub(crate) fn is_loaded(&self) -> bool { self.value.is_some() }

    #[inline] pub(crate) fn version(&self) -> u64 { self.version }

    /// Edit the cached list in place (copy-on-write against outstanding readers).
    /// Returns false when nothing is cached.
    pub(crate) fn modify(&mut self, edit: impl FnOnce(&mut Vec<T>)) -> bool {
        let Some(value) = &mut self.value else { return false };
        edit(Arc::make_mut(value));
        self.version += 1;
        true
    }
}
