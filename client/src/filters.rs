use std::cell::RefCell;
use std::rc::Rc;

use conflict_map_shared::{FilterError, FilterField, FilterSet};

/// Shared handle to the active filter selections.
///
/// Cloning yields another handle to the same set. Reload side effects are
/// the viewer's job; the store only validates and holds values.
#[derive(Debug, Clone, Default)]
pub struct FilterStateStore {
    inner: Rc<RefCell<FilterSet>>,
}

impl FilterStateStore {
    pub fn new(initial: FilterSet) -> Self {
        Self {
            inner: Rc::new(RefCell::new(initial)),
        }
    }

    /// Snapshot of the current selections.
    pub fn get(&self) -> FilterSet {
        self.inner.borrow().clone()
    }

    /// Parse `raw` into `field`. Blank input clears the field; invalid input
    /// leaves every field unchanged.
    pub fn set(&self, field: FilterField, raw: &str) -> Result<(), FilterError> {
        self.inner.borrow_mut().set_raw(field, raw)
    }

    pub fn clear(&self) {
        *self.inner.borrow_mut() = FilterSet::default();
    }

    /// Canonical `key=value&...` form, `none` when nothing is selected.
    pub fn canonical(&self) -> String {
        self.inner.borrow().to_string()
    }
}
