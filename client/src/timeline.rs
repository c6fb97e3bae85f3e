use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;

struct CursorInner {
    min: i32,
    max: i32,
    current: Cell<i32>,
    displayed: Cell<i32>,
}

/// The authoritative current year plus the year shown on the slider label.
///
/// The two differ only while a drag is in progress: dragging moves the label,
/// committing (or a playback tick) moves the current year.
#[derive(Clone)]
pub struct YearCursor {
    inner: Rc<CursorInner>,
}

impl YearCursor {
    pub fn new(min: i32, max: i32, start: i32) -> Self {
        let max = max.max(min);
        let start = start.clamp(min, max);
        Self {
            inner: Rc::new(CursorInner {
                min,
                max,
                current: Cell::new(start),
                displayed: Cell::new(start),
            }),
        }
    }

    pub fn min(&self) -> i32 {
        self.inner.min
    }

    pub fn max(&self) -> i32 {
        self.inner.max
    }

    pub fn current(&self) -> i32 {
        self.inner.current.get()
    }

    pub fn displayed(&self) -> i32 {
        self.inner.displayed.get()
    }

    pub fn clamp(&self, year: i32) -> i32 {
        year.clamp(self.inner.min, self.inner.max)
    }

    /// Move the visible label only.
    pub fn show(&self, year: i32) -> i32 {
        let year = self.clamp(year);
        self.inner.displayed.set(year);
        year
    }

    pub fn commit(&self, year: i32) -> i32 {
        let year = self.clamp(year);
        self.inner.current.set(year);
        self.inner.displayed.set(year);
        year
    }

    /// Advance by one year, or `None` at the upper bound.
    pub fn step_forward(&self) -> Option<i32> {
        let current = self.current();
        if current >= self.inner.max {
            return None;
        }
        Some(self.commit(current + 1))
    }

    /// Position of the displayed year along the slider track, 0.0 to 1.0.
    pub fn bubble_fraction(&self) -> f64 {
        let span = self.inner.max - self.inner.min;
        if span <= 0 {
            return 0.0;
        }
        f64::from(self.displayed() - self.inner.min) / f64::from(span)
    }
}

/// Turns raw slider input into committed years.
///
/// Drag events only move the label. With a debounce configured, the last drag
/// value is committed once input pauses for that long; an explicit commit
/// cancels any debounce still waiting.
pub struct TimelineController {
    cursor: YearCursor,
    debounce: Option<Duration>,
    pending_commit: Rc<RefCell<Option<JoinHandle<()>>>>,
}

impl TimelineController {
    pub fn new(cursor: YearCursor, debounce: Option<Duration>) -> Self {
        Self {
            cursor,
            debounce,
            pending_commit: Rc::new(RefCell::new(None)),
        }
    }

    pub fn cursor(&self) -> &YearCursor {
        &self.cursor
    }

    /// Handle one raw input event. Returns the (clamped) year now shown.
    /// `on_commit` runs after the debounce expires unless superseded.
    pub fn on_drag(&self, raw: i32, on_commit: impl FnOnce(i32) + 'static) -> i32 {
        let shown = self.cursor.show(raw);
        self.cancel_pending_commit();

        let Some(delay) = self.debounce else {
            return shown;
        };

        let slot = Rc::clone(&self.pending_commit);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            slot.borrow_mut().take();
            on_commit(shown);
        });
        *self.pending_commit.borrow_mut() = Some(handle);
        shown
    }

    /// Settle on `value` immediately. Returns the committed (clamped) year.
    pub fn commit(&self, value: i32) -> i32 {
        self.cancel_pending_commit();
        self.cursor.commit(value)
    }

    pub fn cancel_pending_commit(&self) -> bool {
        let pending = self.pending_commit.borrow_mut().take();
        match pending {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn has_pending_commit(&self) -> bool {
        self.pending_commit.borrow().is_some()
    }
}

impl Drop for TimelineController {
    fn drop(&mut self) {
        self.cancel_pending_commit();
    }
}
