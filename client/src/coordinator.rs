use std::cell::{Ref, RefCell};
use std::rc::Rc;

use tokio::sync::Notify;
use tracing::debug;

use crate::fetch::DatasetSource;
use crate::filters::FilterStateStore;
use crate::loader::{DataFetcher, LoadOutcome};
use crate::render::RenderAdapter;

/// A request to show `year`, optionally reframing the view to the new content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub year: i32,
    pub do_fit: bool,
}

/// Anything that accepts load requests. Lets the playback scheduler feed the
/// coordinator without knowing its source or renderer types.
pub trait LoadSink {
    fn request_load(&self, request: LoadRequest);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    pub requests: u64,
    pub runs_started: u64,
    pub runs_completed: u64,
    /// Pending requests overwritten by a newer one before they could run.
    pub superseded: u64,
    pub discarded: u64,
}

#[derive(Default)]
struct CoordinatorState {
    busy: bool,
    pending: Option<LoadRequest>,
    /// Bumped to invalidate whatever run is in flight.
    generation: u64,
    stats: CoordinatorStats,
    last_outcome: Option<LoadOutcome>,
}

struct CoordinatorInner<S, R> {
    state: RefCell<CoordinatorState>,
    fetcher: DataFetcher<S, R>,
    filters: FilterStateStore,
    idle: Notify,
}

/// Serializes load runs.
///
/// At most one run is in flight. Requests that arrive while busy overwrite a
/// single pending slot, so a burst of any length collapses into one follow-up
/// run for the newest request. Filters are read when a run starts, not when it
/// is requested.
///
/// Must be used from inside a `tokio::task::LocalSet`.
pub struct LoadCoordinator<S, R> {
    inner: Rc<CoordinatorInner<S, R>>,
}

impl<S, R> Clone for LoadCoordinator<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, R> LoadCoordinator<S, R>
where
    S: DatasetSource + 'static,
    R: RenderAdapter + 'static,
{
    pub fn new(fetcher: DataFetcher<S, R>, filters: FilterStateStore) -> Self {
        Self {
            inner: Rc::new(CoordinatorInner {
                state: RefCell::new(CoordinatorState::default()),
                fetcher,
                filters,
                idle: Notify::new(),
            }),
        }
    }

    pub fn request_load(&self, request: LoadRequest) {
        let mut state = self.inner.state.borrow_mut();
        state.stats.requests += 1;

        if state.busy {
            match state.pending.replace(request) {
                Some(previous) => {
                    state.stats.superseded += 1;
                    debug!(
                        year = request.year,
                        superseded = previous.year,
                        "pending load superseded"
                    );
                }
                None => debug!(year = request.year, "load queued behind in-flight run"),
            }
            return;
        }

        state.busy = true;
        drop(state);

        let inner = Rc::clone(&self.inner);
        tokio::task::spawn_local(inner.drain(request));
    }

    /// Invalidate the in-flight run (its remaining results are dropped) and
    /// forget any pending request. The run itself still completes.
    pub fn discard_dispatched(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.generation = state.generation.wrapping_add(1);
        if state.busy {
            state.stats.discarded += 1;
        }
        if let Some(dropped) = state.pending.take() {
            debug!(year = dropped.year, "pending load dropped");
        }
    }

    /// Resolves once no run is in flight and nothing is pending.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if !self.inner.state.borrow().busy {
                return;
            }
            notified.await;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.inner.state.borrow().busy
    }

    pub fn pending(&self) -> Option<LoadRequest> {
        self.inner.state.borrow().pending
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.inner.state.borrow().stats
    }

    pub fn last_outcome(&self) -> Option<LoadOutcome> {
        self.inner.state.borrow().last_outcome.clone()
    }

    pub fn renderer(&self) -> Ref<'_, R> {
        self.inner.fetcher.renderer()
    }
}

impl<S, R> CoordinatorInner<S, R>
where
    S: DatasetSource,
    R: RenderAdapter,
{
    async fn drain(self: Rc<Self>, first: LoadRequest) {
        let mut next = Some(first);

        while let Some(request) = next {
            let generation = {
                let mut state = self.state.borrow_mut();
                state.stats.runs_started += 1;
                state.generation
            };
            let filters = self.filters.get();
            debug!(
                year = request.year,
                do_fit = request.do_fit,
                filters = %filters,
                "load run started"
            );

            let outcome = self
                .fetcher
                .run(request, &filters, || {
                    self.state.borrow().generation == generation
                })
                .await;

            let mut state = self.state.borrow_mut();
            state.stats.runs_completed += 1;
            state.last_outcome = Some(outcome);
            next = state.pending.take();
            if next.is_none() {
                state.busy = false;
            }
        }

        debug!("load queue drained");
        self.idle.notify_waiters();
    }
}

impl<S, R> LoadSink for LoadCoordinator<S, R>
where
    S: DatasetSource + 'static,
    R: RenderAdapter + 'static,
{
    fn request_load(&self, request: LoadRequest) {
        LoadCoordinator::request_load(self, request);
    }
}
