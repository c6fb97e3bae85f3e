use std::rc::Rc;

use tokio::sync::watch;
use tracing::{info, warn};

use conflict_map_shared::{FilterError, FilterField, FilterSet};

use crate::config::{StopPolicy, ViewerConfig};
use crate::coordinator::{LoadCoordinator, LoadRequest};
use crate::fetch::DatasetSource;
use crate::filters::FilterStateStore;
use crate::loader::DataFetcher;
use crate::playback::{PlaybackScheduler, PlaybackState};
use crate::render::RenderAdapter;
use crate::timeline::{TimelineController, YearCursor};

struct ViewerInner<S, R> {
    cursor: YearCursor,
    timeline: TimelineController,
    filters: FilterStateStore,
    coordinator: LoadCoordinator<S, R>,
    playback: PlaybackScheduler,
    stop_policy: StopPolicy,
}

/// One viewer instance: the year cursor, filters, load coordinator and
/// playback wired together. Every user-facing action goes through here.
///
/// Must be driven from inside a `tokio::task::LocalSet`.
pub struct Viewer<S, R> {
    inner: Rc<ViewerInner<S, R>>,
}

impl<S, R> Clone for Viewer<S, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, R> Viewer<S, R>
where
    S: DatasetSource + 'static,
    R: RenderAdapter + 'static,
{
    pub fn new(config: &ViewerConfig, source: S, renderer: R) -> Self {
        let cursor = YearCursor::new(config.min_year, config.max_year, config.start_year);
        let filters = FilterStateStore::new(config.initial_filters.clone());
        let coordinator =
            LoadCoordinator::new(DataFetcher::new(source, renderer), filters.clone());

        Self {
            inner: Rc::new(ViewerInner {
                timeline: TimelineController::new(cursor.clone(), config.commit_debounce),
                cursor,
                filters,
                coordinator,
                playback: PlaybackScheduler::new(config.play_interval),
                stop_policy: config.stop_policy,
            }),
        }
    }

    /// First load at the current year, framing the view on the result.
    pub fn initial_load(&self) {
        self.request_load(self.year(), true);
    }

    pub fn request_load(&self, year: i32, do_fit: bool) {
        self.inner
            .coordinator
            .request_load(LoadRequest { year, do_fit });
    }

    /// Raw slider movement. Stops playback and moves the label; the year is
    /// committed after the debounce delay if no further input arrives.
    pub fn drag(&self, raw: i32) -> i32 {
        self.stop_playback();
        let weak = Rc::downgrade(&self.inner);
        self.inner.timeline.on_drag(raw, move |year| {
            if let Some(inner) = weak.upgrade() {
                Viewer { inner }.commit(year);
            }
        })
    }

    /// The slider value settled. Stops playback and loads the year without
    /// reframing.
    pub fn commit(&self, value: i32) -> i32 {
        self.stop_playback();
        let year = self.inner.timeline.commit(value);
        self.request_load(year, false);
        year
    }

    /// Edit one filter. A rejected value changes nothing and loads nothing.
    pub fn set_filter(&self, field: FilterField, raw: &str) -> Result<(), FilterError> {
        if let Err(e) = self.inner.filters.set(field, raw) {
            warn!(field = field.key(), value = raw, error = %e, "filter value rejected");
            return Err(e);
        }
        self.reload_for_filters();
        Ok(())
    }

    pub fn clear_filters(&self) {
        self.inner.filters.clear();
        self.reload_for_filters();
    }

    fn reload_for_filters(&self) {
        self.stop_playback();
        info!(filters = %self.inner.filters.canonical(), year = self.year(), "filters changed");
        self.request_load(self.year(), false);
    }

    pub fn play(&self) -> bool {
        self.inner
            .playback
            .start(self.inner.cursor.clone(), self.inner.coordinator.clone())
    }

    /// End autoplay. Under `StopPolicy::DiscardInFlight` the load for the
    /// last tick is dropped, so `year()` can sit one step ahead of the map
    /// until the next commit, filter change or explicit load.
    pub fn stop_playback(&self) -> bool {
        let stopped = self.inner.playback.stop();
        if stopped && self.inner.stop_policy == StopPolicy::DiscardInFlight {
            self.inner.coordinator.discard_dispatched();
        }
        stopped
    }

    pub fn toggle_playback(&self) -> PlaybackState {
        if self.inner.playback.is_playing() {
            self.stop_playback();
        } else {
            self.play();
        }
        self.playback_state()
    }

    pub fn year(&self) -> i32 {
        self.inner.cursor.current()
    }

    pub fn displayed_year(&self) -> i32 {
        self.inner.cursor.displayed()
    }

    pub fn bubble_fraction(&self) -> f64 {
        self.inner.cursor.bubble_fraction()
    }

    pub fn filters(&self) -> FilterSet {
        self.inner.filters.get()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.inner.playback.state()
    }

    pub fn subscribe_playback(&self) -> watch::Receiver<PlaybackState> {
        self.inner.playback.subscribe()
    }

    pub fn coordinator(&self) -> &LoadCoordinator<S, R> {
        &self.inner.coordinator
    }

    pub async fn wait_idle(&self) {
        self.inner.coordinator.wait_idle().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::render::LayerKind;
    use crate::testing::{RecordingRenderer, ScriptedSource};
    use conflict_map_shared::Dataset;
    use tokio::task::LocalSet;

    fn config(start_year: i32, max_year: i32) -> ViewerConfig {
        ViewerConfig {
            start_year,
            max_year,
            ..ViewerConfig::default()
        }
    }

    fn viewer(
        config: &ViewerConfig,
        latency_ms: u64,
    ) -> (
        ScriptedSource,
        RecordingRenderer,
        Viewer<ScriptedSource, RecordingRenderer>,
    ) {
        let source = ScriptedSource::default();
        source.set_latency(Duration::from_millis(latency_ms));
        let renderer = RecordingRenderer::default();
        let viewer = Viewer::new(config, source.clone(), renderer.clone());
        (source, renderer, viewer)
    }

    #[tokio::test(start_paused = true)]
    async fn initial_load_fits_the_view() {
        LocalSet::new()
            .run_until(async {
                let (_source, renderer, viewer) = viewer(&config(1995, 2023), 50);
                viewer.initial_load();
                viewer.wait_idle().await;

                let outcome = viewer.coordinator().last_outcome().expect("outcome");
                assert_eq!(outcome.request, LoadRequest { year: 1995, do_fit: true });
                assert_eq!(renderer.current(LayerKind::Points), Some(1995));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn playback_requests_each_year_until_max() {
        LocalSet::new()
            .run_until(async {
                let (source, renderer, viewer) = viewer(&config(2000, 2003), 100);
                assert!(viewer.play());

                let mut state = viewer.subscribe_playback();
                state
                    .wait_for(|s| *s == PlaybackState::Idle)
                    .await
                    .expect("scheduler alive");
                viewer.wait_idle().await;

                assert_eq!(source.years_called(Dataset::Regions), vec![2001, 2002, 2003]);
                assert_eq!(renderer.current(LayerKind::Regions), Some(2003));
                assert_eq!(viewer.year(), 2003);
                assert!(!viewer.play());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn filter_change_while_playing_stops_and_reloads_current_year() {
        LocalSet::new()
            .run_until(async {
                let (source, renderer, viewer) = viewer(&config(2008, 2023), 100);
                viewer.play();

                // Ticks at 1.5 s (2009) and 3.0 s (2010); the 2010 run is in
                // flight when the filter changes.
                tokio::time::sleep(Duration::from_millis(3100)).await;
                assert_eq!(viewer.year(), 2010);
                viewer
                    .set_filter(FilterField::Region, "Asia")
                    .expect("valid region");
                assert_eq!(viewer.playback_state(), PlaybackState::Idle);

                tokio::time::sleep(Duration::from_secs(10)).await;
                viewer.wait_idle().await;

                let calls = source.calls();
                assert!(calls.iter().all(|call| call.year <= 2010));
                let filtered: Vec<_> = calls
                    .iter()
                    .filter(|call| call.params.iter().any(|(key, _)| *key == "region"))
                    .map(|call| (call.dataset, call.year))
                    .collect();
                assert_eq!(
                    filtered,
                    vec![(Dataset::Regions, 2010), (Dataset::Events, 2010)]
                );
                assert_eq!(
                    viewer.coordinator().last_outcome().map(|o| o.request),
                    Some(LoadRequest {
                        year: 2010,
                        do_fit: false
                    })
                );
                assert_eq!(renderer.current(LayerKind::Points), Some(2010));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_filter_triggers_nothing() {
        LocalSet::new()
            .run_until(async {
                let (source, _renderer, viewer) = viewer(&config(1990, 2023), 100);
                viewer.play();

                assert!(viewer.set_filter(FilterField::TypeOfViolence, "9").is_err());
                assert_eq!(viewer.playback_state(), PlaybackState::Playing);
                assert!(source.calls().is_empty());
                viewer.stop_playback();
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn manual_commit_interrupts_playback() {
        LocalSet::new()
            .run_until(async {
                let (source, renderer, viewer) = viewer(&config(1960, 2023), 100);
                viewer.play();
                tokio::time::sleep(Duration::from_millis(1600)).await;

                assert_eq!(viewer.commit(1975), 1975);
                assert_eq!(viewer.playback_state(), PlaybackState::Idle);

                tokio::time::sleep(Duration::from_secs(10)).await;
                assert_eq!(source.years_called(Dataset::Regions), vec![1961, 1975]);
                assert_eq!(renderer.current(LayerKind::Regions), Some(1975));
                assert_eq!(viewer.year(), 1975);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_drag_loads_only_the_settled_year() {
        LocalSet::new()
            .run_until(async {
                let (source, renderer, viewer) = viewer(&config(1950, 2023), 100);

                for raw in 1951..=1990 {
                    assert_eq!(viewer.drag(raw), raw);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
                assert_eq!(viewer.displayed_year(), 1990);
                assert_eq!(viewer.year(), 1950);
                assert!(source.calls().is_empty());

                tokio::time::sleep(Duration::from_millis(200)).await;
                viewer.wait_idle().await;

                assert_eq!(
                    source.datasets_called(),
                    vec![(Dataset::Regions, 1990), (Dataset::Events, 1990)]
                );
                assert_eq!(viewer.year(), 1990);
                assert_eq!(renderer.current(LayerKind::Points), Some(1990));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn drag_stops_playback() {
        LocalSet::new()
            .run_until(async {
                let (_source, _renderer, viewer) = viewer(&config(1960, 2023), 100);
                viewer.play();
                viewer.drag(1970);
                assert_eq!(viewer.playback_state(), PlaybackState::Idle);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_tick_still_renders_after_stop_by_default() {
        LocalSet::new()
            .run_until(async {
                let (_source, renderer, viewer) = viewer(&config(2000, 2023), 1000);
                viewer.play();
                tokio::time::sleep(Duration::from_millis(1600)).await;

                assert!(viewer.stop_playback());
                viewer.wait_idle().await;

                assert_eq!(renderer.current(LayerKind::Regions), Some(2001));
                assert_eq!(renderer.current(LayerKind::Points), Some(2001));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn discard_policy_drops_in_flight_tick_on_stop() {
        LocalSet::new()
            .run_until(async {
                let config = ViewerConfig {
                    stop_policy: StopPolicy::DiscardInFlight,
                    ..config(2000, 2023)
                };
                let (source, renderer, viewer) = viewer(&config, 1000);
                viewer.play();
                tokio::time::sleep(Duration::from_millis(1600)).await;

                assert!(viewer.stop_playback());
                viewer.wait_idle().await;

                assert!(renderer.adds().is_empty());
                assert_eq!(source.datasets_called(), vec![(Dataset::Regions, 2001)]);
                assert_eq!(viewer.year(), 2001);
                assert_eq!(renderer.current(LayerKind::Regions), None);

                viewer.request_load(viewer.year(), false);
                viewer.wait_idle().await;
                assert_eq!(renderer.current(LayerKind::Points), Some(2001));

                viewer.commit(2005);
                viewer.wait_idle().await;
                assert_eq!(renderer.current(LayerKind::Points), Some(2005));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn clear_filters_reloads_without_filters() {
        LocalSet::new()
            .run_until(async {
                let config = ViewerConfig {
                    initial_filters: FilterSet {
                        min_best: Some(100),
                        ..FilterSet::default()
                    },
                    ..config(1999, 2023)
                };
                let (source, _renderer, viewer) = viewer(&config, 50);

                viewer.clear_filters();
                viewer.wait_idle().await;

                assert!(viewer.filters().is_empty());
                let calls = source.calls();
                assert_eq!(calls.len(), 2);
                assert!(calls.iter().all(|call| call.params.len() == 1));
            })
            .await;
    }
}
