use std::cell::{Cell, Ref, RefCell};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use conflict_map_shared::{
    Dataset, EventProperties, FeatureCollection, FilterSet, MAX_FIT_ZOOM, RegionProperties,
};

use crate::coordinator::LoadRequest;
use crate::fetch::{DatasetSource, FetchError};
use crate::render::{LayerContent, LayerKind, RenderAdapter};

/// Result of one dataset fetch within a load run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Rendered { features: usize, fitted: bool },
    Failed(FetchError),
    /// The run was invalidated before this dataset was applied.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub request: LoadRequest,
    pub filters: FilterSet,
    /// Whether switching below the event epoch emptied the point layer.
    pub points_cleared: bool,
    pub datasets: Vec<(Dataset, FetchStatus)>,
}

impl LoadOutcome {
    pub fn status(&self, dataset: Dataset) -> Option<&FetchStatus> {
        self.datasets
            .iter()
            .find(|(d, _)| *d == dataset)
            .map(|(_, status)| status)
    }

    pub fn failures(&self) -> usize {
        self.datasets
            .iter()
            .filter(|(_, status)| matches!(status, FetchStatus::Failed(_)))
            .count()
    }
}

/// Runs one load cycle: picks the datasets that exist for the year, fetches
/// them in render order and hands successful results to the renderer.
///
/// Each dataset owns its layer. A failed fetch leaves that layer as it was and
/// does not stop the sibling fetch.
pub struct DataFetcher<S, R> {
    source: S,
    renderer: RefCell<R>,
    points_present: Cell<bool>,
}

impl<S: DatasetSource, R: RenderAdapter> DataFetcher<S, R> {
    pub fn new(source: S, renderer: R) -> Self {
        Self {
            source,
            renderer: RefCell::new(renderer),
            points_present: Cell::new(false),
        }
    }

    pub fn renderer(&self) -> Ref<'_, R> {
        self.renderer.borrow()
    }

    /// `is_current` is checked before every fetch and again before rendering;
    /// once it returns false nothing more is fetched or drawn for this run.
    pub async fn run(
        &self,
        request: LoadRequest,
        filters: &FilterSet,
        is_current: impl Fn() -> bool,
    ) -> LoadOutcome {
        let LoadRequest { year, do_fit } = request;
        let datasets = Dataset::for_year(year);

        let mut points_cleared = false;
        if !datasets.contains(&Dataset::Events) && self.points_present.get() && is_current() {
            self.renderer.borrow_mut().clear(LayerKind::Points);
            self.points_present.set(false);
            points_cleared = true;
            debug!(year, "point layer cleared below event epoch");
        }

        let mut statuses = Vec::with_capacity(datasets.len());
        for (idx, dataset) in datasets.iter().copied().enumerate() {
            // Only the last (topmost) dataset reframes the view.
            let fit = do_fit && idx + 1 == datasets.len();
            let status = match dataset {
                Dataset::Regions => {
                    self.load::<RegionProperties>(
                        dataset,
                        year,
                        filters,
                        fit,
                        &is_current,
                        LayerContent::regions,
                    )
                    .await
                }
                Dataset::Events => {
                    self.load::<EventProperties>(
                        dataset,
                        year,
                        filters,
                        fit,
                        &is_current,
                        LayerContent::points,
                    )
                    .await
                }
            };
            statuses.push((dataset, status));
        }

        LoadOutcome {
            request,
            filters: filters.clone(),
            points_cleared,
            datasets: statuses,
        }
    }

    async fn load<P>(
        &self,
        dataset: Dataset,
        year: i32,
        filters: &FilterSet,
        fit: bool,
        is_current: &impl Fn() -> bool,
        into_layer: fn(i32, FeatureCollection<P>) -> LayerContent,
    ) -> FetchStatus
    where
        P: DeserializeOwned + Default,
    {
        if !is_current() {
            return FetchStatus::Discarded;
        }

        let params = filters.query_for(dataset, year);
        let collection = match self.source.fetch::<P>(dataset, &params).await {
            Ok(collection) => collection,
            Err(e) => {
                warn!(%dataset, year, error = %e, "dataset fetch failed, keeping previous layer");
                return FetchStatus::Failed(e);
            }
        };

        if !is_current() {
            debug!(%dataset, year, "discarding result of invalidated run");
            return FetchStatus::Discarded;
        }

        let layer = into_layer(year, collection);
        let kind = layer.kind();
        let features = layer.len();
        let bounds = layer.bounds();

        let mut renderer = self.renderer.borrow_mut();
        renderer.clear(kind);
        renderer.add(layer);
        if kind == LayerKind::Points {
            self.points_present.set(true);
        }

        let fitted = match bounds {
            Some(bounds) if fit => {
                renderer.fit_to_bounds(bounds, MAX_FIT_ZOOM);
                true
            }
            _ => false,
        };

        FetchStatus::Rendered { features, fitted }
    }
}
