pub mod config;
pub mod coordinator;
pub mod fetch;
pub mod filters;
pub mod loader;
pub mod playback;
pub mod render;
pub mod timeline;
pub mod viewer;

#[cfg(test)]
mod testing;

pub use config::{StopPolicy, ViewerConfig};
pub use coordinator::{CoordinatorStats, LoadCoordinator, LoadRequest, LoadSink};
pub use fetch::{DatasetSource, FetchError, HttpSource};
pub use filters::FilterStateStore;
pub use loader::{DataFetcher, FetchStatus, LoadOutcome};
pub use playback::{PlaybackScheduler, PlaybackState};
pub use render::{Layer, LayerContent, LayerKind, RenderAdapter, TracingRenderer};
pub use timeline::{TimelineController, YearCursor};
pub use viewer::Viewer;
