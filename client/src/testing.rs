//! In-memory collaborators for driving the viewer under virtual time.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::time::Instant;

use conflict_map_shared::{Bounds, Dataset, FeatureCollection, QueryParams};

use crate::coordinator::{LoadRequest, LoadSink};
use crate::fetch::{DatasetSource, FetchError};
use crate::render::{LayerContent, LayerKind, RenderAdapter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub dataset: Dataset,
    pub year: i32,
    pub params: QueryParams,
}

#[derive(Default)]
struct Script {
    latency: Cell<Duration>,
    latency_by_year: RefCell<HashMap<i32, Duration>>,
    failures: RefCell<HashMap<(Dataset, i32), FetchError>>,
    empty: RefCell<HashSet<(Dataset, i32)>>,
    calls: RefCell<Vec<FetchCall>>,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
}

/// Serves one point feature per request, located at `(year / 100, 0)` and
/// tagged with the requested year. Latency, failures and empty results are
/// scripted per dataset and year.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    script: Rc<Script>,
}

impl ScriptedSource {
    pub fn set_latency(&self, latency: Duration) {
        self.script.latency.set(latency);
    }

    pub fn set_latency_for(&self, year: i32, latency: Duration) {
        self.script.latency_by_year.borrow_mut().insert(year, latency);
    }

    pub fn fail(&self, dataset: Dataset, year: i32, error: FetchError) {
        self.script
            .failures
            .borrow_mut()
            .insert((dataset, year), error);
    }

    pub fn empty_for(&self, dataset: Dataset, year: i32) {
        self.script.empty.borrow_mut().insert((dataset, year));
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.script.calls.borrow().clone()
    }

    pub fn datasets_called(&self) -> Vec<(Dataset, i32)> {
        self.script
            .calls
            .borrow()
            .iter()
            .map(|call| (call.dataset, call.year))
            .collect()
    }

    pub fn years_called(&self, dataset: Dataset) -> Vec<i32> {
        self.script
            .calls
            .borrow()
            .iter()
            .filter(|call| call.dataset == dataset)
            .map(|call| call.year)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.script.max_in_flight.get()
    }
}

impl DatasetSource for ScriptedSource {
    async fn fetch<P>(
        &self,
        dataset: Dataset,
        params: &[(&'static str, String)],
    ) -> Result<FeatureCollection<P>, FetchError>
    where
        P: DeserializeOwned + Default,
    {
        let year = params
            .iter()
            .find(|(key, _)| *key == "year")
            .and_then(|(_, value)| value.parse::<i32>().ok())
            .unwrap_or_default();
        let script = &self.script;
        script.calls.borrow_mut().push(FetchCall {
            dataset,
            year,
            params: params.to_vec(),
        });

        let in_flight = script.in_flight.get() + 1;
        script.in_flight.set(in_flight);
        script
            .max_in_flight
            .set(script.max_in_flight.get().max(in_flight));

        let latency = script
            .latency_by_year
            .borrow()
            .get(&year)
            .copied()
            .unwrap_or(script.latency.get());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        script.in_flight.set(script.in_flight.get() - 1);

        if let Some(error) = script.failures.borrow().get(&(dataset, year)) {
            return Err(error.clone());
        }

        let features = if script.empty.borrow().contains(&(dataset, year)) {
            serde_json::json!([])
        } else {
            serde_json::json!([{
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [f64::from(year) / 100.0, 0.0] },
                "properties": { "year": year, "best": 10 }
            }])
        };
        serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
        }))
        .map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    Clear(LayerKind),
    Add {
        kind: LayerKind,
        year: i32,
        features: usize,
    },
    Fit {
        bounds: Bounds,
        max_zoom: u8,
    },
}

#[derive(Clone, Default)]
pub struct RecordingRenderer {
    ops: Rc<RefCell<Vec<RenderOp>>>,
}

impl RecordingRenderer {
    pub fn ops(&self) -> Vec<RenderOp> {
        self.ops.borrow().clone()
    }

    pub fn reset(&self) {
        self.ops.borrow_mut().clear();
    }

    pub fn adds(&self) -> Vec<(LayerKind, i32)> {
        self.ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                RenderOp::Add { kind, year, .. } => Some((*kind, *year)),
                _ => None,
            })
            .collect()
    }

    /// Year of the layer of `kind` currently on the map, if any.
    pub fn current(&self, kind: LayerKind) -> Option<i32> {
        let mut shown = None;
        for op in self.ops.borrow().iter() {
            match op {
                RenderOp::Clear(k) if *k == kind => shown = None,
                RenderOp::Add { kind: k, year, .. } if *k == kind => shown = Some(*year),
                _ => {}
            }
        }
        shown
    }
}

impl RenderAdapter for RecordingRenderer {
    fn clear(&mut self, kind: LayerKind) {
        self.ops.borrow_mut().push(RenderOp::Clear(kind));
    }

    fn add(&mut self, layer: LayerContent) {
        self.ops.borrow_mut().push(RenderOp::Add {
            kind: layer.kind(),
            year: layer.year(),
            features: layer.len(),
        });
    }

    fn fit_to_bounds(&mut self, bounds: Bounds, max_zoom: u8) {
        self.ops
            .borrow_mut()
            .push(RenderOp::Fit { bounds, max_zoom });
    }
}

/// Records every request with the (virtual) time it arrived.
#[derive(Clone, Default)]
pub struct RecordingSink {
    requests: Rc<RefCell<Vec<(LoadRequest, Instant)>>>,
}

impl RecordingSink {
    pub fn requests(&self) -> Vec<(LoadRequest, Instant)> {
        self.requests.borrow().clone()
    }
}

impl LoadSink for RecordingSink {
    fn request_load(&self, request: LoadRequest) {
        self.requests.borrow_mut().push((request, Instant::now()));
    }
}
