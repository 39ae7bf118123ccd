//! Wire types for the benchmark runner API.
//!
//! The runner pushes partial status updates over a websocket and serves
//! everything else (config, results, chart data, examples, audio) over
//! REST. Fields absent from a status event mean "no change", so every
//! field here is optional; snapshot payloads default missing numbers to
//! zero instead of failing the whole fetch.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Partial status update pushed by the runner. Missing fields are
/// "no change", never "reset".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusEvent {
    pub status: Option<String>,
    pub message: Option<String>,
    pub current_model: Option<String>,
    pub current_dataset: Option<String>,
    pub progress: Option<u64>,
    pub total: Option<u64>,
    pub current_sample: Option<SamplePreview>,
}

/// Live transcription preview attached to a status event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SamplePreview {
    pub sample_index: u64,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub hypothesis: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub models: Vec<ToggleEntry>,
    #[serde(default)]
    pub datasets: Vec<ToggleEntry>,
}

/// A model or dataset row from the runner configuration. The runner
/// config carries more fields (paths, types); only these matter here.
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleEntry {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheStatus {
    #[serde(default)]
    pub cached_models: Vec<String>,
}

/// Response to start-run and cache-clear posts.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ActionResponse {
    pub fn accepted(&self, expected: &str) -> bool {
        self.status == expected
    }
}

/// Per-model, per-dataset metric statistics. Error rates are already
/// on the 0-100 percent scale. The runner reports more percentiles for
/// latency than for the other metrics; absent fields deserialize to
/// zero and render as point estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MetricSummary {
    #[serde(default)]
    pub wer_mean: f64,
    #[serde(default)]
    pub wer_std: f64,
    #[serde(default)]
    pub cer_mean: f64,
    #[serde(default)]
    pub cer_std: f64,
    #[serde(default)]
    pub latency_mean: f64,
    #[serde(default)]
    pub latency_std: f64,
    #[serde(default)]
    pub latency_p50: f64,
    #[serde(default)]
    pub latency_p95: f64,
    #[serde(default)]
    pub latency_p99: f64,
    #[serde(default)]
    pub throughput_mean: f64,
    #[serde(default)]
    pub throughput_std: f64,
    #[serde(default)]
    pub total_samples: u64,
}

/// Per-dataset slice of a model's results. The runner nests the metric
/// summary under `metrics` next to the sample count.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetBreakdown {
    #[serde(default)]
    pub samples: u64,
    #[serde(default)]
    pub metrics: MetricSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelResult {
    #[serde(default)]
    pub aggregated: MetricSummary,
    #[serde(default)]
    pub datasets: OrderedMap<DatasetBreakdown>,
}

/// Top-level results payload: model name -> results, in server order.
pub type ResultsPayload = OrderedMap<ModelResult>;

/// JSON map deserialized into a Vec so the server's key order survives.
/// `HashMap` would scramble the model order the tables depend on.
#[derive(Debug, Clone)]
pub struct OrderedMap<T>(pub Vec<(String, T)>);

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        OrderedMap(Vec::new())
    }
}

impl<T> OrderedMap<T> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, T)> {
        self.0.iter()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedMap<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MapVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for MapVisitor<T> {
            type Value = OrderedMap<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(MapVisitor(PhantomData))
    }
}

/// One metric's series across all models in the chart payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricSeries {
    #[serde(default)]
    pub mean: Vec<f64>,
    #[serde(default)]
    pub std: Vec<f64>,
    #[serde(default)]
    pub p50: Vec<f64>,
    #[serde(default)]
    pub p95: Vec<f64>,
    #[serde(default)]
    pub p99: Vec<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartPayload {
    #[serde(default)]
    pub models: Vec<String>,
    pub wer: Option<MetricSeries>,
    pub cer: Option<MetricSeries>,
    pub latency: Option<MetricSeries>,
    pub throughput: Option<MetricSeries>,
    #[serde(default)]
    pub performance_scores: Vec<f64>,
    #[serde(default)]
    pub rankings: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamplesPayload {
    #[serde(default)]
    pub examples: Vec<Example>,
}

/// One transcription example for the viewer modal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub hypothesis: String,
    #[serde(default)]
    pub wer: f64,
    #[serde(default)]
    pub id: Option<String>,
}
