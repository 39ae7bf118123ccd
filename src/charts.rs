//! Chart adapter: projects the runner's chart payload into
//! renderer-ready specs.
//!
//! The registry is cleared before every rebuild so chart instances from
//! a previous run can never leak into the next one. A metric the
//! payload does not carry simply skips its chart.

use crate::protocol::{ChartPayload, MetricSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    GroupedBar,
}

#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub id: &'static str,
    pub title: String,
    pub kind: ChartKind,
    /// Model names, one category per bar (or bar group).
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Default)]
pub struct ChartAdapter {
    registry: Vec<ChartSpec>,
    rankings: Vec<(String, String)>,
}

impl ChartAdapter {
    /// Rebuilds every chart from the payload. Previous instances are
    /// dropped first, whether or not their metric is still present.
    pub fn render(&mut self, payload: &ChartPayload) {
        self.registry.clear();
        self.rankings.clear();

        let models = &payload.models;
        if models.is_empty() {
            return;
        }

        self.push_single("wer", "WER (%)", models, payload.wer.as_ref());
        self.push_single("cer", "CER (%)", models, payload.cer.as_ref());
        self.push_single("latency", "Latency (s)", models, payload.latency.as_ref());
        self.push_single(
            "throughput",
            "Throughput (ch/s)",
            models,
            payload.throughput.as_ref(),
        );

        if let Some(latency) = payload.latency.as_ref() {
            let percentiles = [
                ("P50", &latency.p50),
                ("P95", &latency.p95),
                ("P99", &latency.p99),
            ];
            let series: Vec<Series> = percentiles
                .into_iter()
                .filter(|(_, values)| !values.is_empty())
                .map(|(label, values)| Series {
                    label: label.to_string(),
                    values: sized(values, models.len()),
                })
                .collect();
            if !series.is_empty() {
                self.registry.push(ChartSpec {
                    id: "latency_percentiles",
                    title: "Latency percentiles (s)".to_string(),
                    kind: ChartKind::GroupedBar,
                    categories: models.clone(),
                    series,
                });
            }
        }

        if let (Some(wer), Some(cer)) = (payload.wer.as_ref(), payload.cer.as_ref()) {
            if !wer.mean.is_empty() && !cer.mean.is_empty() {
                self.registry.push(ChartSpec {
                    id: "error_rates",
                    title: "WER vs CER (%)".to_string(),
                    kind: ChartKind::GroupedBar,
                    categories: models.clone(),
                    series: vec![
                        Series {
                            label: "WER".to_string(),
                            values: sized(&wer.mean, models.len()),
                        },
                        Series {
                            label: "CER".to_string(),
                            values: sized(&cer.mean, models.len()),
                        },
                    ],
                });
            }
        }

        if !payload.performance_scores.is_empty() {
            self.registry.push(ChartSpec {
                id: "performance",
                title: "Performance score".to_string(),
                kind: ChartKind::Bar,
                categories: models.clone(),
                series: vec![Series {
                    label: "score".to_string(),
                    values: sized(&payload.performance_scores, models.len()),
                }],
            });
        }

        self.rankings = payload
            .rankings
            .iter()
            .map(|(metric, model)| (metric.replace('_', " "), model.clone()))
            .collect();
    }

    fn push_single(
        &mut self,
        id: &'static str,
        title: &str,
        models: &[String],
        series: Option<&MetricSeries>,
    ) {
        let Some(series) = series else { return };
        if series.mean.is_empty() {
            return;
        }
        self.registry.push(ChartSpec {
            id,
            title: title.to_string(),
            kind: ChartKind::Bar,
            categories: models.to_vec(),
            series: vec![Series {
                label: "mean".to_string(),
                values: sized(&series.mean, models.len()),
            }],
        });
    }

    pub fn charts(&self) -> &[ChartSpec] {
        &self.registry
    }

    pub fn rankings(&self) -> &[(String, String)] {
        &self.rankings
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

/// Series padded or truncated to the model count, so a short upstream
/// array cannot desync bar labels.
fn sized(values: &[f64], len: usize) -> Vec<f64> {
    let mut out = values.to_vec();
    out.resize(len, 0.0);
    out
}
