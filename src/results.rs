//! Results cache and aggregator.
//!
//! The results table is rebuilt wholesale on every fetch; a superseded
//! fetch that lands late simply replaces the table again. Nothing is
//! incrementally patched, so two table versions can never interleave.

use crate::protocol::{MetricSummary, ModelResult, ResultsPayload};

/// Synthetic group for models that report no per-dataset breakdown.
pub const OVERALL_GROUP: &str = "Overall";

/// All model results from the last fetch, in server order.
#[derive(Debug, Clone, Default)]
pub struct ResultsTable {
    models: Vec<(String, ModelResult)>,
}

impl ResultsTable {
    pub fn new(payload: ResultsPayload) -> Self {
        ResultsTable { models: payload.0 }
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[(String, ModelResult)] {
        &self.models
    }
}

/// Headline numbers shown above the detailed tables.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickStats {
    pub model_count: usize,
    /// Taken from whichever model is iterated last, matching the
    /// original accumulator. All models normally share one dataset
    /// size; a mismatch shows up here instead of failing.
    pub total_samples: u64,
    /// Unweighted arithmetic mean across models.
    pub mean_wer: f64,
    pub mean_latency: f64,
    /// Strictly lowest mean WER; the first model wins ties.
    pub best_model: Option<String>,
}

pub fn quick_stats(table: &ResultsTable) -> QuickStats {
    let mut total_samples = 0;
    let mut wer_sum = 0.0;
    let mut latency_sum = 0.0;
    let mut best: Option<(&str, f64)> = None;

    for (name, result) in table.models() {
        let agg = &result.aggregated;
        total_samples = agg.total_samples;
        wer_sum += agg.wer_mean;
        latency_sum += agg.latency_mean;
        match best {
            Some((_, best_wer)) if agg.wer_mean >= best_wer => {}
            _ => best = Some((name, agg.wer_mean)),
        }
    }

    let count = table.models().len();
    let divisor = count.max(1) as f64;
    QuickStats {
        model_count: count,
        total_samples,
        mean_wer: wer_sum / divisor,
        mean_latency: latency_sum / divisor,
        best_model: best.map(|(name, _)| name.to_string()),
    }
}

/// One row of a dataset-scoped table.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub model: String,
    pub summary: MetricSummary,
    pub samples: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DatasetGroup {
    pub name: String,
    pub rows: Vec<DatasetRow>,
}

/// Transposes the model-major table into dataset-major groups. Every
/// model lands in exactly one row per dataset it reports; models with
/// no per-dataset breakdown contribute their aggregated summary to the
/// synthetic [`OVERALL_GROUP`]. Group order is first-seen order, so the
/// result is deterministic for a given payload.
pub fn group_by_dataset(table: &ResultsTable) -> Vec<DatasetGroup> {
    let mut groups: Vec<DatasetGroup> = Vec::new();

    let mut push_row = |groups: &mut Vec<DatasetGroup>, name: &str, row: DatasetRow| {
        match groups.iter_mut().find(|group| group.name == name) {
            Some(group) => group.rows.push(row),
            None => groups.push(DatasetGroup {
                name: name.to_string(),
                rows: vec![row],
            }),
        }
    };

    for (model, result) in table.models() {
        if result.datasets.is_empty() {
            push_row(
                &mut groups,
                OVERALL_GROUP,
                DatasetRow {
                    model: model.clone(),
                    summary: result.aggregated,
                    samples: result.aggregated.total_samples,
                },
            );
            continue;
        }
        for (dataset, breakdown) in result.datasets.iter() {
            push_row(
                &mut groups,
                dataset,
                DatasetRow {
                    model: model.clone(),
                    summary: breakdown.metrics,
                    samples: breakdown.samples,
                },
            );
        }
    }

    groups
}

/// Owns the aggregated view of the last results fetch. Replaced as one
/// unit; readers only ever see a consistent table/stats/groups trio.
#[derive(Debug, Default)]
pub struct ResultsStore {
    table: ResultsTable,
    stats: Option<QuickStats>,
    groups: Vec<DatasetGroup>,
}

impl ResultsStore {
    /// Wholesale replacement. An empty table is "no results yet", not
    /// an error: stats and groups clear and the section stays hidden.
    pub fn replace(&mut self, table: ResultsTable) {
        if table.is_empty() {
            self.stats = None;
            self.groups.clear();
        } else {
            self.stats = Some(quick_stats(&table));
            self.groups = group_by_dataset(&table);
        }
        self.table = table;
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn stats(&self) -> Option<&QuickStats> {
        self.stats.as_ref()
    }

    pub fn groups(&self) -> &[DatasetGroup] {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(json: &str) -> ResultsTable {
        ResultsTable::new(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn quick_stats_pick_strictly_lowest_wer() {
        let table = table(
            r#"{
                "whisper-base": {"aggregated": {"wer_mean": 12.5, "wer_std": 1.1, "total_samples": 50}},
                "whisper-large": {"aggregated": {"wer_mean": 8.0, "total_samples": 50}}
            }"#,
        );
        let stats = quick_stats(&table);
        assert_eq!(stats.model_count, 2);
        assert_eq!(stats.best_model.as_deref(), Some("whisper-large"));
        assert_eq!(stats.total_samples, 50);
        assert!((stats.mean_wer - 10.25).abs() < 1e-9);
    }

    #[test]
    fn first_model_wins_wer_ties() {
        let table = table(
            r#"{
                "first": {"aggregated": {"wer_mean": 5.0}},
                "second": {"aggregated": {"wer_mean": 5.0}}
            }"#,
        );
        assert_eq!(quick_stats(&table).best_model.as_deref(), Some("first"));
    }

    #[test]
    fn total_samples_comes_from_last_model() {
        let table = table(
            r#"{
                "a": {"aggregated": {"total_samples": 100}},
                "b": {"aggregated": {"total_samples": 40}}
            }"#,
        );
        assert_eq!(quick_stats(&table).total_samples, 40);
    }

    #[test]
    fn grouping_transposes_to_dataset_major() {
        let table = table(
            r#"{
                "m1": {
                    "aggregated": {"wer_mean": 10.0},
                    "datasets": {
                        "librispeech": {"samples": 30, "metrics": {"wer_mean": 9.0}},
                        "common-voice": {"samples": 20, "metrics": {"wer_mean": 11.0}}
                    }
                },
                "m2": {
                    "aggregated": {"wer_mean": 7.0},
                    "datasets": {
                        "librispeech": {"samples": 30, "metrics": {"wer_mean": 7.0}}
                    }
                }
            }"#,
        );
        let groups = group_by_dataset(&table);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "librispeech");
        assert_eq!(groups[1].name, "common-voice");

        let librispeech: Vec<&str> = groups[0].rows.iter().map(|r| r.model.as_str()).collect();
        assert_eq!(librispeech, ["m1", "m2"]);
        assert_eq!(groups[1].rows.len(), 1);
        assert_eq!(groups[1].rows[0].samples, 20);
    }

    #[test]
    fn models_without_breakdown_land_in_overall() {
        let table = table(
            r#"{
                "flat": {"aggregated": {"wer_mean": 4.0, "total_samples": 12}}
            }"#,
        );
        let groups = group_by_dataset(&table);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, OVERALL_GROUP);
        assert_eq!(groups[0].rows[0].samples, 12);
        assert_eq!(groups[0].rows[0].summary.wer_mean, 4.0);
    }

    #[test]
    fn every_model_appears_once_per_dataset() {
        let table = table(
            r#"{
                "a": {"datasets": {"d1": {"metrics": {}}, "d2": {"metrics": {}}}},
                "b": {"datasets": {"d2": {"metrics": {}}}},
                "c": {"aggregated": {}}
            }"#,
        );
        let groups = group_by_dataset(&table);
        let total_rows: usize = groups.iter().map(|g| g.rows.len()).sum();
        assert_eq!(total_rows, 4);
        for group in &groups {
            let mut models: Vec<&str> = group.rows.iter().map(|r| r.model.as_str()).collect();
            models.dedup();
            assert_eq!(models.len(), group.rows.len());
        }
    }

    #[test]
    fn store_replace_is_wholesale() {
        let mut store = ResultsStore::default();
        store.replace(table(r#"{"m": {"aggregated": {"wer_mean": 2.0}}}"#));
        assert!(store.stats().is_some());
        assert_eq!(store.groups().len(), 1);

        store.replace(ResultsTable::default());
        assert!(store.is_empty());
        assert!(store.stats().is_none());
        assert!(store.groups().is_empty());
    }
}
