//! Table projection and sort engine.
//!
//! Each dataset tab keeps its own sort state; sorting one tab never
//! touches another. Rows are compared on their rendered cells: numeric
//! when both sides parse as numbers after dropping the "± std"
//! tolerance suffix, lexicographic otherwise.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::results::DatasetGroup;

pub const COLUMNS: [&str; 6] = ["Model", "WER", "CER", "Latency", "Throughput", "Samples"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    pub column: Option<usize>,
    pub direction: SortDirection,
}

impl SortState {
    /// Same column flips direction; a new column resets to ascending.
    fn toggle(&mut self, column: usize) {
        if self.column == Some(column) {
            self.direction = match self.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Ascending,
            };
        } else {
            self.column = Some(column);
            self.direction = SortDirection::Ascending;
        }
    }
}

/// Sort states for every dataset tab, created lazily on first use and
/// kept for the whole session.
#[derive(Debug, Default)]
pub struct TableEngine {
    sorts: HashMap<String, SortState>,
}

impl TableEngine {
    pub fn toggle_sort(&mut self, dataset: &str, column: usize) {
        self.sorts
            .entry(dataset.to_string())
            .or_default()
            .toggle(column);
    }

    pub fn sort_state(&self, dataset: &str) -> SortState {
        self.sorts.get(dataset).copied().unwrap_or_default()
    }

    /// Formatted rows for one dataset group, ordered by that dataset's
    /// own sort state. Other datasets are unaffected by construction.
    pub fn project(&self, group: &DatasetGroup) -> Vec<Vec<String>> {
        let mut rows: Vec<Vec<String>> = group.rows.iter().map(format_row).collect();

        let state = self.sort_state(&group.name);
        if let Some(column) = state.column {
            // Stable ascending sort, then reverse for descending, so a
            // second click yields the exact reverse order of the first.
            rows.sort_by(|a, b| {
                let left = a.get(column).map(String::as_str).unwrap_or("");
                let right = b.get(column).map(String::as_str).unwrap_or("");
                compare_cells(left, right)
            });
            if state.direction == SortDirection::Descending {
                rows.reverse();
            }
        }
        rows
    }
}

fn format_row(row: &crate::results::DatasetRow) -> Vec<String> {
    let s = &row.summary;
    vec![
        row.model.clone(),
        // Error rates arrive already on the 0-100 percent scale.
        with_tolerance(s.wer_mean, s.wer_std, 2, "%"),
        with_tolerance(s.cer_mean, s.cer_std, 2, "%"),
        with_tolerance(s.latency_mean, s.latency_std, 3, "s"),
        format!("{:.1} ch/s", s.throughput_mean),
        row.samples.to_string(),
    ]
}

/// `12.50% ± 1.10` when a spread is known, plain `12.50%` otherwise.
fn with_tolerance(mean: f64, std: f64, precision: usize, unit: &str) -> String {
    if std > 0.0 {
        format!("{mean:.precision$}{unit} ± {std:.precision$}")
    } else {
        format!("{mean:.precision$}{unit}")
    }
}

pub fn compare_cells(a: &str, b: &str) -> Ordering {
    match (parse_numeric(a), parse_numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// Leading-number parse after stripping the tolerance suffix, matching
/// how the cells were compared in the browser (`parseFloat` takes the
/// longest numeric prefix, so `0.123s` reads as `0.123`).
fn parse_numeric(cell: &str) -> Option<f64> {
    let head = cell.split('±').next().unwrap_or(cell).trim();
    let mut end = 0;
    for (i, c) in head.char_indices() {
        let numeric = c.is_ascii_digit() || c == '.' || ((c == '-' || c == '+') && i == 0);
        if !numeric {
            break;
        }
        end = i + c.len_utf8();
    }
    head[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MetricSummary;
    use crate::results::{DatasetRow, OVERALL_GROUP};

    fn row(model: &str, wer: f64) -> DatasetRow {
        DatasetRow {
            model: model.to_string(),
            summary: MetricSummary {
                wer_mean: wer,
                ..Default::default()
            },
            samples: 10,
        }
    }

    fn group(name: &str, rows: Vec<DatasetRow>) -> DatasetGroup {
        DatasetGroup {
            name: name.to_string(),
            rows,
        }
    }

    #[test]
    fn numeric_cells_compare_numerically() {
        assert_eq!(compare_cells("9.00%", "12.50%"), Ordering::Less);
        assert_eq!(compare_cells("12.50% ± 1.10", "9.00%"), Ordering::Greater);
        assert_eq!(compare_cells("0.123s", "0.099s"), Ordering::Greater);
    }

    #[test]
    fn non_numeric_cells_fall_back_to_lexicographic() {
        assert_eq!(compare_cells("whisper-base", "whisper-large"), Ordering::Less);
        assert_eq!(compare_cells("n/a", "12.0"), Ordering::Greater);
    }

    #[test]
    fn second_click_reverses_first_clicks_order() {
        let mut engine = TableEngine::default();
        let group = group(
            "librispeech",
            vec![row("a", 12.0), row("b", 8.0), row("c", 10.0)],
        );

        engine.toggle_sort("librispeech", 1);
        let ascending = engine.project(&group);
        let asc_models: Vec<&str> = ascending.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(asc_models, ["b", "c", "a"]);

        engine.toggle_sort("librispeech", 1);
        let descending = engine.project(&group);
        let desc_models: Vec<&str> = descending.iter().map(|r| r[0].as_str()).collect();
        let mut reversed = asc_models.clone();
        reversed.reverse();
        assert_eq!(desc_models, reversed);
    }

    #[test]
    fn ties_reverse_exactly_too() {
        let mut engine = TableEngine::default();
        let group = group("d", vec![row("a", 5.0), row("b", 5.0), row("c", 1.0)]);

        engine.toggle_sort("d", 1);
        let asc: Vec<String> = engine.project(&group).iter().map(|r| r[0].clone()).collect();
        assert_eq!(asc, ["c", "a", "b"]);

        engine.toggle_sort("d", 1);
        let desc: Vec<String> = engine.project(&group).iter().map(|r| r[0].clone()).collect();
        assert_eq!(desc, ["b", "a", "c"]);
    }

    #[test]
    fn new_column_resets_to_ascending() {
        let mut engine = TableEngine::default();
        engine.toggle_sort("d", 1);
        engine.toggle_sort("d", 1);
        assert_eq!(engine.sort_state("d").direction, SortDirection::Descending);

        engine.toggle_sort("d", 3);
        let state = engine.sort_state("d");
        assert_eq!(state.column, Some(3));
        assert_eq!(state.direction, SortDirection::Ascending);
    }

    #[test]
    fn sorting_one_dataset_leaves_others_alone() {
        let mut engine = TableEngine::default();
        let other = group(OVERALL_GROUP, vec![row("z", 1.0), row("a", 2.0)]);

        engine.toggle_sort("librispeech", 1);
        assert_eq!(engine.sort_state(OVERALL_GROUP).column, None);

        // Unsorted dataset keeps server row order.
        let rows = engine.project(&other);
        assert_eq!(rows[0][0], "z");
        assert_eq!(rows[1][0], "a");
    }

    #[test]
    fn sorting_preserves_row_set() {
        let mut engine = TableEngine::default();
        let group = group("d", vec![row("a", 3.0), row("b", 1.0), row("c", 2.0)]);
        engine.toggle_sort("d", 1);
        let rows = engine.project(&group);
        let mut models: Vec<String> = rows.iter().map(|r| r[0].clone()).collect();
        models.sort();
        assert_eq!(models, ["a", "b", "c"]);
    }

    #[test]
    fn zero_std_renders_point_estimate() {
        let rendered = format_row(&row("m", 7.0));
        assert_eq!(rendered[1], "7.00%");
        let mut spread = row("m", 7.0);
        spread.summary.wer_std = 1.1;
        assert_eq!(format_row(&spread)[1], "7.00% ± 1.10");
    }

    #[test]
    fn error_rate_cells_are_not_rescaled() {
        // The runner reports error rates as percentages already; a
        // 12.5% WER must render as 12.50%, not 1250.00%.
        let mut row = row("m", 12.5);
        row.summary.wer_std = 1.1;
        let engine = TableEngine::default();
        let rows = engine.project(&group("librispeech", vec![row]));
        assert_eq!(rows[0][1], "12.50% ± 1.10");
    }
}
