//! Status reducer: folds partial status events into one coherent
//! dashboard state.
//!
//! Ownership rule: `DashboardState` is mutated only here. Everything
//! else reads snapshots. The reducer also owns the render rate gate so
//! a chatty runner cannot force a redraw per sample; the `Completed`
//! edge always passes through because it triggers the results fetches.

use std::time::{Duration, Instant};

use crate::protocol::{SamplePreview, StatusEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Closed,
    Reconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Error,
}

impl RunStatus {
    /// Maps a runner status string. The runner reports intermediate
    /// phases (`loading_dataset`, `loading_model`, `generating_reports`)
    /// that all count as Running.
    fn from_wire(status: &str) -> RunStatus {
        match status {
            "idle" => RunStatus::Idle,
            "completed" => RunStatus::Completed,
            "error" => RunStatus::Error,
            _ => RunStatus::Running,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
}

impl Progress {
    /// Derived, never stored: 0 when total is unknown.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub connection: ConnectionStatus,
    pub run: RunStatus,
    pub progress: Progress,
    pub message: Option<String>,
    pub current_model: Option<String>,
    pub current_dataset: Option<String>,
    pub sample: Option<SamplePreview>,
    pub run_started: Option<Instant>,
}

impl Default for DashboardState {
    fn default() -> Self {
        DashboardState {
            connection: ConnectionStatus::Connecting,
            run: RunStatus::Idle,
            progress: Progress::default(),
            message: None,
            current_model: None,
            current_dataset: None,
            sample: None,
            run_started: None,
        }
    }
}

/// What a single `apply_event` call decided.
#[derive(Debug, Clone, Copy, Default)]
pub struct Applied {
    /// Propagate a redraw now. Gated by the minimum render interval
    /// except on the completion edge.
    pub render: bool,
    /// Run just transitioned into Completed. Fires once per run and
    /// schedules the results/chart/cache fetches downstream.
    pub completed: bool,
    /// Run just transitioned into Running (a new run began).
    pub started: bool,
}

pub struct StatusReducer {
    state: DashboardState,
    min_render_interval: Duration,
    last_render: Option<Instant>,
}

impl StatusReducer {
    pub fn new(min_render_interval: Duration) -> Self {
        StatusReducer {
            state: DashboardState::default(),
            min_render_interval,
            last_render: None,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Connection transitions come from the connection manager, not the
    /// event stream, and always warrant a redraw.
    pub fn set_connection(&mut self, status: ConnectionStatus) -> bool {
        if self.state.connection == status {
            return false;
        }
        self.state.connection = status;
        true
    }

    /// Folds one partial event into the state. Fields absent from the
    /// event keep their prior value; this is the critical merge rule
    /// since the runner sends diffs, not snapshots.
    pub fn apply_event(&mut self, event: &StatusEvent, now: Instant) -> Applied {
        let mut changed = false;

        let previous_run = self.state.run;
        if let Some(status) = event.status.as_deref() {
            let next = RunStatus::from_wire(status);
            if next != previous_run {
                self.state.run = next;
                changed = true;
            }
        }
        let started = self.state.run == RunStatus::Running && previous_run != RunStatus::Running;
        let completed =
            self.state.run == RunStatus::Completed && previous_run != RunStatus::Completed;

        if started {
            // New run: the preview belongs to the previous run. Progress
            // is expected to restart from 0 but is deliberately not
            // re-validated; the runner owns ordering.
            self.state.sample = None;
            self.state.run_started = Some(now);
        }

        if let Some(message) = &event.message {
            if self.state.message.as_deref() != Some(message) {
                self.state.message = Some(message.clone());
                changed = true;
            }
        }
        if let Some(model) = &event.current_model {
            if self.state.current_model.as_deref() != Some(model) {
                self.state.current_model = Some(model.clone());
                changed = true;
            }
        }
        if let Some(dataset) = &event.current_dataset {
            if self.state.current_dataset.as_deref() != Some(dataset) {
                self.state.current_dataset = Some(dataset.clone());
                changed = true;
            }
        }

        if let Some(total) = event.total {
            if self.state.progress.total != total {
                self.state.progress.total = total;
                changed = true;
            }
        }
        if let Some(current) = event.progress {
            if self.state.progress.current != current {
                self.state.progress.current = current;
                changed = true;
            }
        }
        // current <= total whenever total is known. Regressions are
        // tolerated, overshoot is not.
        if self.state.progress.total > 0 && self.state.progress.current > self.state.progress.total
        {
            self.state.progress.current = self.state.progress.total;
        }

        if let Some(sample) = &event.current_sample {
            // Sample identity is the index; a re-sent identical preview
            // is not a change worth redrawing for.
            let is_new = self
                .state
                .sample
                .as_ref()
                .map(|existing| existing.sample_index != sample.sample_index)
                .unwrap_or(true);
            if is_new {
                self.state.sample = Some(sample.clone());
                changed = true;
            }
        }

        let render = if completed {
            self.last_render = Some(now);
            true
        } else if changed && self.gate_open(now) {
            self.last_render = Some(now);
            true
        } else {
            false
        };

        Applied {
            render,
            completed,
            started,
        }
    }

    fn gate_open(&self, now: Instant) -> bool {
        match self.last_render {
            None => true,
            Some(last) => now.duration_since(last) >= self.min_render_interval,
        }
    }
}

/// Human-readable duration, the way the runner prints them:
/// `45.20s`, `2m 5s`, `1h 2m 5s`.
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.2}s")
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0) as u64;
        let secs = seconds % 60.0;
        format!("{}m {:.0}s", minutes, secs)
    } else {
        let hours = (seconds / 3600.0) as u64;
        let minutes = ((seconds % 3600.0) / 60.0) as u64;
        let secs = (seconds % 60.0) as u64;
        if secs > 0 {
            format!("{hours}h {minutes}m {secs}s")
        } else {
            format!("{hours}h {minutes}m")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reducer() -> StatusReducer {
        StatusReducer::new(Duration::from_millis(500))
    }

    fn event(json: &str) -> StatusEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn omitted_fields_are_retained_not_reset() {
        let mut reducer = reducer();
        let t0 = Instant::now();
        reducer.apply_event(&event(r#"{"progress": 5, "total": 10}"#), t0);
        reducer.apply_event(
            &event(r#"{"current_model": "x"}"#),
            t0 + Duration::from_secs(1),
        );

        let state = reducer.state();
        assert_eq!(state.progress.current, 5);
        assert_eq!(state.progress.total, 10);
        assert_eq!(state.current_model.as_deref(), Some("x"));
    }

    #[test]
    fn progress_never_exceeds_known_total() {
        let mut reducer = reducer();
        let t0 = Instant::now();
        reducer.apply_event(&event(r#"{"progress": 15, "total": 10}"#), t0);
        let progress = reducer.state().progress;
        assert!(progress.current <= progress.total);
        assert_eq!(progress.current, 10);
    }

    #[test]
    fn progress_regression_is_tolerated() {
        let mut reducer = reducer();
        let t0 = Instant::now();
        reducer.apply_event(&event(r#"{"progress": 8, "total": 10}"#), t0);
        reducer.apply_event(&event(r#"{"progress": 3}"#), t0 + Duration::from_secs(1));
        assert_eq!(reducer.state().progress.current, 3);
    }

    #[test]
    fn rate_gate_drops_second_render_within_interval() {
        let mut reducer = reducer();
        let t0 = Instant::now();
        let first = reducer.apply_event(&event(r#"{"progress": 1, "total": 10}"#), t0);
        let second = reducer.apply_event(
            &event(r#"{"progress": 2}"#),
            t0 + Duration::from_millis(100),
        );
        assert!(first.render);
        assert!(!second.render);
        // State still advanced even though the render was gated.
        assert_eq!(reducer.state().progress.current, 2);

        let third = reducer.apply_event(
            &event(r#"{"progress": 3}"#),
            t0 + Duration::from_millis(700),
        );
        assert!(third.render);
    }

    #[test]
    fn completion_always_renders_regardless_of_timing() {
        let mut reducer = reducer();
        let t0 = Instant::now();
        reducer.apply_event(&event(r#"{"status": "running", "progress": 1}"#), t0);
        let done = reducer.apply_event(
            &event(r#"{"status": "completed"}"#),
            t0 + Duration::from_millis(10),
        );
        assert!(done.render);
        assert!(done.completed);
    }

    #[test]
    fn completion_edge_fires_once_per_run() {
        let mut reducer = reducer();
        let t0 = Instant::now();
        reducer.apply_event(&event(r#"{"status": "running"}"#), t0);
        let first = reducer.apply_event(
            &event(r#"{"status": "completed"}"#),
            t0 + Duration::from_secs(1),
        );
        let repeat = reducer.apply_event(
            &event(r#"{"status": "completed", "message": "done"}"#),
            t0 + Duration::from_secs(2),
        );
        assert!(first.completed);
        assert!(!repeat.completed);
    }

    #[test]
    fn new_run_clears_sample_preview() {
        let mut reducer = reducer();
        let t0 = Instant::now();
        reducer.apply_event(
            &event(
                r#"{"status": "running", "current_sample": {"sample_index": 1, "reference": "a"}}"#,
            ),
            t0,
        );
        reducer.apply_event(
            &event(r#"{"status": "completed"}"#),
            t0 + Duration::from_secs(1),
        );
        assert!(reducer.state().sample.is_some());

        let restarted = reducer.apply_event(
            &event(r#"{"status": "running"}"#),
            t0 + Duration::from_secs(2),
        );
        assert!(restarted.started);
        assert!(reducer.state().sample.is_none());
    }

    #[test]
    fn identical_sample_index_is_not_a_change() {
        let mut reducer = reducer();
        let t0 = Instant::now();
        let first = reducer.apply_event(
            &event(r#"{"current_sample": {"sample_index": 4, "reference": "a"}}"#),
            t0,
        );
        let repeat = reducer.apply_event(
            &event(r#"{"current_sample": {"sample_index": 4, "reference": "a"}}"#),
            t0 + Duration::from_secs(1),
        );
        assert!(first.render);
        assert!(!repeat.render);
    }

    #[test]
    fn intermediate_phases_count_as_running() {
        let mut reducer = reducer();
        let t0 = Instant::now();
        let applied = reducer.apply_event(&event(r#"{"status": "loading_model"}"#), t0);
        assert!(applied.started);
        assert_eq!(reducer.state().run, RunStatus::Running);

        reducer.apply_event(
            &event(r#"{"status": "generating_reports"}"#),
            t0 + Duration::from_secs(1),
        );
        assert_eq!(reducer.state().run, RunStatus::Running);
    }

    #[test]
    fn format_duration_matches_runner_style() {
        assert_eq!(format_duration(45.2), "45.20s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
        assert_eq!(format_duration(3720.0), "1h 2m");
    }
}
