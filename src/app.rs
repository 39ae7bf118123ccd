//! Application event loop.
//!
//! One task owns all mutable dashboard state. Channel events, key
//! presses, fetch outcomes and the tick timer are multiplexed through a
//! single `select!`; fetches run on spawned tasks and report back over
//! a channel, so nothing here ever blocks the draw path. A superseded
//! fetch that lands late just replaces state wholesale again
//! (last-write-wins; the reads are idempotent).

use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::audio::RodioBackend;
use crate::charts::ChartAdapter;
use crate::client::ApiClient;
use crate::connection::{ChannelEvent, ConnectionManager};
use crate::protocol::{ActionResponse, CacheStatus, ChartPayload, Example, RunnerConfig};
use crate::results::{ResultsStore, ResultsTable};
use crate::state::{RunStatus, StatusReducer};
use crate::table::{TableEngine, COLUMNS};
use crate::ui;
use crate::viewer::ExampleViewer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Overview,
    Results,
    Charts,
}

/// Blocking popup for user-facing failures; dismissed with Enter/Esc.
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

/// Completed background fetch, delivered back into the event loop.
enum FetchOutcome {
    Results(ResultsTable),
    Charts(ChartPayload),
    Cache(CacheStatus),
    Config(RunnerConfig),
    Start(Result<ActionResponse, String>),
    ClearCache(Result<ActionResponse, String>),
    Examples {
        model: String,
        result: Result<Vec<Example>, String>,
    },
    Audio {
        model: String,
        index: usize,
        result: Result<Vec<u8>, String>,
    },
}

pub struct AppOptions {
    pub reconnect_delay: Duration,
    pub render_interval: Duration,
    pub examples_limit: usize,
}

pub struct App {
    pub(crate) reducer: StatusReducer,
    pub(crate) results: ResultsStore,
    pub(crate) tables: TableEngine,
    pub(crate) charts: ChartAdapter,
    pub(crate) viewer: ExampleViewer<RodioBackend>,
    pub(crate) config: Option<RunnerConfig>,
    pub(crate) cached_models: HashSet<String>,
    pub(crate) view: View,
    pub(crate) active_dataset: usize,
    pub(crate) selected_row: usize,
    pub(crate) selected_column: usize,
    pub(crate) notification: Option<Notification>,
    pub(crate) start_pending: bool,
    client: ApiClient,
    manager: Option<ConnectionManager>,
    reconnect_delay: Duration,
    examples_limit: usize,
    outcomes_tx: mpsc::Sender<FetchOutcome>,
    outcomes_rx: Option<mpsc::Receiver<FetchOutcome>>,
}

impl App {
    pub fn new(client: ApiClient, options: AppOptions) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::channel(64);
        App {
            reducer: StatusReducer::new(options.render_interval),
            results: ResultsStore::default(),
            tables: TableEngine::default(),
            charts: ChartAdapter::default(),
            viewer: ExampleViewer::new(RodioBackend::new()),
            config: None,
            cached_models: HashSet::new(),
            view: View::Overview,
            active_dataset: 0,
            selected_row: 0,
            selected_column: 1,
            notification: None,
            start_pending: false,
            client,
            manager: None,
            reconnect_delay: options.reconnect_delay,
            examples_limit: options.examples_limit,
            outcomes_tx,
            outcomes_rx: Some(outcomes_rx),
        }
    }

    pub async fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let ws_url = self.client.ws_url()?;
        let (manager, mut channel) = ConnectionManager::spawn(ws_url, self.reconnect_delay);
        self.manager = Some(manager);

        let mut outcomes = self
            .outcomes_rx
            .take()
            .expect("run called once per App");

        // A fresh session derives everything from the runner.
        self.fetch_config();
        self.fetch_cache_status();
        self.fetch_results();
        self.fetch_charts();

        let mut input = EventStream::new();
        let mut tick = tokio::time::interval(Duration::from_millis(250));
        let mut dirty = true;

        loop {
            if dirty {
                terminal.draw(|frame| ui::draw(frame, &self))?;
                dirty = false;
            }

            tokio::select! {
                maybe_event = input.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key.code) {
                            break;
                        }
                        dirty = true;
                    }
                    Some(Ok(Event::Resize(..))) => dirty = true,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => warn!("terminal input error: {e}"),
                    None => break,
                },
                Some(event) = channel.recv() => {
                    if self.on_channel_event(event) {
                        dirty = true;
                    }
                },
                Some(outcome) = outcomes.recv() => {
                    self.on_fetch_outcome(outcome);
                    dirty = true;
                },
                _ = tick.tick() => {
                    if self.viewer.tick() {
                        dirty = true;
                    }
                    // Keep the elapsed clock moving while a run is live.
                    if self.reducer.state().run == RunStatus::Running {
                        dirty = true;
                    }
                }
            }
        }

        if let Some(manager) = self.manager.take() {
            manager.shutdown().await;
        }
        Ok(())
    }

    fn on_channel_event(&mut self, event: ChannelEvent) -> bool {
        match event {
            ChannelEvent::Connection(status) => self.reducer.set_connection(status),
            ChannelEvent::Status(event) => {
                let applied = self.reducer.apply_event(&event, Instant::now());
                if applied.completed {
                    info!("run completed, refreshing results, charts and cache status");
                    self.fetch_results();
                    self.fetch_charts();
                    self.fetch_cache_status();
                }
                applied.render
            }
        }
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyCode) -> bool {
        // A notification blocks everything until dismissed.
        if self.notification.is_some() {
            if matches!(key, KeyCode::Enter | KeyCode::Esc) {
                self.notification = None;
            }
            return false;
        }

        if self.viewer.is_open() {
            match key {
                KeyCode::Esc => self.viewer.close(),
                KeyCode::Up => self.viewer.select_previous(),
                KeyCode::Down => self.viewer.select_next(),
                KeyCode::Char(' ') | KeyCode::Enter => self.toggle_audio(),
                _ => {}
            }
            return false;
        }

        match key {
            KeyCode::Char('q') => return true,
            KeyCode::Char('1') => self.view = View::Overview,
            KeyCode::Char('2') => self.view = View::Results,
            KeyCode::Char('3') => self.view = View::Charts,
            KeyCode::Char('s') => self.start_run(),
            KeyCode::Char('c') => self.clear_cache(),
            KeyCode::Char('r') => {
                self.fetch_config();
                self.fetch_cache_status();
            }
            KeyCode::Char('o') => {
                // Manual reconnect: replaces the channel and cancels
                // any pending retry delay.
                if let Some(manager) = &self.manager {
                    manager.reconnect();
                }
            }
            _ => {
                if self.view == View::Results {
                    self.handle_results_key(key);
                }
            }
        }
        false
    }

    fn handle_results_key(&mut self, key: KeyCode) {
        let group_count = self.results.groups().len();
        match key {
            KeyCode::Tab if group_count > 0 => {
                // Switching tabs only toggles visibility; no re-fetch,
                // no re-aggregation, no shared sort state.
                self.active_dataset = (self.active_dataset + 1) % group_count;
                self.selected_row = 0;
            }
            KeyCode::BackTab if group_count > 0 => {
                self.active_dataset = (self.active_dataset + group_count - 1) % group_count;
                self.selected_row = 0;
            }
            KeyCode::Left => {
                self.selected_column = self.selected_column.saturating_sub(1);
            }
            KeyCode::Right => {
                self.selected_column = (self.selected_column + 1).min(COLUMNS.len() - 1);
            }
            KeyCode::Up => {
                self.selected_row = self.selected_row.saturating_sub(1);
            }
            KeyCode::Down => {
                if let Some(group) = self.results.groups().get(self.active_dataset) {
                    if !group.rows.is_empty() {
                        self.selected_row = (self.selected_row + 1).min(group.rows.len() - 1);
                    }
                }
            }
            KeyCode::Enter => {
                if let Some(group) = self.results.groups().get(self.active_dataset) {
                    let dataset = group.name.clone();
                    self.tables.toggle_sort(&dataset, self.selected_column);
                }
            }
            KeyCode::Char('e') => self.open_examples(),
            _ => {}
        }
    }

    fn on_fetch_outcome(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Results(table) => {
                self.results.replace(table);
                let group_count = self.results.groups().len();
                if group_count == 0 {
                    self.active_dataset = 0;
                    self.selected_row = 0;
                } else {
                    self.active_dataset = self.active_dataset.min(group_count - 1);
                    let rows = self.results.groups()[self.active_dataset].rows.len();
                    self.selected_row = self.selected_row.min(rows.saturating_sub(1));
                }
            }
            FetchOutcome::Charts(payload) => self.charts.render(&payload),
            FetchOutcome::Cache(status) => {
                self.cached_models = status.cached_models.into_iter().collect();
            }
            FetchOutcome::Config(config) => self.config = Some(config),
            FetchOutcome::Start(result) => {
                // Either way the control is usable again.
                self.start_pending = false;
                match result {
                    Ok(response) if response.accepted("started") => {
                        info!("benchmark start accepted");
                    }
                    Ok(response) => self.notify(
                        "Start rejected",
                        response
                            .message
                            .unwrap_or_else(|| "benchmark already running".to_string()),
                    ),
                    Err(e) => self.notify("Start failed", e),
                }
            }
            FetchOutcome::ClearCache(result) => match result {
                Ok(response) if response.accepted("success") => {
                    self.fetch_cache_status();
                }
                Ok(response) => self.notify(
                    "Cache clear failed",
                    response
                        .message
                        .unwrap_or_else(|| "runner refused to clear the cache".to_string()),
                ),
                Err(e) => self.notify("Cache clear failed", e),
            },
            FetchOutcome::Examples { model, result } => match result {
                Ok(examples) => self.viewer.loaded(&model, examples),
                Err(e) => self.viewer.load_failed(&model, e),
            },
            FetchOutcome::Audio {
                model,
                index,
                result,
            } => match result {
                Ok(bytes) if self.viewer.model() == Some(model.as_str()) => {
                    self.viewer.try_start_playback(index, bytes);
                }
                Ok(_) => {}
                Err(e) => warn!("audio fetch failed for {model}: {e}"),
            },
        }
    }

    fn notify(&mut self, title: &str, message: String) {
        self.notification = Some(Notification {
            title: title.to_string(),
            message,
        });
    }

    fn start_run(&mut self) {
        if self.start_pending {
            return;
        }
        self.start_pending = true;
        let client = self.client.clone();
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = client.start_run().await.map_err(|e| format!("{e:#}"));
            let _ = tx.send(FetchOutcome::Start(result)).await;
        });
    }

    fn clear_cache(&mut self) {
        let client = self.client.clone();
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = client.clear_cache().await.map_err(|e| format!("{e:#}"));
            let _ = tx.send(FetchOutcome::ClearCache(result)).await;
        });
    }

    fn open_examples(&mut self) {
        let Some(group) = self.results.groups().get(self.active_dataset) else {
            return;
        };
        let rows = self.tables.project(group);
        let Some(row) = rows.get(self.selected_row) else {
            return;
        };
        let model = row[0].clone();
        self.viewer.open(&model);

        let client = self.client.clone();
        let tx = self.outcomes_tx.clone();
        let limit = self.examples_limit;
        tokio::spawn(async move {
            let result = client
                .examples(&model, limit)
                .await
                .map_err(|e| format!("{e:#}"));
            let _ = tx.send(FetchOutcome::Examples { model, result }).await;
        });
    }

    fn toggle_audio(&mut self) {
        let index = self.viewer.selected();
        if self.viewer.playing() == Some(index) {
            self.viewer.stop_playback();
            return;
        }
        let Some(example) = self.viewer.examples().get(index) else {
            return;
        };
        let Some(id) = example.id.clone() else {
            // Example carries no audio sample.
            return;
        };
        let Some(model) = self.viewer.model().map(str::to_string) else {
            return;
        };

        let client = self.client.clone();
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = client.audio(&id).await.map_err(|e| format!("{e:#}"));
            let _ = tx
                .send(FetchOutcome::Audio {
                    model,
                    index,
                    result,
                })
                .await;
        });
    }

    fn fetch_results(&self) {
        let client = self.client.clone();
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            match client.results().await {
                Ok(table) => {
                    let _ = tx.send(FetchOutcome::Results(table)).await;
                }
                // Transport error: keep whatever the page already
                // shows; the next fetch self-heals.
                Err(e) => warn!("results fetch failed: {e:#}"),
            }
        });
    }

    fn fetch_charts(&self) {
        let client = self.client.clone();
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            match client.chart_data().await {
                Ok(Some(payload)) => {
                    let _ = tx.send(FetchOutcome::Charts(payload)).await;
                }
                Ok(None) => {}
                Err(e) => warn!("chart data fetch failed: {e:#}"),
            }
        });
    }

    fn fetch_cache_status(&self) {
        let client = self.client.clone();
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            match client.cache_status().await {
                Ok(status) => {
                    let _ = tx.send(FetchOutcome::Cache(status)).await;
                }
                Err(e) => warn!("cache status fetch failed: {e:#}"),
            }
        });
    }

    fn fetch_config(&self) {
        let client = self.client.clone();
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            match client.config().await {
                Ok(config) => {
                    let _ = tx.send(FetchOutcome::Config(config)).await;
                }
                Err(e) => warn!("config fetch failed: {e:#}"),
            }
        });
    }
}
