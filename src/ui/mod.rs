//! Terminal view layer. Pure render functions over `&App`; all state
//! mutation stays in the event loop.

pub mod charts;
pub mod overlay;
pub mod results;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Tabs, Wrap};
use ratatui::Frame;

use crate::app::{App, View};
use crate::state::{format_duration, ConnectionStatus, RunStatus};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, chunks[0], app);

    match app.view {
        View::Overview => draw_overview(frame, chunks[1], app),
        View::Results => results::draw(frame, chunks[1], app),
        View::Charts => charts::draw(frame, chunks[1], app),
    }

    draw_key_hints(frame, chunks[2], app);

    if app.viewer.is_open() {
        overlay::draw_viewer(frame, app);
    }
    if let Some(notification) = &app.notification {
        overlay::draw_notification(frame, notification);
    }
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(20)])
        .split(area);

    let (label, color) = match app.reducer.state().connection {
        ConnectionStatus::Open => ("connected", Color::Green),
        ConnectionStatus::Connecting => ("connecting", Color::Yellow),
        ConnectionStatus::Reconnecting => ("reconnecting", Color::Yellow),
        ConnectionStatus::Closed => ("disconnected", Color::Red),
    };
    let status = Paragraph::new(Line::from(vec![
        Span::styled("benchwatch ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("● {label}"), Style::default().fg(color)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, chunks[0]);

    let selected = match app.view {
        View::Overview => 0,
        View::Results => 1,
        View::Charts => 2,
    };
    let tabs = Tabs::new(vec!["1 Overview", "2 Results", "3 Charts"])
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(tabs, chunks[1]);
}

fn draw_overview(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(6)])
        .split(columns[0]);
    draw_run_status(frame, left[0], app);
    draw_sample_preview(frame, left[1], app);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(6)])
        .split(columns[1]);
    draw_quick_stats(frame, right[0], app);
    draw_config_panel(frame, right[1], app);
}

fn draw_run_status(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.reducer.state();

    let (label, color) = match state.run {
        RunStatus::Idle => ("idle", Color::Gray),
        RunStatus::Running => ("running", Color::Yellow),
        RunStatus::Completed => ("completed", Color::Green),
        RunStatus::Error => ("error", Color::Red),
    };

    let mut lines = vec![Line::from(vec![
        Span::raw("Status: "),
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ])];
    if let Some(message) = &state.message {
        lines.push(Line::from(format!("Message: {message}")));
    }
    if let Some(model) = &state.current_model {
        lines.push(Line::from(format!("Model: {model}")));
    }
    if let Some(dataset) = &state.current_dataset {
        lines.push(Line::from(format!("Dataset: {dataset}")));
    }
    if state.run == RunStatus::Running {
        if let Some(started) = state.run_started {
            lines.push(Line::from(format!(
                "Elapsed: {}",
                format_duration(started.elapsed().as_secs_f64())
            )));
        }
    }

    let block = Block::default().title("Benchmark Run").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);
    frame.render_widget(Paragraph::new(lines), chunks[0]);

    let progress = &state.progress;
    if progress.total > 0 {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan))
            .percent(progress.percent().round().clamp(0.0, 100.0) as u16)
            .label(format!(
                "{}/{} ({:.1}%)",
                progress.current,
                progress.total,
                progress.percent()
            ));
        frame.render_widget(gauge, chunks[1]);
    }
}

fn draw_sample_preview(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title("Current Sample")
        .borders(Borders::ALL);

    let Some(sample) = &app.reducer.state().sample else {
        frame.render_widget(
            Paragraph::new("No sample yet").block(block),
            area,
        );
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!("Sample #{}", sample.sample_index),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("REF: ", Style::default().fg(Color::Green)),
            Span::raw(sample.reference.clone()),
        ]),
    ];
    // Hypothesis fills in once transcription for the sample finishes.
    let hypothesis = sample.hypothesis.as_deref().unwrap_or("…");
    lines.push(Line::from(vec![
        Span::styled("HYP: ", Style::default().fg(Color::Yellow)),
        Span::raw(hypothesis.to_string()),
    ]));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_quick_stats(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title("Quick Stats").borders(Borders::ALL);

    let Some(stats) = app.results.stats() else {
        frame.render_widget(
            Paragraph::new("No results yet").block(block),
            area,
        );
        return;
    };

    let mut lines = vec![
        Line::from(format!("Models benchmarked: {}", stats.model_count)),
        Line::from(format!("Total samples: {}", stats.total_samples)),
        Line::from(format!("Mean WER: {:.2}%", stats.mean_wer)),
        Line::from(format!("Mean latency: {:.2}s", stats.mean_latency)),
    ];
    if let Some(best) = &stats.best_model {
        lines.push(Line::from(vec![
            Span::raw("Best model: "),
            Span::styled(best.clone(), Style::default().fg(Color::Green)),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_config_panel(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title("Configuration").borders(Borders::ALL);

    let Some(config) = &app.config else {
        frame.render_widget(
            Paragraph::new("Waiting for runner config").block(block),
            area,
        );
        return;
    };

    let mut lines = vec![Line::from(Span::styled(
        "Models",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    for entry in &config.models {
        let marker = if entry.enabled { "[x]" } else { "[ ]" };
        let mut spans = vec![Span::raw(format!("{marker} {}", entry.name))];
        if app.cached_models.contains(&entry.name) {
            spans.push(Span::styled(" (cached)", Style::default().fg(Color::Cyan)));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(Span::styled(
        "Datasets",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for entry in &config.datasets {
        let marker = if entry.enabled { "[x]" } else { "[ ]" };
        lines.push(Line::from(format!("{marker} {}", entry.name)));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_key_hints(frame: &mut Frame, area: Rect, app: &App) {
    let hints = if app.notification.is_some() {
        "Enter/Esc dismiss".to_string()
    } else if app.viewer.is_open() {
        "↑/↓ select  Space play/stop  Esc close".to_string()
    } else {
        let mut hints =
            String::from("q quit  1/2/3 view  s start run  c clear cache  r refresh config  o reconnect");
        if app.view == View::Results && !app.results.is_empty() {
            let multi = app.results.groups().len() > 1;
            if multi {
                hints.push_str("  Tab dataset");
            }
            hints.push_str("  ←/→ column  Enter sort  ↑/↓ row  e examples");
        }
        hints
    };
    frame.render_widget(
        Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray))),
        area,
    );
}
