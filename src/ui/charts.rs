//! Charts view: renders the adapter's chart registry as bar charts,
//! two per row, with the ranking summary pinned at the top.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::App;
use crate::charts::{ChartKind, ChartSpec};

const SERIES_COLORS: [Color; 5] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::Blue,
];

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    if app.charts.is_empty() {
        frame.render_widget(
            Paragraph::new("No chart data yet. Charts appear once a run completes.")
                .block(Block::default().title("Charts").borders(Borders::ALL)),
            area,
        );
        return;
    }

    let rankings = app.charts.rankings();
    let chart_area = if rankings.is_empty() {
        area
    } else {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(6)])
            .split(area);
        let line = rankings
            .iter()
            .map(|(metric, model)| format!("{metric}: {model}"))
            .collect::<Vec<_>>()
            .join("   ");
        frame.render_widget(
            Paragraph::new(line)
                .block(Block::default().title("Best By Metric").borders(Borders::ALL)),
            chunks[0],
        );
        chunks[1]
    };

    let charts = app.charts.charts();
    let row_count = charts.len().div_ceil(2);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, row_count as u32); row_count])
        .split(chart_area);

    for (i, pair) in charts.chunks(2).enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[i]);
        for (j, spec) in pair.iter().enumerate() {
            draw_chart(frame, cols[j], spec);
        }
    }
}

fn draw_chart(frame: &mut Frame, area: Rect, spec: &ChartSpec) {
    let scale = bar_scale(spec);

    let groups: Vec<BarGroup> = match spec.kind {
        ChartKind::Bar => {
            // One group per category, one bar each.
            let Some(series) = spec.series.first() else {
                return;
            };
            spec.categories
                .iter()
                .zip(&series.values)
                .map(|(category, &value)| {
                    BarGroup::default()
                        .label(Line::from(truncate(category, 12)))
                        .bars(&[scaled_bar(value, scale, SERIES_COLORS[0])])
                })
                .collect()
        }
        ChartKind::GroupedBar => spec
            .categories
            .iter()
            .enumerate()
            .map(|(i, category)| {
                let bars: Vec<Bar> = spec
                    .series
                    .iter()
                    .enumerate()
                    .map(|(s, series)| {
                        let value = series.values.get(i).copied().unwrap_or(0.0);
                        scaled_bar(value, scale, SERIES_COLORS[s % SERIES_COLORS.len()])
                    })
                    .collect();
                BarGroup::default()
                    .label(Line::from(truncate(category, 12)))
                    .bars(&bars)
            })
            .collect(),
    };

    let mut chart = BarChart::default()
        .block(
            Block::default()
                .title(spec.title.clone())
                .borders(Borders::ALL),
        )
        .bar_width(7)
        .bar_gap(1)
        .group_gap(2);
    for group in groups {
        chart = chart.data(group);
    }
    frame.render_widget(chart, area);
}

/// BarChart heights are u64; metric values are small floats, so scale
/// everything so the tallest bar lands around 1000.
fn bar_scale(spec: &ChartSpec) -> f64 {
    let max = spec
        .series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0_f64, f64::max);
    if max > 0.0 {
        1000.0 / max
    } else {
        1.0
    }
}

fn scaled_bar(value: f64, scale: f64, color: Color) -> Bar<'static> {
    Bar::default()
        .value((value * scale).round().max(0.0) as u64)
        .text_value(format!("{value:.2}"))
        .style(Style::default().fg(color))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
