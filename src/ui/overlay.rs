//! Modal overlays: the example/audio viewer and blocking notifications.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::{App, Notification};
use crate::viewer::ViewerPhase;

pub fn draw_viewer(frame: &mut Frame, app: &App) {
    let area = centered_rect(frame.area(), 80, 80);
    frame.render_widget(Clear, area);

    let model = app.viewer.model().unwrap_or("?");
    let block = Block::default()
        .title(format!(" Examples — {model} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match app.viewer.phase() {
        ViewerPhase::Closed => {}
        ViewerPhase::Loading => {
            frame.render_widget(Paragraph::new("Loading examples…"), inner);
        }
        ViewerPhase::LoadFailed => {
            let error = app.viewer.error().unwrap_or("request failed");
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("Failed to load examples: {error}"),
                    Style::default().fg(Color::Red),
                ))
                .wrap(Wrap { trim: true }),
                inner,
            );
        }
        ViewerPhase::Populated => draw_examples(frame, inner, app),
    }
}

fn draw_examples(frame: &mut Frame, area: Rect, app: &App) {
    let examples = app.viewer.examples();
    if examples.is_empty() {
        frame.render_widget(Paragraph::new("No examples available for this model."), area);
        return;
    }

    let items: Vec<ListItem> = examples
        .iter()
        .enumerate()
        .map(|(i, example)| {
            let marker = if app.viewer.playing() == Some(i) {
                Span::styled("▶ ", Style::default().fg(Color::Green))
            } else if example.id.is_some() {
                Span::raw("♪ ")
            } else {
                Span::raw("  ")
            };
            let lines = vec![
                Line::from(vec![
                    marker,
                    Span::styled(
                        format!("Example {} — WER {:.2}%", i + 1, example.wer),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(vec![
                    Span::styled("  REF: ", Style::default().fg(Color::Green)),
                    Span::raw(example.reference.clone()),
                ]),
                Line::from(vec![
                    Span::styled("  HYP: ", Style::default().fg(Color::Yellow)),
                    Span::raw(example.hypothesis.clone()),
                ]),
                Line::from(""),
            ];
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items).highlight_style(Style::default().bg(Color::DarkGray));
    let mut state = ListState::default().with_selected(Some(app.viewer.selected()));
    frame.render_stateful_widget(list, area, &mut state);
}

pub fn draw_notification(frame: &mut Frame, notification: &Notification) {
    let area = centered_rect(frame.area(), 50, 30);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(format!(" {} ", notification.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);
    frame.render_widget(
        Paragraph::new(notification.message.clone()).wrap(Wrap { trim: true }),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            "Press Enter to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
        chunks[1],
    );
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
