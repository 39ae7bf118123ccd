//! Results view: one tab per dataset group, each with its own
//! independently sorted table.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs};
use ratatui::Frame;

use crate::app::App;
use crate::results::OVERALL_GROUP;
use crate::table::{SortDirection, COLUMNS};

pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let groups = app.results.groups();
    if groups.is_empty() {
        frame.render_widget(
            Paragraph::new("No benchmark results yet. Press 's' to start a run.")
                .block(Block::default().title("Results").borders(Borders::ALL)),
            area,
        );
        return;
    }

    // A single group (one dataset, so only "Overall") skips the tab bar.
    let table_area = if groups.len() > 1 {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(4)])
            .split(area);
        let titles: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        let tabs = Tabs::new(titles)
            .select(app.active_dataset)
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(tabs, chunks[0]);
        chunks[1]
    } else {
        area
    };

    let Some(group) = groups.get(app.active_dataset) else {
        return;
    };
    let sort = app.tables.sort_state(&group.name);

    let header = Row::new(COLUMNS.iter().enumerate().map(|(i, name)| {
        let mut label = name.to_string();
        if sort.column == Some(i) {
            label.push_str(match sort.direction {
                SortDirection::Ascending => " ▲",
                SortDirection::Descending => " ▼",
            });
        }
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if i == app.selected_column {
            style = style.fg(Color::Cyan);
        }
        Cell::from(Span::styled(label, style))
    }))
    .height(1);

    let rows = app
        .tables
        .project(group)
        .into_iter()
        .map(|cells| Row::new(cells.into_iter().map(Cell::from)));

    let widths = [
        Constraint::Min(20),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Length(9),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .block(
            Block::default()
                .title(group_title(&group.name))
                .borders(Borders::ALL),
        );

    let mut state = TableState::default().with_selected(Some(app.selected_row));
    frame.render_stateful_widget(table, table_area, &mut state);
}

fn group_title(name: &str) -> String {
    if name == OVERALL_GROUP {
        name.to_string()
    } else {
        format!("Dataset: {name}")
    }
}
