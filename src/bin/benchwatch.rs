use std::fs;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use benchwatch::cli::Cli;
use benchwatch::logs::setup_logging;
use benchwatch::{ApiClient, App, AppOptions};
use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use dirs::home_dir;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use url::Url;

fn get_base_dir(custom_path: &Option<String>) -> anyhow::Result<PathBuf> {
    let default_path = home_dir()
        .ok_or_else(|| anyhow::anyhow!("failed to get home directory"))?
        .join(".benchwatch");

    let base_dir = custom_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or(default_path);
    let log_dir = base_dir.join("logs");

    fs::create_dir_all(&log_dir)?;
    Ok(base_dir)
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base_dir = get_base_dir(&cli.data_dir)?;
    let _log_guard = setup_logging(&base_dir.join("logs"), cli.debug)?;

    let base_url = Url::parse(&cli.runner_url)
        .with_context(|| format!("invalid runner url: {}", cli.runner_url))?;
    info!("starting benchwatch against {base_url}");

    let client = ApiClient::new(base_url)?;
    let app = App::new(
        client,
        AppOptions {
            reconnect_delay: Duration::from_secs(cli.reconnect_secs),
            render_interval: Duration::from_millis(cli.render_interval_ms),
            examples_limit: cli.examples_limit,
        },
    );

    let mut terminal = setup_terminal()?;
    let result = app.run(&mut terminal).await;
    restore_terminal(&mut terminal)?;

    if let Err(e) = &result {
        eprintln!("benchwatch exited with an error: {e:#}");
    }
    result
}
