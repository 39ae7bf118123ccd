use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Terminal dashboard for observing a speech-to-text benchmark runner",
    name = "benchwatch"
)]
pub struct Cli {
    /// Base URL of the benchmark runner API
    #[arg(short = 'u', long, env = "BENCHWATCH_RUNNER_URL", default_value = "http://127.0.0.1:8000")]
    pub runner_url: String,

    /// Seconds between websocket reconnect attempts
    #[arg(long, default_value_t = 3)]
    pub reconnect_secs: u64,

    /// Minimum milliseconds between live status redraws
    #[arg(long, default_value_t = 500)]
    pub render_interval_ms: u64,

    /// Example transcriptions fetched per model in the viewer
    #[arg(long, default_value_t = 10)]
    pub examples_limit: usize,

    /// Data directory. Default to $HOME/.benchwatch
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Enable debug logging for benchwatch modules
    #[arg(long)]
    pub debug: bool,
}
