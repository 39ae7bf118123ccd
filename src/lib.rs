pub mod app;
pub mod audio;
pub mod charts;
pub mod cli;
pub mod client;
pub mod connection;
pub mod logs;
pub mod protocol;
pub mod results;
pub mod state;
pub mod table;
pub mod ui;
pub mod viewer;

pub use app::{App, AppOptions};
pub use client::ApiClient;
pub use connection::{ChannelEvent, ConnectionManager};
pub use results::{quick_stats, ResultsStore, ResultsTable};
pub use state::{ConnectionStatus, DashboardState, RunStatus, StatusReducer};
pub use table::TableEngine;
