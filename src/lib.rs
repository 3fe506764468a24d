pub mod config;
pub mod guidelines;
pub mod intelligence;
pub mod models;
pub mod pipeline;
pub mod report;

use tracing_subscriber::EnvFilter;

pub use pipeline::processor::{GuidanceService, PipelineError};

/// Install the global subscriber. Filter comes from `RUST_LOG`, falling
/// back to [`config::default_log_filter`]. Logs go to stderr so report
/// output on stdout stays clean.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}
