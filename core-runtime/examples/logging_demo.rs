//! Logging bootstrap demonstration
//!
//! Run with:
//! ```bash
//! cargo run --example logging_demo
//! cargo run --example logging_demo -- json
//! cargo run --example logging_demo -- compact "core_runtime=trace"
//! ```

use core_runtime::logging::{init_logging, redact_url, LogFormat, LogLevel, LoggingConfig};
use std::env;
use tracing::{debug, info, info_span, warn};

fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_spans(true)
        .with_target(true);
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    if let Err(e) = init_logging(config) {
        eprintln!("logging init failed: {e}");
        return;
    }

    info!(format = ?format, "Logging initialized");

    let span = info_span!("resolve", video_id = "dQw4w9WgXcQ");
    let _guard = span.enter();

    let url = "https://cdn.example/audio.mp3?signature=secret&expire=123";
    debug!(url = %redact_url(url), "Resolved stream URL");
    warn!(attempt = 2, max_attempts = 3, "Request attempt failed");
    info!("Demo complete");
}
