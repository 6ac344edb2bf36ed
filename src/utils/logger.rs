use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Log output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text format with timestamp, level, target, and message
    Text,
    /// JSON format with structured fields
    Json,
}

impl LogFormat {
    /// Parses `text` or `json`, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "text" => Some(LogFormat::Text),
            _ => None,
        }
    }
}

/// Initializes the global tracing subscriber.
///
/// Sets up an env filter (`RUST_LOG`, default `info`), a console layer in the
/// requested format and the `log` to `tracing` bridge so the `log` macros used
/// throughout the crate are captured.
///
/// Safe to call more than once: when a subscriber is already installed the call
/// is a no-op.
pub fn init_logging(format: LogFormat) {
    use tracing_log::LogTracer;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match format {
        LogFormat::Text => fmt::layer().with_target(true).with_line_number(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_target(true).boxed(),
    };

    // Either may already be installed by an earlier call.
    let _ = LogTracer::init();
    let subscriber = tracing_subscriber::registry().with(env_filter).with(fmt_layer);
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Tracing subscriber already initialized: {}", e);
    }
}
