//! Subscriber set-up for the engine's structured logs.
//!
//! Registration emits `info` events per command and `debug` events per
//! classified parameter; invocations run inside a `command` span. Logs are
//! written to stderr so command output on stdout stays clean.

#[cfg(feature = "tracing")]
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer, Registry,
};

/// Tracing output format.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line, human-readable output.
    Pretty,

    /// One line per event.
    Compact,

    /// Newline-delimited JSON.
    Json,
}

/// Tracing configuration.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter.
    ///
    /// If None, uses RUST_LOG or falls back to [`TracingConfig::default_directive`].
    pub level: Option<tracing::Level>,

    pub format: TracingFormat,

    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,

    pub thread_ids: bool,

    /// Filter used when neither `level` nor RUST_LOG is set.
    pub default_directive: String,
}

#[cfg(feature = "tracing")]
impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::Compact,
            timestamps: true,
            target: true,
            thread_ids: false,
            default_directive: "info".to_string(),
        }
    }
}

#[cfg(feature = "tracing")]
impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        match self.level {
            Some(level) => EnvFilter::new(level.to_string()),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.default_directive)),
        }
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(self.target)
            .with_thread_ids(self.thread_ids);
        match (self.format, self.timestamps) {
            (TracingFormat::Pretty, true) => layer.pretty().boxed(),
            (TracingFormat::Pretty, false) => layer.pretty().without_time().boxed(),
            (TracingFormat::Compact, true) => layer.compact().boxed(),
            (TracingFormat::Compact, false) => layer.compact().without_time().boxed(),
            (TracingFormat::Json, true) => layer.json().boxed(),
            (TracingFormat::Json, false) => layer.json().without_time().boxed(),
        }
    }
}

/// Initialize the global subscriber with default settings.
///
/// # Environment Variables
///
/// - `RUST_LOG=debug` - classification and coercion details
/// - `RUST_LOG=argbind=trace,myapp=info` - per-crate filtering
///
/// # Panics
///
/// Panics if a global subscriber is already set.
#[cfg(feature = "tracing")]
pub fn init_subscriber() {
    init_subscriber_with_config(TracingConfig::default());
}

/// Initialize the global subscriber with a custom configuration.
///
/// ```ignore
/// use argbind::{init_subscriber_with_config, TracingConfig, TracingFormat};
///
/// init_subscriber_with_config(TracingConfig {
///     format: TracingFormat::Json,
///     timestamps: false,
///     ..Default::default()
/// });
/// ```
///
/// # Panics
///
/// Panics if a global subscriber is already set.
#[cfg(feature = "tracing")]
pub fn init_subscriber_with_config(config: TracingConfig) {
    tracing_subscriber::registry()
        .with(config.layer())
        .with(config.filter())
        .init();
}

/// Like [`init_subscriber_with_config`], but reports an already-set subscriber.
#[cfg(feature = "tracing")]
pub fn try_init_subscriber_with_config(config: TracingConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(config.layer())
        .with(config.filter())
        .try_init()
}

#[cfg(not(feature = "tracing"))]
pub fn init_subscriber() {}
