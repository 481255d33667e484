use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{TelemetryError, TelemetryResult};

/// Output format for the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human-readable output for interactive use.
    #[default]
    Pretty,
    /// Single-line JSON records, suitable for log aggregation in production.
    Json,
    /// Compact single-line human-readable output.
    Compact,
}

/// Configuration for the process-wide log subscriber.
#[derive(Debug, Clone)]
pub struct LogConfig {
    default_level: String,
    format: LogFormat,
    extra_directives: Vec<String>,
}

impl LogConfig {
    /// Create a config with the given default level (e.g. `"info"`, `"debug"`).
    #[must_use]
    pub fn new(default_level: impl Into<String>) -> Self {
        Self {
            default_level: default_level.into(),
            format: LogFormat::default(),
            extra_directives: Vec::new(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Add an extra per-target filter directive, e.g. `"bastion_bridge=trace"`.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.extra_directives.push(directive.into());
        self
    }

    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.default_level)
            .map_err(|e| TelemetryError::Config(e.to_string()))?;
        for directive in &self.extra_directives {
            let parsed = directive
                .parse()
                .map_err(|_| TelemetryError::Config(format!("invalid directive: {directive}")))?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }
}

/// Install the global `tracing` subscriber from `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::Config`] if a filter directive is malformed, or
/// [`TelemetryError::AlreadyInitialized`] if a global subscriber is already set.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    };

    result.map_err(|_| TelemetryError::AlreadyInitialized)
}

/// Install logging with `info` as the default level and [`LogFormat::Pretty`].
///
/// # Errors
///
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    setup_logging(&LogConfig::new("info"))
}
