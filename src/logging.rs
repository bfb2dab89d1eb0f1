use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn level_filter(debug_mode: bool) -> EnvFilter {
    if debug_mode {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

/// Keeps logging alive and lets `debugMode` be switched at runtime.
///
/// Hold this for the lifetime of the program; dropping it flushes and stops
/// the file writer.
pub struct LoggingHandle {
    _guard: WorkerGuard,
    switch: DebugSwitch,
}

impl LoggingHandle {
    pub fn set_debug_mode(&self, debug_mode: bool) {
        self.switch.apply(debug_mode);
    }

    /// Cloneable switch for passing into
    /// [`Orchestrator::with_debug_mode_hook`](crate::services::Orchestrator::with_debug_mode_hook).
    pub fn debug_switch(&self) -> DebugSwitch {
        self.switch.clone()
    }
}

/// Swaps the active level filter between `debug` and `info`.
#[derive(Clone)]
pub struct DebugSwitch {
    handle: FilterHandle,
}

impl DebugSwitch {
    pub fn apply(&self, debug_mode: bool) {
        match self.handle.reload(level_filter(debug_mode)) {
            Ok(()) => tracing::debug!("Log level set to {}", if debug_mode { "debug" } else { "info" }),
            Err(e) => tracing::warn!("Failed to change log level: {}", e),
        }
    }
}

fn ensure_log_dir(log_dir: &str) -> Result<()> {
    let log_path = Utf8PathBuf::from(log_dir);
    if !log_path.exists() {
        fs::create_dir_all(&log_path)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(())
}

/// Setup logging with rotating file appender.
///
/// Logs are written to the specified directory with daily rotation.
///
/// # Arguments
/// * `log_dir` - Directory for log files (e.g., "logs")
/// * `log_prefix` - Prefix for log files (e.g., "ytlens")
/// * `debug_mode` - If true, use debug level; otherwise use info level
pub fn setup_logging(log_dir: &str, log_prefix: &str, debug_mode: bool) -> Result<LoggingHandle> {
    setup_logging_with_console(log_dir, log_prefix, debug_mode, false)
}

/// Setup logging with optional console output.
///
/// # Arguments
/// * `log_dir` - Directory for log files
/// * `log_prefix` - Prefix for log files
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to stderr
pub fn setup_logging_with_console(
    log_dir: &str,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
) -> Result<LoggingHandle> {
    ensure_log_dir(log_dir)?;

    let file_appender = rolling::daily(log_dir, log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let (filter_layer, filter_handle) = reload::Layer::new(level_filter(debug_mode));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        log_dir,
        log_prefix,
        debug_mode,
        console_output
    );

    Ok(LoggingHandle {
        _guard: guard,
        switch: DebugSwitch {
            handle: filter_handle,
        },
    })
}
