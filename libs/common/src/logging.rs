//! Unified logging module for PharmStock services
//!
//! Console logging with a compact bracketed-level format and runtime
//! reloadable level filtering.

use std::sync::{Mutex, OnceLock};

use tracing::Level;
use tracing_subscriber::{
    fmt::{
        self,
        format::Writer,
        FmtContext, FormatEvent, FormatFields,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Custom event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2026-03-14T09:21:07.443Z [INFO] Sync: warehouse 12`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        // Format timestamp
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        // Format level with brackets and color
        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        // Format the event message and fields
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// Reload handle for dynamic log level changes
type FilterHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;
static LOG_FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();
static CURRENT_LOG_LEVEL: OnceLock<Mutex<String>> = OnceLock::new();

/// Initialize console logging for a service
///
/// `RUST_LOG` takes precedence when set; otherwise the filter defaults to
/// `info` globally with `default_level` for the service's own target.
///
/// Calling this more than once (e.g. from several tests) is harmless: the
/// second call fails to install its subscriber and is ignored.
pub fn init(service_name: &str, default_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = match std::env::var("RUST_LOG") {
        Ok(env_str) => env_str,
        Err(_) => format!("info,{}={}", service_name, default_level),
    };
    let env_filter = EnvFilter::try_new(filter_str.as_str())?;

    // Wrap EnvFilter with reload::Layer for dynamic level changes
    let (reload_filter, reload_handle) = reload::Layer::new(env_filter);

    // Console layer - format only, level filtering handled by reload_filter
    // Custom format: 2026-03-14T09:21:07.443Z [INFO] message
    let console_layer = fmt::layer()
        .with_ansi(true)
        .event_format(BracketedLevelFormat);

    if tracing_subscriber::registry()
        .with(reload_filter)
        .with(console_layer)
        .try_init()
        .is_ok()
    {
        let _ = LOG_FILTER_HANDLE.set(reload_handle);
        let _ = CURRENT_LOG_LEVEL.set(Mutex::new(filter_str));
    }

    Ok(())
}

/// Dynamically set log filter level at runtime
///
/// # Arguments
/// * `level` - Log level string (e.g., "debug", "info", "warn", "error")
///   or full filter spec (e.g., "info,invsrv=debug")
///
/// # Example
/// ```ignore
/// common::logging::set_log_level("debug")?;
/// common::logging::set_log_level("info,invsrv=debug")?;
/// ```
pub fn set_log_level(level: &str) -> Result<(), String> {
    let handle = LOG_FILTER_HANDLE
        .get()
        .ok_or("Logging not initialized with reload support")?;

    let new_filter =
        EnvFilter::try_new(level).map_err(|e| format!("Invalid log level '{}': {}", level, e))?;

    handle
        .reload(new_filter)
        .map_err(|e| format!("Failed to reload log filter: {}", e))?;

    // Update stored level
    if let Some(current) = CURRENT_LOG_LEVEL.get() {
        if let Ok(mut guard) = current.lock() {
            *guard = level.to_string();
        }
    }

    tracing::info!("Log level changed to: {}", level);
    Ok(())
}

/// Get the current log filter spec, if logging was initialized
pub fn current_log_level() -> Option<String> {
    CURRENT_LOG_LEVEL
        .get()
        .and_then(|m| m.lock().ok().map(|g| g.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_level_brackets() {
        assert_eq!(format_level(&Level::INFO), "[INFO]");
        assert_eq!(format_level(&Level::ERROR), "[ERROR]");
    }

    #[test]
    fn test_set_level_before_init_fails() {
        if LOG_FILTER_HANDLE.get().is_none() {
            assert!(set_log_level("debug").is_err());
        }
    }
}
