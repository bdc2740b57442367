//! Logging setup on top of `tracing-subscriber`.
//!
//! The library crates only emit `tracing` events; this module decides where
//! they go and how they look.
//!
//! # Log Levels
//!
//! - `warn`: a connect replaced an existing variant
//! - `info`: one line per derived variant
//! - `debug`: pipeline runs, builds and connects
//! - `trace`: individual steps, dropped fields, switched nested types

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// How the `variants` binary logs.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level_filter: LevelFilter,
    /// Let `RUST_LOG` override `level_filter` when set.
    use_env_filter: bool,
    with_ansi: bool,
    format: LogFormat,
    /// Write to this file instead of stderr.
    log_file: Option<PathBuf>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, one event per line with fields appended.
    #[default]
    Pretty,
    Compact,
    /// One JSON object per event, with timestamp, target and span list.
    Json,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::WARN,
            use_env_filter: true,
            with_ansi: true,
            format: LogFormat::default(),
            log_file: None,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn with_level(mut self, level_filter: LevelFilter) -> Self {
        self.level_filter = level_filter;
        self
    }

    /// Whether `RUST_LOG` may override the level. Explicit CLI flags turn
    /// this off.
    #[must_use]
    pub fn with_env_filter(mut self, enabled: bool) -> Self {
        self.use_env_filter = enabled;
        self
    }

    #[must_use]
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        self.log_file = path;
        self
    }
}

/// Install the global subscriber. Call once at startup.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    let layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            fmt_layer(config, Mutex::new(file))
        }
        None => fmt_layer(config, io::stderr),
    };
    tracing_subscriber::registry()
        .with(layer)
        .with(build_env_filter(config))
        .init();
    Ok(())
}

/// The formatting layer for `config`, writing through `writer`.
///
/// Human formats leave out timestamps; JSON keeps them for log shippers.
fn fmt_layer<W>(config: &LogConfig, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_writer(writer);
    match config.format {
        LogFormat::Json => layer.json().with_span_list(true).boxed(),
        LogFormat::Compact => layer
            .compact()
            .with_ansi(config.with_ansi)
            .with_target(false)
            .without_time()
            .boxed(),
        LogFormat::Pretty => layer
            .with_ansi(config.with_ansi)
            .with_target(false)
            .without_time()
            .boxed(),
    }
}

/// Our crates log at the configured level; everything else stays at warn.
fn default_directives(level_filter: LevelFilter) -> String {
    let level = level_filter.to_string().to_lowercase();
    format!("warn,variants_cli={level},variants_core={level},variants_model={level}")
}

fn build_env_filter(config: &LogConfig) -> EnvFilter {
    let fallback = || EnvFilter::new(default_directives(config.level_filter));
    if config.use_env_filter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback())
    } else {
        fallback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    /// In-memory sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(config: &LogConfig) -> String {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::registry().with(fmt_layer(config, buffer.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(variant = "Input", "variant overwritten");
        });
        buffer.contents()
    }

    #[test]
    fn directives_cover_workspace_crates() {
        assert_eq!(
            default_directives(LevelFilter::DEBUG),
            "warn,variants_cli=debug,variants_core=debug,variants_model=debug"
        );
        assert_eq!(
            default_directives(LevelFilter::OFF),
            "warn,variants_cli=off,variants_core=off,variants_model=off"
        );
    }

    #[test]
    fn json_writes_one_object_per_event() {
        let output = capture(&LogConfig::default().with_format(LogFormat::Json));
        let event: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(event["level"], "WARN");
        assert_eq!(event["fields"]["message"], "variant overwritten");
        assert_eq!(event["fields"]["variant"], "Input");
        assert!(event["timestamp"].is_string());
    }

    #[test]
    fn pretty_output_is_plain_without_ansi() {
        let output = capture(&LogConfig::default().with_ansi(false));
        assert!(output.trim_start().starts_with("WARN"));
        assert!(output.contains("variant overwritten"));
        assert!(output.contains("variant=\"Input\""));
        assert!(!output.contains('\u{1b}'));
    }

    #[test]
    fn explicit_level_ignores_rust_log() {
        let config = LogConfig::default()
            .with_level(LevelFilter::TRACE)
            .with_env_filter(false);
        assert_eq!(
            build_env_filter(&config).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }
}
