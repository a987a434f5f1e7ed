//! Logging Infrastructure
//!
//! - Console output, pretty or JSON (`LOG_JSON=true`)
//! - Daily rotating application logs under `<log_dir>/app` (14 files kept)
//! - Security logs (`target: "security"`) under `<log_dir>/security`, never deleted

use std::fs;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, prelude::*};

/// Application log files kept before rotation deletes them
const APP_LOG_RETENTION: usize = 14;

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over `level` when set. Files are always JSON.
///
/// ```ignore
/// // Development setup (console only)
/// init_logger_with_file("debug", false, None)?;
///
/// // Production setup (console + file)
/// init_logger_with_file("info", true, Some("./data/logs"))?;
/// ```
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let json_console = json_format.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
    });
    let pretty_console = (!json_format).then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
    });

    let (app_layer, security_layer) = match log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            let app_log_dir = log_dir.join("app");
            let security_log_dir = log_dir.join("security");
            fs::create_dir_all(&app_log_dir)?;
            fs::create_dir_all(&security_log_dir)?;

            let app_log = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("snackbar-server")
                .max_log_files(APP_LOG_RETENTION)
                .build(app_log_dir)?;
            let app_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(app_log)
                .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                    meta.target() != "security"
                }));

            let security_log =
                RollingFileAppender::new(Rotation::DAILY, security_log_dir, "security");
            let security_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_ansi(false)
                .with_writer(security_log)
                .with_filter(tracing_subscriber::filter::filter_fn(|meta| {
                    meta.target() == "security"
                }));

            (Some(app_layer), Some(security_layer))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_console)
        .with(pretty_console)
        .with(app_layer)
        .with(security_layer)
        .try_init()?;

    Ok(())
}

/// Security log helper - records security-related events
///
/// Written to `security.YYYY-MM-DD` files when a log dir is configured.
///
/// ```ignore
/// security_log!(WARN, "auth_failed", reason = "invalid_password");
/// security_log!(INFO, "admin_login", ip = "192.168.1.1");
/// ```
#[macro_export]
macro_rules! security_log {
    (WARN, $event:expr, $($arg:tt)*) => {
        tracing::warn!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "WARN",
            $($arg)*
        );
    };
    (INFO, $event:expr, $($arg:tt)*) => {
        tracing::info!(
            target: "security",
            event = $event,
            timestamp = chrono::Local::now().to_rfc3339(),
            level = "INFO",
            $($arg)*
        );
    };
}
