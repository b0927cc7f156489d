use std::panic;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

pub const LOG_DIR_ENV: &str = "CV_LOG_DIR";
pub const BACKTRACE_ENV: &str = "CV_LOG_INCLUDE_BACKTRACE";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn flag_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Routes panics through `tracing`. Installed once per process; with
/// `CV_LOG_INCLUDE_BACKTRACE=1` the default hook runs as well.
pub fn install_tracing_panic_hook(app_name: &'static str) {
    static INSTALLED: OnceLock<()> = OnceLock::new();

    INSTALLED.get_or_init(|| {
        let default_hook = panic::take_hook();
        let include_backtrace = flag_enabled(std::env::var(BACKTRACE_ENV).ok().as_deref());

        panic::set_hook(Box::new(move |info| {
            let thread = std::thread::current();
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()));
            let message = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".into());

            tracing::error!(
                application = app_name,
                thread = thread.name().unwrap_or("unnamed"),
                location = location.as_deref().unwrap_or("unknown"),
                panic_message = %message,
                "panic captured"
            );

            if include_backtrace {
                default_hook(info);
            }
        }));
    });
}

fn log_dir() -> Option<PathBuf> {
    std::env::var_os(LOG_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
}

fn rotating_file_writer(app_name: &'static str, dir: PathBuf) -> Option<BoxMakeWriter> {
    if let Err(err) = std::fs::create_dir_all(&dir) {
        eprintln!("cannot create {LOG_DIR_ENV} {}: {err}; logging to stderr", dir.display());
        return None;
    }

    let appender = tracing_appender::rolling::daily(dir, format!("{app_name}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(BoxMakeWriter::new(non_blocking))
}

/// Installs the global subscriber (`RUST_LOG`, default `info`).
///
/// Logs go to stderr so that stdout stays free for reports; with
/// `CV_LOG_DIR` set they go to `<CV_LOG_DIR>/<app>.log`, rotated daily.
pub fn init_tracing_subscriber(app_name: &'static str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    match log_dir().and_then(|dir| rotating_file_writer(app_name, dir)) {
        Some(writer) => {
            let _ = builder.with_ansi(false).with_writer(writer).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
