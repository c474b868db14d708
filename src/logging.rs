use crate::config::HarnessConfig;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

type BoxedSubscriber = Box<dyn Subscriber + Send + Sync>;

/// Install the global subscriber; keep the guard alive for the whole run
pub fn init_logging(config: &HarnessConfig) -> WorkerGuard {
    let (subscriber, guard) = build_subscriber(config);
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Logging already initialised: {}", e);
    }
    guard
}

/// File layer (JSON or text) plus a console layer on stderr
pub fn build_subscriber(config: &HarnessConfig) -> (BoxedSubscriber, WorkerGuard) {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Console logs go to stderr; stdout carries the PASS/FAIL report
    let subscriber: BoxedSubscriber = if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let console_layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_ansi(true);
        Box::new(registry.with(file_layer).with(console_layer))
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let console_layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_ansi(true);
        Box::new(registry.with(file_layer).with(console_layer))
    };

    (subscriber, guard)
}
