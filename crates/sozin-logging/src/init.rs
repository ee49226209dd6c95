use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_log::LogTracer;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Target for link-level events (every primitive step and rollback action).
pub const T_NET: &str = "sozin::net";

pub struct LoggingGuards {
    _file_guards: Vec<WorkerGuard>,
}

/// Install the global subscriber.
///
/// `console` caps what reaches stderr so an interactive session is not
/// drowned in step logs; the files under `<root>/logs` get everything the
/// config level allows.
pub fn init(
    component: &str,
    root: &Path,
    cfg: &LoggingConfig,
    console: LevelFilter,
) -> Result<LoggingGuards> {
    let filter_layer = build_filter(cfg);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(console);

    let base = tracing_subscriber::registry()
        .with(filter_layer)
        .with(ErrorLayer::default())
        .with(stderr_layer);

    let mut guards = Vec::new();

    if !cfg.file_logging {
        base.try_init().ok();
        let _ = LogTracer::init();
        return Ok(LoggingGuards {
            _file_guards: guards,
        });
    }

    let log_dir = root.join("logs");
    if let Err(err) = std::fs::create_dir_all(&log_dir) {
        base.try_init().ok();
        let _ = LogTracer::init();
        tracing::warn!("File logging disabled ({}): {}", log_dir.display(), err);
        return Ok(LoggingGuards {
            _file_guards: guards,
        });
    }

    let component_appender =
        tracing_appender::rolling::daily(&log_dir, format!("{component}.log"));
    let (component_writer, component_guard) = tracing_appender::non_blocking(component_appender);
    let component_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_writer(component_writer)
        .with_filter(
            Targets::new()
                .with_default(LevelFilter::TRACE)
                .with_target(T_NET, LevelFilter::OFF),
        );
    guards.push(component_guard);

    let net_appender = tracing_appender::rolling::daily(&log_dir, "net.log");
    let (net_writer, net_guard) = tracing_appender::non_blocking(net_appender);
    let net_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_writer(net_writer)
        .with_filter(Targets::new().with_target(T_NET, LevelFilter::TRACE));
    guards.push(net_guard);

    base.with(component_layer).with(net_layer).try_init().ok();
    let _ = LogTracer::init();

    Ok(LoggingGuards {
        _file_guards: guards,
    })
}

fn build_filter(cfg: &LoggingConfig) -> EnvFilter {
    if !cfg.enabled {
        return EnvFilter::new("off");
    }
    EnvFilter::try_new(cfg.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"))
}
