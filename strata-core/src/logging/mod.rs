//! Logging setup
//!
//! The crate logs through the standard `log` macros. Applications that want
//! Strata to install the backend call [`init_logging`] once at startup; it
//! wires `env_logger` with the configured level and line format. `RUST_LOG`
//! still takes precedence over the configured level when set.

pub mod formatter;

pub use formatter::LogEntry;

use std::io::Write;
use std::sync::Once;

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Install the `env_logger` backend. Safe to call more than once.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    config.validate()?;

    INIT.call_once(|| {
        let level = config.level_filter().unwrap_or(log::LevelFilter::Info);
        let format = config.format;

        let mut builder = env_logger::Builder::new();
        builder.filter_level(level);
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }

        // Another backend may already be installed (tests, host application)
        let _ = builder
            .format(move |buf, record| {
                writeln!(buf, "{}", format.format_entry(&LogEntry::from_record(record)))
            })
            .try_init();
    });

    Ok(())
}
