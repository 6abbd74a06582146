use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Logs to stdout and appends a plain-text copy to `log_file`.
/// `RUST_LOG` overrides the default `info` level.
pub fn init(log_file: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .init();

    Ok(())
}
