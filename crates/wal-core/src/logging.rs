use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize tracing for a binary.
///
/// Logs go to stderr so stdout stays clean for command output.
pub fn init(service_name: &str, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    // Default: our crates at `level`, warn for everything else.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let service = service_name.replace('-', "_");
        EnvFilter::new(format!(
            "warn,wal_core={level},wal_gemini={level},{service}={level}"
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::Config(format!("logging init failed: {e}")))
}
