//! Tracing subscriber setup for binaries and embedders.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_FILTER: &str = "info,mizan=debug,sqlx=warn";

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive`.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing(DEFAULT_FILTER);
        init_tracing("warn");
        tracing::info!("still logging");
    }
}
