//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info` and millisecond
/// timestamps. Calling it again is a no-op.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// cumulus::core::logging::init();
/// log::info!("Generator started");
/// ```
pub fn init() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    )
    .format_timestamp_millis()
    .try_init();
}
