use env_logger::Env;

/// Initializes `env_logger` for host applications. Defaults to `info` unless
/// `RUST_LOG` says otherwise. Safe to call more than once.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
