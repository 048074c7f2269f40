use log::LevelFilter;

/// Installs the `env_logger` backend. `RUST_LOG` still wins when set.
pub fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .try_init();
}
