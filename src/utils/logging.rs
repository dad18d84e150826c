//! Logger setup.
//!
//! `RUST_LOG` wins when set; otherwise `default_level` (from config) applies
//! to every target.

use log::LevelFilter;

pub fn init(default_level: &str) {
    let level = parse_level(default_level);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    // A second init (tests, embedding) keeps the first logger.
    if builder.try_init().is_err() {
        log::debug!("logger already initialized");
    }
}

fn parse_level(value: &str) -> LevelFilter {
    value.parse().unwrap_or(LevelFilter::Info)
}
