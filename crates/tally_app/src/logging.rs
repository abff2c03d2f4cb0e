//! Logging initialization for the urltally binary.
//!
//! Everything goes to stderr; stdout carries only the counts and the total.

use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, ConfigBuilder, TermLogger, TerminalMode};

pub fn initialize() {
    let _ = CombinedLogger::init(vec![TermLogger::new(
        LevelFilter::Info,
        build_config(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}
