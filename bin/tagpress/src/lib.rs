//! Tagpress CLI Library
//!
//! Command implementations and logging setup for the `tagpress` binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, check)

pub mod cmd;

pub use tagpress_core::{BuildMeta, Config};
pub use tagpress_generator::{BuildStats, Builder, CheckReport};

/// Build metadata of this binary, computed once at startup and passed to
/// every command.
pub fn build_meta() -> BuildMeta {
    BuildMeta::new(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        option_env!("GIT_HASH"),
    )
}

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
