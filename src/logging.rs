//! Tracing setup

use tracing::Level;

/// Install a formatting subscriber at `level` (`error` .. `trace`).
///
/// Unknown levels fall back to `info`. Returns false when a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_tracing(level: &str) -> bool {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
}
