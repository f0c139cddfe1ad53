//! Logging macro shims.
//!
//! Thin wrappers around [`tracing`] so call sites across the workspace read
//! uniformly (`info!`, `success!`, ...) without importing tracing everywhere.
//! The CLI decides how these events are ultimately formatted.

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { ::tracing::info!($($arg)*) };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => { ::tracing::info!($($arg)*) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { ::tracing::warn!($($arg)*) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { ::tracing::error!($($arg)*) };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { ::tracing::debug!($($arg)*) };
}
