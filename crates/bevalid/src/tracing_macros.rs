//! Crate-internal logging macros.
//!
//! Every log statement goes through `trace_at!`, which expands to the
//! matching `tracing` macro with the `tracing` feature and to nothing
//! without it, so the crate builds with the dependency switched off.

#[cfg(feature = "tracing")]
macro_rules! trace_at {
    ($level:ident, $($arg:tt)*) => {
        ::tracing::$level!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_at {
    ($level:ident, $($arg:tt)*) => {};
}

/// Configuration mistakes, right before they are returned.
macro_rules! trace_warn {
    ($($arg:tt)*) => {
        trace_at!(warn, $($arg)*)
    };
}

/// Registry changes.
macro_rules! trace_info {
    ($($arg:tt)*) => {
        trace_at!(info, $($arg)*)
    };
}

/// Skipped and failed rules.
macro_rules! trace_debug {
    ($($arg:tt)*) => {
        trace_at!(debug, $($arg)*)
    };
}
