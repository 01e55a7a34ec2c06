// src/macros.rs

//
// Logging macros
//
// logging feature enabled  → tracing, every level
// logging feature disabled → errors and warnings go to stderr, the rest is dropped
//
// Drain workers have no caller to return errors to, so warnings stay visible
// even without the feature.
//

#![allow(unused_macros)]

// --------------------
// ERROR / WARN
// --------------------

#[cfg(feature = "logging")]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!($($arg)*)
    };
}

#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_error {
    ($($arg:tt)*) => {
        eprintln!("[mom-broker] error: {}", format_args!($($arg)*))
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        eprintln!("[mom-broker] warn: {}", format_args!($($arg)*))
    };
}

// --------------------
// INFO / DEBUG / TRACE
// --------------------

#[cfg(feature = "logging")]
macro_rules! log_info {
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(feature = "logging")]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
macro_rules! log_trace {
    ($($arg:tt)*) => {};
}

#[allow(unused_imports)]
pub(crate) use {log_debug, log_error, log_info, log_trace, log_warn};
