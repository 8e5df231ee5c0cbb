// ============================================================================
// sbsmux-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// The CLI reuses the core error type; this module only adds a result alias,
// a context extension trait and a formatting macro.

use sbsmux_core::{CoreError, CoreResult};

use std::fmt;

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Extension trait for adding context to errors in the CLI.
///
/// Works like anyhow's `context`, but keeps the result a `CoreError`.
pub trait CliErrorContext<T> {
    /// Add context to an error.
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display;

    /// Add context using a closure (for lazy evaluation).
    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C;
}

impl<T, E> CliErrorContext<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.map_err(|e| {
            let core_error: CoreError = e.into();
            CoreError::OperationFailed(format!("{context}: {core_error}"))
        })
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let core_error: CoreError = e.into();
            CoreError::OperationFailed(format!("{}: {core_error}", f()))
        })
    }
}

impl<T> CliErrorContext<T> for Option<T> {
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.ok_or_else(|| CoreError::OperationFailed(context.to_string()))
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| CoreError::OperationFailed(f().to_string()))
    }
}

/// Creates a CLI error with a formatted message.
#[macro_export]
macro_rules! cli_error {
    ($($arg:tt)*) => {
        $crate::sbsmux_core::CoreError::OperationFailed(format!($($arg)*))
    };
}
