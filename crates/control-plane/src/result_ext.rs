//! Result extension trait for logging errors with context.
//!
//! Execution tasks run detached from any request, so a failed write would
//! otherwise vanish. `log` records the error and the caller location before
//! the error is propagated or dropped.

use std::fmt::Display;
use tracing::error;

/// Extension trait for logging errors with context.
pub trait ResultExt<T, E> {
    /// Log the error with context if this is an `Err` variant.
    ///
    /// Returns the original `Result` unchanged.
    ///
    /// ```ignore
    /// use agentflow_control_plane::result_ext::ResultExt;
    ///
    /// repository
    ///     .update_execution(id, RunStatus::Completed, None)
    ///     .await
    ///     .log("finalizing execution")?;
    /// ```
    fn log<S: ToString>(self, context: S) -> Result<T, E>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: ToString>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let caller_location = std::panic::Location::caller();
            error!(
                target: "agentflow_control_plane",
                error = %e,
                file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                context = %context.to_string(),
                "Operation failed"
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_ext_ok_passes_through() {
        let result: Result<i32, &str> = Ok(42);
        assert_eq!(result.log("creating execution").unwrap(), 42);
    }

    #[test]
    fn test_result_ext_err_passes_through() {
        let result: Result<i32, String> = Err("connection reset".to_string());
        let logged = result.log("updating step");
        assert_eq!(logged.unwrap_err(), "connection reset");
    }
}
