use std::fmt;

/// A request-scoped logging interface.
///
/// `RequestLog` is obtained from [`RequestMeta::log`](crate::RequestMeta::log)
/// or built directly for work done outside a request. It is lifetime-bound to
/// the request id it borrows.
///
/// Secret values are redacted when logged because of their `Debug` and
/// `Display` implementations.
///
/// All log messages include the request ID for tracing.
///
/// # Examples
///
/// ```
/// use exercise_portal::{RequestLog, Secret};
///
/// let log = RequestLog::new("req-42");
/// let token = Secret::new("hunter2".to_string());
/// log.info(format_args!("authenticating with {}", token));
/// assert_eq!(log.request_id(), "req-42");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequestLog<'a> {
    request_id: &'a str,
}

impl<'a> RequestLog<'a> {
    /// Creates a logger for a request ID.
    pub fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs an info-level message with request ID.
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a warning-level message with request ID.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, "{}", args);
    }

    /// Logs an error-level message with request ID.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, "{}", args);
    }
}
