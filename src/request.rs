use crate::logging::RequestLog;

/// Metadata about an incoming request.
///
/// Contains the request identifier and optional principal (the authenticated
/// administrator).
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Unique identifier for this request
    pub request_id: String,
    /// Authenticated principal, if any
    pub principal: Option<Principal>,
}

impl RequestMeta {
    /// Returns a logger that tags every event with this request's id.
    pub fn log(&self) -> RequestLog<'_> {
        RequestLog::new(&self.request_id)
    }
}

/// An authenticated user or service principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Unique identifier for this principal
    pub id: String,
}

impl Principal {
    /// The single portal administrator.
    pub fn admin() -> Self {
        Self { id: "admin".to_string() }
    }
}
