use serde_json::Value;
use std::fmt;

/// The analysis backend answered, but with an error instead of a report.
#[derive(Debug, Clone)]
pub struct BackendRejected {
    pub backend: &'static str,
    pub status: u16,
    pub message: String,
    pub raw_response_json: Option<Value>,
}

impl BackendRejected {
    /// 4xx and in-band errors will not succeed on retry.
    pub fn is_permanent(&self) -> bool {
        (400..500).contains(&self.status) || (200..300).contains(&self.status)
    }
}

impl fmt::Display for BackendRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "analysis backend rejected request (backend={}, status={}): {}",
            self.backend, self.status, self.message
        )
    }
}

impl std::error::Error for BackendRejected {}
