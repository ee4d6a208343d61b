use serde::Serialize;
use webscout_core::Classification;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stable machine-readable error codes. The envelope serializer is the sole
/// translator from classified failures into this taxonomy; the mapping to
/// exit codes is authoritative and must not drift.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidUsage,
    PolicyRefused,
    NotFound,
    Blocked,
    NeedsRender,
    RobotsDisallow,
    Timeout,
    TransportError,
    ProviderError,
    ParseError,
    ExtractionFailed,
    IoError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUsage => "invalid_usage",
            Self::PolicyRefused => "policy_refused",
            Self::NotFound => "not_found",
            Self::Blocked => "blocked",
            Self::NeedsRender => "needs_render",
            Self::RobotsDisallow => "robots_disallow",
            Self::Timeout => "timeout",
            Self::TransportError => "transport_error",
            Self::ProviderError => "provider_error",
            Self::ParseError => "parse_error",
            Self::ExtractionFailed => "extraction_failed",
            Self::IoError => "io_error",
            Self::InternalError => "internal_error",
        }
    }

    /// 0 success, 1 runtime, 2 usage/policy, 3 not found, 4 blocked
    /// (incl. robots), 5 needs render.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::InvalidUsage | Self::PolicyRefused => 2,
            Self::NotFound => 3,
            Self::Blocked | Self::RobotsDisallow => 4,
            Self::NeedsRender => 5,
            Self::Timeout
            | Self::TransportError
            | Self::ProviderError
            | Self::ParseError
            | Self::ExtractionFailed
            | Self::IoError
            | Self::InternalError => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CmdError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl CmdError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code.as_str(),
            "message": self.message,
            "details": self.details,
        })
    }

    /// Lift a fetch classification into the error taxonomy. `Ok` has no
    /// error shape and must not reach this.
    pub fn from_classification(
        classification: Classification,
        reason: Option<&str>,
        next_steps: &[String],
        url: &str,
    ) -> Self {
        let code = match classification {
            Classification::Blocked => ErrorCode::Blocked,
            Classification::NeedsRender => ErrorCode::NeedsRender,
            Classification::NotFound => ErrorCode::NotFound,
            Classification::Timeout => ErrorCode::Timeout,
            Classification::TransportError | Classification::Ok => ErrorCode::TransportError,
        };
        let message = match classification {
            Classification::Blocked => format!(
                "URL blocked or access denied ({})",
                reason.unwrap_or("blocked")
            ),
            Classification::NeedsRender => {
                "page appears to require JavaScript rendering".to_string()
            }
            Classification::NotFound => "URL returned 404 (not found)".to_string(),
            _ => format!("transport failed ({})", reason.unwrap_or("error")),
        };
        Self::new(code, message).with_details(serde_json::json!({
            "url": url,
            "reason": reason,
            "next_steps": next_steps,
        }))
    }
}

impl From<webscout_core::Error> for CmdError {
    fn from(e: webscout_core::Error) -> Self {
        use webscout_core::Error as E;
        let code = match &e {
            E::InvalidUrl(_) | E::InvalidUsage(_) | E::NotSupported(_) => ErrorCode::InvalidUsage,
            E::Fetch(_) | E::Render(_) => ErrorCode::TransportError,
            E::Search(_) | E::NotConfigured(_) => ErrorCode::ProviderError,
            E::Extract(_) => ErrorCode::ExtractionFailed,
            E::Cache(_) | E::Io(_) => ErrorCode::IoError,
        };
        Self::new(code, e.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheMeta {
    pub hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_ratio: Option<f64>,
}

/// Assemble the canonical envelope. `ok=false` iff `error` is set.
pub fn envelope(
    command: &str,
    data: serde_json::Value,
    warnings: &[String],
    error: Option<&CmdError>,
    duration_ms: u128,
    cache: Option<&CacheMeta>,
    providers: &[String],
) -> serde_json::Value {
    serde_json::json!({
        "ok": error.is_none(),
        "command": command,
        "version": VERSION,
        "data": data,
        "warnings": warnings,
        "error": error.map(|e| e.to_value()),
        "meta": {
            "duration_ms": duration_ms as u64,
            "cache": cache,
            "providers": providers,
        },
    })
}
