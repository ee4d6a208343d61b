use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid usage: {0}")]
    InvalidUsage(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("render failed: {0}")]
    Render(String),
    #[error("extraction failed: {0}")]
    Extract(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// RFC3339 UTC wall-clock instant, second precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    Http,
    Browser,
    /// Content handed to us directly (file path or stdin), no transport.
    Provided,
}

impl FetchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Browser => "browser",
            Self::Provided => "provided",
        }
    }
}

/// Terminal classification of one transport attempt.
///
/// The fetch engine never signals expected network conditions by erroring;
/// it classifies. Only programmer errors (invalid URL, forbidden header)
/// propagate as `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Ok,
    Blocked,
    NeedsRender,
    NotFound,
    Timeout,
    TransportError,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Blocked => "blocked",
            Self::NeedsRender => "needs_render",
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::TransportError => "transport_error",
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpInfo {
    pub status: u16,
    pub final_url: String,
    /// Ordered hop-by-hop URLs, first request included, final URL last.
    pub redirect_chain: Vec<String>,
    /// Whitelisted response headers only (content-type, content-length,
    /// date, last-modified, etag). Never Set-Cookie.
    pub headers: BTreeMap<String, String>,
    pub bytes_read: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactInfo {
    /// Normalized content type, post-sniffing.
    pub content_type: Option<String>,
    /// On-disk location of the raw body (cache entry or temp file).
    pub body_path: Option<String>,
    pub body_bytes: u64,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderInfo {
    pub screenshot_path: Option<String>,
    pub dom_snapshot_id: Option<String>,
    pub wait_strategy_used: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocLink {
    pub text: String,
    /// Absolute URL, resolved against the document base.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSection {
    pub heading_level: u8,
    pub heading_text: String,
    pub body_markdown: String,
    pub links: Vec<DocLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub language: Option<String>,
    pub markdown: Option<String>,
    pub text: Option<String>,
    /// SHA-256 hex over the canonical markdown; used by eval for drift detection.
    pub content_hash: Option<String>,
    pub extraction_method: String,
    pub extraction_version: String,
    /// Present for the docs strategy only.
    pub doc_sections: Option<Vec<DocSection>>,
}

/// The shared unit carried between fetch, render, and extract.
///
/// Invariant: every document has a non-empty origin (`url` or `source_path`)
/// and a `fetched_at` timestamp. Optional fields serialize as explicit null,
/// never as empty sentinels. Documents are enriched, then consumed; the
/// envelope serializer never mutates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub url: Option<String>,
    pub source_path: Option<String>,
    /// ISO-8601 UTC.
    pub fetched_at: String,
    pub fetch_method: FetchMethod,
    pub http: Option<HttpInfo>,
    pub artifact: Option<ArtifactInfo>,
    pub render: Option<RenderInfo>,
    pub extracted: Option<ExtractedContent>,
    pub warnings: Vec<String>,
}

impl Document {
    pub fn from_url(url: impl Into<String>, fetch_method: FetchMethod) -> Self {
        Self {
            url: Some(url.into()),
            source_path: None,
            fetched_at: now_rfc3339(),
            fetch_method,
            http: None,
            artifact: None,
            render: None,
            extracted: None,
            warnings: Vec::new(),
        }
    }

    pub fn from_source_path(path: impl Into<String>) -> Self {
        Self {
            url: None,
            source_path: Some(path.into()),
            fetched_at: now_rfc3339(),
            fetch_method: FetchMethod::Provided,
            http: None,
            artifact: None,
            render: None,
            extracted: None,
            warnings: Vec::new(),
        }
    }

    /// Origin identifier for display purposes.
    pub fn origin(&self) -> &str {
        self.url
            .as_deref()
            .or(self.source_path.as_deref())
            .unwrap_or("")
    }

    /// Append a warning, deduplicated by exact string, discovery order kept.
    pub fn push_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachePolicy {
    pub read: bool,
    pub write: bool,
    /// Entries older than this are treated as a miss at read time.
    pub ttl_s: Option<u64>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            read: true,
            write: true,
            ttl_s: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Request headers. `Authorization`, `Cookie`, and `Set-Cookie` are
    /// rejected as usage errors before transport.
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: Option<u64>,
    /// Hard cap on bytes read from the response body.
    pub max_bytes: Option<u64>,
    pub follow_redirects: bool,
    /// When false, classification drops to status-based only.
    pub detect_blocks: bool,
    pub cache: CachePolicy,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: None,
            max_bytes: None,
            follow_redirects: true,
            detect_blocks: true,
            cache: CachePolicy::default(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// A classified transport result: the document, its raw body, and what the
/// caller should consider doing next.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub document: Document,
    pub body: Vec<u8>,
    pub classification: Classification,
    /// Short machine-usable reason, e.g. `http_403`, `consent_wall`, `timeout`.
    pub reason: Option<String>,
    /// Ordered suggestions for subsequent commands/flags.
    pub next_steps: Vec<String>,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: usize,
    pub region: Option<String>,
    pub safe_search: Option<String>,
    pub time_range: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
    pub published_at: Option<String>,
    pub source_provider: String,
    pub score: Option<f64>,
    /// Stable short hash of (provider, url, title).
    pub result_id: String,
}

#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    fn id(&self) -> &'static str;
    /// `None` means enabled; `Some(reason)` explains why the provider is not.
    fn disabled_reason(&self) -> Option<String>;
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>>;
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub timeout_ms: u64,
    pub proxy: Option<String>,
    /// Extra wait after load, milliseconds.
    pub wait_ms: u64,
    /// CSS selector or `network-idle`.
    pub wait_for: Option<String>,
    pub headful: bool,
    pub screenshot: bool,
    pub evidence_dir: Option<std::path::PathBuf>,
    /// Real user profile. Renders under a profile are privileged: artifacts
    /// must not be persisted to the shared cache.
    pub profile_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub final_url: String,
    pub status: Option<u16>,
    pub screenshot_path: Option<String>,
    pub dom_snapshot_id: Option<String>,
    pub wait_strategy_used: String,
}

/// The browser engine is an opaque collaborator; the core only consumes
/// this interface.
#[async_trait::async_trait]
pub trait RenderBackend: Send + Sync {
    fn id(&self) -> &'static str;
    fn disabled_reason(&self) -> Option<String>;
    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderedPage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    Standard,
    Strict,
    Permissive,
}

impl PolicyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Strict => "strict",
            Self::Permissive => "permissive",
        }
    }
}

impl std::str::FromStr for PolicyMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(Error::InvalidUsage(format!("unknown policy mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotsMode {
    Warn,
    Respect,
    Ignore,
}

impl RobotsMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Respect => "respect",
            Self::Ignore => "ignore",
        }
    }
}

impl std::str::FromStr for RobotsMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "respect" => Ok(Self::Respect),
            "ignore" => Ok(Self::Ignore),
            other => Err(Error::InvalidUsage(format!("unknown robots mode: {other}"))),
        }
    }
}

/// Resolved policy for one command invocation.
///
/// Derived with precedence: flags > env > project config > user config >
/// mode defaults. Resolution lives in the CLI crate; this is the value
/// object every component consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub mode: PolicyMode,
    pub allow_domains: Vec<String>,
    pub block_domains: Vec<String>,
    pub robots_mode: RobotsMode,
    pub redact: bool,
    pub detect_blocks: bool,
    pub follow_redirects: bool,
    pub timeout_ms: u64,
    pub max_bytes: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            mode: PolicyMode::Standard,
            allow_domains: Vec::new(),
            block_domains: Vec::new(),
            robots_mode: RobotsMode::Warn,
            redact: false,
            detect_blocks: true,
            follow_redirects: true,
            timeout_ms: 15_000,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_requires_an_origin() {
        let doc = Document::from_url("https://example.com/", FetchMethod::Http);
        assert_eq!(doc.origin(), "https://example.com/");
        let doc = Document::from_source_path("./page.html");
        assert_eq!(doc.origin(), "./page.html");
        assert_eq!(doc.fetch_method, FetchMethod::Provided);
    }

    #[test]
    fn warnings_dedup_and_keep_discovery_order() {
        let mut doc = Document::from_url("https://example.com/", FetchMethod::Http);
        doc.push_warning("b");
        doc.push_warning("a");
        doc.push_warning("b");
        assert_eq!(doc.warnings, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn optional_fields_serialize_as_explicit_null() {
        let doc = Document::from_url("https://example.com/", FetchMethod::Http);
        let v = serde_json::to_value(&doc).unwrap();
        assert!(v.get("extracted").unwrap().is_null());
        assert!(v.get("http").unwrap().is_null());
        assert_eq!(v["fetch_method"], "http");
    }

    #[test]
    fn classification_names_are_stable() {
        assert_eq!(Classification::NeedsRender.as_str(), "needs_render");
        assert_eq!(
            serde_json::to_value(Classification::TransportError).unwrap(),
            serde_json::json!("transport_error")
        );
    }

    #[test]
    fn fetched_at_is_rfc3339_utc() {
        let ts = now_rfc3339();
        assert!(ts.ends_with('Z'), "expected UTC suffix: {ts}");
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
