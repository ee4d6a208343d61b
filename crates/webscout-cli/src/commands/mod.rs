use crate::envelope::{CmdError, ErrorCode};
use crate::support::{enforce_robots_policy, enforce_url_policy, Settings};
use std::collections::BTreeMap;
use webscout_core::{
    ArtifactInfo, Classification, Document, FetchMethod, FetchRequest, HttpInfo, RenderBackend,
    RenderInfo, RenderOptions, RenderedPage,
};
use webscout_local::robots::RobotsChecker;
use webscout_local::HttpFetcher;

pub mod eval;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod search;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Http,
    Browser,
    Auto,
}

impl std::str::FromStr for Method {
    type Err = CmdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "browser" => Ok(Self::Browser),
            "auto" => Ok(Self::Auto),
            other => Err(CmdError::new(
                ErrorCode::InvalidUsage,
                format!("unknown method: {other}"),
            )),
        }
    }
}

pub fn document_value(doc: &Document) -> serde_json::Value {
    serde_json::to_value(doc).unwrap_or(serde_json::Value::Null)
}

/// A retrieved page ready for extraction.
pub struct Retrieved {
    pub document: Document,
    pub html: String,
    /// None when no HTTP fetch happened (browser-only path).
    pub cache_hit: Option<bool>,
    /// Transport collaborators actually used, in invocation order.
    pub providers: Vec<&'static str>,
}

/// A failed leg still carries its Document when transport produced one, so
/// callers can embed it in the envelope.
pub struct LegFailure {
    pub error: CmdError,
    pub document: Option<Document>,
}

impl From<CmdError> for LegFailure {
    fn from(error: CmdError) -> Self {
        Self {
            error,
            document: None,
        }
    }
}

pub struct LegDeps<'a> {
    pub fetcher: &'a HttpFetcher,
    pub renderer: &'a dyn RenderBackend,
    pub robots: &'a RobotsChecker,
    pub settings: &'a Settings,
}

pub fn document_from_render(url: &str, page: &RenderedPage) -> Document {
    let mut doc = Document::from_url(url, FetchMethod::Browser);
    doc.http = Some(HttpInfo {
        status: page.status.unwrap_or(0),
        final_url: page.final_url.clone(),
        redirect_chain: if page.final_url == url {
            vec![url.to_string()]
        } else {
            vec![url.to_string(), page.final_url.clone()]
        },
        headers: BTreeMap::new(),
        bytes_read: page.html.len() as u64,
    });
    doc.artifact = Some(ArtifactInfo {
        content_type: Some("text/html".to_string()),
        body_path: None,
        body_bytes: page.html.len() as u64,
        truncated: false,
    });
    doc.render = Some(RenderInfo {
        screenshot_path: page.screenshot_path.clone(),
        dom_snapshot_id: page.dom_snapshot_id.clone(),
        wait_strategy_used: page.wait_strategy_used.clone(),
    });
    doc
}

/// The transport half of the extract pipeline: policy gate → robots gate →
/// http fetch → optional browser escalation on `needs_render`.
pub async fn retrieve_html(
    deps: &LegDeps<'_>,
    url: &str,
    method: Method,
    headers: &BTreeMap<String, String>,
    operation: &str,
    warnings: &mut Vec<String>,
) -> Result<Retrieved, LegFailure> {
    enforce_url_policy(&deps.settings.policy, url, operation)?;
    let user_agent = headers
        .get("user-agent")
        .map(String::as_str)
        .unwrap_or("webscout");
    enforce_robots_policy(deps.robots, &deps.settings.policy, url, user_agent, warnings).await?;

    let mut providers: Vec<&'static str> = Vec::new();
    if matches!(method, Method::Http | Method::Auto) {
        providers.push("http");
        let mut req = FetchRequest::new(url);
        req.headers = headers.clone();
        req.timeout_ms = Some(deps.settings.policy.timeout_ms);
        req.max_bytes = Some(deps.settings.policy.max_bytes);
        req.follow_redirects = deps.settings.policy.follow_redirects;
        req.detect_blocks = deps.settings.policy.detect_blocks;
        req.cache.read = !deps.settings.cache_fresh && deps.settings.cache_enabled;
        req.cache.write = deps.settings.cache_enabled;
        req.cache.ttl_s = Some(deps.settings.cache_ttl.as_secs());

        let outcome = deps.fetcher.fetch(&req).await.map_err(CmdError::from)?;
        for w in &outcome.document.warnings {
            crate::support::push_warning(warnings, w.clone());
        }
        match outcome.classification {
            Classification::Ok => {
                return Ok(Retrieved {
                    html: String::from_utf8_lossy(&outcome.body).to_string(),
                    document: outcome.document,
                    cache_hit: Some(outcome.cache_hit),
                    providers,
                });
            }
            Classification::NeedsRender if method == Method::Auto => {
                crate::support::push_warning(
                    warnings,
                    format!("{url} needs JavaScript rendering; escalating to browser"),
                );
            }
            other => {
                return Err(LegFailure {
                    error: CmdError::from_classification(
                        other,
                        outcome.reason.as_deref(),
                        &outcome.next_steps,
                        url,
                    ),
                    document: Some(outcome.document),
                });
            }
        }
    }

    // Browser path: explicit `--method browser`, or auto escalation.
    providers.push("browser");
    let options = RenderOptions {
        timeout_ms: deps.settings.policy.timeout_ms,
        proxy: deps.settings.proxy.clone(),
        evidence_dir: Some(deps.settings.evidence_dir_or_default()),
        ..Default::default()
    };
    let page = deps
        .renderer
        .render(url, &options)
        .await
        .map_err(CmdError::from)?;
    let document = document_from_render(url, &page);
    Ok(Retrieved {
        html: page.html,
        document,
        cache_hit: None,
        providers,
    })
}
