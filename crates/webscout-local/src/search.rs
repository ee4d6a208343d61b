use scraper::{Html, Selector};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use url::Url;
use webscout_core::{
    Error, PolicyMode, Result, SearchProvider, SearchQuery, SearchResultItem,
};

fn timeout_ms(q: &SearchQuery) -> u64 {
    // Provider requests can hang indefinitely without an explicit timeout.
    // Keep a conservative cap even if callers pass something huge.
    q.timeout_ms.unwrap_or(20_000).clamp(1_000, 60_000)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_truthy(key: &str) -> bool {
    matches!(
        std::env::var(key)
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Stable short identifier for one result: hash of provider + url + title.
pub fn result_id(provider: &str, url: &str, title: &str) -> String {
    let mut h = Sha256::new();
    h.update(provider.as_bytes());
    h.update(b"\n");
    h.update(url.as_bytes());
    h.update(b"\n");
    h.update(title.as_bytes());
    hex::encode(h.finalize())[..16].to_string()
}

// --- brave_api ---------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BraveApiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    results: Option<Vec<BraveItem>>,
}

#[derive(Debug, Deserialize)]
struct BraveItem {
    url: String,
    title: Option<String>,
    description: Option<String>,
    age: Option<String>,
}

impl BraveApiProvider {
    pub fn from_env(client: reqwest::Client) -> Self {
        Self {
            client,
            api_key: env_nonempty("BRAVE_API_KEY"),
        }
    }

    fn endpoint() -> String {
        // Override exists for tests / enterprise proxies.
        env_nonempty("WEBSCOUT_BRAVE_ENDPOINT")
            .unwrap_or_else(|| "https://api.search.brave.com/res/v1/web/search".to_string())
    }

    fn region_params(region: &str) -> (Option<String>, Option<String>) {
        // region examples: "us-en", "uk-en", "wt-wt"
        let mut parts = region.splitn(2, '-');
        let country = parts.next().unwrap_or("").to_ascii_uppercase();
        let lang = parts.next().unwrap_or("").to_ascii_lowercase();
        (
            (!country.is_empty() && country != "WT").then_some(country),
            (!lang.is_empty() && lang != "wt").then_some(lang),
        )
    }

    fn freshness(time_range: &str) -> Option<&'static str> {
        match time_range.to_ascii_lowercase().as_str() {
            "d" => Some("pd"),
            "w" => Some("pw"),
            "m" => Some("pm"),
            "y" => Some("py"),
            _ => None,
        }
    }

    fn items_from(payload: BraveResponse, max_results: usize) -> Vec<SearchResultItem> {
        let mut out = Vec::new();
        let items = payload.web.and_then(|w| w.results).unwrap_or_default();
        for item in items {
            let title = item.title.unwrap_or_default();
            if title.trim().is_empty() || item.url.trim().is_empty() {
                continue;
            }
            out.push(SearchResultItem {
                result_id: result_id("brave_api", &item.url, &title),
                title,
                url: item.url,
                snippet: item.description.filter(|s| !s.trim().is_empty()),
                published_at: item.age.filter(|s| !s.trim().is_empty()),
                source_provider: "brave_api".to_string(),
                score: None,
            });
            if out.len() >= max_results {
                break;
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl SearchProvider for BraveApiProvider {
    fn id(&self) -> &'static str {
        "brave_api"
    }

    fn disabled_reason(&self) -> Option<String> {
        if self.api_key.is_none() {
            Some("missing BRAVE_API_KEY".to_string())
        } else {
            None
        }
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::NotConfigured("missing BRAVE_API_KEY".to_string()));
        };
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.query.clone()),
            ("count", query.max_results.to_string()),
        ];
        if let Some(safe) = query.safe_search.as_deref() {
            params.push(("safesearch", safe.to_string()));
        }
        if let Some(region) = query.region.as_deref() {
            let (country, lang) = Self::region_params(region);
            if let Some(country) = country {
                params.push(("country", country));
            }
            if let Some(lang) = lang {
                params.push(("search_lang", lang.clone()));
                params.push(("ui_lang", lang));
            }
        }
        if let Some(range) = query.time_range.as_deref() {
            if let Some(freshness) = Self::freshness(range) {
                params.push(("freshness", freshness.to_string()));
            }
        }

        let resp = self
            .client
            .get(Self::endpoint())
            .query(&params)
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X-Subscription-Token", api_key)
            .timeout(std::time::Duration::from_millis(timeout_ms(query)))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let status = resp.status();
        if status.as_u16() == 401 {
            return Err(Error::Search(
                "brave_api authentication failed (check BRAVE_API_KEY)".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(Error::Search(format!("brave_api returned HTTP {status}")));
        }
        let payload: BraveResponse = resp.json().await.map_err(|e| Error::Search(e.to_string()))?;
        Ok(Self::items_from(payload, query.max_results))
    }
}

// --- searxng_local -----------------------------------------------------

#[derive(Debug, Clone)]
pub struct SearxngProvider {
    client: reqwest::Client,
    base: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    results: Option<Vec<SearxngItem>>,
}

#[derive(Debug, Deserialize)]
struct SearxngItem {
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    score: Option<f64>,
}

impl SearxngProvider {
    pub fn from_env(client: reqwest::Client) -> Self {
        Self {
            client,
            base: env_nonempty("SEARXNG_BASE_URL"),
        }
    }

    fn search_endpoint(base: &str) -> String {
        // Accept either a bare base URL or a full /search endpoint.
        let mut base = base.trim().trim_end_matches('/').to_string();
        if !base.ends_with("/search") {
            base.push_str("/search");
        }
        base
    }
}

#[async_trait::async_trait]
impl SearchProvider for SearxngProvider {
    fn id(&self) -> &'static str {
        "searxng_local"
    }

    fn disabled_reason(&self) -> Option<String> {
        if self.base.is_none() {
            Some("missing SEARXNG_BASE_URL".to_string())
        } else {
            None
        }
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>> {
        let Some(base) = self.base.as_deref() else {
            return Err(Error::NotConfigured("missing SEARXNG_BASE_URL".to_string()));
        };
        let mut req = self
            .client
            .get(Self::search_endpoint(base))
            .query(&[("q", query.query.as_str()), ("format", "json")]);
        if let Some(region) = query.region.as_deref() {
            req = req.query(&[("language", region)]);
        }
        let resp = req
            .timeout(std::time::Duration::from_millis(timeout_ms(query)))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("searxng returned HTTP {status}")));
        }
        let payload: SearxngResponse =
            resp.json().await.map_err(|e| Error::Search(e.to_string()))?;

        let mut out = Vec::new();
        for item in payload.results.unwrap_or_default() {
            let (Some(url), Some(title)) = (item.url, item.title) else {
                continue;
            };
            if url.trim().is_empty() || title.trim().is_empty() {
                continue;
            }
            out.push(SearchResultItem {
                result_id: result_id("searxng_local", &url, &title),
                title,
                url,
                snippet: item.content.filter(|s| !s.trim().is_empty()),
                published_at: item.published_date.filter(|s| !s.trim().is_empty()),
                source_provider: "searxng_local".to_string(),
                score: item.score,
            });
            if out.len() >= query.max_results {
                break;
            }
        }
        Ok(out)
    }
}

// --- firecrawl_endpoint ------------------------------------------------

#[derive(Debug, Clone)]
pub struct FirecrawlProvider {
    client: reqwest::Client,
    base: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirecrawlResponse {
    success: Option<bool>,
    data: Option<FirecrawlData>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FirecrawlData {
    Web { web: Option<Vec<FirecrawlItem>> },
    Items(Vec<FirecrawlItem>),
}

#[derive(Debug, Deserialize)]
struct FirecrawlItem {
    url: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

impl FirecrawlProvider {
    pub fn from_env(client: reqwest::Client) -> Self {
        Self {
            client,
            base: env_nonempty("FIRECRAWL_BASE_URL"),
            api_key: env_nonempty("FIRECRAWL_API_KEY"),
        }
    }

    /// Endpoint integrations talk to someone else's box. In auto fallback
    /// only a local instance participates unless the operator opted in via
    /// FIRECRAWL_ALLOW_AUTO or runs under the permissive policy.
    pub fn auto_eligible(&self, mode: PolicyMode) -> bool {
        if mode == PolicyMode::Permissive || env_truthy("FIRECRAWL_ALLOW_AUTO") {
            return true;
        }
        let Some(base) = self.base.as_deref() else {
            return false;
        };
        Url::parse(base)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .map(|h| matches!(h.as_str(), "localhost" | "127.0.0.1" | "::1" | "[::1]"))
            .unwrap_or(false)
    }
}

#[async_trait::async_trait]
impl SearchProvider for FirecrawlProvider {
    fn id(&self) -> &'static str {
        "firecrawl_endpoint"
    }

    fn disabled_reason(&self) -> Option<String> {
        if self.base.is_none() {
            Some("missing FIRECRAWL_BASE_URL".to_string())
        } else {
            None
        }
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>> {
        let Some(base) = self.base.as_deref() else {
            return Err(Error::NotConfigured("missing FIRECRAWL_BASE_URL".to_string()));
        };
        let endpoint = format!("{}/v2/search", base.trim_end_matches('/'));
        let mut req = self
            .client
            .post(endpoint)
            .json(&serde_json::json!({
                "query": query.query,
                "limit": query.max_results,
            }))
            .timeout(std::time::Duration::from_millis(timeout_ms(query)));
        if let Some(key) = self.api_key.as_deref() {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("firecrawl returned HTTP {status}")));
        }
        let payload: FirecrawlResponse =
            resp.json().await.map_err(|e| Error::Search(e.to_string()))?;
        if payload.success == Some(false) {
            return Err(Error::Search("firecrawl returned success=false".to_string()));
        }
        let items = match payload.data {
            Some(FirecrawlData::Web { web }) => web.unwrap_or_default(),
            Some(FirecrawlData::Items(items)) => items,
            None => Vec::new(),
        };
        let mut out = Vec::new();
        for item in items {
            let (Some(url), Some(title)) = (item.url, item.title) else {
                continue;
            };
            if url.trim().is_empty() || title.trim().is_empty() {
                continue;
            }
            out.push(SearchResultItem {
                result_id: result_id("firecrawl_endpoint", &url, &title),
                title,
                url,
                snippet: item.description.filter(|s| !s.trim().is_empty()),
                published_at: None,
                source_provider: "firecrawl_endpoint".to_string(),
                score: None,
            });
            if out.len() >= query.max_results {
                break;
            }
        }
        Ok(out)
    }
}

// --- ddgs --------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DdgProvider {
    client: reqwest::Client,
}

impl DdgProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn endpoint() -> String {
        env_nonempty("WEBSCOUT_DDG_ENDPOINT")
            .unwrap_or_else(|| "https://html.duckduckgo.com/html/".to_string())
    }

    /// DuckDuckGo result hrefs are redirect links carrying the target in a
    /// `uddg` query parameter; unwrap it when present.
    fn unwrap_redirect(href: &str) -> Option<String> {
        let absolute = if href.starts_with("//") {
            format!("https:{href}")
        } else {
            href.to_string()
        };
        let parsed = Url::parse(&absolute).ok()?;
        if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
            let target = target.into_owned();
            return Url::parse(&target).ok().map(|u| u.to_string());
        }
        matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
    }

    fn parse_results(html: &str, max_results: usize) -> Vec<SearchResultItem> {
        let doc = Html::parse_document(html);
        let sel_result = Selector::parse(".result").expect("static selector");
        let sel_link = Selector::parse("a.result__a").expect("static selector");
        let sel_snippet = Selector::parse(".result__snippet").expect("static selector");

        let mut out = Vec::new();
        for container in doc.select(&sel_result) {
            let Some(anchor) = container.select(&sel_link).next() else {
                continue;
            };
            let title: String = anchor.text().collect::<Vec<_>>().join(" ");
            let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(url) = Self::unwrap_redirect(href) else {
                continue;
            };
            if title.is_empty() {
                continue;
            }
            let snippet = container.select(&sel_snippet).next().map(|s| {
                s.text()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            });
            out.push(SearchResultItem {
                result_id: result_id("ddgs", &url, &title),
                title,
                url,
                snippet: snippet.filter(|s| !s.is_empty()),
                published_at: None,
                source_provider: "ddgs".to_string(),
                score: None,
            });
            if out.len() >= max_results {
                break;
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl SearchProvider for DdgProvider {
    fn id(&self) -> &'static str {
        "ddgs"
    }

    fn disabled_reason(&self) -> Option<String> {
        None
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultItem>> {
        let mut params: Vec<(&str, String)> = vec![("q", query.query.clone())];
        if let Some(region) = query.region.as_deref() {
            params.push(("kl", region.to_string()));
        }
        let resp = self
            .client
            .get(Self::endpoint())
            .query(&params)
            .timeout(std::time::Duration::from_millis(timeout_ms(query)))
            .send()
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Search(format!("ddgs returned HTTP {status}")));
        }
        let html = resp.text().await.map_err(|e| Error::Search(e.to_string()))?;
        Ok(Self::parse_results(&html, query.max_results))
    }
}

// --- registry ----------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProviderMeta {
    pub id: &'static str,
    pub kind: &'static str,
    pub required_env: &'static [&'static str],
    pub privacy_warning: Option<&'static str>,
}

pub struct RegisteredProvider {
    pub provider: Arc<dyn SearchProvider>,
    pub meta: ProviderMeta,
    /// Whether this provider may be picked by `auto` under the given mode.
    /// Explicit `--provider` selection bypasses this gate.
    auto_gate: Arc<dyn Fn(PolicyMode) -> bool + Send + Sync>,
}

impl RegisteredProvider {
    pub fn enabled(&self) -> bool {
        self.provider.disabled_reason().is_none()
    }

    pub fn auto_eligible(&self, mode: PolicyMode) -> bool {
        (self.auto_gate)(mode)
    }
}

fn open_gate() -> Arc<dyn Fn(PolicyMode) -> bool + Send + Sync> {
    Arc::new(|_| true)
}

/// Static ordered provider list; `auto` selection is first-enabled-match in
/// this order.
pub fn search_registry(client: &reqwest::Client) -> Vec<RegisteredProvider> {
    let firecrawl = Arc::new(FirecrawlProvider::from_env(client.clone()));
    let firecrawl_for_gate = firecrawl.clone();
    vec![
        RegisteredProvider {
            provider: Arc::new(BraveApiProvider::from_env(client.clone())),
            meta: ProviderMeta {
                id: "brave_api",
                kind: "search",
                required_env: &["BRAVE_API_KEY"],
                privacy_warning: Some("brave_api sends queries to the Brave Search API."),
            },
            auto_gate: open_gate(),
        },
        RegisteredProvider {
            provider: Arc::new(SearxngProvider::from_env(client.clone())),
            meta: ProviderMeta {
                id: "searxng_local",
                kind: "search",
                required_env: &["SEARXNG_BASE_URL"],
                privacy_warning: None,
            },
            auto_gate: open_gate(),
        },
        RegisteredProvider {
            provider: firecrawl,
            meta: ProviderMeta {
                id: "firecrawl_endpoint",
                kind: "search",
                required_env: &["FIRECRAWL_BASE_URL"],
                privacy_warning: Some(
                    "firecrawl_endpoint sends queries to the configured Firecrawl endpoint.",
                ),
            },
            auto_gate: Arc::new(move |mode| firecrawl_for_gate.auto_eligible(mode)),
        },
        RegisteredProvider {
            provider: Arc::new(DdgProvider::new(client.clone())),
            meta: ProviderMeta {
                id: "ddgs",
                kind: "search",
                required_env: &[],
                privacy_warning: Some(
                    "ddgs uses DuckDuckGo public endpoints; queries are sent to third-party services.",
                ),
            },
            auto_gate: open_gate(),
        },
    ]
}

/// Resolve `--provider`: an explicit id must exist and be enabled; `auto`
/// picks the first enabled provider in registry order, with the Firecrawl
/// endpoint participating only when it is auto-eligible.
pub fn select_provider(
    registry: &[RegisteredProvider],
    requested: &str,
    mode: PolicyMode,
) -> Result<Arc<dyn SearchProvider>> {
    let requested = requested.trim();
    if requested != "auto" {
        let Some(entry) = registry.iter().find(|p| p.meta.id == requested) else {
            return Err(Error::InvalidUsage(format!(
                "unknown provider: {requested}"
            )));
        };
        if let Some(reason) = entry.provider.disabled_reason() {
            return Err(Error::NotConfigured(format!(
                "provider disabled: {requested} ({reason})"
            )));
        }
        return Ok(entry.provider.clone());
    }

    for entry in registry {
        if !entry.enabled() || !entry.auto_eligible(mode) {
            continue;
        }
        return Ok(entry.provider.clone());
    }
    // ddgs is always enabled, so auto can only fail if the registry is empty.
    Err(Error::NotConfigured("no search provider available".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn result_ids_are_stable_and_distinct() {
        let a = result_id("brave_api", "https://example.com/", "Title");
        let b = result_id("brave_api", "https://example.com/", "Title");
        let c = result_id("ddgs", "https://example.com/", "Title");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn brave_payload_maps_to_items() {
        let payload: BraveResponse = serde_json::from_str(
            r#"{"web":{"results":[
                {"url":"https://example.com/a","title":"A","description":"first"},
                {"url":"https://example.com/b","title":"","description":"skipped"},
                {"url":"https://example.com/c","title":"C","age":"2024-01-01"}
            ]}}"#,
        )
        .unwrap();
        let items = BraveApiProvider::items_from(payload, 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "A");
        assert_eq!(items[0].snippet.as_deref(), Some("first"));
        assert_eq!(items[1].published_at.as_deref(), Some("2024-01-01"));
        assert!(items.iter().all(|i| i.source_provider == "brave_api"));
    }

    #[test]
    fn brave_region_and_freshness_mapping() {
        assert_eq!(
            BraveApiProvider::region_params("us-en"),
            (Some("US".to_string()), Some("en".to_string()))
        );
        assert_eq!(BraveApiProvider::region_params("wt-wt"), (None, None));
        assert_eq!(BraveApiProvider::freshness("w"), Some("pw"));
        assert_eq!(BraveApiProvider::freshness("x"), None);
    }

    #[test]
    fn ddg_html_parsing_unwraps_redirect_links() {
        let html = r#"<html><body>
<div class="result">
  <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fdocs&rut=x">Example Docs</a>
  <a class="result__snippet">A reference site.</a>
</div>
<div class="result">
  <a class="result__a" href="https://plain.example/page">Plain Link</a>
</div>
</body></html>"#;
        let items = DdgProvider::parse_results(html, 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://example.com/docs");
        assert_eq!(items[0].title, "Example Docs");
        assert_eq!(items[0].snippet.as_deref(), Some("A reference site."));
        assert_eq!(items[1].url, "https://plain.example/page");
    }

    #[test]
    fn auto_selection_prefers_brave_then_falls_back_to_ddg() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("BRAVE_API_KEY");
        std::env::remove_var("SEARXNG_BASE_URL");
        std::env::remove_var("FIRECRAWL_BASE_URL");
        std::env::remove_var("FIRECRAWL_ALLOW_AUTO");

        let client = reqwest::Client::new();
        let registry = search_registry(&client);
        let picked = select_provider(&registry, "auto", PolicyMode::Standard).unwrap();
        assert_eq!(picked.id(), "ddgs");

        std::env::set_var("BRAVE_API_KEY", "test-key");
        let registry = search_registry(&client);
        let picked = select_provider(&registry, "auto", PolicyMode::Standard).unwrap();
        assert_eq!(picked.id(), "brave_api");
        std::env::remove_var("BRAVE_API_KEY");
    }

    #[test]
    fn remote_firecrawl_is_skipped_in_standard_auto() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("BRAVE_API_KEY");
        std::env::remove_var("SEARXNG_BASE_URL");
        std::env::remove_var("FIRECRAWL_ALLOW_AUTO");
        std::env::set_var("FIRECRAWL_BASE_URL", "https://api.firecrawl.dev");

        let client = reqwest::Client::new();
        let fc = FirecrawlProvider::from_env(client.clone());
        assert!(!fc.auto_eligible(PolicyMode::Standard));
        assert!(fc.auto_eligible(PolicyMode::Permissive));

        std::env::set_var("FIRECRAWL_BASE_URL", "http://localhost:3002");
        let fc = FirecrawlProvider::from_env(client.clone());
        assert!(fc.auto_eligible(PolicyMode::Standard));

        std::env::remove_var("FIRECRAWL_BASE_URL");
    }

    #[test]
    fn explicit_unknown_or_disabled_providers_error() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("BRAVE_API_KEY");
        let client = reqwest::Client::new();
        let registry = search_registry(&client);
        assert!(matches!(
            select_provider(&registry, "nope", PolicyMode::Standard),
            Err(Error::InvalidUsage(_))
        ));
        assert!(matches!(
            select_provider(&registry, "brave_api", PolicyMode::Standard),
            Err(Error::NotConfigured(_))
        ));
    }
}
