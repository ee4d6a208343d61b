use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use webscout_core::{
    ArtifactInfo, Classification, Document, Error, FetchMethod, FetchOutcome, FetchRequest,
    HttpInfo, Result,
};

pub mod extract;
pub mod markdown;
pub mod render;
pub mod robots;
pub mod safety;
pub mod search;
pub mod sniff;
pub mod urlutil;

const CACHE_SCHEMA_VERSION: u32 = 1;
const MAX_REDIRECT_HOPS: usize = 10;

/// Response headers worth keeping on a Document / cache sidecar.
///
/// Kept deliberately small; expand only when a field is proven useful and
/// safe. Set-Cookie never qualifies.
fn whitelist_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (k, v) in headers {
        match k.trim().to_ascii_lowercase().as_str() {
            "content-type" | "content-length" | "date" | "last-modified" | "etag" => {
                out.insert(k.trim().to_ascii_lowercase(), v.clone());
            }
            _ => {}
        }
    }
    out
}

fn epoch_s() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub dir: PathBuf,
    pub ttl: Duration,
    pub max_bytes: u64,
    pub enabled: bool,
    /// Force lookup misses, but keep storing on success.
    pub fresh: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntryMeta {
    pub schema_version: u32,
    /// "fetch" for raw bodies, "search" for serialized result lists.
    pub kind: String,
    pub stored_at: u64,
    pub last_accessed: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub final_url: String,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub redirect_chain: Vec<String>,
    #[serde(default)]
    pub body_bytes: u64,
    #[serde(default)]
    pub truncated: bool,
}

impl CacheEntryMeta {
    pub fn for_search(url: impl Into<String>) -> Self {
        Self {
            schema_version: CACHE_SCHEMA_VERSION,
            kind: "search".to_string(),
            stored_at: 0,
            last_accessed: 0,
            url: url.into(),
            final_url: String::new(),
            status: 0,
            content_type: Some("application/json".to_string()),
            headers: BTreeMap::new(),
            redirect_chain: Vec::new(),
            body_bytes: 0,
            truncated: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheHit {
    pub key: String,
    pub body_path: PathBuf,
    pub body: Vec<u8>,
    pub meta: CacheEntryMeta,
}

/// Content-addressed store for raw responses.
///
/// Layout: `<dir>/bodies/<fp[0..2]>/<fp>.bin` plus a `.json` sidecar.
/// Corrupt entries count as a miss; writes are temp-file + atomic rename so
/// concurrent readers of distinct fingerprints are safe and colliding
/// writes are idempotent.
#[derive(Clone)]
pub struct Cache {
    settings: Arc<CacheSettings>,
    /// Lazily-created temp dir for do-not-persist bodies; removed when the
    /// last clone drops at process exit.
    ephemeral: Arc<Mutex<Option<tempfile::TempDir>>>,
}

impl Cache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            ephemeral: Arc::new(Mutex::new(None)),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Request fingerprint: method + normalized URL + the headers that alter
    /// content negotiation (accept, accept-language, user-agent).
    pub fn fingerprint(method: &str, url: &str, headers: &BTreeMap<String, String>) -> String {
        let mut h = Sha256::new();
        h.update(b"method:");
        h.update(method.to_ascii_uppercase().as_bytes());
        h.update(b"\nurl:");
        h.update(urlutil::normalize_url_for_cache(url).as_bytes());
        for name in ["accept", "accept-language", "user-agent"] {
            h.update(b"\n");
            h.update(name.as_bytes());
            h.update(b":");
            let value = headers
                .iter()
                .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
                .unwrap_or("");
            h.update(value.as_bytes());
        }
        hex::encode(h.finalize())
    }

    fn paths(&self, key: &str) -> (PathBuf, PathBuf) {
        let dir = self.settings.dir.join("bodies").join(&key[0..2]);
        (dir.join(format!("{key}.json")), dir.join(format!("{key}.bin")))
    }

    pub fn get(&self, key: &str, max_body_bytes: Option<u64>) -> Option<CacheHit> {
        if !self.settings.enabled || self.settings.fresh {
            return None;
        }
        let (meta_p, body_p) = self.paths(key);
        let meta_bytes = fs::read(&meta_p).ok()?;
        let mut meta: CacheEntryMeta = match serde_json::from_slice(&meta_bytes) {
            Ok(m) => m,
            Err(_) => {
                // Corrupt sidecar: drop the pair, report a miss.
                let _ = fs::remove_file(&meta_p);
                let _ = fs::remove_file(&body_p);
                return None;
            }
        };
        let body = fs::read(&body_p).ok()?;

        let now = epoch_s();
        if now.saturating_sub(meta.stored_at) > self.settings.ttl.as_secs() {
            let _ = fs::remove_file(&meta_p);
            let _ = fs::remove_file(&body_p);
            return None;
        }
        if let Some(max) = max_body_bytes {
            if body.len() as u64 > max {
                return None;
            }
        }

        // Touch for LRU eviction ordering. Best effort.
        meta.last_accessed = now;
        if let Ok(bytes) = serde_json::to_vec(&meta) {
            let _ = fs::write(&meta_p, bytes);
        }

        Some(CacheHit {
            key: key.to_string(),
            body_path: body_p,
            body,
            meta,
        })
    }

    /// Store an entry and return the body path. When the cache is disabled
    /// the body goes to a process-temp path that is deleted on exit.
    pub fn put(&self, key: &str, mut meta: CacheEntryMeta, body: &[u8]) -> Result<PathBuf> {
        if !self.settings.enabled {
            return self.ephemeral_write(key, body);
        }
        let now = epoch_s();
        meta.schema_version = CACHE_SCHEMA_VERSION;
        meta.stored_at = now;
        meta.last_accessed = now;
        meta.body_bytes = body.len() as u64;

        let (meta_p, body_p) = self.paths(key);
        let parent = meta_p
            .parent()
            .ok_or_else(|| Error::Cache("cache path has no parent".to_string()))?;
        fs::create_dir_all(parent).map_err(|e| Error::Cache(e.to_string()))?;

        write_atomic(parent, &body_p, body)?;
        let meta_bytes = serde_json::to_vec(&meta).map_err(|e| Error::Cache(e.to_string()))?;
        write_atomic(parent, &meta_p, &meta_bytes)?;

        self.prune();
        Ok(body_p)
    }

    /// Write a body that must not persist (no-cache mode, privileged
    /// renders). The backing temp dir lives for the process lifetime.
    pub fn ephemeral_write(&self, key: &str, body: &[u8]) -> Result<PathBuf> {
        let mut guard = self.ephemeral.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            *guard = Some(
                tempfile::Builder::new()
                    .prefix("webscout-")
                    .tempdir()
                    .map_err(|e| Error::Cache(e.to_string()))?,
            );
        }
        let dir = guard.as_ref().expect("just created").path().to_path_buf();
        drop(guard);
        let path = dir.join(format!("{key}.bin"));
        fs::write(&path, body).map_err(|e| Error::Cache(e.to_string()))?;
        Ok(path)
    }

    /// Evict least-recently-accessed entries when the store exceeds
    /// `max_bytes * 1.1`, down to `max_bytes * 0.9`. The hysteresis band
    /// prevents prune thrashing around the budget. Expired entries go first.
    /// Returns bytes freed.
    pub fn prune(&self) -> u64 {
        if !self.settings.enabled {
            return 0;
        }
        let bodies = self.settings.dir.join("bodies");
        let ttl_s = self.settings.ttl.as_secs();
        let now = epoch_s();

        struct Entry {
            last_accessed: u64,
            size: u64,
            meta_p: PathBuf,
            body_p: PathBuf,
        }

        let mut entries: Vec<Entry> = Vec::new();
        let mut total: u64 = 0;
        let mut freed: u64 = 0;

        let Ok(shards) = fs::read_dir(&bodies) else {
            return 0;
        };
        for shard in shards.flatten() {
            let Ok(files) = fs::read_dir(shard.path()) else {
                continue;
            };
            for file in files.flatten() {
                let meta_p = file.path();
                if meta_p.extension().and_then(|s| s.to_str()) != Some("json") {
                    continue;
                }
                let body_p = meta_p.with_extension("bin");
                let meta: Option<CacheEntryMeta> = fs::read(&meta_p)
                    .ok()
                    .and_then(|b| serde_json::from_slice(&b).ok());
                let size = fs::metadata(&meta_p).map(|m| m.len()).unwrap_or(0)
                    + fs::metadata(&body_p).map(|m| m.len()).unwrap_or(0);
                match meta {
                    Some(meta) if body_p.exists() => {
                        if now.saturating_sub(meta.stored_at) > ttl_s {
                            let _ = fs::remove_file(&meta_p);
                            let _ = fs::remove_file(&body_p);
                            freed += size;
                            continue;
                        }
                        total += size;
                        entries.push(Entry {
                            last_accessed: meta.last_accessed,
                            size,
                            meta_p,
                            body_p,
                        });
                    }
                    _ => {
                        let _ = fs::remove_file(&meta_p);
                        let _ = fs::remove_file(&body_p);
                        freed += size;
                    }
                }
            }
        }

        let high = self.settings.max_bytes.saturating_mul(11) / 10;
        let low = self.settings.max_bytes.saturating_mul(9) / 10;
        if total <= high {
            return freed;
        }

        entries.sort_by_key(|e| e.last_accessed);
        for entry in entries {
            if total <= low {
                break;
            }
            let _ = fs::remove_file(&entry.meta_p);
            let _ = fs::remove_file(&entry.body_p);
            total = total.saturating_sub(entry.size);
            freed += entry.size;
        }
        freed
    }
}

fn write_atomic(parent: &Path, dest: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::Cache(e.to_string()))?;
    fs::write(tmp.path(), bytes).map_err(|e| Error::Cache(e.to_string()))?;
    tmp.persist(dest)
        .map_err(|e| Error::Cache(e.to_string()))?;
    Ok(())
}

/// Pure classification of one transport result. Ordered, first match wins.
pub fn classify_response(
    status: u16,
    body: &[u8],
    content_type: Option<&str>,
    detect_blocks: bool,
) -> (Classification, Option<String>) {
    match status {
        401 | 403 | 429 => return (Classification::Blocked, Some(format!("http_{status}"))),
        404 => return (Classification::NotFound, Some("http_404".to_string())),
        s if s >= 500 => {
            return (
                Classification::TransportError,
                Some(format!("http_{status}")),
            )
        }
        s if (400..500).contains(&s) => {
            return (
                Classification::TransportError,
                Some(format!("http_{status}")),
            )
        }
        _ => {}
    }

    if !detect_blocks || !(200..300).contains(&status) {
        return (Classification::Ok, None);
    }
    let html_ish = matches!(content_type, Some("text/html") | Some("application/xhtml+xml"))
        || sniff::looks_like_html(body);
    if !html_ish {
        return (Classification::Ok, None);
    }

    let preview = String::from_utf8_lossy(&body[..body.len().min(200_000)]).to_ascii_lowercase();

    let needs_render = preview.contains("enable javascript")
        || preview.contains("checking your browser")
        || preview.contains("verify you are human")
        || noscript_required(&preview)
        || (body.len() < 2048 && preview.contains("<script") && !has_visible_text(&preview));
    if needs_render {
        return (Classification::NeedsRender, Some("js_wall".to_string()));
    }

    let consent_keywords = [
        "cookie consent",
        "accept all cookies",
        "we use cookies",
        "before you continue",
        "consent to the use of cookies",
    ];
    if preview.contains("<form") && consent_keywords.iter().any(|k| preview.contains(k)) {
        return (Classification::Blocked, Some("consent_wall".to_string()));
    }

    (Classification::Ok, None)
}

fn noscript_required(preview: &str) -> bool {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"<noscript>[^<]{0,200}required").expect("static"))
        .is_match(preview)
}

/// Crude visible-text check: skip script/style blocks and tags, look for
/// any non-whitespace byte left over. Byte-wise on purpose: the preview may
/// hold arbitrary (lossy) UTF-8 and multibyte content counts as visible.
fn has_visible_text(html: &str) -> bool {
    let bytes = html.as_bytes(); // caller already lowercased
    let mut in_tag = false;
    let mut skip_until: Option<&[u8]> = None;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = skip_until {
            if bytes[i..].starts_with(end) {
                i += end.len();
                skip_until = None;
            } else {
                i += 1;
            }
            continue;
        }
        let b = bytes[i];
        if b == b'<' {
            if bytes[i..].starts_with(b"<script") {
                skip_until = Some(b"</script>");
                i += 7;
                continue;
            }
            if bytes[i..].starts_with(b"<style") {
                skip_until = Some(b"</style>");
                i += 6;
                continue;
            }
            in_tag = true;
        } else if b == b'>' {
            in_tag = false;
        } else if !in_tag && !b.is_ascii_whitespace() {
            return true;
        }
        i += 1;
    }
    false
}

/// Suggested follow-up commands/flags per classification.
pub fn next_steps_for(classification: Classification) -> Vec<String> {
    match classification {
        Classification::Blocked => vec![
            "retry with different --user-agent / --header values".to_string(),
            "route the request through --proxy".to_string(),
            "try another search provider or an alternative source".to_string(),
        ],
        Classification::NeedsRender => vec![
            "render <url>".to_string(),
            "extract <url> --method browser".to_string(),
        ],
        Classification::NotFound => {
            vec!["verify the URL is correct and still published".to_string()]
        }
        Classification::Timeout | Classification::TransportError => vec![
            "retry with --fresh".to_string(),
            "increase --timeout".to_string(),
        ],
        Classification::Ok => Vec::new(),
    }
}

fn forbidden_header(name: &str) -> bool {
    matches!(
        name.trim().to_ascii_lowercase().as_str(),
        "authorization" | "cookie" | "set-cookie"
    )
}

/// Polite HTTP transport with cache, bounded redirects, streamed size cap,
/// and block/JS-wall classification.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    cache: Cache,
}

impl HttpFetcher {
    pub fn new(cache: Cache, proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            // Redirects are followed manually so the hop chain can be
            // recorded and bounded.
            .redirect(reqwest::redirect::Policy::none())
            // Avoid "hang forever" on DNS/TLS/body stalls; per-request
            // timeouts still override this.
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .gzip(true);
        if let Some(proxy) = proxy {
            builder = builder
                .proxy(reqwest::Proxy::all(proxy).map_err(|e| Error::Fetch(e.to_string()))?);
        }
        let client = builder.build().map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self { client, cache })
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub async fn fetch(&self, req: &FetchRequest) -> Result<FetchOutcome> {
        let parsed = url::Url::parse(&req.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "only http/https URLs are fetchable, got {}",
                parsed.scheme()
            )));
        }
        for name in req.headers.keys() {
            if forbidden_header(name) {
                return Err(Error::InvalidUsage(format!(
                    "refusing to set restricted header: {name}"
                )));
            }
        }

        let key = Cache::fingerprint("GET", &req.url, &req.headers);

        if req.cache.read {
            let cache = self.cache.clone();
            let key2 = key.clone();
            let max = req.max_bytes;
            let hit = tokio::task::spawn_blocking(move || cache.get(&key2, max))
                .await
                .map_err(|e| Error::Cache(format!("cache get join failed: {e}")))?;
            if let Some(hit) = hit {
                tracing::debug!(url = %req.url, key = %key, "cache hit");
                return Ok(self.outcome_from_cache(req, hit));
            }
        }

        self.fetch_network(req, parsed, key).await
    }

    fn outcome_from_cache(&self, req: &FetchRequest, hit: CacheHit) -> FetchOutcome {
        let (classification, reason) = classify_response(
            hit.meta.status,
            &hit.body,
            hit.meta.content_type.as_deref(),
            req.detect_blocks,
        );
        let mut doc = Document::from_url(&req.url, FetchMethod::Http);
        doc.http = Some(HttpInfo {
            status: hit.meta.status,
            final_url: hit.meta.final_url.clone(),
            redirect_chain: hit.meta.redirect_chain.clone(),
            headers: hit.meta.headers.clone(),
            bytes_read: hit.body.len() as u64,
        });
        doc.artifact = Some(ArtifactInfo {
            content_type: hit.meta.content_type.clone(),
            body_path: Some(hit.body_path.to_string_lossy().to_string()),
            body_bytes: hit.body.len() as u64,
            truncated: hit.meta.truncated,
        });
        FetchOutcome {
            document: doc,
            body: hit.body,
            next_steps: next_steps_for(classification),
            classification,
            reason,
            cache_hit: true,
        }
    }

    async fn fetch_network(
        &self,
        req: &FetchRequest,
        start_url: url::Url,
        key: String,
    ) -> Result<FetchOutcome> {
        let mut chain: Vec<String> = vec![start_url.to_string()];
        let mut current = start_url;
        let mut response: Option<reqwest::Response> = None;

        for _hop in 0..=MAX_REDIRECT_HOPS {
            let mut rb = self.client.get(current.clone());
            if let Some(to) = req.timeout() {
                rb = rb.timeout(to);
            }
            for (k, v) in &req.headers {
                if let (Ok(name), Ok(value)) = (
                    reqwest::header::HeaderName::from_bytes(k.as_bytes()),
                    reqwest::header::HeaderValue::from_str(v),
                ) {
                    rb = rb.header(name, value);
                }
            }
            let resp = match rb.send().await {
                Ok(r) => r,
                Err(e) => {
                    let reason = if e.is_timeout() { "timeout" } else { "send_failed" };
                    return Ok(self.transport_error_outcome(req, chain, reason, e.to_string()));
                }
            };
            let status = resp.status();
            if req.follow_redirects && status.is_redirection() {
                let location = resp
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                if let Some(location) = location {
                    if chain.len() > MAX_REDIRECT_HOPS {
                        return Ok(self.transport_error_outcome(
                            req,
                            chain,
                            "too_many_redirects",
                            format!("redirect chain exceeded {MAX_REDIRECT_HOPS} hops"),
                        ));
                    }
                    let next = match current.join(&location) {
                        Ok(u) => u,
                        Err(e) => {
                            return Ok(self.transport_error_outcome(
                                req,
                                chain,
                                "bad_redirect",
                                e.to_string(),
                            ))
                        }
                    };
                    tracing::debug!(from = %current, to = %next, "following redirect");
                    chain.push(next.to_string());
                    current = next;
                    continue;
                }
            }
            response = Some(resp);
            break;
        }

        let Some(resp) = response else {
            return Ok(self.transport_error_outcome(
                req,
                chain,
                "too_many_redirects",
                format!("redirect chain exceeded {MAX_REDIRECT_HOPS} hops"),
            ));
        };

        let status = resp.status().as_u16();
        let mut raw_headers = BTreeMap::new();
        for (k, v) in resp.headers() {
            if let Ok(s) = v.to_str() {
                raw_headers.insert(k.as_str().to_string(), s.to_string());
            }
        }
        let declared_type = raw_headers.get("content-type").cloned();

        // Stream the body, truncating at max_bytes.
        let max_bytes = req.max_bytes.unwrap_or(u64::MAX) as usize;
        let mut truncated = false;
        let mut body: Vec<u8> = Vec::new();
        {
            use futures_util::StreamExt;
            let mut stream = resp.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let reason = if e.is_timeout() { "timeout" } else { "read_failed" };
                        return Ok(self.transport_error_outcome(
                            req,
                            chain,
                            reason,
                            e.to_string(),
                        ));
                    }
                };
                if body.len().saturating_add(chunk.len()) > max_bytes {
                    let take = max_bytes.saturating_sub(body.len());
                    body.extend_from_slice(&chunk[..take]);
                    truncated = true;
                    break;
                }
                body.extend_from_slice(&chunk);
            }
        }

        let content_type = sniff::normalize_content_type(declared_type.as_deref(), &body);
        let final_url = current.to_string();
        let (classification, reason) =
            classify_response(status, &body, content_type.as_deref(), req.detect_blocks);

        let mut doc = Document::from_url(&req.url, FetchMethod::Http);

        // Persist regardless of classification: eval replay depends on
        // blocked/JS-wall responses being reproducible from cache.
        let meta = CacheEntryMeta {
            schema_version: CACHE_SCHEMA_VERSION,
            kind: "fetch".to_string(),
            stored_at: 0,
            last_accessed: 0,
            url: req.url.clone(),
            final_url: final_url.clone(),
            status,
            content_type: content_type.clone(),
            headers: whitelist_headers(&raw_headers),
            redirect_chain: chain.clone(),
            body_bytes: body.len() as u64,
            truncated,
        };
        let body_path = if req.cache.write {
            let cache = self.cache.clone();
            let key2 = key.clone();
            let body2 = body.clone();
            let stored = tokio::task::spawn_blocking(move || cache.put(&key2, meta, &body2))
                .await
                .map_err(|e| Error::Cache(format!("cache put join failed: {e}")))?;
            match stored {
                Ok(path) => Some(path.to_string_lossy().to_string()),
                Err(e) => {
                    // Disk trouble degrades to a warning; the in-memory
                    // body is still returned.
                    doc.push_warning(format!("cache store failed: {e}"));
                    None
                }
            }
        } else {
            match self.cache.ephemeral_write(&key, &body) {
                Ok(path) => Some(path.to_string_lossy().to_string()),
                Err(e) => {
                    doc.push_warning(format!("ephemeral store failed: {e}"));
                    None
                }
            }
        };

        doc.http = Some(HttpInfo {
            status,
            final_url,
            redirect_chain: chain,
            headers: whitelist_headers(&raw_headers),
            bytes_read: body.len() as u64,
        });
        doc.artifact = Some(ArtifactInfo {
            content_type,
            body_path,
            body_bytes: body.len() as u64,
            truncated,
        });

        Ok(FetchOutcome {
            document: doc,
            body,
            next_steps: next_steps_for(classification),
            classification,
            reason,
            cache_hit: false,
        })
    }

    fn transport_error_outcome(
        &self,
        req: &FetchRequest,
        chain: Vec<String>,
        reason: &str,
        detail: String,
    ) -> FetchOutcome {
        let mut doc = Document::from_url(&req.url, FetchMethod::Http);
        doc.push_warning(format!("transport: {detail}"));
        doc.http = chain.last().map(|last| HttpInfo {
            status: 0,
            final_url: last.clone(),
            redirect_chain: chain.clone(),
            headers: BTreeMap::new(),
            bytes_read: 0,
        });
        FetchOutcome {
            document: doc,
            body: Vec::new(),
            classification: Classification::TransportError,
            reason: Some(reason.to_string()),
            next_steps: next_steps_for(Classification::TransportError),
            cache_hit: false,
        }
    }
}
