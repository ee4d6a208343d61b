use super::{document_value, retrieve_html, LegDeps, Method};
use crate::envelope::{CmdError, ErrorCode};
use crate::support::{default_headers, push_warning, Ctx};
use futures_util::StreamExt;
use webscout_core::{Document, PolicyMode, SearchQuery, SearchResultItem};
use webscout_local::extract::{extract_html, ExtractLimits, Strategy};
use webscout_local::render::PlaywrightRenderer;
use webscout_local::robots::RobotsChecker;
use webscout_local::safety;
use webscout_local::search::{search_registry, select_provider};
use webscout_local::urlutil::{host_matches_domain, host_of, is_allowed, redact_url};

/// Bounded worker pool size for the fetch leg.
const FETCH_CONCURRENCY: usize = 4;

#[derive(clap::Args, Debug, Clone)]
pub struct PipelineCmd {
    /// Search query
    pub query: String,
    /// Search results to consider
    #[arg(long, default_value_t = 5)]
    pub top_k: usize,
    /// Results to extract
    #[arg(long, default_value_t = 1)]
    pub extract_k: usize,
    /// Transport method for the extract leg
    #[arg(long, default_value = "http", value_parser = ["http", "browser", "auto"])]
    pub method: String,
    /// Return the candidate plan without fetching
    #[arg(long)]
    pub plan: bool,
    /// Prefer domains when selecting candidates (repeatable)
    #[arg(long = "prefer-domain")]
    pub prefer_domain: Vec<String>,
    /// Search provider
    #[arg(long, default_value = "auto")]
    pub provider: String,
    /// Time range (provider-specific: d, w, m, y)
    #[arg(long)]
    pub time_range: Option<String>,
    /// Region code (e.g. us-en)
    #[arg(long)]
    pub region: Option<String>,
    /// Safe search mode
    #[arg(long, value_parser = ["on", "moderate", "off"])]
    pub safe_search: Option<String>,
    /// Budget hint (reserved; not enforced)
    #[arg(long)]
    pub budget: Option<String>,
}

#[derive(Debug, Clone)]
struct Candidate {
    rank: usize,
    item: SearchResultItem,
    preferred_domain: Option<String>,
}

impl Candidate {
    fn to_value(&self, redact: bool) -> serde_json::Value {
        let mut v = serde_json::to_value(&self.item).unwrap_or(serde_json::Value::Null);
        if redact {
            if let Some(url) = v.get("url").and_then(|u| u.as_str()) {
                let redacted = redact_url(url);
                v["url"] = serde_json::Value::String(redacted);
            }
        }
        v["rank"] = serde_json::json!(self.rank);
        v["reason"] = serde_json::json!(if self.preferred_domain.is_some() {
            "preferred_domain"
        } else {
            "top_rank"
        });
        if let Some(domain) = self.preferred_domain.as_deref() {
            v["preferred_domain"] = serde_json::json!(domain);
        }
        v
    }
}

/// Stable re-rank: preferred-domain matches first, original order within
/// each bucket.
fn select_candidates(results: &[SearchResultItem], prefer: &[String]) -> Vec<Candidate> {
    let mut preferred = Vec::new();
    let mut remaining = Vec::new();
    for (idx, item) in results.iter().enumerate() {
        let preferred_domain = prefer.iter().find_map(|domain| {
            let host = host_of(&item.url)?;
            host_matches_domain(&host, domain).then(|| domain.clone())
        });
        let candidate = Candidate {
            rank: idx + 1,
            item: item.clone(),
            preferred_domain,
        };
        if candidate.preferred_domain.is_some() {
            preferred.push(candidate);
        } else {
            remaining.push(candidate);
        }
    }
    preferred.extend(remaining);
    preferred
}

pub async fn run(ctx: &mut Ctx, cmd: &PipelineCmd) -> i32 {
    match pipeline_inner(ctx, cmd).await {
        Ok(code) => code,
        Err(e) => ctx.finish(
            "pipeline",
            serde_json::json!({
                "query": cmd.query,
                "candidates": [],
                "documents": [],
                "plan": cmd.plan,
            }),
            Some(e),
        ),
    }
}

async fn pipeline_inner(ctx: &mut Ctx, cmd: &PipelineCmd) -> Result<i32, CmdError> {
    if cmd.top_k == 0 || cmd.extract_k == 0 {
        return Err(CmdError::new(
            ErrorCode::InvalidUsage,
            "--top-k and --extract-k must be >= 1",
        ));
    }
    let method: Method = cmd.method.parse()?;
    if method == Method::Auto && ctx.settings.policy.mode != PolicyMode::Permissive {
        return Err(CmdError::new(
            ErrorCode::PolicyRefused,
            "auto browser escalation requires --policy permissive",
        ));
    }
    if cmd.budget.is_some() {
        ctx.warn("--budget is accepted but not enforced yet");
    }

    let client = ctx.settings.http_client()?;
    let registry = search_registry(&client);
    let provider = select_provider(&registry, &cmd.provider, ctx.settings.policy.mode)?;
    ctx.add_provider(provider.id());
    if let Some(warning) = registry
        .iter()
        .find(|e| e.meta.id == provider.id())
        .and_then(|e| e.meta.privacy_warning)
    {
        ctx.warn(warning);
    }

    let query = SearchQuery {
        query: cmd.query.clone(),
        max_results: cmd.top_k,
        region: cmd.region.clone(),
        safe_search: cmd.safe_search.clone(),
        time_range: cmd.time_range.clone(),
        timeout_ms: Some(ctx.settings.policy.timeout_ms),
    };
    let mut results = provider.search(&query).await.map_err(CmdError::from)?;
    let rules = ctx.settings.domain_rules();
    if !rules.is_empty() {
        results.retain(|r| is_allowed(&r.url, &rules));
    }
    results.truncate(cmd.top_k);

    if results.is_empty() {
        return Err(CmdError::new(ErrorCode::NotFound, "no results"));
    }

    let candidates = select_candidates(&results, &cmd.prefer_domain);
    let redact = ctx.settings.policy.redact;
    let candidate_values: Vec<serde_json::Value> =
        candidates.iter().map(|c| c.to_value(redact)).collect();

    if cmd.plan {
        if ctx.wants_plain() {
            for c in &candidates {
                let url = if redact {
                    redact_url(&c.item.url)
                } else {
                    c.item.url.clone()
                };
                println!("{url}");
            }
            return Ok(ctx.finish("pipeline", serde_json::json!({}), None));
        }
        if !ctx.wants_json() {
            for c in &candidates {
                let url = if redact {
                    redact_url(&c.item.url)
                } else {
                    c.item.url.clone()
                };
                let label = if c.preferred_domain.is_some() {
                    "preferred"
                } else {
                    "ranked"
                };
                println!("{}. {url} ({label})", c.rank);
            }
            return Ok(ctx.finish("pipeline", serde_json::json!({}), None));
        }
        let data = serde_json::json!({
            "query": cmd.query,
            "candidates": candidate_values,
            "documents": [],
            "plan": true,
        });
        return Ok(ctx.finish("pipeline", data, None));
    }

    // Extract leg: bounded fan-out, results joined in candidate order.
    let fetcher = ctx.settings.fetcher()?;
    let renderer = PlaywrightRenderer::new();
    let robots = std::sync::Arc::new(RobotsChecker::new(ctx.settings.http_client()?));
    let settings = ctx.settings.clone();
    let headers = default_headers(None, None);

    let legs: Vec<LegReport> = futures_util::stream::iter(
        candidates.iter().take(cmd.extract_k).cloned(),
    )
    .map(|candidate| {
        let fetcher = fetcher.clone();
        let renderer = renderer.clone();
        let robots = robots.clone();
        let settings = settings.clone();
        let headers = headers.clone();
        async move {
            let deps = LegDeps {
                fetcher: &fetcher,
                renderer: &renderer,
                robots: robots.as_ref(),
                settings: &settings,
            };
            run_leg(&deps, &candidate, method, &headers).await
        }
    })
    .buffered(FETCH_CONCURRENCY)
    .collect()
    .await;

    let mut documents: Vec<Document> = Vec::new();
    let mut errors: Vec<serde_json::Value> = Vec::new();
    for leg in legs {
        for w in leg.warnings {
            ctx.warn(w);
        }
        for p in leg.providers {
            ctx.add_provider(p);
        }
        match leg.outcome {
            Ok(document) => documents.push(document),
            Err((url, error)) => {
                ctx.warn(format!("failed to extract {url}: {}", error.code.as_str()));
                errors.push(serde_json::json!({"url": url, "error": error.to_value()}));
            }
        }
    }

    if ctx.wants_plain() {
        let outputs: Vec<&str> = documents
            .iter()
            .filter_map(|d| d.extracted.as_ref())
            .filter_map(|e| e.markdown.as_deref().or(e.text.as_deref()))
            .collect();
        if outputs.is_empty() {
            return Err(CmdError::new(ErrorCode::NotFound, "no content extracted"));
        }
        let joined = outputs.join("\n---\n");
        print!("{joined}");
        if !joined.ends_with('\n') {
            println!();
        }
        return Ok(ctx.finish("pipeline", serde_json::json!({}), None));
    }

    if !ctx.wants_json() {
        if documents.is_empty() {
            return Err(CmdError::new(ErrorCode::NotFound, "no content extracted"));
        }
        for (idx, doc) in documents.iter().enumerate() {
            let mut url = doc.origin().to_string();
            if redact {
                url = redact_url(&url);
            }
            println!("[{}] {url}", idx + 1);
            if let Some(content) = doc
                .extracted
                .as_ref()
                .and_then(|e| e.markdown.as_deref().or(e.text.as_deref()))
            {
                print!("{content}");
                if !content.ends_with('\n') {
                    println!();
                }
            }
            if idx + 1 < documents.len() {
                println!("\n---\n");
            }
        }
        return Ok(ctx.finish("pipeline", serde_json::json!({}), None));
    }

    let data = serde_json::json!({
        "query": cmd.query,
        "candidates": candidate_values,
        "documents": documents.iter().map(document_value).collect::<Vec<_>>(),
        "errors": errors,
        "plan": false,
    });
    // Partial success is preserved: extracted documents ride alongside
    // per-URL errors. Only a fully-empty bundle is an error.
    if documents.is_empty() {
        let error = CmdError::new(
            ErrorCode::ExtractionFailed,
            "no candidate could be extracted",
        )
        .with_details(serde_json::json!({"failed": errors.len()}));
        return Ok(ctx.finish("pipeline", data, Some(error)));
    }
    Ok(ctx.finish("pipeline", data, None))
}

struct LegReport {
    outcome: Result<Document, (String, CmdError)>,
    warnings: Vec<String>,
    providers: Vec<&'static str>,
}

async fn run_leg(
    deps: &LegDeps<'_>,
    candidate: &Candidate,
    method: Method,
    headers: &std::collections::BTreeMap<String, String>,
) -> LegReport {
    let url = candidate.item.url.clone();
    let mut warnings = Vec::new();

    let retrieved = match retrieve_html(deps, &url, method, headers, "pipeline", &mut warnings).await
    {
        Ok(r) => r,
        Err(failure) => {
            return LegReport {
                outcome: Err((url, failure.error)),
                warnings,
                providers: Vec::new(),
            }
        }
    };

    let base = retrieved
        .document
        .http
        .as_ref()
        .map(|h| h.final_url.clone())
        .or_else(|| retrieved.document.url.clone());
    let extraction = extract_html(
        &retrieved.html,
        base.as_deref(),
        Strategy::Auto,
        &ExtractLimits::default(),
    );
    let mut providers = retrieved.providers;
    providers.push(extraction.strategy.as_str());

    let mut document = retrieved.document;
    for w in &extraction.warnings {
        push_warning(&mut warnings, w.clone());
        document.push_warning(w.clone());
    }
    let scan_text = extraction
        .content
        .markdown
        .as_deref()
        .or(extraction.content.text.as_deref())
        .unwrap_or("");
    for hit in safety::scan_prompt_injection(scan_text) {
        let warning = safety::injection_warning(&hit);
        push_warning(&mut warnings, warning.clone());
        document.push_warning(warning);
    }
    document.extracted = Some(extraction.content);

    LegReport {
        outcome: Ok(document),
        warnings,
        providers,
    }
}
