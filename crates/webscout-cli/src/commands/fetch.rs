use crate::envelope::{CacheMeta, CmdError};
use crate::support::{
    default_headers, enforce_robots_policy, enforce_url_policy, parse_headers, Ctx,
    DEFAULT_MAX_BYTES,
};
use webscout_core::{Classification, FetchRequest};
use webscout_local::robots::RobotsChecker;

#[derive(clap::Args, Debug, Clone)]
pub struct FetchCmd {
    /// URL to fetch
    pub url: String,
    /// Extra header (repeatable): key:value
    #[arg(long = "header")]
    pub header: Vec<String>,
    /// JSON object of headers (path or '-')
    #[arg(long)]
    pub headers_file: Option<String>,
    /// User-Agent header
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Accept-Language header
    #[arg(long)]
    pub accept_language: Option<String>,
    /// Max response bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
    pub max_bytes: u64,
    /// Do not follow redirects
    #[arg(long)]
    pub no_follow_redirects: bool,
    /// Disable bot-wall / JS-wall heuristics (status-based classification only)
    #[arg(long)]
    pub no_detect_blocks: bool,
    /// Include the body in JSON output (debug)
    #[arg(long)]
    pub include_body: bool,
}

pub async fn run(ctx: &mut Ctx, cmd: &FetchCmd) -> i32 {
    match fetch_inner(ctx, cmd).await {
        Ok(code) => code,
        Err(e) => ctx.finish("fetch", serde_json::json!({"document": null}), Some(e)),
    }
}

async fn fetch_inner(ctx: &mut Ctx, cmd: &FetchCmd) -> Result<i32, CmdError> {
    enforce_url_policy(&ctx.settings.policy, &cmd.url, "fetch")?;

    let headers = parse_headers(
        default_headers(cmd.user_agent.as_deref(), cmd.accept_language.as_deref()),
        &cmd.header,
        cmd.headers_file.as_deref(),
    )?;

    let robots = RobotsChecker::new(ctx.settings.http_client()?);
    let user_agent = headers
        .get("user-agent")
        .cloned()
        .unwrap_or_else(|| "webscout".to_string());
    let mut warnings = std::mem::take(&mut ctx.warnings);
    let robots_result = enforce_robots_policy(
        &robots,
        &ctx.settings.policy,
        &cmd.url,
        &user_agent,
        &mut warnings,
    )
    .await;
    ctx.warnings = warnings;
    robots_result?;

    let fetcher = ctx.settings.fetcher()?;
    let mut req = FetchRequest::new(&cmd.url);
    req.headers = headers;
    req.timeout_ms = Some(ctx.settings.policy.timeout_ms);
    req.max_bytes = Some(cmd.max_bytes);
    req.follow_redirects = !cmd.no_follow_redirects;
    req.detect_blocks = !cmd.no_detect_blocks;
    req.cache.read = ctx.settings.cache_enabled && !ctx.settings.cache_fresh;
    req.cache.write = ctx.settings.cache_enabled;
    req.cache.ttl_s = Some(ctx.settings.cache_ttl.as_secs());

    let outcome = fetcher.fetch(&req).await.map_err(CmdError::from)?;
    ctx.add_provider("http");
    ctx.cache_meta = Some(CacheMeta {
        hit: outcome.cache_hit,
        stored: Some(
            !outcome.cache_hit
                && outcome
                    .document
                    .artifact
                    .as_ref()
                    .map(|a| a.body_path.is_some())
                    .unwrap_or(false),
        ),
        hit_ratio: None,
    });
    for w in &outcome.document.warnings {
        ctx.warn(w.clone());
    }
    if ctx.settings.cache_fresh && !outcome.cache_hit {
        ctx.warn("cache bypassed (--fresh)");
    }

    let mut doc_value = super::document_value(&outcome.document);
    if cmd.include_body {
        doc_value["body"] =
            serde_json::Value::String(String::from_utf8_lossy(&outcome.body).to_string());
    }
    let data = serde_json::json!({"document": doc_value});

    if outcome.classification != Classification::Ok {
        let error = CmdError::from_classification(
            outcome.classification,
            outcome.reason.as_deref(),
            &outcome.next_steps,
            &cmd.url,
        );
        return Ok(ctx.finish("fetch", data, Some(error)));
    }

    if ctx.wants_plain() {
        let body_path = outcome
            .document
            .artifact
            .as_ref()
            .and_then(|a| a.body_path.clone());
        match body_path {
            Some(path) => println!("{path}"),
            None => println!("{}", outcome.document.origin()),
        }
        return Ok(ctx.finish("fetch", serde_json::json!({}), None));
    }

    if !ctx.wants_json() {
        let status = outcome
            .document
            .http
            .as_ref()
            .map(|h| h.status.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("HTTP {status} {}", outcome.document.origin());
        if let Some(path) = outcome
            .document
            .artifact
            .as_ref()
            .and_then(|a| a.body_path.as_deref())
        {
            println!("body: {path}");
        }
        return Ok(ctx.finish("fetch", serde_json::json!({}), None));
    }

    Ok(ctx.finish("fetch", data, None))
}
