use crate::envelope::{CmdError, ErrorCode};
use crate::support::Ctx;
use webscout_core::{SearchQuery, SearchResultItem};
use webscout_local::search::{search_registry, select_provider};
use webscout_local::urlutil::{is_allowed, redact_url};

#[derive(clap::Args, Debug, Clone)]
pub struct SearchCmd {
    /// Search query
    pub query: String,
    /// Maximum results
    #[arg(short = 'n', long, default_value_t = 10)]
    pub max_results: usize,
    /// Search provider (auto picks the first enabled one)
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
}

pub async fn run(ctx: &mut Ctx, cmd: &SearchCmd) -> i32 {
    match search_inner(ctx, cmd).await {
        Ok(code) => code,
        Err(e) => ctx.finish("search", serde_json::json!({"results": []}), Some(e)),
    }
}

async fn search_inner(ctx: &mut Ctx, cmd: &SearchCmd) -> Result<i32, CmdError> {
    if cmd.max_results == 0 {
        return Err(CmdError::new(
            ErrorCode::InvalidUsage,
            "--max-results must be >= 1",
        ));
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
        max_results: cmd.max_results,
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
    if ctx.settings.policy.redact {
        for r in results.iter_mut() {
            r.url = redact_url(&r.url);
        }
    }

    if results.is_empty() {
        // Plain/human modes keep stdout empty; JSON mode still emits a
        // complete envelope. All of that happens in finish().
        return Err(CmdError::new(ErrorCode::NotFound, "no results"));
    }

    if ctx.wants_plain() {
        for r in &results {
            println!("{}", r.url);
        }
        return Ok(ctx.finish("search", serde_json::json!({}), None));
    }

    if !ctx.wants_json() {
        print_human(&results);
        return Ok(ctx.finish("search", serde_json::json!({}), None));
    }

    let data = serde_json::json!({
        "query": cmd.query,
        "provider": provider.id(),
        "results": results,
    });
    Ok(ctx.finish("search", data, None))
}

fn print_human(results: &[SearchResultItem]) {
    for (idx, r) in results.iter().enumerate() {
        println!("{}. {}", idx + 1, r.title);
        println!("   {}", r.url);
        if let Some(snippet) = r.snippet.as_deref() {
            println!("   {snippet}");
        }
    }
}
