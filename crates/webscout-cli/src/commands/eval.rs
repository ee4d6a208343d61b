use crate::envelope::{CacheMeta, CmdError, ErrorCode};
use crate::eval::scoring::{criterion_for, score_search_results, word_count, Criterion};
use crate::eval::suite::{load_suite, EvalCase, EvalSuite};
use crate::support::{default_headers, Ctx};
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use webscout_core::{Classification, FetchRequest, SearchQuery, SearchResultItem};
use webscout_local::extract::{extract_html, ExtractLimits, Strategy};
use webscout_local::search::{search_registry, select_provider};
use webscout_local::urlutil::{
    host_matches_domain, host_of, is_allowed, normalize_url_for_match, redact_url,
};
use webscout_local::{Cache, CacheEntryMeta, HttpFetcher};

const FETCH_CONCURRENCY: usize = 4;

#[derive(clap::Args, Debug, Clone)]
pub struct EvalCmd {
    /// Suite file: JSONL (blank/# lines ignored), JSON array, or
    /// {"cases": [...]}; '-' for stdin
    #[arg(long)]
    pub suite: String,
    /// Search provider(s) to run (repeatable; default: auto)
    #[arg(long = "provider")]
    pub provider: Vec<String>,
    /// Top-k used for metrics
    #[arg(short = 'k', long, default_value_t = 10)]
    pub k: usize,
    /// Non-zero exit when the run has misses/errors
    #[arg(long, default_value = "error", value_parser = ["none", "error", "miss", "miss_or_error"])]
    pub fail_on: String,
    /// Include result items in JSON output
    #[arg(long)]
    pub include_results: bool,
    /// Skip the fetch/extract leg entirely
    #[arg(long)]
    pub no_fetch: bool,
}

/// One provider's running totals across the search, fetch, and extract
/// legs. A single struct: the legs report into the same summary row.
#[derive(Default)]
struct ProviderStats {
    cases_total: usize,
    criteria_cases: usize,
    hit_cases: usize,
    mrr_sum: f64,
    search_errors: usize,
    fetch_attempts: usize,
    fetch_ok: usize,
    blocked: usize,
    needs_render: usize,
    not_found: usize,
    fetch_errors: usize,
    cache_hits: usize,
    durations_ms: Vec<u128>,
    extract_attempts: usize,
    extract_non_empty: usize,
    word_count_sum: usize,
    code_pages: usize,
    code_preserved: usize,
}

impl ProviderStats {
    fn hit_rate(&self) -> f64 {
        ratio(self.hit_cases, self.criteria_cases)
    }

    fn mrr(&self) -> f64 {
        ratio_f(self.mrr_sum, self.criteria_cases)
    }

    fn summary_row(&self, pid: &str) -> serde_json::Value {
        serde_json::json!({
            "provider": pid,
            "cases_total": self.cases_total,
            "criteria_cases": self.criteria_cases,
            "hit_cases": self.hit_cases,
            "hit_rate": self.hit_rate(),
            "mrr": self.mrr(),
            "errors": self.search_errors,
            "fetch": {
                "attempts": self.fetch_attempts,
                "ok": self.fetch_ok,
                "blocked": self.blocked,
                "needs_render": self.needs_render,
                "not_found": self.not_found,
                "errors": self.fetch_errors,
                "cache_hits": self.cache_hits,
                "median_latency_ms": median(&self.durations_ms),
            },
            "extract": {
                "attempts": self.extract_attempts,
                "non_empty": self.extract_non_empty,
                "extraction_empty_count": self.extract_attempts.saturating_sub(self.extract_non_empty),
                "mean_extracted_words": ratio_f(self.word_count_sum as f64, self.extract_attempts),
                "code_block_pages": self.code_pages,
                "code_block_preserved": self.code_preserved,
            },
        })
    }
}

pub async fn run(ctx: &mut Ctx, cmd: &EvalCmd) -> i32 {
    match eval_inner(ctx, cmd).await {
        Ok(code) => code,
        Err(e) => ctx.finish("eval", serde_json::json!({"cases": []}), Some(e)),
    }
}

fn search_cache_key(pid: &str, query: &str, k: usize) -> String {
    // Synthetic URL namespace keeps eval's search replay in the same store
    // as fetch bodies without colliding with real URLs.
    let key_url = format!("webscout://search/{pid}?n={k}&q={query}");
    Cache::fingerprint("SEARCH", &key_url, &BTreeMap::new())
}

fn load_cached_results(cache: &Cache, key: &str) -> Option<Vec<SearchResultItem>> {
    let hit = cache.get(key, None)?;
    serde_json::from_slice(&hit.body).ok()
}

fn select_eval_url(
    case: &EvalCase,
    candidates: &[SearchResultItem],
    k: usize,
) -> Option<(String, &'static str)> {
    if let Some(url) = case.expected_urls.first() {
        return Some((url.clone(), "expected_url"));
    }
    if !case.expected_domains.is_empty() {
        for r in candidates.iter().take(k) {
            let host = host_of(&r.url).unwrap_or_default();
            if case
                .expected_domains
                .iter()
                .any(|d| host_matches_domain(&host, d))
            {
                return Some((r.url.clone(), "expected_domain"));
            }
        }
    }
    candidates.first().map(|r| (r.url.clone(), "top_result"))
}

const HTML_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];
const TEXT_TYPES: &[&str] = &["text/plain", "application/json", "application/xml", "text/xml"];

fn content_type_prefix(ct: Option<&str>) -> Option<String> {
    let value = ct?.split(';').next()?.trim().to_ascii_lowercase();
    (!value.is_empty()).then_some(value)
}

fn is_htmlish(ct: &Option<String>) -> bool {
    match ct.as_deref() {
        None => true,
        Some(v) => HTML_TYPES.contains(&v),
    }
}

fn is_textish(ct: &Option<String>) -> bool {
    match ct.as_deref() {
        None => false,
        Some(v) => TEXT_TYPES.contains(&v) || (v.starts_with("text/") && !HTML_TYPES.contains(&v)),
    }
}

fn markdown_has_code(markdown: Option<&str>) -> bool {
    let Some(md) = markdown else { return false };
    md.lines()
        .any(|l| l.trim_start().starts_with("```") || l.starts_with("    ") || l.starts_with('\t'))
}

fn score_extraction(
    body: &str,
    content_type: Option<&str>,
    base_url: Option<&str>,
    stats: &mut ProviderStats,
) -> serde_json::Value {
    let normalized = content_type_prefix(content_type);
    if !is_htmlish(&normalized) && !is_textish(&normalized) {
        return serde_json::json!({
            "status": "skipped",
            "reason": "unsupported_content_type",
            "content_type": normalized,
        });
    }

    stats.extract_attempts += 1;

    if is_textish(&normalized) {
        let non_empty = !body.trim().is_empty();
        if non_empty {
            stats.extract_non_empty += 1;
        }
        let words = word_count(body);
        stats.word_count_sum += words;
        return serde_json::json!({
            "status": "ok",
            "strategy": "text",
            "non_empty": non_empty,
            "word_count": words,
            "code_block_present": false,
            "code_block_preserved": null,
        });
    }

    let extraction = extract_html(body, base_url, Strategy::Auto, &ExtractLimits::default());
    let markdown = extraction.content.markdown.as_deref();
    let text = extraction.content.text.as_deref();
    let non_empty = markdown
        .or(text)
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);
    if non_empty {
        stats.extract_non_empty += 1;
    }
    let words = word_count(text.or(markdown).unwrap_or(""));
    stats.word_count_sum += words;

    let body_lc = body.to_ascii_lowercase();
    let code_present = body_lc.contains("<pre") || body_lc.contains("<code");
    let mut code_preserved = serde_json::Value::Null;
    if code_present {
        stats.code_pages += 1;
        let preserved = markdown_has_code(markdown);
        if preserved {
            stats.code_preserved += 1;
        }
        code_preserved = serde_json::json!(preserved);
    }

    serde_json::json!({
        "status": "ok",
        "strategy": extraction.strategy.as_str(),
        "non_empty": non_empty,
        "word_count": words,
        "code_block_present": code_present,
        "code_block_preserved": code_preserved,
    })
}

struct FetchJob {
    case_idx: usize,
    url: String,
    source: &'static str,
}

async fn eval_inner(ctx: &mut Ctx, cmd: &EvalCmd) -> Result<i32, CmdError> {
    if cmd.k == 0 {
        return Err(CmdError::new(ErrorCode::InvalidUsage, "-k must be >= 1"));
    }
    let suite = load_suite(&cmd.suite)?;

    let client = ctx.settings.http_client()?;
    let registry = search_registry(&client);
    let requested: Vec<String> = if cmd.provider.is_empty() {
        vec!["auto".to_string()]
    } else {
        cmd.provider.clone()
    };
    let mut providers: Vec<Arc<dyn webscout_core::SearchProvider>> = Vec::new();
    for id in &requested {
        let provider = select_provider(&registry, id, ctx.settings.policy.mode)?;
        if providers.iter().any(|p| p.id() == provider.id()) {
            continue;
        }
        providers.push(provider);
    }
    for p in &providers {
        ctx.add_provider(p.id());
        if let Some(warning) = registry
            .iter()
            .find(|e| e.meta.id == p.id())
            .and_then(|e| e.meta.privacy_warning)
        {
            ctx.warn(warning);
        }
    }
    let provider_ids: Vec<&'static str> = providers.iter().map(|p| p.id()).collect();

    let cache = ctx.settings.cache();
    let fetcher = ctx.settings.fetcher()?;
    let rules = ctx.settings.domain_rules();
    let headers = default_headers(None, None);

    let (mut cache_reads, mut cache_read_hits, mut cache_writes) = (0usize, 0usize, 0usize);
    let mut any_error = false;
    let mut any_miss = false;

    let mut per_provider: BTreeMap<&str, ProviderStats> = BTreeMap::new();
    let mut url_sets: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();

    // One entry per case; by_provider filled as each provider runs.
    let mut case_entries: Vec<serde_json::Value> = suite
        .cases
        .iter()
        .map(|case| {
            let mut v = case.to_value();
            v["k"] = serde_json::json!(case.k.unwrap_or(cmd.k));
            v["by_provider"] = serde_json::json!({});
            v
        })
        .collect();

    for provider in &providers {
        let pid = provider.id();
        let stats = per_provider.entry(pid).or_default();
        let mut fetch_jobs: Vec<FetchJob> = Vec::new();

        // Phase 1: search (cache-backed replay), scoring.
        for (case_idx, case) in suite.cases.iter().enumerate() {
            let case_k = case.k.unwrap_or(cmd.k);
            let criterion = criterion_for(&case.expected_urls, &case.expected_domains);
            stats.cases_total += 1;
            if criterion != Criterion::None {
                stats.criteria_cases += 1;
            }

            let t0 = Instant::now();
            let key = search_cache_key(pid, &case.query, case_k);
            cache_reads += 1;
            let mut cached = load_cached_results(&cache, &key);
            if cached.is_some() {
                cache_read_hits += 1;
            }
            if cached.is_none() {
                let query = SearchQuery {
                    query: case.query.clone(),
                    max_results: case_k,
                    region: None,
                    safe_search: None,
                    time_range: None,
                    timeout_ms: Some(ctx.settings.policy.timeout_ms),
                };
                match provider.search(&query).await {
                    Ok(results) => {
                        if let Ok(body) = serde_json::to_vec(&results) {
                            let meta = CacheEntryMeta::for_search(format!(
                                "webscout://search/{pid}?q={}",
                                case.query
                            ));
                            if cache.put(&key, meta, &body).is_ok() {
                                cache_writes += 1;
                            }
                        }
                        cached = Some(results);
                    }
                    Err(e) => {
                        any_error = true;
                        stats.search_errors += 1;
                        let err = CmdError::from(e);
                        case_entries[case_idx]["by_provider"][pid] =
                            serde_json::json!({"error": err.to_value()});
                        continue;
                    }
                }
            }
            let results = cached.unwrap_or_default();
            let duration_ms = t0.elapsed().as_millis() as u64;

            let mut candidates: Vec<SearchResultItem> = results;
            if !rules.is_empty() {
                candidates.retain(|r| is_allowed(&r.url, &rules));
            }

            let score = score_search_results(
                &candidates,
                &case.expected_domains,
                &case.expected_urls,
                case_k,
            );
            let passed = match criterion {
                Criterion::Url => score.url_hit,
                Criterion::Domain => score.domain_hit,
                Criterion::None => true,
            };
            if criterion != Criterion::None {
                if passed {
                    stats.hit_cases += 1;
                } else {
                    any_miss = true;
                }
                stats.mrr_sum += match criterion {
                    Criterion::Url => score.url_mrr,
                    _ => score.domain_mrr,
                };
            }

            url_sets.insert(
                (case.id.clone(), pid.to_string()),
                candidates
                    .iter()
                    .take(case_k)
                    .map(|r| normalize_url_for_match(&r.url))
                    .collect(),
            );

            let mut entry = serde_json::json!({
                "criterion": match criterion {
                    Criterion::Url => "url",
                    Criterion::Domain => "domain",
                    Criterion::None => "none",
                },
                "passed": passed,
                "duration_ms": duration_ms,
                "score": score,
            });
            if cmd.include_results {
                let shown: Vec<serde_json::Value> = candidates
                    .iter()
                    .take(case_k)
                    .map(|r| {
                        let mut v = serde_json::to_value(r).unwrap_or(serde_json::Value::Null);
                        if ctx.settings.policy.redact {
                            v["url"] = serde_json::json!(redact_url(&r.url));
                        }
                        v
                    })
                    .collect();
                entry["results"] = serde_json::json!(shown);
            }
            case_entries[case_idx]["by_provider"][pid] = entry;

            // Phase 2: pick a fetch target; policy gates it before any
            // transport is queued.
            if !cmd.no_fetch {
                match select_eval_url(case, &candidates, case_k) {
                    Some((url, source)) => {
                        if crate::support::enforce_url_policy(&ctx.settings.policy, &url, "eval")
                            .is_err()
                        {
                            case_entries[case_idx]["by_provider"][pid]["fetch"] =
                                serde_json::json!({
                                    "target_url": url,
                                    "source": source,
                                    "status": "skipped",
                                    "reason": "policy_refused",
                                });
                            case_entries[case_idx]["by_provider"][pid]["extract"] =
                                serde_json::json!({"status": "skipped", "reason": "policy_refused"});
                        } else {
                            fetch_jobs.push(FetchJob {
                                case_idx,
                                url,
                                source,
                            });
                        }
                    }
                    None => {
                        case_entries[case_idx]["by_provider"][pid]["fetch"] =
                            serde_json::json!({"status": "skipped", "reason": "no_results"});
                        case_entries[case_idx]["by_provider"][pid]["extract"] =
                            serde_json::json!({"status": "skipped", "reason": "no_fetch"});
                    }
                }
            } else {
                case_entries[case_idx]["by_provider"][pid]["fetch"] =
                    serde_json::json!({"status": "skipped", "reason": "fetch_disabled"});
                case_entries[case_idx]["by_provider"][pid]["extract"] =
                    serde_json::json!({"status": "skipped", "reason": "fetch_disabled"});
            }
        }

        // Phase 3: fetch leg through the bounded pool, joined in case order.
        let settings = ctx.settings.clone();
        let outcomes: Vec<(usize, &'static str, String, Result<FetchLegResult, CmdError>)> =
            futures_util::stream::iter(fetch_jobs.into_iter().map(|job| {
                let fetcher = fetcher.clone();
                let headers = headers.clone();
                let settings = settings.clone();
                async move {
                    let started = Instant::now();
                    let result = fetch_one(&fetcher, &settings, &headers, &job.url).await;
                    (
                        job.case_idx,
                        job.source,
                        job.url,
                        result.map(|mut r| {
                            r.duration_ms = started.elapsed().as_millis() as u64;
                            r
                        }),
                    )
                }
            }))
            .buffered(FETCH_CONCURRENCY)
            .collect()
            .await;

        for (case_idx, source, url, outcome) in outcomes {
            match outcome {
                Ok(leg) => {
                    stats.fetch_attempts += 1;
                    if leg.cache_hit {
                        stats.cache_hits += 1;
                    }
                    stats.durations_ms.push(leg.duration_ms as u128);
                    let status_label = match leg.classification {
                        Classification::Ok => {
                            stats.fetch_ok += 1;
                            "ok"
                        }
                        Classification::Blocked => {
                            stats.blocked += 1;
                            "blocked"
                        }
                        Classification::NeedsRender => {
                            stats.needs_render += 1;
                            "needs_render"
                        }
                        Classification::NotFound => {
                            stats.not_found += 1;
                            "not_found"
                        }
                        _ => {
                            // Transport failures count toward --fail-on error.
                            any_error = true;
                            stats.fetch_errors += 1;
                            "transport_error"
                        }
                    };
                    case_entries[case_idx]["by_provider"][pid]["fetch"] = serde_json::json!({
                        "target_url": url,
                        "source": source,
                        "status": status_label,
                        "duration_ms": leg.duration_ms,
                        "http_status": leg.http_status,
                        "final_url": leg.final_url,
                        "content_type": leg.content_type,
                        "bytes": leg.body.len(),
                        "cache_hit": leg.cache_hit,
                    });
                    if leg.classification == Classification::Ok {
                        let body = String::from_utf8_lossy(&leg.body);
                        case_entries[case_idx]["by_provider"][pid]["extract"] = score_extraction(
                            &body,
                            leg.content_type.as_deref(),
                            leg.final_url.as_deref(),
                            stats,
                        );
                    } else {
                        case_entries[case_idx]["by_provider"][pid]["extract"] =
                            serde_json::json!({"status": "skipped", "reason": "fetch_failed"});
                    }
                }
                Err(e) => {
                    any_error = true;
                    stats.fetch_attempts += 1;
                    stats.fetch_errors += 1;
                    case_entries[case_idx]["by_provider"][pid]["fetch"] = serde_json::json!({
                        "target_url": url,
                        "source": source,
                        "status": "error",
                        "error": e.to_value(),
                    });
                    case_entries[case_idx]["by_provider"][pid]["extract"] =
                        serde_json::json!({"status": "skipped", "reason": "fetch_error"});
                }
            }
        }
    }

    // Summaries: per-provider rows plus cross-provider aggregates.
    let default_stats = ProviderStats::default();
    let all: Vec<&ProviderStats> = provider_ids
        .iter()
        .map(|pid| per_provider.get(pid).unwrap_or(&default_stats))
        .collect();
    let by_provider_summary: Vec<serde_json::Value> = provider_ids
        .iter()
        .zip(all.iter())
        .map(|(pid, s)| s.summary_row(pid))
        .collect();

    let total = |f: fn(&ProviderStats) -> usize| all.iter().copied().map(f).sum::<usize>();
    let total_criteria = total(|s| s.criteria_cases);
    let total_hits = total(|s| s.hit_cases);
    let total_mrr: f64 = all.iter().map(|s| s.mrr_sum).sum();
    let total_fetch_attempts = total(|s| s.fetch_attempts);
    let total_extract_attempts = total(|s| s.extract_attempts);

    let mut overlap: Vec<serde_json::Value> = Vec::new();
    if provider_ids.len() >= 2 {
        for (i, a) in provider_ids.iter().enumerate() {
            for b in provider_ids.iter().skip(i + 1) {
                let mut values = Vec::new();
                for case in &suite.cases {
                    let a_set = url_sets
                        .get(&(case.id.clone(), a.to_string()))
                        .cloned()
                        .unwrap_or_default();
                    let b_set = url_sets
                        .get(&(case.id.clone(), b.to_string()))
                        .cloned()
                        .unwrap_or_default();
                    let union: std::collections::BTreeSet<&String> =
                        a_set.iter().chain(b_set.iter()).collect();
                    if union.is_empty() {
                        continue;
                    }
                    let inter = a_set.iter().filter(|u| b_set.contains(u)).count();
                    values.push(inter as f64 / union.len() as f64);
                }
                overlap.push(serde_json::json!({
                    "a": a,
                    "b": b,
                    "avg_jaccard": ratio_f(values.iter().sum(), values.len()),
                    "cases": values.len(),
                }));
            }
        }
    }

    let hit_ratio = ratio(cache_read_hits, cache_reads);
    ctx.cache_meta = Some(CacheMeta {
        hit: cache_read_hits > 0,
        stored: Some(cache_writes > 0),
        hit_ratio: Some(hit_ratio),
    });

    let summary = serde_json::json!({
        "hit_at_k": ratio(total_hits, total_criteria),
        "mrr": ratio_f(total_mrr, total_criteria),
        "blocked_rate": ratio(total(|s| s.blocked), total_fetch_attempts),
        "needs_render_rate": ratio(total(|s| s.needs_render), total_fetch_attempts),
        "extraction_nonempty_rate": ratio(total(|s| s.extract_non_empty), total_extract_attempts),
        "by_provider": by_provider_summary,
        "overlap": overlap,
        "cache": {
            "reads": cache_reads,
            "hits": cache_read_hits,
            "writes": cache_writes,
            "hit_ratio": hit_ratio,
        },
    });

    let failed = match cmd.fail_on.as_str() {
        "none" => false,
        "error" => any_error,
        "miss" => any_miss,
        _ => any_error || any_miss,
    };

    let data = serde_json::json!({
        "suite": {"path": suite.path, "case_count": suite.cases.len()},
        "settings": {
            "providers": provider_ids,
            "k": cmd.k,
            "fail_on": cmd.fail_on,
        },
        "summary": summary,
        "cases": case_entries,
    });

    if ctx.wants_plain() {
        print_plain(&data);
        if failed {
            eprintln!("eval failed");
            return Ok(1);
        }
        return Ok(ctx.finish("eval", serde_json::json!({}), None));
    }
    if !ctx.wants_json() {
        print_human(&suite, cmd.k, &data);
        if failed {
            eprintln!("eval failed");
            return Ok(1);
        }
        return Ok(ctx.finish("eval", serde_json::json!({}), None));
    }

    let error = failed.then(|| {
        CmdError::new(ErrorCode::ProviderError, "eval failed").with_details(serde_json::json!({
            "miss": any_miss,
            "error": any_error,
            "fail_on": cmd.fail_on,
        }))
    });
    Ok(ctx.finish("eval", data, error))
}

struct FetchLegResult {
    classification: Classification,
    http_status: Option<u16>,
    final_url: Option<String>,
    content_type: Option<String>,
    body: Vec<u8>,
    cache_hit: bool,
    duration_ms: u64,
}

async fn fetch_one(
    fetcher: &HttpFetcher,
    settings: &crate::support::Settings,
    headers: &BTreeMap<String, String>,
    url: &str,
) -> Result<FetchLegResult, CmdError> {
    let mut req = FetchRequest::new(url);
    req.headers = headers.clone();
    req.timeout_ms = Some(settings.policy.timeout_ms);
    req.max_bytes = Some(settings.policy.max_bytes);
    req.cache.read = settings.cache_enabled && !settings.cache_fresh;
    req.cache.write = settings.cache_enabled;
    req.cache.ttl_s = Some(settings.cache_ttl.as_secs());
    let outcome = fetcher.fetch(&req).await.map_err(CmdError::from)?;
    Ok(FetchLegResult {
        classification: outcome.classification,
        http_status: outcome.document.http.as_ref().map(|h| h.status),
        final_url: outcome.document.http.as_ref().map(|h| h.final_url.clone()),
        content_type: outcome
            .document
            .artifact
            .as_ref()
            .and_then(|a| a.content_type.clone()),
        body: outcome.body,
        cache_hit: outcome.cache_hit,
        duration_ms: 0,
    })
}

fn ratio(num: usize, den: usize) -> f64 {
    ratio_f(num as f64, den)
}

fn ratio_f(num: f64, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num / den as f64
    }
}

fn median(values: &[u128]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    })
}

fn print_plain(data: &serde_json::Value) {
    if let Some(rows) = data["summary"]["by_provider"].as_array() {
        for row in rows {
            println!(
                "{}\t{:.3}\t{:.3}\t{}\t{}\t{}",
                row["provider"].as_str().unwrap_or("?"),
                row["hit_rate"].as_f64().unwrap_or(0.0),
                row["mrr"].as_f64().unwrap_or(0.0),
                row["hit_cases"].as_u64().unwrap_or(0),
                row["criteria_cases"].as_u64().unwrap_or(0),
                row["errors"].as_u64().unwrap_or(0),
            );
        }
    }
}

fn print_human(suite: &EvalSuite, k: usize, data: &serde_json::Value) {
    println!("suite: {} ({} cases, k={})", suite.path, suite.cases.len(), k);
    if let Some(rows) = data["summary"]["by_provider"].as_array() {
        for row in rows {
            println!(
                "{}: hit@k {}/{} ({:.3}), mrr {:.3}, errors {}",
                row["provider"].as_str().unwrap_or("?"),
                row["hit_cases"].as_u64().unwrap_or(0),
                row["criteria_cases"].as_u64().unwrap_or(0),
                row["hit_rate"].as_f64().unwrap_or(0.0),
                row["mrr"].as_f64().unwrap_or(0.0),
                row["errors"].as_u64().unwrap_or(0),
            );
        }
    }
    println!(
        "cache: {} reads, {} hits (ratio {:.3})",
        data["summary"]["cache"]["reads"].as_u64().unwrap_or(0),
        data["summary"]["cache"]["hits"].as_u64().unwrap_or(0),
        data["summary"]["cache"]["hit_ratio"].as_f64().unwrap_or(0.0),
    );
}
