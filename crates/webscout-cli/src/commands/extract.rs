use super::{document_value, retrieve_html, LegDeps, Method};
use crate::envelope::{CacheMeta, CmdError, ErrorCode};
use crate::support::{default_headers, Ctx};
use webscout_core::{Document, PolicyMode};
use webscout_local::extract::{extract_html, ExtractLimits, Strategy};
use webscout_local::render::PlaywrightRenderer;
use webscout_local::robots::RobotsChecker;
use webscout_local::safety;

#[derive(clap::Args, Debug, Clone)]
pub struct ExtractCmd {
    /// URL, path, or '-' for stdin
    pub target: String,
    /// Extraction strategy
    #[arg(long, default_value = "auto", value_parser = ["auto", "readability", "docs"])]
    pub strategy: String,
    /// Transport method. `auto` escalates http -> browser on JS walls and
    /// requires --policy permissive.
    #[arg(long, default_value = "http", value_parser = ["http", "browser", "auto"])]
    pub method: String,
    /// Output markdown only
    #[arg(long, conflicts_with_all = ["text", "both"])]
    pub markdown: bool,
    /// Output text only
    #[arg(long, conflicts_with = "both")]
    pub text: bool,
    /// Output both markdown and text
    #[arg(long)]
    pub both: bool,
    /// Truncate extracted output at N characters
    #[arg(long, default_value_t = 0)]
    pub max_chars: usize,
    /// Truncate extracted output at ~N tokens (chars/4 approximation)
    #[arg(long, default_value_t = 0)]
    pub max_tokens: usize,
    /// Include raw HTML in JSON output (debug)
    #[arg(long)]
    pub include_html: bool,
}

pub async fn run(ctx: &mut Ctx, cmd: &ExtractCmd) -> i32 {
    match extract_inner(ctx, cmd).await {
        Ok(code) => code,
        Err(e) => ctx.finish("extract", serde_json::json!({"document": null}), Some(e)),
    }
}

fn is_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

async fn extract_inner(ctx: &mut Ctx, cmd: &ExtractCmd) -> Result<i32, CmdError> {
    let method: Method = cmd.method.parse()?;
    if method == Method::Auto && ctx.settings.policy.mode != PolicyMode::Permissive {
        return Err(CmdError::new(
            ErrorCode::PolicyRefused,
            "auto browser escalation requires --policy permissive",
        ));
    }
    let strategy: Strategy = cmd
        .strategy
        .parse()
        .map_err(|e: webscout_core::Error| CmdError::new(ErrorCode::InvalidUsage, e.to_string()))?;

    let (mut document, html) = if is_url(&cmd.target) {
        let fetcher = ctx.settings.fetcher()?;
        let renderer = PlaywrightRenderer::new();
        let robots = RobotsChecker::new(ctx.settings.http_client()?);
        let deps = LegDeps {
            fetcher: &fetcher,
            renderer: &renderer,
            robots: &robots,
            settings: &ctx.settings,
        };
        let headers = default_headers(None, None);
        let mut warnings = std::mem::take(&mut ctx.warnings);
        let retrieved =
            retrieve_html(&deps, &cmd.target, method, &headers, "extract", &mut warnings).await;
        ctx.warnings = warnings;
        match retrieved {
            Ok(retrieved) => {
                for p in &retrieved.providers {
                    ctx.add_provider(*p);
                }
                if let Some(hit) = retrieved.cache_hit {
                    ctx.cache_meta = Some(CacheMeta {
                        hit,
                        stored: Some(!hit),
                        hit_ratio: None,
                    });
                }
                (retrieved.document, retrieved.html)
            }
            Err(failure) => {
                let data = serde_json::json!({
                    "document": failure.document.as_ref().map(document_value),
                });
                return Ok(ctx.finish("extract", data, Some(failure.error)));
            }
        }
    } else if cmd.target == "-" {
        use std::io::Read;
        let mut html = String::new();
        std::io::stdin()
            .read_to_string(&mut html)
            .map_err(|e| CmdError::new(ErrorCode::IoError, e.to_string()))?;
        (Document::from_source_path("stdin"), html)
    } else {
        let html = std::fs::read_to_string(&cmd.target)
            .map_err(|e| CmdError::new(ErrorCode::IoError, format!("{}: {e}", cmd.target)))?;
        (Document::from_source_path(&cmd.target), html)
    };

    let base_url = document
        .http
        .as_ref()
        .map(|h| h.final_url.clone())
        .or_else(|| document.url.clone());
    let limits = ExtractLimits {
        max_chars: cmd.max_chars,
        max_tokens: cmd.max_tokens,
    };
    let extraction = extract_html(&html, base_url.as_deref(), strategy, &limits);
    ctx.add_provider(extraction.strategy.as_str());
    for w in &extraction.warnings {
        ctx.warn(w.clone());
        document.push_warning(w.clone());
    }

    let mut content = extraction.content;
    let scan_text = content
        .markdown
        .as_deref()
        .or(content.text.as_deref())
        .unwrap_or("");
    for hit in safety::scan_prompt_injection(scan_text) {
        let warning = safety::injection_warning(&hit);
        ctx.warn(warning.clone());
        document.push_warning(warning);
    }

    if content.markdown.is_none() && content.text.is_none() {
        document.extracted = Some(content);
        let data = serde_json::json!({"document": document_value(&document)});
        let error = CmdError::new(
            ErrorCode::ExtractionFailed,
            "no readable content could be extracted",
        )
        .with_details(serde_json::json!({
            "strategy": extraction.strategy.as_str(),
            "reason": "empty_extraction",
        }));
        return Ok(ctx.finish("extract", data, Some(error)));
    }

    // Output shaping: --markdown / --text narrow the emitted fields.
    let markdown_only = cmd.markdown;
    let text_only = cmd.text;
    if markdown_only {
        content.text = None;
    } else if text_only {
        content.markdown = None;
    }

    if ctx.wants_plain() || !ctx.wants_json() {
        let output = if text_only {
            content.text.as_deref()
        } else {
            content.markdown.as_deref().or(content.text.as_deref())
        };
        if let Some(output) = output {
            print!("{output}");
            if !output.ends_with('\n') {
                println!();
            }
        }
        document.extracted = Some(content);
        return Ok(ctx.finish("extract", serde_json::json!({}), None));
    }

    document.extracted = Some(content);
    let mut doc_value = document_value(&document);
    if cmd.include_html {
        doc_value["html"] = serde_json::Value::String(html);
    }
    Ok(ctx.finish("extract", serde_json::json!({"document": doc_value}), None))
}
