use super::{document_from_render, document_value};
use crate::envelope::{CmdError, ErrorCode};
use crate::support::{enforce_url_policy, Ctx};
use std::path::PathBuf;
use webscout_core::{PolicyMode, RenderBackend, RenderOptions};
use webscout_local::render::PlaywrightRenderer;
use webscout_local::urlutil::redact_url;

#[derive(clap::Args, Debug, Clone)]
pub struct RenderCmd {
    /// URL to render
    pub url: String,
    /// Browser profile directory (privileged; artifacts are not persisted)
    #[arg(long, conflicts_with = "use_system_profile")]
    pub profile: Option<PathBuf>,
    /// Use the system browser profile (privileged)
    #[arg(long)]
    pub use_system_profile: bool,
    /// Extra wait after load, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub wait: u64,
    /// Wait for a CSS selector or 'network-idle'
    #[arg(long)]
    pub wait_for: Option<String>,
    /// Capture a full-page screenshot into the evidence directory
    #[arg(long)]
    pub screenshot: bool,
    /// Run the browser headful (forbidden with --no-input)
    #[arg(long)]
    pub headful: bool,
}

fn resolve_system_profile() -> Result<PathBuf, CmdError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if cfg!(target_os = "macos") {
        if let Some(home) = dirs::home_dir() {
            for p in [
                "Library/Application Support/Google/Chrome",
                "Library/Application Support/Chromium",
                "Library/Application Support/Microsoft Edge",
            ] {
                candidates.push(home.join(p));
            }
        }
    } else if cfg!(target_os = "windows") {
        if let Some(local) = dirs::data_local_dir() {
            candidates.push(local.join("Google/Chrome/User Data"));
            candidates.push(local.join("Microsoft/Edge/User Data"));
        }
    } else if let Some(home) = dirs::home_dir() {
        for p in [".config/google-chrome", ".config/chromium", ".config/microsoft-edge"] {
            candidates.push(home.join(p));
        }
    }
    candidates
        .iter()
        .find(|p| p.exists())
        .cloned()
        .ok_or_else(|| {
            CmdError::new(ErrorCode::InvalidUsage, "system browser profile not found")
                .with_details(serde_json::json!({
                    "searched": candidates
                        .iter()
                        .map(|p| p.to_string_lossy().to_string())
                        .collect::<Vec<_>>(),
                }))
        })
}

pub async fn run(ctx: &mut Ctx, cmd: &RenderCmd) -> i32 {
    match render_inner(ctx, cmd).await {
        Ok(code) => code,
        Err(e) => ctx.finish("render", serde_json::json!({"document": null}), Some(e)),
    }
}

async fn render_inner(ctx: &mut Ctx, cmd: &RenderCmd) -> Result<i32, CmdError> {
    enforce_url_policy(&ctx.settings.policy, &cmd.url, "render")?;

    if ctx.global.no_input && cmd.headful {
        return Err(CmdError::new(
            ErrorCode::InvalidUsage,
            "--headful is not allowed with --no-input",
        ));
    }

    let profile_dir = if let Some(profile) = cmd.profile.clone() {
        Some(profile)
    } else if cmd.use_system_profile {
        Some(resolve_system_profile()?)
    } else {
        None
    };
    if ctx.settings.policy.mode == PolicyMode::Strict && profile_dir.is_some() {
        return Err(CmdError::new(
            ErrorCode::PolicyRefused,
            "strict policy forbids browser profile reuse",
        ));
    }
    let privileged = profile_dir.is_some();
    if privileged {
        ctx.warn("render used a browser profile; treat output as privileged (artifacts are not persisted)");
    }
    if cmd.headful {
        ctx.warn("render used headful mode");
    }

    let renderer = PlaywrightRenderer::new();
    ctx.add_provider("browser");
    let options = RenderOptions {
        timeout_ms: ctx.settings.policy.timeout_ms,
        proxy: ctx.settings.proxy.clone(),
        wait_ms: cmd.wait,
        wait_for: cmd.wait_for.clone(),
        headful: cmd.headful,
        screenshot: cmd.screenshot && !privileged,
        // Privileged renders are do-not-persist: no evidence directory.
        evidence_dir: (!privileged).then(|| ctx.settings.evidence_dir_or_default()),
        profile_dir,
    };
    let page = renderer
        .render(&cmd.url, &options)
        .await
        .map_err(CmdError::from)?;
    let doc = document_from_render(&cmd.url, &page);

    if ctx.wants_plain() {
        match doc.render.as_ref().and_then(|r| r.dom_snapshot_id.as_deref()) {
            Some(id) => println!("{id}"),
            None => {
                let mut url = doc.origin().to_string();
                if ctx.settings.policy.redact {
                    url = redact_url(&url);
                }
                println!("{url}");
            }
        }
        return Ok(ctx.finish("render", serde_json::json!({}), None));
    }

    if !ctx.wants_json() {
        let status = doc
            .http
            .as_ref()
            .map(|h| h.status.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let mut url = doc.origin().to_string();
        if ctx.settings.policy.redact {
            url = redact_url(&url);
        }
        println!("BROWSER {status} {url}");
        if let Some(render) = doc.render.as_ref() {
            if let Some(id) = render.dom_snapshot_id.as_deref() {
                println!("dom: {id}");
            }
            if let Some(shot) = render.screenshot_path.as_deref() {
                println!("screenshot: {shot}");
            }
        }
        return Ok(ctx.finish("render", serde_json::json!({}), None));
    }

    Ok(ctx.finish(
        "render",
        serde_json::json!({"document": document_value(&doc)}),
        None,
    ))
}
