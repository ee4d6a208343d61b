//! Browser rendering via a Playwright shellout.
//!
//! The engine itself is opaque to the core: this adapter spawns `node`
//! with a small driver script and reads one JSON object back. Anything
//! speaking the same contract (html, final_url, status) can replace it.

use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use webscout_core::{Error, RenderBackend, RenderOptions, RenderedPage, Result};

/// Cap on driver stdout; DOM snapshots beyond this are suspicious.
const MAX_DRIVER_OUTPUT: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Default)]
pub struct PlaywrightRenderer;

impl PlaywrightRenderer {
    pub fn new() -> Self {
        Self
    }

    fn node_version() -> Option<String> {
        let out = std::process::Command::new("node")
            .arg("--version")
            .output()
            .ok()?;
        out.status
            .success()
            .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    fn driver_script(url: &str, options: &RenderOptions, screenshot_path: Option<&str>) -> String {
        // Values are embedded as JSON literals so URL/selector content can
        // never escape into script context.
        let url_js = serde_json::to_string(url).unwrap_or_else(|_| "\"\"".to_string());
        let proxy_js = serde_json::to_string(&options.proxy).unwrap_or_else(|_| "null".to_string());
        let wait_for_js =
            serde_json::to_string(&options.wait_for).unwrap_or_else(|_| "null".to_string());
        let profile_js = serde_json::to_string(
            &options
                .profile_dir
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        )
        .unwrap_or_else(|_| "null".to_string());
        let shot_js = serde_json::to_string(&screenshot_path).unwrap_or_else(|_| "null".to_string());
        let timeout = options.timeout_ms.max(1_000);
        let wait_ms = options.wait_ms;
        let headless = !options.headful;

        format!(
            r#"const {{ chromium }} = require('playwright');
(async () => {{
  const url = {url_js};
  const proxy = {proxy_js};
  const waitFor = {wait_for_js};
  const profile = {profile_js};
  const shot = {shot_js};
  const launch = {{ headless: {headless} }};
  if (proxy) launch.proxy = {{ server: proxy }};
  let browser = null, context = null;
  if (profile) {{
    context = await chromium.launchPersistentContext(profile, launch);
  }} else {{
    browser = await chromium.launch(launch);
    context = await browser.newContext();
  }}
  const page = await context.newPage();
  const resp = await page.goto(url, {{ timeout: {timeout}, waitUntil: 'domcontentloaded' }});
  if (waitFor === 'network-idle') {{
    await page.waitForLoadState('networkidle', {{ timeout: {timeout} }});
  }} else if (waitFor) {{
    await page.waitForSelector(waitFor, {{ timeout: {timeout} }});
  }}
  if ({wait_ms} > 0) await page.waitForTimeout({wait_ms});
  if (shot) await page.screenshot({{ path: shot, fullPage: true }});
  const html = await page.content();
  console.log(JSON.stringify({{ html, final_url: page.url(), status: resp ? resp.status() : null }}));
  await context.close();
  if (browser) await browser.close();
}})().catch((e) => {{ console.error(String((e && e.message) || e)); process.exit(3); }});
"#
        )
    }

    fn evidence_paths(
        url: &str,
        options: &RenderOptions,
    ) -> (Option<PathBuf>, Option<PathBuf>, String) {
        let mut h = Sha256::new();
        h.update(url.as_bytes());
        let id = hex::encode(h.finalize())[..16].to_string();
        let Some(dir) = options.evidence_dir.as_ref() else {
            return (None, None, id);
        };
        let dom = dir.join(format!("{id}.html"));
        let shot = options.screenshot.then(|| dir.join(format!("{id}.png")));
        (Some(dom), shot, id)
    }
}

#[derive(serde::Deserialize)]
struct DriverOutput {
    html: String,
    final_url: String,
    status: Option<u16>,
}

#[async_trait::async_trait]
impl RenderBackend for PlaywrightRenderer {
    fn id(&self) -> &'static str {
        "browser"
    }

    fn disabled_reason(&self) -> Option<String> {
        if Self::node_version().is_none() {
            Some("node is not installed (browser rendering shells out to node+playwright)".to_string())
        } else {
            None
        }
    }

    async fn render(&self, url: &str, options: &RenderOptions) -> Result<RenderedPage> {
        if let Some(reason) = self.disabled_reason() {
            return Err(Error::NotConfigured(reason));
        }
        if let Some(dir) = options.evidence_dir.as_ref() {
            std::fs::create_dir_all(dir).map_err(Error::Io)?;
        }
        let (dom_path, shot_path, snapshot_id) = Self::evidence_paths(url, options);
        let script = Self::driver_script(
            url,
            options,
            shot_path.as_ref().map(|p| p.to_string_lossy()).as_deref(),
        );

        let mut cmd = tokio::process::Command::new("node");
        cmd.arg("-e")
            .arg(&script)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        // The page timeout is enforced inside the driver; this outer bound
        // covers browser startup and a wedged node process.
        let budget = Duration::from_millis(options.timeout_ms.max(1_000) + options.wait_ms + 30_000);
        let output = tokio::time::timeout(budget, cmd.output())
            .await
            .map_err(|_| Error::Render("browser render timed out".to_string()))?
            .map_err(|e| Error::Render(format!("failed to spawn node: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.contains("Cannot find module") {
                return Err(Error::NotConfigured(
                    "playwright is not installed for node (npm i -g playwright && npx playwright install chromium)"
                        .to_string(),
                ));
            }
            return Err(Error::Render(format!(
                "browser driver failed: {}",
                stderr.lines().next().unwrap_or("unknown error")
            )));
        }
        if output.stdout.len() > MAX_DRIVER_OUTPUT {
            return Err(Error::Render("browser driver output exceeded bounds".to_string()));
        }

        let parsed: DriverOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::Render(format!("bad driver output: {e}")))?;

        if let Some(dom_path) = dom_path.as_ref() {
            // DOM snapshot is evidence, not cache; failures only degrade it.
            if let Err(e) = std::fs::write(dom_path, parsed.html.as_bytes()) {
                tracing::debug!(error = %e, "failed to persist dom snapshot");
            }
        }

        let wait_strategy_used = match options.wait_for.as_deref() {
            Some("network-idle") => "network-idle".to_string(),
            Some(selector) => format!("selector:{selector}"),
            None if options.wait_ms > 0 => format!("domcontentloaded+{}ms", options.wait_ms),
            None => "domcontentloaded".to_string(),
        };

        Ok(RenderedPage {
            html: parsed.html,
            final_url: parsed.final_url,
            status: parsed.status,
            screenshot_path: shot_path.map(|p| p.to_string_lossy().to_string()),
            dom_snapshot_id: dom_path.is_some().then_some(snapshot_id),
            wait_strategy_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_script_embeds_values_as_json_literals() {
        let options = RenderOptions {
            timeout_ms: 5_000,
            wait_for: Some("#app\"; process.exit(0); //".to_string()),
            ..Default::default()
        };
        let script = PlaywrightRenderer::driver_script("https://example.com/\"; //", &options, None);
        // Quotes inside URL/selector stay escaped inside string literals.
        assert!(script.contains(r##""https://example.com/\"; //""##));
        assert!(script.contains(r##""#app\"; process.exit(0); //""##));
    }

    #[test]
    fn wait_strategy_labels() {
        let (dom, shot, id) = PlaywrightRenderer::evidence_paths(
            "https://example.com/",
            &RenderOptions {
                evidence_dir: Some(std::env::temp_dir()),
                screenshot: true,
                ..Default::default()
            },
        );
        assert!(dom.unwrap().to_string_lossy().ends_with(&format!("{id}.html")));
        assert!(shot.unwrap().to_string_lossy().ends_with(&format!("{id}.png")));
    }
}
