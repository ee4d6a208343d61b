use crate::support::Ctx;
use webscout_core::RenderBackend;
use webscout_local::render::PlaywrightRenderer;
use webscout_local::search::search_registry;

pub async fn run(ctx: &mut Ctx) -> i32 {
    let client = match ctx.settings.http_client() {
        Ok(c) => c,
        Err(e) => return ctx.finish("providers", serde_json::json!({}), Some(e)),
    };

    let mut rows: Vec<serde_json::Value> = Vec::new();
    for entry in search_registry(&client) {
        let reason = entry.provider.disabled_reason();
        rows.push(serde_json::json!({
            "id": entry.meta.id,
            "type": entry.meta.kind,
            "enabled": reason.is_none(),
            "reason": reason,
            "required_env": entry.meta.required_env,
            "privacy_warning": entry.meta.privacy_warning,
        }));
    }
    rows.push(serde_json::json!({
        "id": "http",
        "type": "fetch",
        "enabled": true,
        "reason": null,
        "required_env": [],
        "privacy_warning": null,
    }));
    let renderer = PlaywrightRenderer::new();
    let render_reason = renderer.disabled_reason();
    rows.push(serde_json::json!({
        "id": "browser",
        "type": "render",
        "enabled": render_reason.is_none(),
        "reason": render_reason,
        "required_env": [],
        "privacy_warning": null,
    }));
    for strategy in ["readability", "docs"] {
        rows.push(serde_json::json!({
            "id": strategy,
            "type": "extract",
            "enabled": true,
            "reason": null,
            "required_env": [],
            "privacy_warning": null,
        }));
    }

    for row in &rows {
        if let Some(id) = row.get("id").and_then(|v| v.as_str()) {
            ctx.add_provider(id);
        }
    }

    if ctx.wants_plain() {
        for row in &rows {
            if let Some(id) = row.get("id").and_then(|v| v.as_str()) {
                println!("{id}");
            }
        }
        return 0;
    }
    if !ctx.wants_json() {
        for row in &rows {
            let id = row["id"].as_str().unwrap_or("?");
            let kind = row["type"].as_str().unwrap_or("?");
            let status = if row["enabled"].as_bool().unwrap_or(false) {
                "enabled".to_string()
            } else {
                format!("disabled ({})", row["reason"].as_str().unwrap_or("unknown"))
            };
            println!("{kind}: {id} - {status}");
        }
        return 0;
    }

    ctx.finish("providers", serde_json::json!({"providers": rows}), None)
}
