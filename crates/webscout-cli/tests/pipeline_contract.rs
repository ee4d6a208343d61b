use axum::{http::header, routing::get, Json, Router};
use std::net::SocketAddr;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ARTICLE: &str = "<html><head><title>Asyncio Guide</title></head><body><article>\
<h1>Asyncio Guide</h1><p>Event loops schedule coroutines cooperatively and this \
paragraph is long enough to be selected as the dominant article body.</p>\
</article></body></html>";

struct Fixture {
    addr: SocketAddr,
    page_hits: Arc<AtomicUsize>,
}

/// Brave-shaped search endpoint plus a content page, with a hit counter on
/// the page so plan mode can prove it fetched nothing. `{SELF}` in result
/// URLs is replaced by the fixture's own address.
async fn serve_fixture(result_urls: Vec<String>) -> Fixture {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let result_urls: Vec<String> = result_urls
        .into_iter()
        .map(|u| u.replace("{SELF}", &addr.to_string()))
        .collect();
    let page_hits = Arc::new(AtomicUsize::new(0));
    let hits = page_hits.clone();
    let app = Router::new()
        .route(
            "/search",
            get(move || {
                let urls = result_urls.clone();
                async move {
                    let results: Vec<serde_json::Value> = urls
                        .iter()
                        .enumerate()
                        .map(|(i, url)| {
                            serde_json::json!({
                                "url": url,
                                "title": format!("Result {i}"),
                                "description": "about asyncio",
                            })
                        })
                        .collect();
                    Json(serde_json::json!({"web": {"results": results}}))
                }
            }),
        )
        .route(
            "/article",
            get(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    ([(header::CONTENT_TYPE, "text/html")], ARTICLE)
                }
            }),
        );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Fixture { addr, page_hits }
}

fn webscout(home: &std::path::Path, fixture: SocketAddr) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("webscout");
    let mut cmd = Command::new(bin);
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("HTTP_PROXY")
        .env_remove("HTTPS_PROXY")
        .env("BRAVE_API_KEY", "test-key")
        .env(
            "WEBSCOUT_BRAVE_ENDPOINT",
            format!("http://{fixture}/search"),
        );
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn plan_mode_returns_candidates_without_fetching() {
    let fixture = serve_fixture(vec![
        "https://a.example/x".to_string(),
        "https://b.example/y".to_string(),
        "https://c.example/z".to_string(),
        "https://d.example/w".to_string(),
    ])
    .await;
    let home = tempfile::tempdir().unwrap();

    let out = webscout(home.path(), fixture.addr)
        .args([
            "pipeline",
            "python asyncio",
            "--plan",
            "--top-k",
            "3",
            "--json",
        ])
        .output()
        .expect("run webscout");

    assert_eq!(out.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["ok"], true);
    assert_eq!(v["data"]["plan"], true);
    let candidates = v["data"]["candidates"].as_array().unwrap();
    assert!(candidates.len() <= 3);
    assert_eq!(v["data"]["documents"].as_array().unwrap().len(), 0);
    // Only the search provider ran; no fetch leg.
    assert_eq!(
        v["meta"]["providers"],
        serde_json::json!(["brave_api"])
    );
    assert_eq!(fixture.page_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn prefer_domain_reranks_stably() {
    let fixture = serve_fixture(vec![
        "https://first.example/a".to_string(),
        "https://second.example/b".to_string(),
        "https://preferred.example/c".to_string(),
        "https://preferred.example/d".to_string(),
    ])
    .await;
    let home = tempfile::tempdir().unwrap();

    let out = webscout(home.path(), fixture.addr)
        .args([
            "pipeline",
            "anything",
            "--plan",
            "--top-k",
            "4",
            "--prefer-domain",
            "preferred.example",
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(0));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let candidates = v["data"]["candidates"].as_array().unwrap();
    let urls: Vec<&str> = candidates.iter().map(|c| c["url"].as_str().unwrap()).collect();
    // Preferred bucket first, original order inside each bucket.
    assert_eq!(
        urls,
        vec![
            "https://preferred.example/c",
            "https://preferred.example/d",
            "https://first.example/a",
            "https://second.example/b",
        ]
    );
    assert_eq!(candidates[0]["reason"], "preferred_domain");
    assert_eq!(candidates[2]["reason"], "top_rank");
    // Ranks keep the original search order for rationale.
    assert_eq!(candidates[0]["rank"], 3);
    assert_eq!(candidates[2]["rank"], 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_extracts_top_candidates_in_order() {
    let home = tempfile::tempdir().unwrap();
    // The result URL points back at the fixture's own article page.
    let fixture = serve_fixture(vec!["http://{SELF}/article".to_string()]).await;
    let article_url = format!("http://{}/article", fixture.addr);

    let out = webscout(home.path(), fixture.addr)
        .args([
            "--cache-dir",
            home.path().join("cache").to_str().unwrap(),
            "pipeline",
            "python asyncio",
            "--top-k",
            "1",
            "--extract-k",
            "1",
            "--json",
        ])
        .output()
        .expect("run webscout");

    assert_eq!(out.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["ok"], true);
    assert_eq!(v["data"]["plan"], false);
    let documents = v["data"]["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["url"], article_url);
    assert!(documents[0]["extracted"]["markdown"]
        .as_str()
        .unwrap()
        .contains("Asyncio Guide"));
    assert_eq!(fixture.page_hits.load(Ordering::SeqCst), 1);

    // Plain mode emits the extracted content.
    let out = webscout(home.path(), fixture.addr)
        .args([
            "--cache-dir",
            home.path().join("cache").to_str().unwrap(),
            "pipeline",
            "python asyncio",
            "--top-k",
            "1",
            "--plain",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Asyncio Guide"));
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_preserves_partial_success() {
    let fixture = serve_fixture(vec![
        "http://127.0.0.1:9/unreachable".to_string(),
        "http://{SELF}/article".to_string(),
    ])
    .await;
    let article_url = format!("http://{}/article", fixture.addr);
    let home = tempfile::tempdir().unwrap();

    let out = webscout(home.path(), fixture.addr)
        .args([
            "--cache-dir",
            home.path().join("cache").to_str().unwrap(),
            "--timeout",
            "3",
            "pipeline",
            "anything",
            "--top-k",
            "2",
            "--extract-k",
            "2",
            "--json",
        ])
        .output()
        .expect("run webscout");

    assert_eq!(out.status.code(), Some(0), "partial success is still ok");
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["ok"], true);
    let documents = v["data"]["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["url"], article_url);
    let errors = v["data"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0]["url"].as_str().unwrap().contains("127.0.0.1:9"));
}

#[tokio::test(flavor = "multi_thread")]
async fn budget_flag_is_accepted_but_warned_about() {
    let fixture = serve_fixture(vec!["https://a.example/x".to_string()]).await;
    let home = tempfile::tempdir().unwrap();

    let out = webscout(home.path(), fixture.addr)
        .args([
            "pipeline",
            "anything",
            "--plan",
            "--budget",
            "2000ms",
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(0));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert!(v["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w.as_str().unwrap_or("").contains("--budget")));
}
