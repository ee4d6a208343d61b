use axum::{http::header, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use std::process::Command;

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn webscout(home: &std::path::Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("webscout");
    let mut cmd = Command::new(bin);
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("HTTP_PROXY")
        .env_remove("HTTPS_PROXY");
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn blocked_403_maps_to_exit_4_with_reason() {
    let app = Router::new().route("/", get(|| async { (StatusCode::FORBIDDEN, "denied") }));
    let addr = serve(app).await;
    let home = tempfile::tempdir().unwrap();

    let out = webscout(home.path())
        .args([
            "--cache-dir",
            home.path().join("cache").to_str().unwrap(),
            "fetch",
            &format!("http://{addr}/"),
            "--json",
        ])
        .output()
        .expect("run webscout");

    assert_eq!(out.status.code(), Some(4));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["ok"], false);
    assert_eq!(v["error"]["code"], "blocked");
    assert_eq!(v["error"]["details"]["reason"], "http_403");
    assert_eq!(v["data"]["document"]["http"]["status"], 403);
}

#[tokio::test(flavor = "multi_thread")]
async fn js_wall_maps_to_exit_5_with_render_suggestion() {
    let body = "<html><body><noscript>JavaScript is required</noscript>\
<p>Please enable JavaScript to view this page</p>\
<script>boot()</script></body></html>";
    let app = Router::new().route(
        "/",
        get(move || async move { ([(header::CONTENT_TYPE, "text/html")], body) }),
    );
    let addr = serve(app).await;
    let home = tempfile::tempdir().unwrap();

    let out = webscout(home.path())
        .args([
            "--cache-dir",
            home.path().join("cache").to_str().unwrap(),
            "fetch",
            &format!("http://{addr}/"),
            "--json",
        ])
        .output()
        .expect("run webscout");

    assert_eq!(out.status.code(), Some(5));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["error"]["code"], "needs_render");
    let steps = v["error"]["details"]["next_steps"]
        .as_array()
        .expect("next_steps present");
    assert!(
        steps
            .iter()
            .any(|s| s.as_str().unwrap_or("").contains("--method browser")),
        "expected a browser suggestion in {steps:?}"
    );
    assert_eq!(v["data"]["document"]["http"]["status"], 200);
}

#[tokio::test(flavor = "multi_thread")]
async fn js_wall_heuristics_are_suppressible() {
    let body = "<html><body><p>Please enable JavaScript to view this page</p></body></html>";
    let app = Router::new().route(
        "/",
        get(move || async move { ([(header::CONTENT_TYPE, "text/html")], body) }),
    );
    let addr = serve(app).await;
    let home = tempfile::tempdir().unwrap();

    let out = webscout(home.path())
        .args([
            "--cache-dir",
            home.path().join("cache").to_str().unwrap(),
            "fetch",
            &format!("http://{addr}/"),
            "--no-detect-blocks",
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["ok"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn repeat_fetches_are_idempotent_under_cache() {
    let app = Router::new().route(
        "/page",
        get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "stable body") }),
    );
    let addr = serve(app).await;
    let home = tempfile::tempdir().unwrap();
    let cache_dir = home.path().join("cache");
    let url = format!("http://{addr}/page");

    let run = || {
        webscout(home.path())
            .args([
                "--cache-dir",
                cache_dir.to_str().unwrap(),
                "fetch",
                &url,
                "--json",
            ])
            .output()
            .expect("run webscout")
    };

    let first: serde_json::Value = serde_json::from_slice(&run().stdout).unwrap();
    let second: serde_json::Value = serde_json::from_slice(&run().stdout).unwrap();

    assert_eq!(first["meta"]["cache"]["hit"], false);
    assert_eq!(second["meta"]["cache"]["hit"], true);
    assert_eq!(
        first["data"]["document"]["artifact"]["body_path"],
        second["data"]["document"]["artifact"]["body_path"]
    );
    assert_eq!(
        first["data"]["document"]["http"]["status"],
        second["data"]["document"]["http"]["status"]
    );

    // Plain mode prints the cache body path.
    let out = webscout(home.path())
        .args([
            "--cache-dir",
            cache_dir.to_str().unwrap(),
            "fetch",
            &url,
            "--plain",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(0));
    let line = String::from_utf8_lossy(&out.stdout);
    assert_eq!(
        line.trim(),
        first["data"]["document"]["artifact"]["body_path"]
            .as_str()
            .unwrap()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn body_is_truncated_at_max_bytes() {
    let app = Router::new().route(
        "/big",
        get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "x".repeat(50_000)) }),
    );
    let addr = serve(app).await;
    let home = tempfile::tempdir().unwrap();

    let out = webscout(home.path())
        .args([
            "--cache-dir",
            home.path().join("cache").to_str().unwrap(),
            "fetch",
            &format!("http://{addr}/big"),
            "--max-bytes",
            "1000",
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(0));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["data"]["document"]["artifact"]["truncated"], true);
    assert_eq!(v["data"]["document"]["artifact"]["body_bytes"], 1000);
}

#[tokio::test(flavor = "multi_thread")]
async fn redirect_chain_is_recorded_in_order() {
    let app = Router::new()
        .route(
            "/start",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/end")], "") }),
        )
        .route(
            "/end",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "landed") }),
        );
    let addr = serve(app).await;
    let home = tempfile::tempdir().unwrap();

    let out = webscout(home.path())
        .args([
            "--cache-dir",
            home.path().join("cache").to_str().unwrap(),
            "fetch",
            &format!("http://{addr}/start"),
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(0));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let chain = v["data"]["document"]["http"]["redirect_chain"].as_array().unwrap();
    assert_eq!(chain.len(), 2);
    assert!(chain[0].as_str().unwrap().ends_with("/start"));
    assert!(chain[1].as_str().unwrap().ends_with("/end"));
    assert!(v["data"]["document"]["http"]["final_url"]
        .as_str()
        .unwrap()
        .ends_with("/end"));
}

#[tokio::test(flavor = "multi_thread")]
async fn robots_respect_refuses_disallowed_urls() {
    let app = Router::new()
        .route(
            "/robots.txt",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "User-agent: *\nDisallow: /private/\n") }),
        )
        .route(
            "/private/page",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "secret") }),
        );
    let addr = serve(app).await;
    let home = tempfile::tempdir().unwrap();

    let out = webscout(home.path())
        .args([
            "--cache-dir",
            home.path().join("cache").to_str().unwrap(),
            "--robots",
            "respect",
            "fetch",
            &format!("http://{addr}/private/page"),
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(4));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["error"]["code"], "robots_disallow");

    // warn mode proceeds, with a warning in the envelope.
    let out = webscout(home.path())
        .args([
            "--cache-dir",
            home.path().join("cache").to_str().unwrap(),
            "--robots",
            "warn",
            "fetch",
            &format!("http://{addr}/private/page"),
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(0));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["ok"], true);
    assert!(v["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|w| w.as_str().unwrap_or("").contains("robots.txt disallows")));
}
