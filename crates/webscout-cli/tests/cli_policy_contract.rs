use std::process::Command;

fn webscout(home: &std::path::Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("webscout");
    let mut cmd = Command::new(bin);
    // Keep user/project config and provider keys out of the contract.
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_CACHE_HOME", home.join(".cache"))
        .env_remove("BRAVE_API_KEY")
        .env_remove("SEARXNG_BASE_URL")
        .env_remove("FIRECRAWL_BASE_URL")
        .env_remove("HTTP_PROXY")
        .env_remove("HTTPS_PROXY");
    cmd
}

#[test]
fn strict_policy_refuses_url_fetch_without_allow_domain() {
    let home = tempfile::tempdir().unwrap();
    let out = webscout(home.path())
        .args(["--policy", "strict", "fetch", "https://example.com/", "--json"])
        .output()
        .expect("run webscout");

    assert_eq!(out.status.code(), Some(2), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("one JSON envelope");
    assert_eq!(v["ok"], false);
    assert_eq!(v["command"], "fetch");
    assert_eq!(v["error"]["code"], "policy_refused");
    assert!(
        v["error"]["message"].as_str().unwrap().contains("allow-domain"),
        "message should mention allow-domain: {}",
        v["error"]["message"]
    );
}

#[test]
fn strict_policy_allows_whitelisted_domains_through_the_gate() {
    // The gate itself passes; the fetch then fails on transport (no server),
    // which must exit 1 rather than 2.
    let home = tempfile::tempdir().unwrap();
    let out = webscout(home.path())
        .args([
            "--policy",
            "strict",
            "--allow-domain",
            "127.0.0.1",
            "--timeout",
            "2",
            "--no-cache",
            "fetch",
            "http://127.0.0.1:9/",
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["error"]["code"], "transport_error");
}

#[test]
fn blocked_domain_refuses_extract() {
    let home = tempfile::tempdir().unwrap();
    let out = webscout(home.path())
        .args([
            "--block-domain",
            "example.com",
            "extract",
            "https://docs.example.com/page",
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(2));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["error"]["code"], "policy_refused");
}

#[test]
fn unknown_provider_is_invalid_usage() {
    let home = tempfile::tempdir().unwrap();
    let out = webscout(home.path())
        .args(["search", "anything", "--provider", "nope", "--json"])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(2));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["error"]["code"], "invalid_usage");
}

#[test]
fn plain_mode_keeps_stdout_empty_on_error() {
    let home = tempfile::tempdir().unwrap();
    let out = webscout(home.path())
        .args(["--policy", "strict", "fetch", "https://example.com/", "--plain"])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty(), "plain-mode errors go to stderr only");
    assert!(!out.stderr.is_empty());
}

#[test]
fn auto_method_requires_permissive_policy() {
    let home = tempfile::tempdir().unwrap();
    let out = webscout(home.path())
        .args([
            "extract",
            "https://example.com/",
            "--method",
            "auto",
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(2));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["error"]["code"], "policy_refused");
    assert!(v["error"]["message"]
        .as_str()
        .unwrap()
        .contains("permissive"));
}

#[test]
fn restricted_headers_are_rejected_before_transport() {
    let home = tempfile::tempdir().unwrap();
    let out = webscout(home.path())
        .args([
            "fetch",
            "https://example.com/",
            "--header",
            "Authorization: Bearer secret",
            "--json",
        ])
        .output()
        .expect("run webscout");
    assert_eq!(out.status.code(), Some(2));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["error"]["code"], "invalid_usage");
    assert!(v["error"]["message"].as_str().unwrap().contains("restricted header"));
}
