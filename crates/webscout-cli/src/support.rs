use crate::envelope::{self, CacheMeta, CmdError, ErrorCode};
use crate::timeutil::parse_duration;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use webscout_core::{Policy, PolicyMode, RobotsMode};
use webscout_local::robots::RobotsChecker;
use webscout_local::urlutil::{is_allowed, DomainRules};
use webscout_local::{safety, Cache, CacheSettings, HttpFetcher};

const DEFAULT_CACHE_TTL: &str = "7d";
const DEFAULT_CACHE_MAX_MB: u64 = 1024;
const DEFAULT_TIMEOUT_S: f64 = 15.0;
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Browser-ish default headers; overridable via --user-agent /
/// --accept-language / --header.
const DEFAULT_ACCEPT: &str = "text/html,*/*";
const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Output machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,
    /// Pretty-print JSON (implies --json)
    #[arg(long, global = true)]
    pub pretty: bool,
    /// Stable text output for piping
    #[arg(long, global = true)]
    pub plain: bool,
    /// Reduce non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,
    /// Verbose diagnostics to stderr
    #[arg(long, global = true)]
    pub verbose: bool,
    /// Disable ANSI color output
    #[arg(long, global = true)]
    pub no_color: bool,
    /// Never prompt or open interactive flows
    #[arg(long, global = true)]
    pub no_input: bool,
    /// Network timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<f64>,
    /// HTTP(S) proxy URL
    #[arg(long, global = true)]
    pub proxy: Option<String>,
    /// Cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,
    /// Disable the cache entirely
    #[arg(long, global = true)]
    pub no_cache: bool,
    /// Bypass cache reads (still stores on success)
    #[arg(long, global = true)]
    pub fresh: bool,
    /// Cache size budget in MB
    #[arg(long, global = true)]
    pub cache_max_mb: Option<u64>,
    /// Cache TTL (e.g. 24h, 7d)
    #[arg(long, global = true)]
    pub cache_ttl: Option<String>,
    /// Evidence directory for render artifacts
    #[arg(long, global = true)]
    pub evidence_dir: Option<PathBuf>,
    /// Redact URLs and sensitive fields in output
    #[arg(long, global = true)]
    pub redact: bool,
    /// robots.txt stance
    #[arg(long, global = true, value_parser = ["warn", "respect", "ignore"])]
    pub robots: Option<String>,
    /// Allow domain (repeatable); restricts network operations
    #[arg(long = "allow-domain", global = true)]
    pub allow_domain: Vec<String>,
    /// Block domain (repeatable); restricts network operations
    #[arg(long = "block-domain", global = true)]
    pub block_domain: Vec<String>,
    /// Policy mode
    #[arg(long, global = true, value_parser = ["standard", "strict", "permissive"])]
    pub policy: Option<String>,
}

/// On-disk config shape shared by the project file (`./.webscout.json`) and
/// the user file (`~/.config/webscout/config.json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub policy: Option<String>,
    pub robots: Option<String>,
    pub timeout: Option<f64>,
    pub proxy: Option<String>,
    pub redact: Option<bool>,
    pub cache_dir: Option<String>,
    pub cache_ttl: Option<String>,
    pub cache_max_mb: Option<u64>,
    #[serde(default)]
    pub allow_domains: Vec<String>,
    #[serde(default)]
    pub block_domains: Vec<String>,
}

fn load_config(path: &std::path::Path) -> FileConfig {
    let Ok(bytes) = std::fs::read(path) else {
        return FileConfig::default();
    };
    match serde_json::from_slice(&bytes) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "ignoring unparseable config");
            FileConfig::default()
        }
    }
}

fn user_config() -> FileConfig {
    let Some(dir) = dirs::config_dir() else {
        return FileConfig::default();
    };
    load_config(&dir.join("webscout").join("config.json"))
}

fn project_config() -> FileConfig {
    load_config(std::path::Path::new(".webscout.json"))
}

fn proxy_from_env() -> Option<String> {
    for key in ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"] {
        if let Ok(v) = std::env::var(key) {
            let v = v.trim().to_string();
            if !v.is_empty() {
                return Some(v);
            }
        }
    }
    None
}

/// Resolved per-invocation settings: the Policy value object plus the cache
/// knobs that sit outside it.
#[derive(Debug, Clone)]
pub struct Settings {
    pub policy: Policy,
    pub proxy: Option<String>,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub cache_max_mb: u64,
    pub cache_enabled: bool,
    pub cache_fresh: bool,
    pub evidence_dir: Option<PathBuf>,
}

/// Precedence: flags > env > project config > user config > mode defaults.
pub fn resolve_settings(g: &GlobalArgs) -> Result<Settings, CmdError> {
    let project = project_config();
    let user = user_config();

    let mode_str = g
        .policy
        .clone()
        .or_else(|| project.policy.clone())
        .or_else(|| user.policy.clone())
        .unwrap_or_else(|| "standard".to_string());
    let mode: PolicyMode = mode_str
        .parse()
        .map_err(|e: webscout_core::Error| CmdError::new(ErrorCode::InvalidUsage, e.to_string()))?;

    // Strict mode defaults to actually honoring robots.txt; the flag and
    // config files can still override.
    let robots_default = match mode {
        PolicyMode::Strict => "respect",
        _ => "warn",
    };
    let robots_str = g
        .robots
        .clone()
        .or_else(|| project.robots.clone())
        .or_else(|| user.robots.clone())
        .unwrap_or_else(|| robots_default.to_string());
    let robots_mode: RobotsMode = robots_str
        .parse()
        .map_err(|e: webscout_core::Error| CmdError::new(ErrorCode::InvalidUsage, e.to_string()))?;

    let timeout_s = g
        .timeout
        .or(project.timeout)
        .or(user.timeout)
        .unwrap_or(DEFAULT_TIMEOUT_S);
    if !(timeout_s > 0.0) {
        return Err(CmdError::new(
            ErrorCode::InvalidUsage,
            "--timeout must be positive",
        ));
    }

    let proxy = g
        .proxy
        .clone()
        .or_else(proxy_from_env)
        .or_else(|| project.proxy.clone())
        .or_else(|| user.proxy.clone());

    let mut allow_domains = g.allow_domain.clone();
    for d in project.allow_domains.iter().chain(user.allow_domains.iter()) {
        if !allow_domains.contains(d) {
            allow_domains.push(d.clone());
        }
    }
    let mut block_domains = g.block_domain.clone();
    for d in project.block_domains.iter().chain(user.block_domains.iter()) {
        if !block_domains.contains(d) {
            block_domains.push(d.clone());
        }
    }

    let redact = g.redact || project.redact.or(user.redact).unwrap_or(false);

    let cache_dir = g
        .cache_dir
        .clone()
        .or_else(|| project.cache_dir.clone().map(PathBuf::from))
        .or_else(|| user.cache_dir.clone().map(PathBuf::from))
        .or_else(|| dirs::cache_dir().map(|d| d.join("webscout")))
        .unwrap_or_else(|| PathBuf::from(".webscout-cache"));

    let ttl_str = g
        .cache_ttl
        .clone()
        .or_else(|| project.cache_ttl.clone())
        .or_else(|| user.cache_ttl.clone())
        .unwrap_or_else(|| DEFAULT_CACHE_TTL.to_string());
    let cache_ttl = parse_duration(&ttl_str)
        .map_err(|e| CmdError::new(ErrorCode::InvalidUsage, e.to_string()))?;

    let cache_max_mb = g
        .cache_max_mb
        .or(project.cache_max_mb)
        .or(user.cache_max_mb)
        .unwrap_or(DEFAULT_CACHE_MAX_MB);

    let policy = Policy {
        mode,
        allow_domains,
        block_domains,
        robots_mode,
        redact,
        detect_blocks: true,
        follow_redirects: true,
        timeout_ms: (timeout_s * 1000.0) as u64,
        max_bytes: DEFAULT_MAX_BYTES,
    };

    Ok(Settings {
        policy,
        proxy,
        cache_dir,
        cache_ttl,
        cache_max_mb,
        cache_enabled: !g.no_cache,
        cache_fresh: g.fresh,
        evidence_dir: g.evidence_dir.clone(),
    })
}

impl Settings {
    /// Minimal safe settings, used only to emit an envelope when settings
    /// resolution itself failed.
    pub fn fallback() -> Self {
        Self {
            policy: Policy::default(),
            proxy: None,
            cache_dir: std::env::temp_dir().join("webscout"),
            cache_ttl: Duration::from_secs(7 * 86_400),
            cache_max_mb: DEFAULT_CACHE_MAX_MB,
            cache_enabled: false,
            cache_fresh: false,
            evidence_dir: None,
        }
    }

    pub fn cache(&self) -> Cache {
        Cache::new(CacheSettings {
            dir: self.cache_dir.clone(),
            ttl: self.cache_ttl,
            max_bytes: self.cache_max_mb.saturating_mul(1024 * 1024),
            enabled: self.cache_enabled,
            fresh: self.cache_fresh,
        })
    }

    pub fn fetcher(&self) -> Result<HttpFetcher, CmdError> {
        HttpFetcher::new(self.cache(), self.proxy.as_deref()).map_err(CmdError::from)
    }

    pub fn http_client(&self) -> Result<reqwest::Client, CmdError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(format!("webscout/{}", envelope::VERSION))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_millis(self.policy.timeout_ms.max(1_000)));
        if let Some(proxy) = self.proxy.as_deref() {
            builder = builder
                .proxy(reqwest::Proxy::all(proxy).map_err(|e| {
                    CmdError::new(ErrorCode::InvalidUsage, format!("invalid --proxy: {e}"))
                })?);
        }
        builder
            .build()
            .map_err(|e| CmdError::new(ErrorCode::InternalError, e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.policy.timeout_ms)
    }

    pub fn domain_rules(&self) -> DomainRules {
        DomainRules {
            allow: self.policy.allow_domains.clone(),
            block: self.policy.block_domains.clone(),
        }
    }

    pub fn evidence_dir_or_default(&self) -> PathBuf {
        self.evidence_dir
            .clone()
            .unwrap_or_else(|| self.cache_dir.join("evidence"))
    }
}

/// Domain gating for any URL-based network operation.
pub fn enforce_url_policy(policy: &Policy, url: &str, operation: &str) -> Result<(), CmdError> {
    if policy.mode == PolicyMode::Strict && policy.allow_domains.is_empty() {
        return Err(CmdError::new(
            ErrorCode::PolicyRefused,
            format!("strict policy requires --allow-domain for network {operation}"),
        ));
    }
    let rules = DomainRules {
        allow: policy.allow_domains.clone(),
        block: policy.block_domains.clone(),
    };
    if !rules.is_empty() && !is_allowed(url, &rules) {
        return Err(CmdError::new(
            ErrorCode::PolicyRefused,
            "URL blocked by domain rules",
        )
        .with_details(serde_json::json!({"url": url})));
    }
    Ok(())
}

/// Robots stance: `respect` refuses disallowed URLs; `warn` proceeds with a
/// warning; `ignore` performs no lookup at all.
pub async fn enforce_robots_policy(
    checker: &RobotsChecker,
    policy: &Policy,
    url: &str,
    user_agent: &str,
    warnings: &mut Vec<String>,
) -> Result<(), CmdError> {
    if policy.robots_mode == RobotsMode::Ignore {
        return Ok(());
    }
    // Bounded by its own (shorter) timeout so a slow robots host cannot eat
    // the whole request budget.
    let timeout = Duration::from_millis(policy.timeout_ms.min(5_000).max(1_000));
    let check = checker
        .check(url, user_agent, timeout)
        .await
        .map_err(CmdError::from)?;
    if check.allowed {
        return Ok(());
    }
    match policy.robots_mode {
        RobotsMode::Respect => Err(CmdError::new(
            ErrorCode::RobotsDisallow,
            "URL disallowed by robots.txt",
        )
        .with_details(serde_json::json!({
            "url": url,
            "robots_url": check.robots_url,
            "reason": "robots_disallow",
        }))),
        _ => {
            push_warning(warnings, format!("robots.txt disallows {url} (proceeding: --robots warn)"));
            Ok(())
        }
    }
}

pub fn push_warning(warnings: &mut Vec<String>, message: impl Into<String>) {
    let message = message.into();
    if !warnings.contains(&message) {
        warnings.push(message);
    }
}

pub fn default_headers(
    user_agent: Option<&str>,
    accept_language: Option<&str>,
) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("accept".to_string(), DEFAULT_ACCEPT.to_string());
    headers.insert(
        "accept-language".to_string(),
        accept_language.unwrap_or(DEFAULT_ACCEPT_LANGUAGE).to_string(),
    );
    headers.insert(
        "user-agent".to_string(),
        user_agent.unwrap_or(DEFAULT_USER_AGENT).to_string(),
    );
    headers
}

/// Merge `--header k:v` pairs and an optional `--headers-file` JSON object
/// over the defaults. Credential-bearing headers are refused outright;
/// secrets travel via env, never flags.
pub fn parse_headers(
    base: BTreeMap<String, String>,
    header_flags: &[String],
    headers_file: Option<&str>,
) -> Result<BTreeMap<String, String>, CmdError> {
    let mut headers = base;
    let mut add = |k: &str, v: &str| -> Result<(), CmdError> {
        let key = k.trim().to_ascii_lowercase();
        if matches!(key.as_str(), "authorization" | "cookie" | "set-cookie") {
            return Err(CmdError::new(
                ErrorCode::InvalidUsage,
                format!("refusing to set restricted header: {k}"),
            ));
        }
        headers.insert(key, v.trim().to_string());
        Ok(())
    };

    for entry in header_flags {
        let Some((k, v)) = entry.split_once(':') else {
            return Err(CmdError::new(
                ErrorCode::InvalidUsage,
                format!("invalid --header value: {entry:?} (expected key:value)"),
            ));
        };
        add(k, v)?;
    }

    if let Some(path) = headers_file {
        let content = if path == "-" {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| CmdError::new(ErrorCode::IoError, e.to_string()))?;
            buf
        } else {
            std::fs::read_to_string(path)
                .map_err(|e| CmdError::new(ErrorCode::IoError, format!("{path}: {e}")))?
        };
        let parsed: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| CmdError::new(ErrorCode::ParseError, format!("--headers-file: {e}")))?;
        let Some(obj) = parsed.as_object() else {
            return Err(CmdError::new(
                ErrorCode::InvalidUsage,
                "--headers-file must contain a JSON object",
            ));
        };
        for (k, v) in obj {
            let value = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            add(k, &value)?;
        }
    }

    Ok(headers)
}

/// Per-invocation output context: accumulates warnings and provider order,
/// then emits exactly one envelope (JSON mode) and the stderr diagnostics.
pub struct Ctx {
    pub global: GlobalArgs,
    pub settings: Settings,
    pub start: Instant,
    pub warnings: Vec<String>,
    pub providers: Vec<String>,
    pub cache_meta: Option<CacheMeta>,
}

impl Ctx {
    pub fn new(global: GlobalArgs, settings: Settings) -> Self {
        Self {
            global,
            settings,
            start: Instant::now(),
            warnings: Vec::new(),
            providers: Vec::new(),
            cache_meta: None,
        }
    }

    pub fn wants_json(&self) -> bool {
        self.global.json || self.global.pretty
    }

    pub fn wants_plain(&self) -> bool {
        self.global.plain && !self.wants_json()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        push_warning(&mut self.warnings, message);
    }

    pub fn add_provider(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.providers.contains(&id) {
            self.providers.push(id);
        }
    }

    /// Emit the envelope (JSON mode), stderr diagnostics, and return the
    /// process exit code. The single funnel from errors to exit codes.
    pub fn finish(
        &self,
        command: &str,
        mut data: serde_json::Value,
        error: Option<CmdError>,
    ) -> i32 {
        let mut error = error;
        if self.settings.policy.redact {
            safety::redact_urls_in_value(&mut data);
            if let Some(err) = error.as_mut() {
                if let Some(details) = err.details.as_mut() {
                    safety::redact_details(details);
                    safety::redact_urls_in_value(details);
                }
            }
        }

        if !self.global.quiet {
            for w in &self.warnings {
                eprintln!("warning: {w}");
            }
            if let Some(err) = error.as_ref() {
                eprintln!("error: {}", err.message);
            }
        }

        if self.wants_json() {
            let payload = envelope::envelope(
                command,
                data,
                &self.warnings,
                error.as_ref(),
                self.start.elapsed().as_millis(),
                self.cache_meta.as_ref(),
                &self.providers,
            );
            let rendered = if self.global.pretty {
                serde_json::to_string_pretty(&payload)
            } else {
                serde_json::to_string(&payload)
            };
            match rendered {
                Ok(s) => println!("{s}"),
                Err(e) => {
                    eprintln!("error: failed to serialize envelope: {e}");
                    return ErrorCode::InternalError.exit_code();
                }
            }
        }

        error.map(|e| e.code.exit_code()).unwrap_or(0)
    }
}
