use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;
use webscout_core::Result;

/// Per-host robots.txt freshness. Intentionally short: robots changes are
/// rare, but a long-lived CLI process must not act on stale policy forever.
const ROBOTS_TTL: Duration = Duration::from_secs(30 * 60);

/// Upper bound on robots.txt bytes we are willing to parse.
const ROBOTS_MAX_BYTES: usize = 512 * 1024;

#[derive(Debug, Clone)]
pub struct RobotsCheck {
    pub allowed: bool,
    pub robots_url: Option<String>,
    pub status: Option<u16>,
}

#[derive(Debug, Clone)]
struct Rule {
    allow: bool,
    pattern: String,
}

#[derive(Debug, Clone, Default)]
struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Longest-match-wins; ties prefer allow. Empty rule set allows all.
    fn allows(&self, path: &str) -> bool {
        let mut best: Option<(usize, bool)> = None;
        for rule in &self.rules {
            if let Some(len) = match_len(&rule.pattern, path) {
                match best {
                    Some((blen, ballow)) => {
                        if len > blen || (len == blen && rule.allow && !ballow) {
                            best = Some((len, rule.allow));
                        }
                    }
                    None => best = Some((len, rule.allow)),
                }
            }
        }
        best.map(|(_, allow)| allow).unwrap_or(true)
    }
}

/// Match a robots path pattern (`*` wildcard, `$` end anchor) against a
/// path. Returns the pattern length as specificity when it matches.
fn match_len(pattern: &str, path: &str) -> Option<usize> {
    if pattern.is_empty() {
        // "Disallow:" with no value means allow everything; treat as the
        // weakest possible match.
        return Some(0);
    }
    let anchored = pattern.ends_with('$');
    let pat = if anchored {
        &pattern[..pattern.len() - 1]
    } else {
        pattern
    };
    let parts: Vec<&str> = pat.split('*').collect();

    let mut pos = 0usize;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !path[pos..].starts_with(part) {
                return None;
            }
            pos += part.len();
        } else {
            match path[pos..].find(part) {
                Some(found) => pos += found + part.len(),
                None => return None,
            }
        }
    }
    if anchored {
        // The last literal part must reach the end of the path.
        if pat.ends_with('*') || pos == path.len() {
            Some(pattern.len())
        } else {
            None
        }
    } else {
        Some(pattern.len())
    }
}

/// Parse robots.txt into the rule set applying to `user_agent`.
///
/// Groups whose user-agent token is a case-insensitive substring of the
/// caller's UA apply; the `*` group is the fallback. Specific groups win
/// over the wildcard group entirely, per RFC 9309.
fn parse_rules(body: &str, user_agent: &str) -> RuleSet {
    let ua = user_agent.to_ascii_lowercase();
    let mut specific = RuleSet::default();
    let mut wildcard = RuleSet::default();
    let mut any_specific = false;

    let mut group_specific = false;
    let mut group_wildcard = false;
    let mut in_group_header = false;

    for raw in body.lines() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let field = field.trim().to_ascii_lowercase();
        let value = value.trim();

        match field.as_str() {
            "user-agent" => {
                if !in_group_header {
                    group_specific = false;
                    group_wildcard = false;
                }
                in_group_header = true;
                let token = value.to_ascii_lowercase();
                if token == "*" {
                    group_wildcard = true;
                } else if !token.is_empty() && ua.contains(&token) {
                    group_specific = true;
                    any_specific = true;
                }
            }
            "allow" | "disallow" => {
                in_group_header = false;
                let rule = Rule {
                    allow: field == "allow",
                    pattern: value.to_string(),
                };
                if group_specific {
                    specific.rules.push(rule.clone());
                }
                if group_wildcard {
                    wildcard.rules.push(rule);
                }
            }
            _ => {
                in_group_header = false;
            }
        }
    }

    if any_specific {
        specific
    } else {
        wildcard
    }
}

fn robots_url_for(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str()?;
    let mut robots = parsed.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    Some(robots.to_string())
}

#[derive(Debug, Clone)]
struct CachedRobots {
    fetched: Instant,
    status: Option<u16>,
    rules: Option<RuleSet>,
}

/// Process-scoped robots consultant with a per-host in-memory cache.
///
/// This map is deliberately separate from the response cache: robots
/// entries must never count against the cache budget or survive the
/// process.
pub struct RobotsChecker {
    client: reqwest::Client,
    by_host: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsChecker {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            by_host: Mutex::new(HashMap::new()),
        }
    }

    /// Consult robots.txt for `url`. Fetch failures and non-200 statuses
    /// allow the request: robots enforcement must not turn an unreachable
    /// robots file into a denial of service against ourselves.
    pub async fn check(&self, url: &str, user_agent: &str, timeout: Duration) -> Result<RobotsCheck> {
        let Some(robots_url) = robots_url_for(url) else {
            return Ok(RobotsCheck {
                allowed: true,
                robots_url: None,
                status: None,
            });
        };
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
            .unwrap_or_default();

        let cached = {
            let map = self.by_host.lock().unwrap_or_else(|e| e.into_inner());
            map.get(&host)
                .filter(|c| c.fetched.elapsed() < ROBOTS_TTL)
                .cloned()
        };

        let entry = match cached {
            Some(entry) => entry,
            None => {
                let entry = self.fetch_rules(&robots_url, user_agent, timeout).await;
                let mut map = self.by_host.lock().unwrap_or_else(|e| e.into_inner());
                map.insert(host.clone(), entry.clone());
                entry
            }
        };

        let allowed = match &entry.rules {
            Some(rules) => {
                let path = Url::parse(url)
                    .map(|u| {
                        let mut p = u.path().to_string();
                        if let Some(q) = u.query() {
                            p.push('?');
                            p.push_str(q);
                        }
                        p
                    })
                    .unwrap_or_else(|_| "/".to_string());
                rules.allows(&path)
            }
            None => true,
        };

        Ok(RobotsCheck {
            allowed,
            robots_url: Some(robots_url),
            status: entry.status,
        })
    }

    async fn fetch_rules(
        &self,
        robots_url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> CachedRobots {
        let resp = self
            .client
            .get(robots_url)
            .header(reqwest::header::ACCEPT, "text/plain,*/*")
            .timeout(timeout)
            .send()
            .await;
        let Ok(resp) = resp else {
            tracing::debug!(robots_url, "robots fetch failed; allowing");
            return CachedRobots {
                fetched: Instant::now(),
                status: None,
                rules: None,
            };
        };
        let status = resp.status().as_u16();
        if status != 200 {
            return CachedRobots {
                fetched: Instant::now(),
                status: Some(status),
                rules: None,
            };
        }
        let body = resp.text().await.unwrap_or_default();
        let body = if body.len() > ROBOTS_MAX_BYTES {
            body[..ROBOTS_MAX_BYTES].to_string()
        } else {
            body
        };
        CachedRobots {
            fetched: Instant::now(),
            status: Some(status),
            rules: Some(parse_rules(&body, user_agent)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = "\
# comments are ignored
User-agent: *
Disallow: /private/
Allow: /private/ok
Disallow: /*.json$

User-agent: scoutbot
Disallow: /only-for-scout/
";

    #[test]
    fn wildcard_group_applies_when_no_specific_match() {
        let rules = parse_rules(BODY, "Mozilla/5.0");
        assert!(rules.allows("/public/page"));
        assert!(!rules.allows("/private/page"));
        assert!(rules.allows("/private/ok/page"));
    }

    #[test]
    fn specific_group_replaces_the_wildcard_group() {
        let rules = parse_rules(BODY, "scoutbot/0.1");
        assert!(!rules.allows("/only-for-scout/x"));
        // The wildcard group's disallow does not apply to the specific group.
        assert!(rules.allows("/private/page"));
    }

    #[test]
    fn wildcard_and_end_anchor_patterns() {
        let rules = parse_rules(BODY, "anything");
        assert!(!rules.allows("/api/data.json"));
        // The $ anchor binds to the end of the checked path.
        assert!(rules.allows("/api/data.json?x=1"));
        assert!(rules.allows("/api/data.jsonl"));
    }

    #[test]
    fn empty_disallow_allows_everything() {
        let rules = parse_rules("User-agent: *\nDisallow:\n", "x");
        assert!(rules.allows("/anything"));
    }

    #[test]
    fn robots_url_derivation() {
        assert_eq!(
            robots_url_for("https://example.com/a/b?q=1").as_deref(),
            Some("https://example.com/robots.txt")
        );
        assert_eq!(robots_url_for("file:///tmp/x.html"), None);
    }
}
