use url::Url;

/// Strip port/surrounding dots, lowercase. IDNA hosts are compared in the
/// ASCII (punycode) form the `url` crate already produces.
pub fn normalize_host(host: &str) -> String {
    host.trim().trim_matches('.').to_ascii_lowercase()
}

pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(normalize_host)
}

/// Exact or subdomain match: `docs.example.com` matches `example.com`.
pub fn host_matches_domain(host: &str, domain: &str) -> bool {
    let domain = normalize_host(domain);
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}

#[derive(Debug, Clone, Default)]
pub struct DomainRules {
    pub allow: Vec<String>,
    pub block: Vec<String>,
}

impl DomainRules {
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.block.is_empty()
    }
}

/// Block list wins; a non-empty allow list is exhaustive.
pub fn is_allowed(url: &str, rules: &DomainRules) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    if rules.block.iter().any(|d| host_matches_domain(&host, d)) {
        return false;
    }
    if !rules.allow.is_empty() {
        return rules.allow.iter().any(|d| host_matches_domain(&host, d));
    }
    true
}

/// Strip userinfo, query, and fragment. Unparseable input is returned as-is
/// rather than leaking through an error path.
pub fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let _ = parsed.set_username("");
    let _ = parsed.set_password(None);
    parsed.set_query(None);
    parsed.set_fragment(None);
    parsed.to_string()
}

/// Canonical form used for URL equality in eval scoring: lowercased
/// scheme+host (the parser already does this), trailing slash trimmed off
/// non-root paths, query and fragment dropped.
pub fn normalize_url_for_match(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.trim().to_string();
    };
    parsed.set_query(None);
    parsed.set_fragment(None);
    let mut out = parsed.to_string();
    if out.ends_with('/') && parsed.path() != "/" {
        out.pop();
    }
    out
}

/// Canonical form used for cache fingerprints: scheme+host lowercased, path
/// preserved, query keys sorted, fragment stripped.
pub fn normalize_url_for_cache(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.trim().to_string();
    };
    parsed.set_fragment(None);
    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        parsed.set_query(None);
        return parsed.to_string();
    }
    pairs.sort();
    let query = pairs
        .iter()
        .map(|(k, v)| {
            if v.is_empty() {
                k.clone()
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join("&");
    parsed.set_query(Some(&query));
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_matching_covers_subdomains() {
        assert!(host_matches_domain("docs.example.com", "example.com"));
        assert!(host_matches_domain("example.com", "EXAMPLE.com"));
        assert!(!host_matches_domain("notexample.com", "example.com"));
        assert!(!host_matches_domain("example.com", ""));
    }

    #[test]
    fn block_list_wins_over_allow_list() {
        let rules = DomainRules {
            allow: vec!["example.com".to_string()],
            block: vec!["bad.example.com".to_string()],
        };
        assert!(is_allowed("https://example.com/x", &rules));
        assert!(!is_allowed("https://bad.example.com/x", &rules));
        assert!(!is_allowed("https://other.org/", &rules));
    }

    #[test]
    fn empty_rules_allow_everything() {
        let rules = DomainRules::default();
        assert!(is_allowed("https://anything.example/", &rules));
        assert!(!is_allowed("not a url", &rules));
    }

    #[test]
    fn redact_strips_userinfo_query_and_fragment() {
        let out = redact_url("https://user:pw@example.com:8443/p?token=abc#frag");
        assert_eq!(out, "https://example.com:8443/p");
    }

    #[test]
    fn match_normalization_drops_trailing_slash_and_query() {
        assert_eq!(
            normalize_url_for_match("HTTPS://Example.COM/Docs/?utm=1"),
            "https://example.com/Docs"
        );
        assert_eq!(
            normalize_url_for_match("https://example.com/"),
            "https://example.com/"
        );
    }

    #[test]
    fn cache_normalization_sorts_query_keys() {
        assert_eq!(
            normalize_url_for_cache("https://example.com/a?b=2&a=1#x"),
            "https://example.com/a?a=1&b=2"
        );
        assert_eq!(
            normalize_url_for_cache("https://example.com/a"),
            "https://example.com/a"
        );
    }
}
