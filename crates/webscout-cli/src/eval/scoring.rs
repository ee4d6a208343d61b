use serde::Serialize;
use webscout_core::SearchResultItem;
use webscout_local::urlutil::{host_matches_domain, host_of, normalize_url_for_match};

/// Per-case retrieval score: hit@k and MRR over both criteria.
///
/// `expected_urls` compare under match-normalization (§cache fingerprint
/// rules minus the query sort); `expected_domains` compare by
/// exact-or-subdomain host match.
#[derive(Debug, Clone, Serialize)]
pub struct SearchScore {
    pub k: usize,
    pub url_hit: bool,
    pub url_first_hit_rank: Option<usize>,
    pub url_mrr: f64,
    pub matched_urls: Vec<String>,
    pub domain_hit: bool,
    pub domain_first_hit_rank: Option<usize>,
    pub domain_mrr: f64,
    pub matched_domains: Vec<String>,
}

pub fn score_search_results(
    results: &[SearchResultItem],
    expected_domains: &[String],
    expected_urls: &[String],
    k: usize,
) -> SearchScore {
    let top = &results[..results.len().min(k)];

    let mut domain_first_hit_rank = None;
    let mut matched_domains = Vec::new();
    if !expected_domains.is_empty() {
        for (idx, r) in top.iter().enumerate() {
            let host = host_of(&r.url).unwrap_or_default();
            if expected_domains
                .iter()
                .any(|d| host_matches_domain(&host, d))
            {
                domain_first_hit_rank = Some(idx + 1);
                break;
            }
        }
        for d in expected_domains {
            let hit = top.iter().any(|r| {
                host_matches_domain(&host_of(&r.url).unwrap_or_default(), d)
            });
            if hit {
                matched_domains.push(d.clone());
            }
        }
    }
    let domain_mrr = domain_first_hit_rank
        .map(|rank| 1.0 / rank as f64)
        .unwrap_or(0.0);

    let expected_set: Vec<String> = expected_urls
        .iter()
        .map(|u| normalize_url_for_match(u))
        .collect();
    let top_normalized: Vec<String> = top
        .iter()
        .map(|r| normalize_url_for_match(&r.url))
        .collect();

    let mut url_first_hit_rank = None;
    let mut matched_urls = Vec::new();
    if !expected_set.is_empty() {
        for (idx, normalized) in top_normalized.iter().enumerate() {
            if expected_set.contains(normalized) {
                url_first_hit_rank = Some(idx + 1);
                break;
            }
        }
        for (original, normalized) in expected_urls.iter().zip(expected_set.iter()) {
            if top_normalized.contains(normalized) {
                matched_urls.push(original.clone());
            }
        }
    }
    let url_mrr = url_first_hit_rank
        .map(|rank| 1.0 / rank as f64)
        .unwrap_or(0.0);

    SearchScore {
        k,
        url_hit: url_first_hit_rank.is_some(),
        url_first_hit_rank,
        url_mrr,
        matched_urls,
        domain_hit: domain_first_hit_rank.is_some(),
        domain_first_hit_rank,
        domain_mrr,
        matched_domains,
    }
}

/// Which pass/fail criterion a case carries: URLs beat domains; a case with
/// neither only contributes quality metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Url,
    Domain,
    None,
}

pub fn criterion_for(expected_urls: &[String], expected_domains: &[String]) -> Criterion {
    if !expected_urls.is_empty() {
        Criterion::Url
    } else if !expected_domains.is_empty() {
        Criterion::Domain
    } else {
        Criterion::None
    }
}

pub fn word_count(text: &str) -> usize {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> SearchResultItem {
        SearchResultItem {
            title: "t".to_string(),
            url: url.to_string(),
            snippet: None,
            published_at: None,
            source_provider: "test".to_string(),
            score: None,
            result_id: "x".to_string(),
        }
    }

    #[test]
    fn url_hit_uses_normalized_comparison() {
        let results = vec![
            item("https://other.org/page"),
            item("https://Example.com/Docs/?utm=1"),
        ];
        let score = score_search_results(
            &results,
            &[],
            &["https://example.com/Docs".to_string()],
            5,
        );
        assert!(score.url_hit);
        assert_eq!(score.url_first_hit_rank, Some(2));
        assert!((score.url_mrr - 0.5).abs() < 1e-9);
        assert_eq!(score.matched_urls, vec!["https://example.com/Docs"]);
    }

    #[test]
    fn results_beyond_k_do_not_count() {
        let results = vec![item("https://a.test/"), item("https://b.test/")];
        let score =
            score_search_results(&results, &[], &["https://b.test/".to_string()], 1);
        assert!(!score.url_hit);
        assert_eq!(score.url_mrr, 0.0);
    }

    #[test]
    fn domain_hit_covers_subdomains() {
        let results = vec![item("https://docs.example.com/x")];
        let score = score_search_results(&results, &["example.com".to_string()], &[], 10);
        assert!(score.domain_hit);
        assert_eq!(score.domain_first_hit_rank, Some(1));
        assert_eq!(score.domain_mrr, 1.0);
        assert_eq!(score.matched_domains, vec!["example.com"]);
    }

    #[test]
    fn criterion_prefers_urls_over_domains() {
        let urls = vec!["https://a.test/".to_string()];
        let domains = vec!["a.test".to_string()];
        assert_eq!(criterion_for(&urls, &domains), Criterion::Url);
        assert_eq!(criterion_for(&[], &domains), Criterion::Domain);
        assert_eq!(criterion_for(&[], &[]), Criterion::None);
    }

    #[test]
    fn word_count_splits_on_non_alphanumerics() {
        assert_eq!(word_count("Hello, world! 42"), 3);
        assert_eq!(word_count(""), 0);
    }
}
