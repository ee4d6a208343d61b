use crate::markdown::{element_to_markdown, element_to_text, MarkdownOptions};
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use url::Url;
use webscout_core::{DocLink, DocSection, ExtractedContent};

/// Bumped whenever extraction output can change shape for identical input;
/// eval uses it together with `content_hash` for drift detection.
pub const EXTRACTION_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Auto,
    Readability,
    Docs,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Readability => "readability",
            Self::Docs => "docs",
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = webscout_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "readability" => Ok(Self::Readability),
            "docs" => Ok(Self::Docs),
            other => Err(webscout_core::Error::InvalidUsage(format!(
                "unknown extraction strategy: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractLimits {
    /// 0 disables.
    pub max_chars: usize,
    /// 0 disables. Tokens are approximated as chars/4.
    pub max_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub content: ExtractedContent,
    /// Strategy actually used (auto resolved).
    pub strategy: Strategy,
    pub warnings: Vec<String>,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn element_text_chars(el: &ElementRef) -> usize {
    el.text().map(|t| t.chars().count()).sum()
}

fn element_link_text_chars(el: &ElementRef) -> usize {
    el.select(&selector("a"))
        .map(|a| a.text().map(|t| t.chars().count()).sum::<usize>())
        .sum()
}

fn class_or_id_lc(el: &ElementRef) -> String {
    let mut out = String::new();
    if let Some(c) = el.value().attr("class") {
        out.push_str(c);
        out.push(' ');
    }
    if let Some(i) = el.value().attr("id") {
        out.push_str(i);
    }
    out.to_ascii_lowercase()
}

fn is_boilerplate_container(el: &ElementRef) -> bool {
    // Structural UI words only; no site-specific heuristics.
    let s = class_or_id_lc(el);
    if s.is_empty() {
        return false;
    }
    [
        "navbar", "menu", "sidebar", "footer", "banner", "cookie", "consent", "advert", "promo",
        "subscribe", "newsletter", "share", "social", "related", "breadcrumb", "toc",
    ]
    .iter()
    .any(|bad| s.contains(bad))
}

const DOCS_PATH_SEGMENTS: &[&str] = &["docs", "api", "reference", "guide", "manual"];

fn content_root(doc: &Html) -> Option<ElementRef<'_>> {
    for sel in ["main", "[role=\"main\"]", "article", "body"] {
        if let Some(el) = doc.select(&selector(sel)).next() {
            return Some(el);
        }
    }
    None
}

/// Dispatch `auto` between docs-mode and readability-mode.
pub fn choose_strategy(doc: &Html, base_url: Option<&str>) -> Strategy {
    let Some(root) = content_root(doc) else {
        return Strategy::Readability;
    };
    let headings = root.select(&selector("h1,h2,h3,h4,h5,h6")).count();
    let code_blocks = root.select(&selector("pre")).count();
    let nav_blocks = doc.select(&selector("nav, aside")).count()
        + doc
            .select(&selector("[class*=\"toc\"], [class*=\"sidebar\"]"))
            .count();

    let path_hint = base_url
        .and_then(|u| Url::parse(u).ok())
        .map(|u| {
            u.path_segments()
                .map(|mut segments| {
                    segments.any(|s| DOCS_PATH_SEGMENTS.contains(&s.to_ascii_lowercase().as_str()))
                })
                .unwrap_or(false)
        })
        .unwrap_or(false);

    if path_hint && headings >= 2 {
        return Strategy::Docs;
    }
    if code_blocks >= 1 && headings >= 2 {
        return Strategy::Docs;
    }
    if headings >= 6 {
        return Strategy::Docs;
    }
    if nav_blocks >= 1 && headings >= 2 {
        return Strategy::Docs;
    }
    // Heading density: >= 4 headings per 2000 chars of content text.
    let text_chars = element_text_chars(&root);
    if headings >= 4 && text_chars > 0 && headings * 2000 >= text_chars * 4 {
        return Strategy::Docs;
    }
    Strategy::Readability
}

fn title_of(doc: &Html, root: Option<&ElementRef>) -> Option<String> {
    if let Some(el) = doc.select(&selector("title")).next() {
        let t: String = el.text().collect::<Vec<_>>().join(" ");
        let t = t.split_whitespace().collect::<Vec<_>>().join(" ");
        if !t.is_empty() {
            return Some(t);
        }
    }
    if let Some(el) = doc
        .select(&selector("meta[property=\"og:title\"]"))
        .next()
    {
        if let Some(content) = el.value().attr("content") {
            let t = content.trim();
            if !t.is_empty() {
                return Some(t.to_string());
            }
        }
    }
    let scope = root.copied().or_else(|| content_root(doc))?;
    let h1 = scope.select(&selector("h1, h2")).next()?;
    let t: String = h1.text().collect::<Vec<_>>().join(" ");
    let t = t.split_whitespace().collect::<Vec<_>>().join(" ");
    (!t.is_empty()).then_some(t)
}

/// Document attributes first, then a short stopword heuristic over the
/// first ~2KB of extracted text. Absent stays absent.
fn detect_language(doc: &Html, text: &str) -> Option<String> {
    if let Some(html_el) = doc.select(&selector("html")).next() {
        if let Some(lang) = html_el.value().attr("lang") {
            let primary = lang.split(['-', '_']).next().unwrap_or("").trim();
            if !primary.is_empty() {
                return Some(primary.to_ascii_lowercase());
            }
        }
    }
    if let Some(meta) = doc
        .select(&selector("meta[http-equiv=\"content-language\"], meta[name=\"language\"]"))
        .next()
    {
        if let Some(content) = meta.value().attr("content") {
            let primary = content.split(['-', '_', ',']).next().unwrap_or("").trim();
            if !primary.is_empty() {
                return Some(primary.to_ascii_lowercase());
            }
        }
    }

    let window: String = text.chars().take(2048).collect::<String>().to_lowercase();
    let words: Vec<&str> = window
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();
    if words.len() < 20 {
        return None;
    }
    let tables: &[(&str, &[&str])] = &[
        ("en", &["the", "and", "of", "to", "is", "in", "that", "for", "with", "are"]),
        ("de", &["der", "die", "das", "und", "ist", "nicht", "mit", "ein", "für", "von"]),
        ("fr", &["le", "la", "les", "et", "est", "pour", "que", "des", "une", "dans"]),
        ("es", &["el", "los", "que", "es", "para", "con", "una", "del", "las", "por"]),
    ];
    let mut best: Option<(&str, usize)> = None;
    for (lang, stopwords) in tables.iter().copied() {
        let hits = words.iter().filter(|w| stopwords.contains(w)).count();
        match best {
            Some((_, bh)) if hits <= bh => {}
            _ if hits >= 4 => best = Some((lang, hits)),
            _ => {}
        }
    }
    best.map(|(lang, _)| lang.to_string())
}

/// Dominant-article selection: score text density against link density with
/// tag and paragraph bonuses, then convert the winning subtree.
fn pick_article_node<'a>(doc: &'a Html) -> Option<ElementRef<'a>> {
    let sel = selector("article, main, section, div");
    let sel_p = selector("p");
    let mut best_score: i64 = 0;
    let mut best: Option<ElementRef> = None;
    for (seen, el) in doc.select(&sel).enumerate() {
        if seen > 20_000 {
            break;
        }
        if is_boilerplate_container(&el) {
            continue;
        }
        let txt = element_text_chars(&el);
        if txt < 50 {
            continue;
        }
        let link_txt = element_link_text_chars(&el);
        let non_link = txt.saturating_sub(link_txt);
        let mut score = (non_link as i64) - 3 * (link_txt as i64);
        match el.value().name() {
            "article" => score += 500,
            "main" => score += 300,
            _ => {}
        }
        if txt > 0 {
            let density = link_txt as f64 / txt as f64;
            if density >= 0.66 {
                score -= 900;
            } else if density >= 0.5 {
                score -= 500;
            } else if density >= 0.33 {
                score -= 250;
            }
        }
        let paragraphs = el.select(&sel_p).take(50).count() as i64;
        score += 20 * paragraphs.min(10);
        if non_link < 80 {
            score -= 200;
        }
        if score > best_score {
            best_score = score;
            best = Some(el);
        }
    }
    best.or_else(|| doc.select(&selector("body")).next())
}

fn extract_readability(doc: &Html, base: Option<&Url>) -> ExtractedContent {
    let opts = MarkdownOptions {
        base: base.cloned(),
        skip_chrome: true,
        max_table_cols: 8,
    };
    let node = pick_article_node(doc);
    let (markdown, text) = match node {
        Some(el) => (element_to_markdown(el, &opts), element_to_text(el)),
        None => (String::new(), String::new()),
    };
    let title = title_of(doc, node.as_ref());
    let language = detect_language(doc, &text);
    ExtractedContent {
        title,
        language,
        markdown: non_empty(markdown),
        text: non_empty(text),
        content_hash: None,
        extraction_method: "readability".to_string(),
        extraction_version: EXTRACTION_VERSION.to_string(),
        doc_sections: None,
    }
}

/// Link density above this marks a region as navigation chrome.
const SIDEBAR_LINK_DENSITY: f64 = 0.6;

fn is_sidebar_region(el: &ElementRef) -> bool {
    let tag = el.value().name();
    if matches!(tag, "nav" | "aside") {
        return true;
    }
    let label = class_or_id_lc(el);
    if ["toc", "sidebar", "menu"].iter().any(|w| label.contains(w)) {
        return true;
    }
    let txt = element_text_chars(el);
    if txt < 40 {
        return false;
    }
    element_link_text_chars(el) as f64 / txt as f64 > SIDEBAR_LINK_DENSITY
}

fn extract_docs(doc: &Html, base: Option<&Url>) -> ExtractedContent {
    let opts = MarkdownOptions {
        base: base.cloned(),
        skip_chrome: true,
        max_table_cols: 8,
    };
    let root = content_root(doc);
    let mut markdown_parts: Vec<String> = Vec::new();
    let mut text_parts: Vec<String> = Vec::new();
    if let Some(root) = root {
        let children: Vec<ElementRef> = root
            .children()
            .filter_map(ElementRef::wrap)
            .collect();
        if children.is_empty() {
            markdown_parts.push(element_to_markdown(root, &opts));
            text_parts.push(element_to_text(root));
        } else {
            for child in children {
                if is_sidebar_region(&child) {
                    continue;
                }
                let md = element_to_markdown(child, &opts);
                if !md.is_empty() {
                    markdown_parts.push(md);
                }
                let txt = element_to_text(child);
                if !txt.is_empty() {
                    text_parts.push(txt);
                }
            }
        }
    }
    let markdown = markdown_parts.join("\n\n");
    let text = text_parts.join("\n");
    let sections = sections_from_markdown(&markdown);
    let title = title_of(doc, root.as_ref());
    let language = detect_language(doc, &text);
    ExtractedContent {
        title,
        language,
        markdown: non_empty(markdown),
        text: non_empty(text),
        content_hash: None,
        extraction_method: "docs".to_string(),
        extraction_version: EXTRACTION_VERSION.to_string(),
        doc_sections: Some(sections),
    }
}

/// Split rendered markdown into a flat ordered section list. Each section
/// owns its heading and the body up to the next heading; fenced code is
/// opaque to the splitter. Links are already absolute in the markdown.
fn sections_from_markdown(markdown: &str) -> Vec<DocSection> {
    let mut sections: Vec<DocSection> = Vec::new();
    let mut current: Option<(u8, String, Vec<String>)> = None;
    let mut in_fence = false;

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            if let Some((_, _, lines)) = current.as_mut() {
                lines.push(line.to_string());
            }
            continue;
        }
        if !in_fence {
            if let Some((level, text)) = parse_atx_heading(line) {
                if let Some((lvl, heading, lines)) = current.take() {
                    sections.push(section_from(lvl, heading, lines));
                }
                current = Some((level, text, Vec::new()));
                continue;
            }
        }
        if let Some((_, _, lines)) = current.as_mut() {
            lines.push(line.to_string());
        }
    }
    if let Some((lvl, heading, lines)) = current.take() {
        sections.push(section_from(lvl, heading, lines));
    }
    sections
}

fn parse_atx_heading(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = trimmed[hashes..].strip_prefix(' ')?;
    let text = rest.trim().to_string();
    (!text.is_empty()).then_some((hashes as u8, text))
}

fn section_from(level: u8, heading: String, lines: Vec<String>) -> DocSection {
    let body = lines.join("\n").trim().to_string();
    let links = links_from_markdown(&body);
    DocSection {
        heading_level: level,
        heading_text: heading,
        body_markdown: body,
        links,
    }
}

fn links_from_markdown(markdown: &str) -> Vec<DocLink> {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = RE.get_or_init(|| {
        regex::Regex::new(r"\[([^\]]+)\]\((https?://[^)\s]+)\)").expect("static")
    });
    let mut out = Vec::new();
    for cap in re.captures_iter(markdown) {
        out.push(DocLink {
            text: cap[1].to_string(),
            url: cap[2].to_string(),
        });
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

fn approx_tokens(s: &str) -> usize {
    // Whitespace+punctuation approximation: about one token per 4 chars.
    s.chars().count().div_ceil(4)
}

fn truncate_chars(s: &str, max_chars: usize) -> (String, usize, usize, bool) {
    let total = s.chars().count();
    if total <= max_chars {
        return (s.to_string(), total, total, false);
    }
    // Char-wise walk keeps the cut on a UTF-8 boundary.
    let out: String = s.chars().take(max_chars).collect();
    (out, max_chars, total, true)
}

fn truncate_tokens_paragraphwise(s: &str, max_tokens: usize) -> (String, usize, usize, bool) {
    let total = approx_tokens(s);
    if total <= max_tokens {
        return (s.to_string(), total, total, false);
    }
    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0usize;
    for para in s.split("\n\n") {
        let cost = approx_tokens(para);
        if used + cost > max_tokens && !kept.is_empty() {
            break;
        }
        kept.push(para);
        used += cost;
        if used >= max_tokens {
            break;
        }
    }
    (kept.join("\n\n"), used.min(max_tokens), total, true)
}

/// Apply `--max-chars` then `--max-tokens`, in that order. Returns warnings
/// for every cut actually made.
fn apply_limits(content: &mut ExtractedContent, limits: &ExtractLimits) -> Vec<String> {
    let mut warnings = Vec::new();

    if limits.max_chars > 0 {
        let mut clipped_any = false;
        let mut primary: Option<(usize, usize)> = None;
        for field in [&mut content.markdown, &mut content.text] {
            if let Some(value) = field.as_mut() {
                let (out, kept, total, clipped) = truncate_chars(value, limits.max_chars);
                if clipped {
                    clipped_any = true;
                    if primary.is_none() {
                        primary = Some((kept, total));
                    }
                    *value = out;
                }
            }
        }
        if let Some(sections) = content.doc_sections.as_mut() {
            let mut budget = limits.max_chars;
            let mut cut = false;
            let mut kept_sections = Vec::new();
            for mut section in sections.drain(..) {
                if budget == 0 {
                    cut = true;
                    break;
                }
                let (body, kept, _total, clipped) = truncate_chars(&section.body_markdown, budget);
                budget = budget.saturating_sub(kept);
                if clipped {
                    cut = true;
                    section.body_markdown = body;
                    section.links = links_from_markdown(&section.body_markdown);
                }
                kept_sections.push(section);
            }
            *sections = kept_sections;
            clipped_any = clipped_any || cut;
        }
        if clipped_any {
            let (kept, total) = primary.unwrap_or((limits.max_chars, limits.max_chars));
            warnings.push(format!("truncated: chars={kept} of {total} …"));
        }
    }

    if limits.max_tokens > 0 {
        let mut clipped_any = false;
        let mut primary: Option<(usize, usize)> = None;
        if content.doc_sections.is_some() {
            // Section-wise for the docs strategy.
            if let Some(sections) = content.doc_sections.as_mut() {
                let mut budget = limits.max_tokens;
                let mut kept_sections = Vec::new();
                let total: usize = sections
                    .iter()
                    .map(|s| approx_tokens(&s.body_markdown))
                    .sum();
                let mut used = 0usize;
                for section in sections.drain(..) {
                    let cost = approx_tokens(&section.body_markdown);
                    if cost > budget && !kept_sections.is_empty() {
                        clipped_any = true;
                        break;
                    }
                    budget = budget.saturating_sub(cost);
                    used += cost;
                    kept_sections.push(section);
                }
                if clipped_any {
                    primary = Some((used, total));
                }
                *sections = kept_sections;
            }
            if clipped_any {
                // Rebuild markdown from surviving sections so outputs agree.
                if let (Some(sections), Some(markdown)) =
                    (content.doc_sections.as_ref(), content.markdown.as_mut())
                {
                    let rebuilt: Vec<String> = sections
                        .iter()
                        .map(|s| {
                            format!(
                                "{} {}\n\n{}",
                                "#".repeat(s.heading_level as usize),
                                s.heading_text,
                                s.body_markdown
                            )
                        })
                        .collect();
                    *markdown = rebuilt.join("\n\n").trim().to_string();
                }
            }
        } else {
            for field in [&mut content.markdown, &mut content.text] {
                if let Some(value) = field.as_mut() {
                    let (out, used, total, clipped) =
                        truncate_tokens_paragraphwise(value, limits.max_tokens);
                    if clipped {
                        clipped_any = true;
                        if primary.is_none() {
                            primary = Some((used, total));
                        }
                        *value = out;
                    }
                }
            }
        }
        if clipped_any {
            let (used, total) = primary.unwrap_or((limits.max_tokens, limits.max_tokens));
            warnings.push(format!("truncated: tokens={used} of {total}"));
        }
    }

    warnings
}

pub fn content_hash(markdown: &str) -> String {
    let mut h = Sha256::new();
    h.update(markdown.as_bytes());
    hex::encode(h.finalize())
}

/// Extract readable content from HTML under the given strategy and limits.
pub fn extract_html(
    html: &str,
    base_url: Option<&str>,
    strategy: Strategy,
    limits: &ExtractLimits,
) -> Extraction {
    let doc = Html::parse_document(html);
    let base = base_url.and_then(|u| Url::parse(u).ok());

    let resolved = match strategy {
        Strategy::Auto => choose_strategy(&doc, base_url),
        other => other,
    };
    let mut content = match resolved {
        Strategy::Docs => extract_docs(&doc, base.as_ref()),
        _ => extract_readability(&doc, base.as_ref()),
    };

    let warnings = apply_limits(&mut content, limits);
    content.content_hash = content.markdown.as_deref().map(content_hash);

    Extraction {
        content,
        strategy: resolved,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCS_HTML: &str = r#"<html lang="en"><head><title>Widget API</title></head><body>
<nav class="sidebar"><a href="/a">A</a><a href="/b">B</a><a href="/c">C</a></nav>
<main>
<h1>Widget API</h1>
<p>Reference for the widget service.</p>
<h2>Getting started</h2>
<p>Install the client, then see <a href="/docs/auth">authentication</a>.</p>
<pre><code class="language-go">fmt.Println("x")</code></pre>
<h2>Endpoints</h2>
<p>All endpoints are versioned.</p>
</main></body></html>"#;

    const ARTICLE_HTML: &str = r#"<html><head><title>A Story</title></head><body>
<nav><a href="/home">home</a><a href="/about">about</a></nav>
<article>
<h1>A Story</h1>
<p>Once upon a time there was a very long paragraph of prose that carried the
actual substance of the page, repeated a few times to look like an article.</p>
<p>Once upon a time there was a very long paragraph of prose that carried the
actual substance of the page, repeated a few times to look like an article.</p>
</article>
<footer>contact us</footer></body></html>"#;

    #[test]
    fn auto_dispatch_separates_docs_from_articles() {
        let docs = Html::parse_document(DOCS_HTML);
        assert_eq!(choose_strategy(&docs, None), Strategy::Docs);
        let article = Html::parse_document(ARTICLE_HTML);
        assert_eq!(choose_strategy(&article, None), Strategy::Readability);
    }

    #[test]
    fn path_segment_hints_docs_mode() {
        let html = "<html><body><main><h2>A</h2><p>x</p><h2>B</h2><p>y</p></main></body></html>";
        let doc = Html::parse_document(html);
        assert_eq!(
            choose_strategy(&doc, Some("https://example.com/docs/widget")),
            Strategy::Docs
        );
        assert_eq!(
            choose_strategy(&doc, Some("https://example.com/blog/widget")),
            Strategy::Readability
        );
    }

    #[test]
    fn docs_extraction_preserves_headings_code_and_links() {
        let out = extract_html(
            DOCS_HTML,
            Some("https://example.com/docs/"),
            Strategy::Docs,
            &ExtractLimits::default(),
        );
        let content = out.content;
        assert_eq!(content.extraction_method, "docs");
        assert_eq!(content.title.as_deref(), Some("Widget API"));
        assert_eq!(content.language.as_deref(), Some("en"));

        let md = content.markdown.as_deref().unwrap();
        assert!(md.contains("## Getting started"));
        assert!(md.contains("```go\nfmt.Println(\"x\")\n```"), "got: {md}");
        // The sidebar is pruned.
        assert!(!md.contains("[A](") && !md.contains("[B]("));

        let sections = content.doc_sections.unwrap();
        let started = sections
            .iter()
            .find(|s| s.heading_text == "Getting started")
            .expect("section present");
        assert_eq!(started.heading_level, 2);
        assert!(started.body_markdown.contains("fmt.Println"));
        assert_eq!(started.links.len(), 1);
        assert_eq!(started.links[0].url, "https://example.com/docs/auth");
    }

    #[test]
    fn readability_drops_nav_and_footer() {
        let out = extract_html(ARTICLE_HTML, None, Strategy::Readability, &ExtractLimits::default());
        let md = out.content.markdown.as_deref().unwrap();
        assert!(md.contains("# A Story"));
        assert!(md.contains("substance of the page"));
        assert!(!md.contains("contact us"));
        assert!(!md.contains("[home]"));
        assert!(out.content.doc_sections.is_none());
    }

    #[test]
    fn max_chars_cuts_on_utf8_boundary_and_warns() {
        let html = format!(
            "<html><body><article><p>{}</p></article></body></html>",
            "héllo wörld ".repeat(100)
        );
        let out = extract_html(
            &html,
            None,
            Strategy::Readability,
            &ExtractLimits {
                max_chars: 50,
                max_tokens: 0,
            },
        );
        let md = out.content.markdown.as_deref().unwrap();
        assert!(md.chars().count() <= 50);
        assert!(out
            .warnings
            .iter()
            .any(|w| w.starts_with("truncated: chars=50 of ")), "warnings: {:?}", out.warnings);
    }

    #[test]
    fn max_tokens_truncates_docs_sectionwise() {
        let out = extract_html(
            DOCS_HTML,
            None,
            Strategy::Docs,
            &ExtractLimits {
                max_chars: 0,
                max_tokens: 20,
            },
        );
        let sections = out.content.doc_sections.unwrap();
        assert!(sections.len() < 3, "sections should be dropped, got {}", sections.len());
        assert!(out.warnings.iter().any(|w| w.starts_with("truncated: tokens=")));
    }

    #[test]
    fn content_hash_is_stable_for_identical_markdown() {
        let a = extract_html(DOCS_HTML, None, Strategy::Docs, &ExtractLimits::default());
        let b = extract_html(DOCS_HTML, None, Strategy::Docs, &ExtractLimits::default());
        assert_eq!(a.content.content_hash, b.content.content_hash);
        assert_eq!(a.content.content_hash.as_deref().map(str::len), Some(64));
    }

    #[test]
    fn title_falls_back_to_og_title_then_h1() {
        let html = r#"<html><head><meta property="og:title" content="OG Title"></head>
<body><article><p>text body long enough to be picked as the article candidate here</p></article></body></html>"#;
        let out = extract_html(html, None, Strategy::Readability, &ExtractLimits::default());
        assert_eq!(out.content.title.as_deref(), Some("OG Title"));
    }

    #[test]
    fn language_heuristic_reads_stopwords() {
        let text = "the cat and the dog ran to the house of the man that is in the park with a ball for fun and more of the same words that are here";
        let html = format!("<html><body><article><p>{text}</p></article></body></html>");
        let out = extract_html(&html, None, Strategy::Readability, &ExtractLimits::default());
        assert_eq!(out.content.language.as_deref(), Some("en"));
    }
}
