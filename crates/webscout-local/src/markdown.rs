//! Deterministic DOM → markdown conversion.
//!
//! Intentionally "good enough" rather than a full CommonMark serializer:
//! headings, paragraphs, lists, blockquotes, inline emphasis, code spans,
//! fenced code blocks, links, and small GFM tables. Output is stable for
//! identical input, which the content hash and eval drift detection rely on.

use scraper::{ElementRef, Node};
use url::Url;

#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Base for absolutizing link hrefs.
    pub base: Option<Url>,
    /// Drop nav/aside/footer/form subtrees (readability-style chrome).
    pub skip_chrome: bool,
    /// Tables wider than this collapse to a placeholder.
    pub max_table_cols: usize,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            base: None,
            skip_chrome: true,
            max_table_cols: 8,
        }
    }
}

const ALWAYS_SKIP: &[&str] = &[
    "script", "style", "noscript", "template", "head", "svg", "iframe",
];
const CHROME: &[&str] = &["nav", "aside", "footer", "form", "button"];

pub fn resolve_href(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    if let Ok(abs) = Url::parse(href) {
        return Some(abs.to_string());
    }
    base.and_then(|b| b.join(href).ok()).map(|u| u.to_string())
}

struct Writer<'a> {
    out: String,
    opts: &'a MarkdownOptions,
    list_stack: Vec<ListKind>,
}

enum ListKind {
    Unordered,
    Ordered(usize),
}

impl<'a> Writer<'a> {
    fn new(opts: &'a MarkdownOptions) -> Self {
        Self {
            out: String::new(),
            opts,
            list_stack: Vec::new(),
        }
    }

    fn ensure_blank_line(&mut self) {
        if self.out.is_empty() {
            return;
        }
        while self.out.ends_with(' ') {
            self.out.pop();
        }
        if !self.out.ends_with("\n\n") {
            if self.out.ends_with('\n') {
                self.out.push('\n');
            } else {
                self.out.push_str("\n\n");
            }
        }
    }

    fn ensure_newline(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn push_inline(&mut self, text: &str) {
        let collapsed = collapse_ws(text);
        if collapsed.is_empty() {
            // Preserve a single separating space between inline runs.
            if text.chars().any(|c| c.is_whitespace())
                && !self.out.is_empty()
                && !self.out.ends_with(|c: char| c.is_whitespace())
            {
                self.out.push(' ');
            }
            return;
        }
        if text.starts_with(|c: char| c.is_whitespace())
            && !self.out.is_empty()
            && !self.out.ends_with(|c: char| c.is_whitespace())
        {
            self.out.push(' ');
        }
        self.out.push_str(&collapsed);
        if text.ends_with(|c: char| c.is_whitespace()) {
            self.out.push(' ');
        }
    }

    fn walk_children(&mut self, el: ElementRef) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => self.push_inline(text),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.walk_element(child_el);
                    }
                }
                _ => {}
            }
        }
    }

    fn walk_element(&mut self, el: ElementRef) {
        let tag = el.value().name();
        if ALWAYS_SKIP.contains(&tag) || (self.opts.skip_chrome && CHROME.contains(&tag)) {
            return;
        }
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<usize>().unwrap_or(1);
                let text = inline_of(el, self.opts);
                if !text.is_empty() {
                    self.ensure_blank_line();
                    self.out.push_str(&"#".repeat(level));
                    self.out.push(' ');
                    self.out.push_str(&text);
                    self.ensure_blank_line();
                }
            }
            "p" => {
                self.ensure_blank_line();
                self.walk_children(el);
                self.ensure_blank_line();
            }
            "br" => self.ensure_newline(),
            "hr" => {
                self.ensure_blank_line();
                self.out.push_str("---");
                self.ensure_blank_line();
            }
            "strong" | "b" => {
                let text = inline_of(el, self.opts);
                if !text.is_empty() {
                    self.push_inline(&format!("**{text}**"));
                }
            }
            "em" | "i" => {
                let text = inline_of(el, self.opts);
                if !text.is_empty() {
                    self.push_inline(&format!("*{text}*"));
                }
            }
            "code" => {
                let raw: String = el.text().collect();
                let code = raw.trim();
                if !code.is_empty() {
                    self.push_inline(&format!("`{code}`"));
                }
            }
            "pre" => self.push_code_block(el),
            "a" => {
                let text = inline_of(el, self.opts);
                let href = el
                    .value()
                    .attr("href")
                    .and_then(|h| resolve_href(h, self.opts.base.as_ref()));
                match (text.is_empty(), href) {
                    (false, Some(href)) => self.push_inline(&format!("[{text}]({href})")),
                    (false, None) => self.push_inline(&text),
                    (true, Some(href)) => self.push_inline(&format!("<{href}>")),
                    (true, None) => {}
                }
            }
            "ul" => {
                self.push_list(el, ListKind::Unordered);
            }
            "ol" => {
                self.push_list(el, ListKind::Ordered(1));
            }
            "li" => self.push_list_item(el),
            "blockquote" => {
                let inner = render_fragment(el, self.opts);
                if !inner.is_empty() {
                    self.ensure_blank_line();
                    for line in inner.lines() {
                        self.out.push_str("> ");
                        self.out.push_str(line);
                        self.out.push('\n');
                    }
                    self.ensure_blank_line();
                }
            }
            "table" => self.push_table(el),
            _ => {
                // Generic container: recurse, letting children decide
                // whether they are block or inline.
                self.walk_children(el);
            }
        }
    }

    fn push_code_block(&mut self, el: ElementRef) {
        let code: String = el.text().collect();
        let code = code.trim_matches('\n');
        if code.trim().is_empty() {
            return;
        }
        let lang = el
            .select(&selector("code"))
            .next()
            .and_then(|c| c.value().attr("class"))
            .and_then(|classes| {
                classes.split_whitespace().find_map(|c| {
                    c.strip_prefix("language-")
                        .or_else(|| c.strip_prefix("lang-"))
                        .map(|s| s.to_string())
                })
            })
            .unwrap_or_default();
        self.ensure_blank_line();
        self.out.push_str("```");
        self.out.push_str(&lang);
        self.out.push('\n');
        self.out.push_str(code);
        self.ensure_newline();
        self.out.push_str("```");
        self.ensure_blank_line();
    }

    fn push_list(&mut self, el: ElementRef, kind: ListKind) {
        if self.list_stack.is_empty() {
            self.ensure_blank_line();
        } else {
            self.ensure_newline();
        }
        self.list_stack.push(kind);
        self.walk_children(el);
        self.list_stack.pop();
        if self.list_stack.is_empty() {
            self.ensure_blank_line();
        }
    }

    fn push_list_item(&mut self, el: ElementRef) {
        let depth = self.list_stack.len().saturating_sub(1);
        let marker = match self.list_stack.last_mut() {
            Some(ListKind::Ordered(n)) => {
                let m = format!("{n}. ");
                *n += 1;
                m
            }
            _ => "- ".to_string(),
        };
        self.ensure_newline();
        self.out.push_str(&"  ".repeat(depth));
        self.out.push_str(&marker);
        self.walk_children(el);
        self.ensure_newline();
    }

    fn push_table(&mut self, el: ElementRef) {
        let mut rows: Vec<Vec<String>> = Vec::new();
        for tr in el.select(&selector("tr")) {
            let mut cells = Vec::new();
            for cell in tr.select(&selector("th, td")) {
                cells.push(inline_of(cell, self.opts));
            }
            if !cells.is_empty() {
                rows.push(cells);
            }
        }
        if rows.is_empty() {
            return;
        }
        let cols = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        self.ensure_blank_line();
        if cols > self.opts.max_table_cols {
            self.out
                .push_str(&format!("[table omitted: {} rows × {} cols]", rows.len(), cols));
            self.ensure_blank_line();
            return;
        }
        for (i, row) in rows.iter().enumerate() {
            self.out.push('|');
            for c in 0..cols {
                let cell = row.get(c).map(String::as_str).unwrap_or("");
                self.out.push(' ');
                self.out.push_str(&cell.replace('|', "\\|"));
                self.out.push_str(" |");
            }
            self.out.push('\n');
            if i == 0 {
                self.out.push('|');
                for _ in 0..cols {
                    self.out.push_str(" --- |");
                }
                self.out.push('\n');
            }
        }
        self.ensure_blank_line();
    }
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn selector(css: &str) -> scraper::Selector {
    scraper::Selector::parse(css).expect("static selector")
}

/// Inline rendering of an element's subtree (no block breaks).
fn inline_of(el: ElementRef, opts: &MarkdownOptions) -> String {
    let mut w = Writer::new(opts);
    w.walk_children(el);
    collapse_ws(&w.out)
}

fn render_fragment(el: ElementRef, opts: &MarkdownOptions) -> String {
    let mut w = Writer::new(opts);
    w.walk_children(el);
    w.out.trim().to_string()
}

/// Convert an element subtree to markdown.
pub fn element_to_markdown(el: ElementRef, opts: &MarkdownOptions) -> String {
    let mut w = Writer::new(opts);
    w.walk_element(el);
    w.out.trim().to_string()
}

/// Block-aware plain text: tags dropped, block elements separated by
/// newlines, inline whitespace collapsed.
pub fn element_to_text(el: ElementRef) -> String {
    fn walk(el: ElementRef, out: &mut String) {
        let tag = el.value().name();
        if ALWAYS_SKIP.contains(&tag) {
            return;
        }
        let block = matches!(
            tag,
            "p" | "div" | "section" | "article" | "main" | "li" | "tr" | "blockquote" | "pre"
                | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "br" | "table" | "ul" | "ol"
        );
        if block && !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        if tag == "pre" {
            let code: String = el.text().collect();
            out.push_str(code.trim_matches('\n'));
            out.push('\n');
            return;
        }
        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    let collapsed = collapse_ws(text);
                    if !collapsed.is_empty() {
                        if !out.is_empty() && !out.ends_with(|c: char| c.is_whitespace()) {
                            out.push(' ');
                        }
                        out.push_str(&collapsed);
                    }
                }
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        walk(child_el, out);
                    }
                }
                _ => {}
            }
        }
        if block && !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }
    let mut out = String::new();
    walk(el, &mut out);
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn md(html: &str) -> String {
        let doc = Html::parse_document(html);
        let root = doc
            .select(&selector("body"))
            .next()
            .expect("body");
        element_to_markdown(root, &MarkdownOptions::default())
    }

    #[test]
    fn headings_lists_and_emphasis() {
        let out = md("<body><h2>Title</h2><p>Some <strong>bold</strong> and <em>italic</em> text.</p><ul><li>one</li><li>two</li></ul></body>");
        assert!(out.contains("## Title"));
        assert!(out.contains("**bold**"));
        assert!(out.contains("*italic*"));
        assert!(out.contains("- one\n- two"));
    }

    #[test]
    fn fenced_code_block_keeps_language_and_content() {
        let out = md(r#"<body><pre><code class="language-go">fmt.Println("x")</code></pre></body>"#);
        assert!(out.starts_with("```go\n"), "got: {out}");
        assert!(out.contains("fmt.Println(\"x\")"));
        assert!(out.trim_end().ends_with("```"));
    }

    #[test]
    fn inline_code_and_links_resolve_against_base() {
        let opts = MarkdownOptions {
            base: Some(Url::parse("https://example.com/docs/").unwrap()),
            ..Default::default()
        };
        let doc = Html::parse_document(
            "<body><p>Use <code>run()</code>, see <a href=\"../api\">the API</a>.</p></body>",
        );
        let root = doc.select(&selector("body")).next().unwrap();
        let out = element_to_markdown(root, &opts);
        assert!(out.contains("`run()`"));
        assert!(out.contains("[the API](https://example.com/api)"), "got: {out}");
    }

    #[test]
    fn small_tables_become_gfm() {
        let out = md("<body><table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table></body>");
        assert!(out.contains("| A | B |"));
        assert!(out.contains("| --- | --- |"));
        assert!(out.contains("| 1 | 2 |"));
    }

    #[test]
    fn wide_tables_collapse_to_a_placeholder() {
        let row: String = (0..9).map(|i| format!("<td>{i}</td>")).collect();
        let html = format!("<body><table><tr>{row}</tr><tr>{row}</tr></table></body>");
        let out = md(&html);
        assert_eq!(out, "[table omitted: 2 rows × 9 cols]");
    }

    #[test]
    fn chrome_and_scripts_are_dropped() {
        let out = md("<body><nav><a href=\"/x\">menu</a></nav><script>x()</script><p>kept</p><footer>f</footer></body>");
        assert_eq!(out, "kept");
    }

    #[test]
    fn blockquote_gets_prefixed() {
        let out = md("<body><blockquote><p>wise words</p></blockquote></body>");
        assert_eq!(out, "> wise words");
    }

    #[test]
    fn plain_text_walks_blocks() {
        let doc = Html::parse_document(
            "<body><h1>T</h1><p>a b</p><ul><li>x</li><li>y</li></ul></body>",
        );
        let root = doc.select(&selector("body")).next().unwrap();
        let out = element_to_text(root);
        assert_eq!(out, "T\na b\nx\ny");
    }
}
