pub mod extract;
pub mod resolver;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::record::ProfileRecord;

/// Placeholder for any field no strategy could resolve.
pub const SENTINEL: &str = "N/A";

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "li", "main", "nav", "ol", "p", "section", "table", "tr",
    "ul",
];

/// The page as the page source saw it: address plus document markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        PageSnapshot {
            url: url.into(),
            html: html.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Person,
    Company,
}

impl ProfileKind {
    /// Person pages live under `/in/`, organisation pages under `/company/`.
    pub fn classify(url: &str) -> Option<Self> {
        if url.contains("/in/") {
            Some(ProfileKind::Person)
        } else if url.contains("/company/") {
            Some(ProfileKind::Company)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProfileKind::Person => "Person Profile",
            ProfileKind::Company => "Company Profile",
        }
    }
}

/// Parse the snapshot once and run the extractor for `kind` over it.
///
/// The parsed document never outlives this call, so async callers can hold
/// the result across `.await` points.
pub fn process_page(kind: ProfileKind, page: &PageSnapshot) -> ProfileRecord {
    let document = Html::parse_document(&page.html);
    match kind {
        ProfileKind::Person => ProfileRecord::Person(extract::person::extract(&document, &page.url)),
        ProfileKind::Company => {
            ProfileRecord::Company(extract::company::extract(&document, &page.url))
        }
    }
}

// ── DOM helpers ──

pub fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    document.select(&sel).next()
}

pub fn select_all<'a>(document: &'a Html, selector: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(selector) {
        Ok(sel) => document.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

/// Rendered text of an element, close to what a browser reports as innerText:
/// whitespace collapses, `<br>` and block boundaries become line breaks,
/// script and style bodies are skipped. Lines come back trimmed.
pub fn inner_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    render(el, &mut raw);
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            push_collapsed(out, text);
            continue;
        }
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        match child_el.value().name() {
            "script" | "style" | "template" | "noscript" => {}
            "br" => out.push('\n'),
            name if BLOCK_TAGS.contains(&name) => {
                out.push('\n');
                render(child_el, out);
                out.push('\n');
            }
            _ => render(child_el, out),
        }
    }
}

fn push_collapsed(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_whitespace() {
            if !(out.is_empty() || out.ends_with(' ') || out.ends_with('\n')) {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
}

/// Trimmed text, or `None` when nothing is left.
pub fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Absolute form of an href, the way `element.href` reads in a browser.
/// Already-absolute values and bare `www.` hosts are kept verbatim.
pub fn resolve_href(raw: &str, base: Option<&Url>) -> String {
    if raw.starts_with("www.") || Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    base.and_then(|b| b.join(raw).ok())
        .map(String::from)
        .unwrap_or_else(|| raw.to_string())
}

pub fn is_javascript(href: &str) -> bool {
    href.trim_start().to_ascii_lowercase().starts_with("javascript:")
}

pub fn looks_like_url(value: &str) -> bool {
    value.starts_with("http") || value.starts_with("www")
}

// ── Tests ──
