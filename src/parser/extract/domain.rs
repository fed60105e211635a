//! Company website resolution.
//!
//! The website link moves around between page layouts, and the top card often
//! points back into the site itself or through the site's redirect wrapper.
//! Resolution runs in three steps: known website selectors, a scan for the
//! first external link in the main containers, then unwrapping of redirect
//! links to their real destination.

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::parser::resolver::{FieldSpec, Strategy};
use crate::parser::{inner_text, is_javascript, looks_like_url, resolve_href, select_first, SENTINEL};

const WEBSITE_SELECTORS: [&str; 6] = [
    r#"[data-field="website"] a"#,
    ".org-top-card-primary-actions__inner a",
    r#"a[data-control-name="topcard_website"]"#,
    ".org-about-company-module__company-page-url a",
    ".link-without-visited-state",
    "dd > a.link-without-visited-state",
];

const LINK_CONTAINERS: &str =
    ".org-top-card a, .org-grid__content-main a, .org-about-module__margin-bottom a";

const SITE_HOST: &str = "linkedin.com";
const REDIRECT_PATH: &str = "redir/redirect";

/// First element of a selector: its href unless that is a `javascript:`
/// link, else its text when the text is itself a URL.
pub struct AnchorTarget<'a> {
    pub selector: &'static str,
    pub base: Option<&'a Url>,
}

impl Strategy for AnchorTarget<'_> {
    fn attempt(&self, document: &Html) -> Option<String> {
        let el = select_first(document, self.selector)?;
        if let Some(href) = el.value().attr("href").map(str::trim).filter(|h| !h.is_empty()) {
            let href = resolve_href(href, self.base);
            if !is_javascript(&href) {
                return Some(href);
            }
        }
        let text = inner_text(el);
        text.starts_with("http").then_some(text)
    }
}

/// First off-site http(s)/www link inside the top card and about containers.
pub struct ExternalLinkScan<'a> {
    pub base: Option<&'a Url>,
}

impl Strategy for ExternalLinkScan<'_> {
    fn attempt(&self, document: &Html) -> Option<String> {
        let sel = Selector::parse(LINK_CONTAINERS).ok()?;
        document
            .select(&sel)
            .filter_map(|a| a.value().attr("href"))
            .map(|href| resolve_href(href.trim(), self.base))
            .find(|href| {
                !href.contains(SITE_HOST) && !is_javascript(href) && looks_like_url(href)
            })
    }
}

/// Resolve the company website, or the sentinel when nothing usable exists.
pub fn resolve(document: &Html, base: Option<&Url>) -> String {
    let primary = WEBSITE_SELECTORS
        .iter()
        .fold(FieldSpec::new("domain"), |field, selector| {
            field.with(AnchorTarget { selector: *selector, base })
        })
        .try_resolve(document);

    let candidate = match primary {
        Some(value) if !needs_fallback(&value) => Some(value),
        rejected => {
            if let Some(value) = rejected {
                debug!(%value, "domain candidate rejected, scanning for external links");
            }
            FieldSpec::new("domain_fallback")
                .with(ExternalLinkScan { base })
                .try_resolve(document)
        }
    };

    candidate
        .and_then(|value| accept(&value))
        .unwrap_or_else(|| SENTINEL.to_string())
}

/// A website value found anywhere on the page, made usable: it has to be an
/// http(s)/www URL and not an on-site link, and redirect wrappers are unwrapped.
pub fn accept(value: &str) -> Option<String> {
    if needs_fallback(value) || !looks_like_url(value) {
        debug!(%value, "website value rejected");
        return None;
    }
    Some(unwrap_redirect(value))
}

/// `javascript:` links and on-site links other than the redirect wrapper
/// say nothing about the company's own website.
pub fn needs_fallback(value: &str) -> bool {
    value.contains("javascript:")
        || (value.contains(SITE_HOST) && !value.contains(REDIRECT_PATH))
}

/// Replace a redirect-wrapper link with its `url` parameter. Anything that
/// cannot be parsed, or has no usable parameter, comes back unchanged.
pub fn unwrap_redirect(value: &str) -> String {
    if !value.contains(&format!("{}/{}", SITE_HOST, REDIRECT_PATH)) {
        return value.to_string();
    }
    match Url::parse(value) {
        Ok(parsed) => parsed
            .query_pairs()
            .find(|(k, _)| k == "url")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| value.to_string()),
        Err(e) => {
            debug!(%value, error = %e, "redirect link did not parse, keeping it");
            value.to_string()
        }
    }
}
