use scraper::Html;
use tracing::debug;

use super::{inner_text, non_empty, select_first, SENTINEL};

/// One way of locating a field's value in the document.
///
/// A strategy that cannot find its target returns `None`; it never fails the
/// whole resolution.
pub trait Strategy {
    fn attempt(&self, document: &Html) -> Option<String>;
}

/// Text of the first element matching a CSS selector.
pub struct SelectorText(pub &'static str);

impl Strategy for SelectorText {
    fn attempt(&self, document: &Html) -> Option<String> {
        select_first(document, self.0).and_then(|el| non_empty(&inner_text(el)))
    }
}

/// Find `anchor`, step up to its parent, then look for `inner` inside it.
pub struct ScopedSelectorText {
    pub anchor: &'static str,
    pub inner: &'static str,
}

impl ScopedSelectorText {
    pub fn parent_of(anchor: &'static str, inner: &'static str) -> Self {
        ScopedSelectorText { anchor, inner }
    }
}

impl Strategy for ScopedSelectorText {
    fn attempt(&self, document: &Html) -> Option<String> {
        let anchor = select_first(document, self.anchor)?;
        let parent = anchor.parent().and_then(scraper::ElementRef::wrap)?;
        let inner = scraper::Selector::parse(self.inner).ok()?;
        let found = parent.select(&inner).next()?;
        non_empty(&inner_text(found))
    }
}

/// A named field and the ordered strategies that can produce it.
pub struct FieldSpec<'a> {
    name: &'static str,
    strategies: Vec<Box<dyn Strategy + 'a>>,
}

impl<'a> FieldSpec<'a> {
    pub fn new(name: &'static str) -> Self {
        FieldSpec {
            name,
            strategies: Vec::new(),
        }
    }

    /// Shorthand for a chain of plain selector lookups.
    pub fn selectors(name: &'static str, selectors: &[&'static str]) -> Self {
        selectors
            .iter()
            .fold(FieldSpec::new(name), |field, s| field.with(SelectorText(*s)))
    }

    pub fn with(mut self, strategy: impl Strategy + 'a) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// First non-empty trimmed value in strategy order.
    pub fn try_resolve(&self, document: &Html) -> Option<String> {
        let found = self.strategies.iter().enumerate().find_map(|(i, s)| {
            s.attempt(document)
                .and_then(|v| non_empty(&v))
                .map(|v| (i, v))
        });
        match found {
            Some((i, value)) => {
                debug!(field = self.name, strategy = i, "resolved");
                Some(value)
            }
            None => {
                debug!(field = self.name, "unresolved");
                None
            }
        }
    }

    /// Like [`try_resolve`](Self::try_resolve) but falls back to the sentinel.
    pub fn resolve(&self, document: &Html) -> String {
        self.try_resolve(document)
            .unwrap_or_else(|| SENTINEL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    impl Strategy for Fixed {
        fn attempt(&self, _: &Html) -> Option<String> {
            self.0.map(String::from)
        }
    }

    #[test]
    fn first_success_wins() {
        let doc = Html::parse_document("<h1>Primary</h1><div class='alt'>Secondary</div>");
        let field = FieldSpec::selectors("name", &[".alt", "h1"]);
        assert_eq!(field.resolve(&doc), "Secondary");
    }

    #[test]
    fn empty_text_falls_through() {
        let doc = Html::parse_document("<h1>   </h1><div class='alt'>  Fallback </div>");
        let field = FieldSpec::selectors("name", &["h1", ".alt"]);
        assert_eq!(field.resolve(&doc), "Fallback");
    }

    #[test]
    fn nothing_found_gives_sentinel() {
        let doc = Html::parse_document("<p>nothing here</p>");
        let field = FieldSpec::selectors("name", &["h1", ".missing", "div[[broken"]);
        assert_eq!(field.try_resolve(&doc), None);
        assert_eq!(field.resolve(&doc), SENTINEL);
    }

    #[test]
    fn whitespace_only_strategy_output_is_not_a_success() {
        let doc = Html::parse_document("");
        let field = FieldSpec::new("x")
            .with(Fixed(Some("   ")))
            .with(Fixed(None))
            .with(Fixed(Some("  kept  ")));
        assert_eq!(field.resolve(&doc), "kept");
    }

    #[test]
    fn scoped_lookup_searches_the_anchor_parent() {
        let doc = Html::parse_document(
            r#"<section><div id="about"></div><div class="inline-show-more-text">Scoped</div></section>
               <div class="inline-show-more-text">Global</div>"#,
        );
        let s = ScopedSelectorText::parent_of("#about", ".inline-show-more-text");
        assert_eq!(s.attempt(&doc).as_deref(), Some("Scoped"));

        let missing = ScopedSelectorText::parent_of("#nope", ".inline-show-more-text");
        assert_eq!(missing.attempt(&doc), None);
    }
}
