use chrono::Utc;
use scraper::Html;

use crate::parser::resolver::{FieldSpec, ScopedSelectorText, SelectorText};
use crate::parser::SENTINEL;
use crate::record::{PersonRecord, EMAIL_PLACEHOLDER};

const ABOUT_LIMIT: usize = 200;
const ELLIPSIS: &str = "...";

pub fn extract(document: &Html, url: &str) -> PersonRecord {
    let name = FieldSpec::selectors(
        "name",
        &["h1", ".text-heading-xlarge", ".pv-top-card-section__name"],
    )
    .resolve(document);
    let (first_name, last_name) = split_name(&name);

    let job_title = FieldSpec::selectors(
        "jobTitle",
        &[
            ".text-body-medium.break-words",
            ".pv-text-details__left-panel-mt2 span",
        ],
    )
    .resolve(document);

    let location = FieldSpec::selectors(
        "location",
        &[
            ".text-body-small.inline.t-black--light.break-words",
            ".pv-text-details__left-panel-mt2 .text-body-small",
        ],
    )
    .resolve(document);

    // Current position: top-fold "show more" block, experience data field, right panel
    let company_name = FieldSpec::selectors(
        "companyName",
        &[
            ".inline-show-more-text--is-collapsed",
            r#"[data-field="experience_company_name"]"#,
            ".pv-text-details__right-panel-item-text",
        ],
    )
    .resolve(document);

    let about = FieldSpec::new("aboutSummary")
        .with(ScopedSelectorText::parent_of("#about", ".inline-show-more-text"))
        .with(SelectorText(".pv-about-section .inline-show-more-text"))
        .resolve(document);

    PersonRecord {
        first_name,
        last_name,
        job_title,
        company_name,
        location,
        about_summary: truncate_about(&about),
        email: EMAIL_PLACEHOLDER.to_string(),
        source_url: url.to_string(),
        captured_at: Utc::now(),
    }
}

/// First token is the first name; everything after it is the last name.
pub fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    if name.is_empty() {
        return (SENTINEL.to_string(), SENTINEL.to_string());
    }
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) if !rest.trim().is_empty() => {
            (first.to_string(), rest.trim().to_string())
        }
        _ => (name.to_string(), SENTINEL.to_string()),
    }
}

/// Hard cut at 200 characters, marked with an ellipsis when anything was dropped.
pub fn truncate_about(text: &str) -> String {
    if text.chars().count() <= ABOUT_LIMIT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(ABOUT_LIMIT).collect();
    cut.push_str(ELLIPSIS);
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_URL: &str = "https://www.linkedin.com/in/jane-q-public/";

    fn fixture(name: &str) -> Html {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        Html::parse_document(&html)
    }

    #[test]
    fn name_splits_on_first_whitespace() {
        assert_eq!(
            split_name("Ada Lovelace Byron"),
            ("Ada".to_string(), "Lovelace Byron".to_string())
        );
        assert_eq!(split_name("Ada"), ("Ada".to_string(), "N/A".to_string()));
        assert_eq!(split_name("N/A"), ("N/A".to_string(), "N/A".to_string()));
        assert_eq!(split_name("  "), ("N/A".to_string(), "N/A".to_string()));
    }

    #[test]
    fn truncation_law() {
        for len in [0usize, 1, 199, 200, 201, 250, 1000] {
            let text = "x".repeat(len);
            let out = truncate_about(&text);
            let expected = len.min(ABOUT_LIMIT) + if len > ABOUT_LIMIT { 3 } else { 0 };
            assert_eq!(out.chars().count(), expected, "len {}", len);
            assert_eq!(out.ends_with("..."), len > ABOUT_LIMIT);
        }
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(201);
        let out = truncate_about(&text);
        assert_eq!(out.chars().count(), 203);
        assert!(out.starts_with(&"é".repeat(200)));
    }

    #[test]
    fn jane_q_public_end_to_end() {
        let rec = extract(&fixture("person"), PROFILE_URL);
        assert_eq!(rec.first_name, "Jane");
        assert_eq!(rec.last_name, "Q. Public");
        assert_eq!(rec.job_title, "Engineer at Acme");
        assert_eq!(rec.location, "Berlin, Germany");
        assert_eq!(rec.company_name, "Acme Corporation");
        assert_eq!(rec.about_summary.chars().count(), 203);
        assert_eq!(rec.about_summary, format!("{}...", "A".repeat(200)));
        assert_eq!(rec.email, EMAIL_PLACEHOLDER);
        assert_eq!(rec.source_url, PROFILE_URL);
    }

    #[test]
    fn legacy_layout_uses_fallback_selectors() {
        let rec = extract(&fixture("person_legacy"), PROFILE_URL);
        assert_eq!(rec.first_name, "Grace");
        assert_eq!(rec.last_name, "N/A");
        assert_eq!(rec.job_title, "Rear Admiral");
        assert_eq!(rec.location, "Arlington, Virginia");
        assert_eq!(rec.company_name, "US Navy");
        assert_eq!(rec.about_summary, "Wrote the first compiler.");
    }

    #[test]
    fn empty_page_is_all_sentinels() {
        let rec = extract(&Html::parse_document("<html><body></body></html>"), PROFILE_URL);
        for field in [
            &rec.first_name,
            &rec.last_name,
            &rec.job_title,
            &rec.company_name,
            &rec.location,
            &rec.about_summary,
        ] {
            assert_eq!(field, SENTINEL);
        }
        assert_eq!(rec.email, EMAIL_PLACEHOLDER);
    }
}
