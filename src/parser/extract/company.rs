use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{domain, is_unset};
use crate::parser::resolver::FieldSpec;
use crate::parser::{
    inner_text, is_javascript, non_empty, resolve_href, select_all, SENTINEL,
};
use crate::record::CompanyRecord;

static PLUS_EMPLOYEES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+,\d+ \+ employees").unwrap());
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+-\d+").unwrap());

const INFO_ITEM: &str = ".org-top-card-summary-info-list__info-item";
const LEGACY_INFO_ITEM: &str = ".t-14.t-black--light.mb1";
const MIDDOT: char = '·';

/// The three descriptive fields the top card, about list and data fields
/// all compete to fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyFacts {
    pub industry: String,
    pub employee_size: String,
    pub headquarters: String,
}

impl Default for CompanyFacts {
    fn default() -> Self {
        CompanyFacts {
            industry: SENTINEL.to_string(),
            employee_size: SENTINEL.to_string(),
            headquarters: SENTINEL.to_string(),
        }
    }
}

pub fn extract(document: &Html, url: &str) -> CompanyRecord {
    let company_name =
        FieldSpec::selectors("companyName", &["h1", ".org-top-card-summary__title"])
            .resolve(document);

    let base = Url::parse(url).ok();
    let mut website = domain::resolve(document, base.as_ref());

    // Order matters: the about list overwrites the top card, data fields only fill gaps
    let mut facts = CompanyFacts::default();
    scan_top_card(document, &mut facts);
    scan_about_list(document, &mut facts, &mut website, base.as_ref());
    fill_from_data_fields(document, &mut facts);

    CompanyRecord {
        company_name,
        industry: facts.industry,
        domain: website,
        employee_size: facts.employee_size,
        headquarters: facts.headquarters,
        source_url: url.to_string(),
        captured_at: Utc::now(),
    }
}

/// Strategy A: classify the top-card summary items by position and content.
/// The first item to claim a field keeps it.
pub fn scan_top_card(document: &Html, facts: &mut CompanyFacts) {
    let mut items = select_all(document, INFO_ITEM);
    if items.is_empty() {
        items = select_all(document, LEGACY_INFO_ITEM);
    }

    for (index, item) in items.into_iter().enumerate() {
        let text = inner_text(item);
        if text.is_empty() {
            continue;
        }

        if is_employee_count(&text) {
            if is_unset(&facts.employee_size) {
                if let Some(size) = text.split_whitespace().next() {
                    facts.employee_size = size.to_string();
                }
            }
        } else if index == 0 && !text.contains("followers") {
            if is_unset(&facts.industry) {
                facts.industry = text;
            }
        } else if text.contains(MIDDOT)
            || (index > 0 && !text.contains("employees") && !text.contains("followers"))
        {
            if is_unset(&facts.headquarters) {
                let place = text.rsplit(MIDDOT).next().unwrap_or_default().trim();
                if !place.is_empty() {
                    facts.headquarters = place.to_string();
                }
            }
        }
    }
}

fn is_employee_count(text: &str) -> bool {
    text.to_lowercase().contains("employees")
        || PLUS_EMPLOYEES_RE.is_match(text)
        || RANGE_RE.is_match(text)
}

/// Strategy B: walk the about section's `dt`/`dd` pairs. Matches overwrite
/// whatever the top card found; the website only fills an empty domain.
pub fn scan_about_list(
    document: &Html,
    facts: &mut CompanyFacts,
    website: &mut String,
    base: Option<&Url>,
) {
    for term in select_all(document, "dt") {
        let Some(definition) = next_element_sibling(term) else {
            continue;
        };
        if definition.value().name() != "dd" {
            continue;
        }

        let header = inner_text(term).to_lowercase();
        let value = inner_text(definition);
        if value.is_empty() {
            continue;
        }

        if header.contains("industry") {
            facts.industry = value.clone();
        }
        if header.contains("company size") {
            if let Some(size) = strip_employees(&value) {
                facts.employee_size = size;
            }
        }
        if header.contains("headquarters") {
            facts.headquarters = value.clone();
        }
        if header.contains("website") && is_unset(website) {
            if let Some(href) = first_link(definition, base).and_then(|h| domain::accept(&h)) {
                *website = href;
            }
        }
    }
}

/// Strategy C: explicit data-field lookups, used only for fields still unset.
pub fn fill_from_data_fields(document: &Html, facts: &mut CompanyFacts) {
    if is_unset(&facts.industry) {
        if let Some(industry) =
            FieldSpec::selectors("industry", &[r#"[data-field="industry"]"#]).try_resolve(document)
        {
            facts.industry = industry;
        }
    }
    if is_unset(&facts.employee_size) {
        let size = FieldSpec::selectors("employeeSize", &[r#"[data-field="company_size"]"#])
            .try_resolve(document)
            .and_then(|raw| strip_employees(&raw));
        if let Some(size) = size {
            facts.employee_size = size;
        }
    }
}

/// "1,001-5,000 employees\n1,234 on LinkedIn" -> "1,001-5,000"
fn strip_employees(value: &str) -> Option<String> {
    let head = value.split(" employees").next().unwrap_or_default();
    non_empty(head.split('\n').next().unwrap_or_default())
}

fn next_element_sibling(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

fn first_link(el: ElementRef<'_>, base: Option<&Url>) -> Option<String> {
    let anchor = Selector::parse("a").ok()?;
    let href = el.select(&anchor).next()?.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    let href = resolve_href(href, base);
    (!is_javascript(&href)).then_some(href)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://www.linkedin.com/company/acme/about/";

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", body))
    }

    fn fixture(name: &str) -> Html {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap();
        Html::parse_document(&html)
    }

    fn top_card(items: &[&str]) -> CompanyFacts {
        let body: String = items
            .iter()
            .map(|t| format!(r#"<div class="org-top-card-summary-info-list__info-item">{}</div>"#, t))
            .collect();
        let mut facts = CompanyFacts::default();
        scan_top_card(&doc(&body), &mut facts);
        facts
    }

    #[test]
    fn top_card_classifies_by_position() {
        let facts = top_card(&["Software Development", "Berlin, Germany", "12K followers", "51-200 employees"]);
        assert_eq!(facts.industry, "Software Development");
        assert_eq!(facts.headquarters, "Berlin, Germany");
        assert_eq!(facts.employee_size, "51-200");
    }

    #[test]
    fn top_card_middot_takes_last_segment() {
        let facts = top_card(&["IT Services", "Acme Group · Paris, France"]);
        assert_eq!(facts.headquarters, "Paris, France");
    }

    #[test]
    fn top_card_first_follower_item_is_not_industry() {
        let facts = top_card(&["3,456 followers", "Austin, Texas"]);
        assert_eq!(facts.industry, SENTINEL);
        assert_eq!(facts.headquarters, "Austin, Texas");
    }

    #[test]
    fn top_card_first_match_per_category_wins() {
        let facts = top_card(&["Retail", "Lyon", "Nice", "10,001+ employees", "11-50 employees"]);
        assert_eq!(facts.headquarters, "Lyon");
        assert_eq!(facts.employee_size, "10,001+");
    }

    #[test]
    fn top_card_legacy_items_when_new_layout_absent() {
        let mut facts = CompanyFacts::default();
        scan_top_card(
            &doc(r#"<div class="t-14 t-black--light mb1">Biotechnology</div>"#),
            &mut facts,
        );
        assert_eq!(facts.industry, "Biotechnology");
    }

    #[test]
    fn about_list_overwrites_and_strips_size() {
        let mut facts = top_card(&["Software", "Berlin"]);
        let mut website = SENTINEL.to_string();
        let page = doc(
            r#"<dl>
                 <dt>Website</dt><dd><a href="https://acme.io">acme.io</a></dd>
                 <dt>Industry</dt><dd>Computer Software</dd>
                 <dt>Company size</dt><dd>1,001-5,000 employees<br>1,234 on LinkedIn</dd>
                 <dt>Headquarters</dt><dd>Munich, Bavaria</dd>
                 <dt>Founded</dt><dd>2001</dd>
               </dl>"#,
        );
        let base = Url::parse(PAGE).unwrap();
        scan_about_list(&page, &mut facts, &mut website, Some(&base));
        assert_eq!(facts.industry, "Computer Software");
        assert_eq!(facts.employee_size, "1,001-5,000");
        assert_eq!(facts.headquarters, "Munich, Bavaria");
        assert_eq!(website, "https://acme.io");
    }

    #[test]
    fn about_list_leaves_resolved_website_alone() {
        let mut facts = CompanyFacts::default();
        let mut website = "https://first.example".to_string();
        let page = doc(r#"<dl><dt>Website</dt><dd><a href="https://second.example">x</a></dd></dl>"#);
        scan_about_list(&page, &mut facts, &mut website, None);
        assert_eq!(website, "https://first.example");
    }

    fn website_from_about_list(href: &str) -> String {
        let page = doc(&format!(
            r#"<h1>Acme</h1><dl><dt>Website</dt><dd><a href="{}">website</a></dd></dl>"#,
            href
        ));
        extract(&page, PAGE).domain
    }

    #[test]
    fn about_list_website_must_be_a_url() {
        assert_eq!(website_from_about_list("mailto:hello@acme.io"), SENTINEL);
    }

    #[test]
    fn about_list_website_skips_on_site_links() {
        assert_eq!(website_from_about_list("/company/acme/"), SENTINEL);
    }

    #[test]
    fn about_list_website_unwraps_redirects() {
        assert_eq!(
            website_from_about_list(
                "https://www.linkedin.com/redir/redirect?url=https%3A%2F%2Fexample.com"
            ),
            "https://example.com"
        );
    }

    #[test]
    fn about_list_ignores_terms_without_dd() {
        let mut facts = CompanyFacts::default();
        let mut website = SENTINEL.to_string();
        let page = doc(r#"<dl><dt>Industry</dt><div>Not a definition</div></dl>"#);
        scan_about_list(&page, &mut facts, &mut website, None);
        assert_eq!(facts, CompanyFacts::default());
    }

    #[test]
    fn data_fields_never_overwrite_earlier_values() {
        let page = doc(
            r#"<div class="org-top-card-summary-info-list__info-item">Banking</div>
               <span data-field="industry">Financial Services</span>
               <span data-field="company_size">201-500 employees</span>"#,
        );
        let mut facts = CompanyFacts::default();
        scan_top_card(&page, &mut facts);
        fill_from_data_fields(&page, &mut facts);
        assert_eq!(facts.industry, "Banking");
        assert_eq!(facts.employee_size, "201-500");
    }

    #[test]
    fn strip_employees_variants() {
        assert_eq!(strip_employees("51-200 employees").as_deref(), Some("51-200"));
        assert_eq!(strip_employees("11-50\n3 on LinkedIn").as_deref(), Some("11-50"));
        assert_eq!(strip_employees(" employees"), None);
    }

    #[test]
    fn full_company_page() {
        let rec = extract(&fixture("company"), PAGE);
        assert_eq!(rec.company_name, "Acme Robotics");
        assert_eq!(rec.industry, "Industrial Automation");
        assert_eq!(rec.employee_size, "201-500");
        assert_eq!(rec.headquarters, "Rotterdam, South Holland");
        assert_eq!(rec.domain, "https://acme-robotics.example");
        assert_eq!(rec.source_url, PAGE);
    }

    #[test]
    fn bare_company_page_is_all_sentinels() {
        let rec = extract(&doc("<p>Loading…</p>"), PAGE);
        assert_eq!(rec.company_name, SENTINEL);
        assert_eq!(rec.industry, SENTINEL);
        assert_eq!(rec.domain, SENTINEL);
        assert_eq!(rec.employee_size, SENTINEL);
        assert_eq!(rec.headquarters, SENTINEL);
    }
}
