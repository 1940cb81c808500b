//! HTML content extraction
//!
//! This module turns a fetched document into the pieces the rest of
//! the engine works with: the title, the visible text, the outgoing
//! links, and optionally the structured fields a job's extraction
//! schema asks for.

use crate::url::normalize_link;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;
use url::Url;

/// Content pulled out of a fetched HTML document
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub title: Option<String>,

    /// Visible text with script, style, and noscript contents removed
    pub text: String,

    /// Absolute normalized links, deduplicated, in document order
    pub links: Vec<String>,
}

/// Parses an HTML document and extracts title, text, and links
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base` - The page's own URL, for resolving relative links
pub fn extract_page(html: &str, base: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);

    ExtractedPage {
        title: extract_title(&document),
        text: extract_text(&document),
        links: extract_links(&document, base),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Collects visible text, skipping script, style, and noscript subtrees
fn extract_text(document: &Html) -> String {
    const SKIPPED: [&str; 3] = ["script", "style", "noscript"];

    let mut out = String::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let inside_skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|element| SKIPPED.contains(&element.name()))
                .unwrap_or(false)
        });
        if inside_skipped {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(trimmed);
        }
    }
    out
}

/// Extracts all followable links from the HTML document
///
/// Skips empty hrefs, same-page anchors, and download links; scheme
/// filtering (javascript:, mailto:, data:, non-HTTP) happens inside
/// normalization.
fn extract_links(document: &Html, base: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() || href.starts_with('#') {
                continue;
            }

            if let Ok(url) = normalize_link(base, href) {
                let url = url.to_string();
                if seen.insert(url.clone()) {
                    links.push(url);
                }
            }
        }
    }

    links
}

/// Heuristic for pages that arrive as an empty shell and hydrate in JS
///
/// Looks for what SPAs look like from a plain HTTP client: heavy
/// script payloads, framework mount-point markers, or a body far too
/// small to be the rendered page.
pub fn needs_js_render(html: &str) -> bool {
    let lowered = html.to_lowercase();

    let script_count = lowered.matches("<script").count();
    if script_count > 15 {
        return true;
    }

    if lowered.contains("__next")
        || lowered.contains("data-reactroot")
        || lowered.contains("ng-version")
    {
        return true;
    }

    html.len() < 5000
}

/// One field of a job's extraction schema
///
/// `attr` is either the literal `"text"` for the element's visible
/// text or the name of an attribute to read. Selectors are CSS.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRule {
    pub name: String,

    pub selector: String,

    #[serde(default = "default_attr")]
    pub attr: String,

    /// Collect every match instead of the first
    #[serde(default)]
    pub all: bool,
}

fn default_attr() -> String {
    "text".to_string()
}

/// Applies an extraction schema to a document
///
/// Invalid selectors and missing elements yield `null` for that field
/// rather than failing the whole job; partial extraction beats none.
///
/// # Arguments
///
/// * `html` - The HTML content to extract from
/// * `rules` - The schema fields to evaluate
///
/// # Returns
///
/// A JSON object with one entry per rule
pub fn extract_with_schema(html: &str, rules: &[ExtractionRule]) -> Value {
    let document = Html::parse_document(html);
    let mut out = serde_json::Map::new();

    for rule in rules {
        let selector = match Selector::parse(&rule.selector) {
            Ok(selector) => selector,
            Err(_) => {
                warn!(
                    field = %rule.name,
                    selector = %rule.selector,
                    "invalid extraction selector, field set to null"
                );
                out.insert(rule.name.clone(), Value::Null);
                continue;
            }
        };

        let value = if rule.all {
            let items: Vec<Value> = document
                .select(&selector)
                .filter_map(|element| element_value(element, &rule.attr))
                .map(Value::String)
                .collect();
            Value::Array(items)
        } else {
            document
                .select(&selector)
                .find_map(|element| element_value(element, &rule.attr))
                .map(Value::String)
                .unwrap_or(Value::Null)
        };

        out.insert(rule.name.clone(), value);
    }

    Value::Object(out)
}

/// Reads one value off a matched element per the rule's `attr`
fn element_value(element: ElementRef<'_>, attr: &str) -> Option<String> {
    if attr == "text" {
        let text = element.text().collect::<String>().trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    } else {
        element.value().attr(attr).map(|value| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/catalog").unwrap()
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>  Catalog  </title></head><body></body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(page.title, Some("Catalog".to_string()));
    }

    #[test]
    fn test_missing_title_is_none() {
        let page = extract_page("<html><body>hi</body></html>", &base_url());
        assert_eq!(page.title, None);
    }

    #[test]
    fn test_text_skips_script_and_style() {
        let html = r#"<html><body>
            <p>Visible text</p>
            <script>alert("hidden")</script>
            <style>p { color: red }</style>
            <noscript>Enable JS</noscript>
            <p>More text</p>
        </body></html>"#;
        let page = extract_page(html, &base_url());
        assert!(page.text.contains("Visible text"));
        assert!(page.text.contains("More text"));
        assert!(!page.text.contains("alert"));
        assert!(!page.text.contains("color"));
        assert!(!page.text.contains("Enable JS"));
    }

    #[test]
    fn test_text_joins_nodes_with_spaces() {
        let html = "<html><body><p>one</p><p>two</p></body></html>";
        let page = extract_page(html, &base_url());
        assert_eq!(page.text, "one two");
    }

    #[test]
    fn test_relative_links_resolved_and_normalized() {
        let html = r#"<html><body><a href="/item/42/">Item</a></body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(page.links, vec!["https://example.com/item/42"]);
    }

    #[test]
    fn test_links_deduplicated_in_order() {
        let html = r#"<html><body>
            <a href="/a">A</a>
            <a href="/b">B</a>
            <a href="/a/">A again</a>
        </body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(
            page.links,
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_special_scheme_links_skipped() {
        let html = r#"<html><body>
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:team@example.com">Mail</a>
            <a href="tel:+15550100">Call</a>
            <a href="/real">Real</a>
        </body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(page.links, vec!["https://example.com/real"]);
    }

    #[test]
    fn test_fragment_only_links_skipped() {
        let html = r##"<html><body><a href="#section">Jump</a></body></html>"##;
        let page = extract_page(html, &base_url());
        assert!(page.links.is_empty());
    }

    #[test]
    fn test_download_links_skipped() {
        let html = r#"<html><body><a href="/report.pdf" download>Report</a></body></html>"#;
        let page = extract_page(html, &base_url());
        assert!(page.links.is_empty());
    }

    #[test]
    fn test_needs_js_render_script_heavy() {
        let body = "<p>x</p>".repeat(1000);
        let scripts = "<script src=\"/chunk.js\"></script>".repeat(16);
        assert!(needs_js_render(&format!(
            "<html><body>{}{}</body></html>",
            body, scripts
        )));
    }

    #[test]
    fn test_needs_js_render_spa_markers() {
        let filler = "<p>content</p>".repeat(500);
        let next = format!("<html><body><div id=\"__next\"></div>{}</body></html>", filler);
        let react = format!("<html><body><div data-reactroot>{}</div></body></html>", filler);
        let angular = format!("<html><body ng-version=\"17.0.0\">{}</body></html>", filler);
        assert!(needs_js_render(&next));
        assert!(needs_js_render(&react));
        assert!(needs_js_render(&angular));
    }

    #[test]
    fn test_needs_js_render_tiny_body() {
        assert!(needs_js_render("<html><body></body></html>"));
    }

    #[test]
    fn test_needs_js_render_regular_page() {
        let filler = "<p>a paragraph of real server-rendered content</p>".repeat(200);
        let html = format!("<html><head><title>t</title></head><body>{}</body></html>", filler);
        assert!(!needs_js_render(&html));
    }

    #[test]
    fn test_schema_text_field() {
        let html = r#"<html><body><h1> Widget 9000 </h1></body></html>"#;
        let rules = vec![ExtractionRule {
            name: "product".to_string(),
            selector: "h1".to_string(),
            attr: "text".to_string(),
            all: false,
        }];
        let value = extract_with_schema(html, &rules);
        assert_eq!(value["product"], "Widget 9000");
    }

    #[test]
    fn test_schema_attribute_field() {
        let html = r#"<html><body><a class="next" href="/page/2">Next</a></body></html>"#;
        let rules = vec![ExtractionRule {
            name: "next_page".to_string(),
            selector: "a.next".to_string(),
            attr: "href".to_string(),
            all: false,
        }];
        let value = extract_with_schema(html, &rules);
        assert_eq!(value["next_page"], "/page/2");
    }

    #[test]
    fn test_schema_all_collects_every_match() {
        let html = r#"<html><body>
            <li class="tag">rust</li>
            <li class="tag">crawler</li>
        </body></html>"#;
        let rules = vec![ExtractionRule {
            name: "tags".to_string(),
            selector: "li.tag".to_string(),
            attr: "text".to_string(),
            all: true,
        }];
        let value = extract_with_schema(html, &rules);
        assert_eq!(value["tags"], serde_json::json!(["rust", "crawler"]));
    }

    #[test]
    fn test_schema_no_match_yields_null() {
        let rules = vec![ExtractionRule {
            name: "price".to_string(),
            selector: ".price".to_string(),
            attr: "text".to_string(),
            all: false,
        }];
        let value = extract_with_schema("<html><body></body></html>", &rules);
        assert_eq!(value["price"], Value::Null);
    }

    #[test]
    fn test_schema_invalid_selector_yields_null() {
        let rules = vec![ExtractionRule {
            name: "broken".to_string(),
            selector: ":::nope".to_string(),
            attr: "text".to_string(),
            all: false,
        }];
        let value = extract_with_schema("<html><body></body></html>", &rules);
        assert_eq!(value["broken"], Value::Null);
    }

    #[test]
    fn test_schema_rules_deserialize_with_defaults() {
        let rules: Vec<ExtractionRule> =
            serde_json::from_str(r#"[{"name": "title", "selector": "h1"}]"#).unwrap();
        assert_eq!(rules[0].attr, "text");
        assert!(!rules[0].all);
    }
}
