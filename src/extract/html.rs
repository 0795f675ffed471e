// src/extract/html.rs
// =============================================================================
// This module pulls SEO signals out of raw HTML.
//
// Two techniques are used:
// - Regex over the markup for <link> and <meta> tags. The rules are
//   intentionally simple and predictable (attribute order does not matter,
//   duplicate canonical tags resolve to the last one).
// - The `scraper` crate for <script type="application/ld+json"> blocks,
//   since their contents must be read verbatim and then parsed as JSON.
//
// Nothing here fails: a missing or malformed signal is simply absent.
// =============================================================================

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::OnceLock;

/// Nested `@graph` levels followed before giving up.
pub const MAX_GRAPH_DEPTH: usize = 16;

fn link_tag_regex() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"(?i)<link\b[^>]*>").expect("static regex"))
}

fn meta_tag_regex() -> &'static Regex {
    static META: OnceLock<Regex> = OnceLock::new();
    META.get_or_init(|| Regex::new(r"(?i)<meta\b[^>]*>").expect("static regex"))
}

fn attribute_regex() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(r#"(?i)([a-z_:][-a-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("static regex")
    })
}

fn json_ld_selector() -> &'static Selector {
    static SCRIPT: OnceLock<Selector> = OnceLock::new();
    SCRIPT.get_or_init(|| Selector::parse("script[type]").expect("static selector"))
}

// Splits a tag's attributes into (lowercased name, value) pairs.
fn attributes(tag: &str) -> Vec<(String, String)> {
    attribute_regex()
        .captures_iter(tag)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or("");
            (caps[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}

fn attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

// Every <link rel="canonical"> tag's href (None for a tag without one),
// in document order.
pub fn canonical_links(html: &str) -> Vec<Option<String>> {
    link_tag_regex()
        .find_iter(html)
        .map(|m| attributes(m.as_str()))
        .filter(|attrs| {
            attribute(attrs, "rel")
                .map(|rel| {
                    rel.split_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("canonical"))
                })
                .unwrap_or(false)
        })
        .map(|attrs| {
            attribute(&attrs, "href")
                .map(str::trim)
                .filter(|href| !href.is_empty())
                .map(str::to_string)
        })
        .collect()
}

// The page's canonical URL. When several canonical tags exist the last one
// wins, even if it carries no href.
pub fn extract_canonical(html: &str) -> Option<String> {
    canonical_links(html).pop().flatten()
}

// Content of the first <meta> whose `attribute_name` equals `key`
// (case-insensitive), e.g. ("og:url", "property") or ("robots", "name").
pub fn extract_meta_value(html: &str, key: &str, attribute_name: &str) -> Option<String> {
    let attribute_name = attribute_name.to_ascii_lowercase();
    meta_tag_regex().find_iter(html).find_map(|m| {
        let attrs = attributes(m.as_str());
        let matches_key = attribute(&attrs, &attribute_name)
            .map(|value| value.trim().eq_ignore_ascii_case(key))
            .unwrap_or(false);
        if matches_key {
            attribute(&attrs, "content").map(|content| content.trim().to_string())
        } else {
            None
        }
    })
}

// Parses every JSON-LD block and flattens `@graph` arrays into a flat list
// of objects. Blocks that are not valid JSON are skipped.
pub fn extract_json_ld_objects(html: &str) -> Vec<Value> {
    let document = Html::parse_document(html);
    let mut queue: VecDeque<(Value, usize)> = VecDeque::new();

    for script in document.select(json_ld_selector()) {
        let is_json_ld = script
            .value()
            .attr("type")
            .map(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
            .unwrap_or(false);
        if !is_json_ld {
            continue;
        }
        let text: String = script.text().collect();
        if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
            queue.push_back((value, 0));
        }
    }

    let mut objects = Vec::new();
    while let Some((value, depth)) = queue.pop_front() {
        if depth > MAX_GRAPH_DEPTH {
            continue;
        }
        match value {
            Value::Array(items) => {
                for item in items {
                    queue.push_back((item, depth + 1));
                }
            }
            Value::Object(mut map) => match map.remove("@graph") {
                Some(graph) => {
                    // Keep the wrapper only if it describes something itself
                    if map.contains_key("@type") {
                        objects.push(Value::Object(map));
                    }
                    queue.push_back((graph, depth + 1));
                }
                None => objects.push(Value::Object(map)),
            },
            _ => {}
        }
    }

    objects
}

/// URLs found in a blog page's structured data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogSchemaSignals {
    pub blog_posting_count: usize,
    pub main_entity_urls: Vec<String>,
    pub breadcrumb_count: usize,
    pub breadcrumb_leaf_urls: Vec<String>,
}

pub fn extract_blog_schema_signals(html: &str) -> BlogSchemaSignals {
    let mut signals = BlogSchemaSignals::default();

    for object in extract_json_ld_objects(html) {
        if has_type(&object, "BlogPosting") {
            signals.blog_posting_count += 1;
            if let Some(main_entity) = object.get("mainEntityOfPage") {
                signals.main_entity_urls.extend(entity_urls(main_entity));
            }
        }
        if has_type(&object, "BreadcrumbList") {
            signals.breadcrumb_count += 1;
            let leaf = match object.get("itemListElement") {
                Some(Value::Array(items)) => items.last(),
                Some(item @ Value::Object(_)) => Some(item),
                _ => None,
            };
            if let Some(url) = leaf.and_then(breadcrumb_item_url) {
                signals.breadcrumb_leaf_urls.push(url);
            }
        }
    }

    signals
}

fn has_type(object: &Value, wanted: &str) -> bool {
    match object.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case(wanted),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.eq_ignore_ascii_case(wanted)),
        _ => false,
    }
}

// A URL reference is either a plain string or a node with "@id" / "url".
fn reference_url(value: &Value) -> Option<String> {
    match value {
        Value::String(url) => Some(url.trim().to_string()),
        Value::Object(map) => map
            .get("@id")
            .or_else(|| map.get("url"))
            .and_then(Value::as_str)
            .map(|url| url.trim().to_string()),
        _ => None,
    }
}

fn entity_urls(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(reference_url).collect(),
        other => reference_url(other).into_iter().collect(),
    }
}

fn breadcrumb_item_url(item: &Value) -> Option<String> {
    item.get("item")
        .and_then(reference_url)
        .or_else(|| item.get("url").and_then(Value::as_str).map(|u| u.trim().to_string()))
}
