// src/extract/sitemap.rs
// Pulls `<loc>` entries out of a sitemap document.

use regex::Regex;
use std::sync::OnceLock;

fn loc_regex() -> &'static Regex {
    static LOC: OnceLock<Regex> = OnceLock::new();
    LOC.get_or_init(|| Regex::new(r"(?i)<loc>([^<]+)</loc>").expect("static regex"))
}

// Returns every <loc> text in document order. XML entities are decoded, but
// whitespace is left untouched so the sitemap check can flag it.
pub fn extract_locs(xml: &str) -> Vec<String> {
    loc_regex()
        .captures_iter(xml)
        .map(|caps| decode_xml_entities(&caps[1]))
        .collect()
}

fn entity_regex() -> &'static Regex {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    ENTITY.get_or_init(|| {
        Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|lt|gt|quot|apos|amp);").expect("static regex")
    })
}

// Named and numeric (&#38; / &#x26;) references, decoded in a single pass so
// "&amp;#38;" stays "&#38;". Unknown or invalid references are left as-is.
fn decode_xml_entities(text: &str) -> String {
    entity_regex()
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => {
                    let number = &entity[1..];
                    let code = match number.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => number.parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_locs_in_order() {
        let xml = r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/</loc></url>
  <url><LOC>https://example.com/b</LOC></url>
  <url><loc>https://example.com/a?x=1&amp;y=2</loc></url>
</urlset>"#;
        assert_eq!(
            extract_locs(xml),
            vec![
                "https://example.com/",
                "https://example.com/b",
                "https://example.com/a?x=1&y=2",
            ]
        );
    }

    #[test]
    fn test_numeric_entities_are_decoded() {
        let xml = "<loc>https://example.com/a?x=1&#38;y=2&#x26;z=&#X2F;</loc>\
                   <loc>https://example.com/&amp;#38;</loc>\
                   <loc>https://example.com/&#xD800;</loc>";
        assert_eq!(
            extract_locs(xml),
            vec![
                "https://example.com/a?x=1&y=2&z=/",
                "https://example.com/&#38;",
                // A surrogate is not a char, so the reference stays as written
                "https://example.com/&#xD800;",
            ]
        );
    }

    #[test]
    fn test_extract_locs_keeps_whitespace() {
        let xml = "<loc>\n  https://example.com/a  \n</loc>";
        assert_eq!(extract_locs(xml), vec!["\n  https://example.com/a  \n"]);
    }
}
