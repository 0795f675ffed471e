// src/extract/mod.rs
// =============================================================================
// Pure text-processing helpers used by the checks.
//
// Submodules:
// - html: canonical links, meta tags and JSON-LD structured data
// - sitemap: <loc> entries from a sitemap document
// - urls: normalization and origin comparison
//
// None of these functions perform I/O or return errors; a signal that cannot
// be parsed is reported as absent.
// =============================================================================

mod html;
mod sitemap;
mod urls;

pub use html::{
    canonical_links, extract_blog_schema_signals, extract_canonical, extract_meta_value,
};
pub use sitemap::extract_locs;
pub use urls::{is_canonical_url, normalize_url, to_absolute_normalized};
