// src/config.rs
// =============================================================================
// Everything the engine needs to know about the site under test lives in one
// explicit struct, `AuditConfig`, which is handed to `audit::run`.
//
// Layering:
// 1. Built-in defaults (the tables for the production site)
// 2. An optional JSON file (--config), where every field is optional
// 3. CLI overrides (--site, --max-retries, --concurrency, --timeout-ms)
//
// Strings in the robots directive list, the trailing-slash allow list and the
// host variant list may contain `{site}`, `{host}` or `{apex}` placeholders,
// which are expanded against the configured origin.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_SITE: &str = "https://www.maasiso.nl";
pub const DEFAULT_USER_AGENT: &str = "MaasISO-SEO-Audit/1.0";
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_CONCURRENCY: usize = 6;
pub const DEFAULT_HOP_LIMIT: usize = 10;

/// One legacy path and the path it must permanently redirect to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRedirect {
    pub from: String,
    pub to: String,
}

/// What a soft-404 candidate path is expected to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "expected", rename_all = "snake_case")]
pub enum Soft404Expectation {
    /// 301/308 on the first hop, ending at `target`
    Redirect { path: String, target: String },
    /// Terminal status must be one of `statuses`
    Status { path: String, statuses: Vec<u16> },
}

impl Soft404Expectation {
    pub fn path(&self) -> &str {
        match self {
            Soft404Expectation::Redirect { path, .. } => path,
            Soft404Expectation::Status { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuditConfig {
    /// Canonical origin, e.g. "https://www.example.com" (no trailing slash)
    pub site: String,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    /// Delay before retry n is `backoff_base_ms * 2^n`
    pub backoff_base_ms: u64,
    pub hop_limit: usize,
    pub concurrency: usize,
    pub blog_prefix: String,
    pub search_path: String,
    /// Canonical URLs allowed to end in '/' (besides nothing else)
    pub trailing_slash_allow_list: Vec<String>,
    pub required_robots_directives: Vec<String>,
    pub required_robots_agents: Vec<String>,
    pub legacy_redirects: Vec<LegacyRedirect>,
    pub host_variants: Vec<String>,
    pub soft404: Vec<Soft404Expectation>,
    pub removed_paths: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        let legacy = [
            ("/diensten/iso-9001-consultancy", "/iso-9001"),
            ("/diensten/gdpr-avg", "/avg"),
            ("/diensten/bio", "/bio"),
            ("/diensten/iso-27001", "/iso-27001"),
            ("/diensten/iso-45001", "/iso-45001"),
            ("/diensten/iso-9001", "/iso-9001"),
            ("/diensten/iso-14001", "/iso-14001"),
        ];

        AuditConfig {
            site: DEFAULT_SITE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: 1000,
            hop_limit: DEFAULT_HOP_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
            blog_prefix: "/blog/".to_string(),
            search_path: "/search".to_string(),
            trailing_slash_allow_list: vec!["{site}/".to_string()],
            required_robots_directives: vec![
                "Allow: /".to_string(),
                "Disallow: /api/".to_string(),
                "Disallow: /admin/".to_string(),
                "Sitemap: {site}/sitemap.xml".to_string(),
            ],
            required_robots_agents: vec!["*".to_string()],
            legacy_redirects: legacy
                .iter()
                .map(|(from, to)| LegacyRedirect {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
            host_variants: vec![
                "http://{apex}/".to_string(),
                "http://www.{apex}/".to_string(),
                "{site}/".to_string(),
            ],
            soft404: vec![
                Soft404Expectation::Redirect {
                    path: "/index.html".to_string(),
                    target: "/".to_string(),
                },
                Soft404Expectation::Redirect {
                    path: "/algemene-voorwaarden".to_string(),
                    target: "/terms-and-conditions".to_string(),
                },
                Soft404Expectation::Status {
                    path: "/$".to_string(),
                    statuses: vec![404, 410],
                },
            ],
            removed_paths: vec![
                "/blog/iso-9001-interne-audit-tips".to_string(),
                "/blog/minimal-test-blog-post".to_string(),
                "/test-deploy".to_string(),
                "/news/avg-iso-9001-integratie".to_string(),
            ],
        }
    }
}

impl AuditConfig {
    /// Replaces the canonical origin (a trailing '/' is dropped).
    pub fn with_site(mut self, site: &str) -> Self {
        self.site = site.trim_end_matches('/').to_string();
        self
    }

    /// Reads a JSON config file; missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AuditConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        let site = config.site.clone();
        Ok(config.with_site(&site))
    }

    /// Rejects configs the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let parsed =
            Url::parse(&self.site).map_err(|e| anyhow!("Invalid site URL '{}': {}", self.site, e))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(anyhow!("Site must be http(s): {}", self.site));
        }
        if parsed.path() != "/" || parsed.query().is_some() {
            return Err(anyhow!("Site must be a bare origin: {}", self.site));
        }
        if self.concurrency == 0 {
            return Err(anyhow!("Concurrency must be at least 1"));
        }
        if self.hop_limit == 0 {
            return Err(anyhow!("Hop limit must be at least 1"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Expands the placeholders a table entry may use:
    /// - `{site}`: the configured origin ("https://www.example.com")
    /// - `{host}`: its host and port ("www.example.com")
    /// - `{apex}`: the host without a leading "www." ("example.com")
    pub fn expand(&self, template: &str) -> String {
        let expanded = template.replace("{site}", &self.site);
        if !expanded.contains("{host}") && !expanded.contains("{apex}") {
            return expanded;
        }
        let host = self.host();
        let apex = host.strip_prefix("www.").unwrap_or(&host);
        expanded.replace("{host}", &host).replace("{apex}", apex)
    }

    // host[:port] of the configured origin; empty if the site does not parse
    // (validate() rejects such configs before a run).
    fn host(&self) -> String {
        let Ok(url) = Url::parse(&self.site) else {
            return String::new();
        };
        match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        }
    }

    /// `site` + path, with a leading '/' ensured.
    pub fn site_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.site, path)
        } else {
            format!("{}/{}", self.site, path)
        }
    }

    pub fn sitemap_url(&self) -> String {
        self.site_url("/sitemap.xml")
    }

    pub fn robots_url(&self) -> String {
        self.site_url("/robots.txt")
    }

    pub fn home_url(&self) -> String {
        self.site_url("/")
    }
}
