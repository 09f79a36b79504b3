//! Tolerant document-link matchers for lookup page HTML.
//!
//! The lookup site's markup drifts, so link extraction is a prioritized list
//! of independent matchers. Each one either finds a candidate URL or returns
//! `None`; the first hit wins. New page layouts get a new matcher appended
//! rather than another branch in an existing one.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static CITATION_PDF_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?is)<meta\s+[^>]*(?:name|property)\s*=\s*["']citation_pdf_url["'][^>]*content\s*=\s*["']([^"']+)["']"#,
    )
});

static QUOTED_PDF_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?i)(?:href|src|content)\s*=\s*["'](https?://[^"'\s<>]+?\.pdf(?:[?#][^"'\s<>]*)?)["']"#,
    )
});

// Bare URLs must end at `.pdf`, optionally followed by a query or fragment,
// and then a delimiter, so `x.pdf.html` is not cut short.
static PATENT_IMAGES_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(https://patentimages\.storage\.googleapis\.com/[^"'\s<>]+?\.pdf(?:[?#][^"'\s<>]*)?)(?:["'\s<>;,)\]]|$)"#,
    )
});

static ANY_PDF_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(https?://[^"'\s<>]+?\.pdf(?:[?#][^"'\s<>]*)?)(?:["'\s<>;,)\]]|$)"#,
    )
});

/// One strategy for locating a document URL in a lookup page.
pub trait LinkMatcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Returns the raw (still entity-escaped) URL if this matcher finds one.
    fn find(&self, html: &str) -> Option<String>;
}

/// Matcher backed by a regex; uses capture group 1 when present, else the whole match.
pub struct RegexMatcher {
    name: &'static str,
    regex: &'static Regex,
}

impl RegexMatcher {
    /// Creates a matcher from a static regex.
    #[must_use]
    pub fn new(name: &'static str, regex: &'static Regex) -> Self {
        Self { name, regex }
    }
}

impl LinkMatcher for RegexMatcher {
    fn name(&self) -> &'static str {
        self.name
    }

    fn find(&self, html: &str) -> Option<String> {
        let captures = self.regex.captures(html)?;
        captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str().trim().to_string())
    }
}

/// Default matcher order: quoted-attribute matches before bare URLs.
#[must_use]
pub fn default_matchers() -> Vec<Box<dyn LinkMatcher>> {
    vec![
        Box::new(RegexMatcher::new("citation_pdf_url", &CITATION_PDF_RE)),
        Box::new(RegexMatcher::new("quoted_pdf_attribute", &QUOTED_PDF_ATTR_RE)),
        Box::new(RegexMatcher::new("patent_images_url", &PATENT_IMAGES_URL_RE)),
        Box::new(RegexMatcher::new("any_pdf_url", &ANY_PDF_URL_RE)),
    ]
}

/// Runs matchers in order and returns the first usable absolute URL.
///
/// HTML entities are unescaped in the result. Hits that do not parse as an
/// absolute `http(s)` URL are skipped and the next matcher is tried.
#[must_use]
pub fn find_document_url(html: &str, matchers: &[Box<dyn LinkMatcher>]) -> Option<String> {
    matchers.iter().find_map(|matcher| {
        let raw = matcher.find(html)?;
        let candidate = html_unescape(&raw);
        let parsed = Url::parse(&candidate).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            tracing::debug!(matcher = matcher.name(), url = %candidate, "skipping non-web link");
            return None;
        }
        tracing::debug!(matcher = matcher.name(), url = %candidate, "document link matched");
        Some(candidate)
    })
}

/// Unescapes the HTML entities that appear in attribute-encoded URLs.
#[must_use]
pub fn html_unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&#47;", "/")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
