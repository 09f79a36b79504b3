//! Shared helpers for integration tests: a mock patent site and mock document host.
//!
//! A single `MockServer` plays both roles. Lookup pages live under
//! `/patent/<slug>/en` and point at documents under `/pdfs/<slug>.pdf`.
//! Unmounted paths answer 404, which the resolver treats as "not found".

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use patent_bundler::{BundleConfig, RetryPolicy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Lookup page path for `slug`.
pub fn page_path(slug: &str) -> String {
    format!("/patent/{slug}/en")
}

/// Document path for `slug`.
pub fn pdf_path(slug: &str) -> String {
    format!("/pdfs/{slug}.pdf")
}

/// Fake document body for `slug`.
pub fn pdf_body(slug: &str) -> Vec<u8> {
    format!("%PDF-1.4 fake document for {slug}\n%%EOF").into_bytes()
}

/// HTML resembling a patent page with a `citation_pdf_url` meta tag.
pub fn patent_page(pdf_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head>
<meta name="description" content="Patent page">
<meta name="citation_pdf_url" content="{pdf_url}">
</head><body><a href="{pdf_url}">Download PDF</a></body></html>"#
    )
}

/// Mounts a lookup page for `slug` and the document it links to.
pub async fn mount_patent(server: &MockServer, slug: &str) {
    let pdf_url = format!("{}{}", server.uri(), pdf_path(slug));
    mount_page(server, slug, &pdf_url).await;
    Mock::given(method("GET"))
        .and(path(pdf_path(slug)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/pdf")
                .set_body_bytes(pdf_body(slug)),
        )
        .mount(server)
        .await;
}

/// Mounts only a lookup page for `slug`, linking to `pdf_url`.
pub async fn mount_page(server: &MockServer, slug: &str, pdf_url: &str) {
    Mock::given(method("GET"))
        .and(path(page_path(slug)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html; charset=utf-8")
                .set_body_string(patent_page(pdf_url)),
        )
        .mount(server)
        .await;
}

/// Pipeline config pointed at `server`, retrying without delay, staging under `root`.
pub fn config_for(server: &MockServer, root: &Path) -> BundleConfig {
    BundleConfig {
        timeout: Duration::from_secs(5),
        concurrency: 3,
        max_tokens: 50,
        retry_policy: RetryPolicy::immediate(3),
        lookup_base_url: server.uri(),
        workspace_root: Some(root.to_path_buf()),
    }
}

/// Number of entries left under `root`.
pub fn entries_in(root: &Path) -> usize {
    std::fs::read_dir(root)
        .expect("workspace root should be readable")
        .count()
}
