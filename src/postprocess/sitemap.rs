// src/postprocess/sitemap.rs
//
// Grounded on the teacher's `sitemap.rs::generate_sitemap`, reworked
// from `LoadedContent`/`config.site.domain` to `Site`'s page arena and
// `config.baseurl`. lastmod = max(page.date, source file mtime), per
// §4.14.

use std::path::Path;

use time::macros::format_description;
use time::OffsetDateTime;

use crate::site::Site;

fn format_url_entry(base_url: &str, path: &str, lastmod: Option<OffsetDateTime>) -> String {
    let mut entry = String::new();
    entry.push_str("  <url>\n");
    entry.push_str(&format!("    <loc>{base_url}{path}</loc>\n"));
    if let Some(date) = lastmod {
        const FORMAT: &[time::format_description::FormatItem<'static>] =
            format_description!("[year]-[month]-[day]");
        if let Ok(formatted) = date.format(FORMAT) {
            entry.push_str(&format!("    <lastmod>{formatted}</lastmod>\n"));
        }
    }
    entry.push_str("  </url>\n");
    entry
}

fn file_mtime(root: &Path, source_path: &Path) -> Option<OffsetDateTime> {
    let full = root.join(source_path);
    let meta = std::fs::metadata(full).ok()?;
    let modified = meta.modified().ok()?;
    OffsetDateTime::try_from(modified).ok()
}

fn lastmod_for(root: &Path, page: &crate::site::Page) -> Option<OffsetDateTime> {
    let mtime = page
        .source_path
        .as_ref()
        .and_then(|p| file_mtime(root, p));
    match (page.date, mtime) {
        (Some(d), Some(m)) => Some(if d > m { d } else { m }),
        (Some(d), None) => Some(d),
        (None, Some(m)) => Some(m),
        (None, None) => None,
    }
}

/// Enumerates every non-generated page plus generated pages that carry
/// a stable `output_url` (taxonomy archive pages); `_generated`
/// pagination pages beyond page 1 are included too since they're
/// reachable and indexable.
pub(crate) fn generate(site: &Site, root: &Path) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

    let base_url = site.config.baseurl.trim_end_matches('/').to_string();

    for page in &site.pages {
        if page.draft {
            continue;
        }
        let Some(url) = &page.output_url else { continue };
        xml.push_str(&format_url_entry(&base_url, url, lastmod_for(root, page)));
    }

    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::site::{Page, PageId, Site};
    use std::collections::HashSet;

    fn page_with_url(url: &str) -> Page {
        Page {
            id: PageId(0),
            source_path: None,
            raw_source: String::new(),
            original_frontmatter: toml::value::Table::new(),
            metadata: toml::value::Table::new(),
            rendered_html: None,
            output_path: None,
            output_url: Some(url.to_string()),
            extracted_links: Vec::new(),
            toc: None,
            headings: Vec::new(),
            tags: Vec::new(),
            categories: Vec::new(),
            weight: 0,
            date: None,
            slug: "s".into(),
            custom_id: None,
            content_type: None,
            draft: false,
            generated: false,
            virtual_page: false,
            posts: Vec::new(),
            paginator: None,
            page_num: None,
            section: None,
            cascade_keys: HashSet::new(),
            fingerprint: "f".into(),
        }
    }

    #[test]
    fn generates_one_url_entry_per_non_draft_page() {
        let mut site = Site::new(Config::default());
        site.push_page(page_with_url("/about/"));
        let mut draft = page_with_url("/secret/");
        draft.draft = true;
        site.push_page(draft);
        let xml = generate(&site, Path::new("."));
        assert_eq!(xml.matches("<url>").count(), 1);
        assert!(xml.contains("/about/"));
        assert!(!xml.contains("/secret/"));
    }
}
