// src/postprocess/index_json.rs
//
// Site-wide search index (§4.14). No teacher analog; JSON shape
// follows the same serde-derive-a-struct style the teacher uses for
// content metadata (`content.rs::ContentMeta`).

use serde::Serialize;

use crate::site::Site;

#[derive(Debug, Serialize)]
struct IndexEntry {
    title: String,
    url: String,
    summary: String,
    tags: Vec<String>,
    section: String,
    plain_text: String,
}

fn entry_for(site: &Site, page: &crate::site::Page) -> Option<IndexEntry> {
    let url = page.output_url.clone()?;
    let title = crate::site::meta_str(&page.metadata, "title").unwrap_or_default();
    let plain_text = page
        .rendered_html
        .as_deref()
        .map(super::strip_tags)
        .unwrap_or_default();
    let summary: String = plain_text.chars().take(200).collect();
    let section = page
        .section
        .map(|id| site.section(id).name.clone())
        .unwrap_or_default();

    Some(IndexEntry {
        title,
        url,
        summary,
        tags: page.tags.clone(),
        section,
        plain_text,
    })
}

/// Returns `(json, plain_text)`: the JSON array used for client-side
/// search, and a concatenated plain-text blob for the optional
/// `search-index.txt` sibling (§6 `output_formats.site_wide`).
pub(crate) fn generate(site: &Site) -> (String, String) {
    let entries: Vec<IndexEntry> = site
        .pages
        .iter()
        .filter(|p| !p.draft && !p.virtual_page)
        .filter_map(|p| entry_for(site, p))
        .collect();

    let text = entries
        .iter()
        .map(|e| format!("{}\n{}\n", e.title, e.plain_text))
        .collect::<Vec<_>>()
        .join("\n");

    let json = serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string());
    (json, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::site::{Page, PageId, Site};
    use std::collections::HashSet;

    fn page(title: &str, url: &str) -> Page {
        let mut metadata = toml::value::Table::new();
        metadata.insert("title".into(), toml::Value::String(title.to_string()));
        Page {
            id: PageId(0),
            source_path: None,
            raw_source: String::new(),
            original_frontmatter: metadata.clone(),
            metadata,
            rendered_html: Some("<p>hello world</p>".into()),
            output_path: None,
            output_url: Some(url.to_string()),
            extracted_links: Vec::new(),
            toc: None,
            headings: Vec::new(),
            tags: vec!["rust".into()],
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
    fn indexes_non_draft_non_virtual_pages() {
        let mut site = Site::new(Config::default());
        site.push_page(page("Hello", "/hello/"));
        let mut draft = page("Secret", "/secret/");
        draft.draft = true;
        site.push_page(draft);

        let (json, text) = generate(&site);
        assert!(json.contains("Hello"));
        assert!(!json.contains("Secret"));
        assert!(text.contains("hello world"));
    }
}
