// src/taxonomy.rs
//
// C5: collects tags/categories across non-generated pages and
// materializes archive/pagination pages (§4.5). The "group, then
// paginate" shape is grounded on the teacher's per-content-type index
// rendering loop in `build.rs`, generalized from a single content type
// to arbitrary taxonomy kinds.

use std::collections::HashMap;

use slug::slugify;

use crate::site::{Page, PageId, Paginator, Site};
use crate::strategy;

#[derive(Debug, Clone)]
pub(crate) struct TaxonomyTerm {
    pub display_name: String,
    pub slug: String,
    pub pages: Vec<PageId>,
}

/// `kind → slug → term` (§3 TaxonomyMap). Kinds are whatever
/// `config.taxonomies` declares; §6 default is `[tags, categories]`.
#[derive(Default)]
pub(crate) struct TaxonomyMap {
    pub kinds: HashMap<String, HashMap<String, TaxonomyTerm>>,
}

fn field_for_kind<'a>(page: &'a Page, kind: &str) -> &'a [String] {
    match kind {
        "tags" => &page.tags,
        "categories" => &page.categories,
        _ => &[],
    }
}

/// Collect terms from every page not marked `_generated` (Open Question
/// #2: tag/category pages never re-enter collection, preventing cycles).
pub(crate) fn collect(site: &Site) -> TaxonomyMap {
    let mut kinds: HashMap<String, HashMap<String, TaxonomyTerm>> = HashMap::new();
    for kind in &site.config.taxonomies {
        kinds.entry(kind.clone()).or_default();
    }

    for page in &site.pages {
        if page.generated {
            continue;
        }
        for kind in &site.config.taxonomies {
            for term in field_for_kind(page, kind) {
                let terms = kinds.entry(kind.clone()).or_default();
                let slug = slugify(term);
                let entry = terms.entry(slug.clone()).or_insert_with(|| TaxonomyTerm {
                    display_name: term.clone(),
                    slug: slug.clone(),
                    pages: Vec::new(),
                });
                entry.pages.push(page.id);
            }
        }
    }
    TaxonomyMap { kinds }
}

/// Generate term listing + pagination virtual pages for every term with
/// at least one page (§4.5). Sort order follows Open Question #3: the
/// strategy of the section owning the first contributing page, falling
/// back to the blog strategy.
pub(crate) fn materialize(site: &mut Site) {
    let taxonomy = collect(site);
    let per_page = site.config.pagination.per_page.max(1);

    for (kind, terms) in &taxonomy.kinds {
        for term in terms.values() {
            if term.pages.is_empty() {
                continue;
            }
            let ordered = sort_term_pages(site, term);
            let total_pages = term.pages.len().div_ceil(per_page);
            for page_num in 1..=total_pages {
                let start = (page_num - 1) * per_page;
                let end = (start + per_page).min(ordered.len());
                let slice: Vec<PageId> = ordered[start..end].to_vec();
                let base_url = format!("/{kind}/{}/", term.slug);
                let url = if page_num == 1 {
                    base_url.clone()
                } else {
                    format!("{base_url}page/{page_num}/")
                };

                let mut metadata = toml::value::Table::new();
                metadata.insert(
                    "title".into(),
                    toml::Value::String(format!("Posts tagged '{}'", term.display_name)),
                );
                metadata.insert(
                    "template".into(),
                    toml::Value::String(format!("{kind}.html")),
                );

                let page = Page {
                    id: crate::site::PageId(0),
                    source_path: None,
                    raw_source: String::new(),
                    original_frontmatter: metadata.clone(),
                    metadata,
                    rendered_html: None,
                    output_path: None,
                    output_url: Some(url.clone()),
                    extracted_links: Vec::new(),
                    toc: None,
                    headings: Vec::new(),
                    tags: Vec::new(),
                    categories: Vec::new(),
                    weight: 0,
                    date: None,
                    slug: term.slug.clone(),
                    custom_id: None,
                    content_type: Some(kind.clone()),
                    draft: false,
                    generated: true,
                    virtual_page: true,
                    posts: slice,
                    paginator: Some(Paginator {
                        current: page_num,
                        total: total_pages,
                        per_page,
                        base_url: base_url.clone(),
                    }),
                    page_num: Some(page_num),
                    section: None,
                    cascade_keys: Default::default(),
                    fingerprint: format!("taxonomy:{kind}:{}:{page_num}", term.slug),
                };
                site.push_page(page);
            }
        }
    }

    site.taxonomies = taxonomy;
}

fn sort_term_pages(site: &Site, term: &TaxonomyTerm) -> Vec<PageId> {
    let strategy_name = term
        .pages
        .first()
        .and_then(|&id| site.page(id).section)
        .map(|section| strategy::detect_for_section(site, section))
        .unwrap_or_else(|| "blog".to_string());

    let pages: Vec<&Page> = term.pages.iter().map(|&id| site.page(id)).collect();
    let sorted = strategy::sort_pages_by_name(&strategy_name, pages);
    sorted.into_iter().map(|p| p.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::HashSet;

    fn page_with_tags(tags: Vec<&str>) -> Page {
        Page {
            id: crate::site::PageId(0),
            source_path: Some("p".into()),
            raw_source: String::new(),
            original_frontmatter: toml::value::Table::new(),
            metadata: toml::value::Table::new(),
            rendered_html: None,
            output_path: None,
            output_url: None,
            extracted_links: Vec::new(),
            toc: None,
            headings: Vec::new(),
            tags: tags.into_iter().map(String::from).collect(),
            categories: Vec::new(),
            weight: 0,
            date: None,
            slug: "p".into(),
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
    fn collects_tags_across_pages() {
        let mut site = Site::new(Config::default());
        site.push_page(page_with_tags(vec!["rust", "ssg"]));
        site.push_page(page_with_tags(vec!["rust"]));
        let taxonomy = collect(&site);
        assert_eq!(taxonomy.kinds["tags"]["rust"].pages.len(), 2);
        assert_eq!(taxonomy.kinds["tags"]["ssg"].pages.len(), 1);
    }

    #[test]
    fn materialize_paginates_large_terms() {
        let mut site = Site::new(Config::default());
        site.config.pagination.per_page = 2;
        for _ in 0..5 {
            site.push_page(page_with_tags(vec!["rust"]));
        }
        materialize(&mut site);
        let generated: Vec<_> = site.pages.iter().filter(|p| p.generated).collect();
        assert_eq!(generated.len(), 3); // ceil(5/2) = 3 pages
    }
}
