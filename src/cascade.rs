// src/cascade.rs
//
// C3: eager-merge cascade (Design Notes §9 — replaces the original's
// late-binding property fallthrough via reflection). Build an immutable
// `section_path → merged cascade map` snapshot, then apply it to every
// page with frontmatter-wins semantics (§4.3).

use std::collections::HashMap;

use crate::error::CascadeError;
use crate::site::{PageId, SectionId, Site};

/// Keys a cascade block may never set; collision is fatal (§4.3).
const PROTECTED_KEYS: &[&str] = &["_section", "_site", "_generated", "_virtual"];

/// Deep-merge `overlay` into `base`: scalars and tables are overridden,
/// but per §8 boundary behavior an explicit empty list *replaces* the
/// ancestor list while an absent key still inherits.
fn deep_merge(base: &mut toml::value::Table, overlay: &toml::value::Table) {
    for (k, v) in overlay {
        match (base.get_mut(k), v) {
            (Some(toml::Value::Table(base_t)), toml::Value::Table(overlay_t)) => {
                deep_merge(base_t, overlay_t);
            }
            _ => {
                base.insert(k.clone(), v.clone());
            }
        }
    }
}

/// Snapshot of every section's cascade, already merged root→leaf.
pub(crate) struct CascadeSnapshot {
    by_section: HashMap<SectionId, toml::value::Table>,
}

/// Build the cascade snapshot by walking each section's ancestor chain.
/// A section cascading into one of its own ancestors (a cycle) is
/// structurally impossible given the tree shape here, but a section
/// whose own cascade block references itself via a malformed `parent`
/// chain is guarded against defensively.
pub(crate) fn build_snapshot(site: &Site) -> Result<CascadeSnapshot, CascadeError> {
    let mut by_section = HashMap::new();
    for section in &site.sections {
        let mut chain = Vec::new();
        let mut current = Some(section.id);
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = current {
            if !seen.insert(id) {
                return Err(CascadeError::Cycle(site.section(section.id).path.clone()));
            }
            chain.push(id);
            current = site.section(id).parent;
        }
        chain.reverse(); // root first

        let mut merged = toml::value::Table::new();
        for id in chain {
            let block = &site.section(id).cascade_block;
            for key in PROTECTED_KEYS {
                if block.contains_key(*key) {
                    return Err(CascadeError::ProtectedKey {
                        section: site.section(id).path.clone(),
                        key: key.to_string(),
                    });
                }
            }
            deep_merge(&mut merged, block);
        }
        by_section.insert(section.id, merged);
    }
    Ok(CascadeSnapshot { by_section })
}

/// Apply the snapshot to every page: for each key in the page's owning
/// section's cascade, set `page.metadata[k]` only if `k` was absent from
/// the page's original frontmatter, and record it in `cascade_keys`.
pub(crate) fn apply(site: &mut Site, snapshot: &CascadeSnapshot) {
    let page_ids: Vec<PageId> = (0..site.pages.len() as u32).map(PageId).collect();
    for id in page_ids {
        let section = site.page(id).section;
        let Some(section) = section else { continue };
        let Some(cascade) = snapshot.by_section.get(&section) else {
            continue;
        };
        let page = site.page_mut(id);
        for (k, v) in cascade {
            if !page.original_frontmatter.contains_key(k) {
                page.metadata.insert(k.clone(), v.clone());
                page.cascade_keys.insert(k.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::site::{Page, PageId, Section};
    use std::collections::HashSet;

    fn blank_page(section: SectionId) -> Page {
        Page {
            id: PageId(0),
            source_path: Some("x".into()),
            raw_source: String::new(),
            original_frontmatter: toml::value::Table::new(),
            metadata: toml::value::Table::new(),
            rendered_html: None,
            output_path: None,
            output_url: None,
            extracted_links: Vec::new(),
            toc: None,
            headings: Vec::new(),
            tags: Vec::new(),
            categories: Vec::new(),
            weight: 0,
            date: None,
            slug: "x".into(),
            custom_id: None,
            content_type: None,
            draft: false,
            generated: false,
            virtual_page: false,
            posts: Vec::new(),
            paginator: None,
            page_num: None,
            section: Some(section),
            cascade_keys: HashSet::new(),
            fingerprint: "f".into(),
        }
    }

    #[test]
    fn frontmatter_wins_over_cascade() {
        let mut site = Site::new(Config::default());
        let mut cascade = toml::value::Table::new();
        cascade.insert("type".into(), toml::Value::String("blog".into()));
        let section_id = site.push_section(Section {
            id: SectionId(0),
            name: "blog".into(),
            path: "blog".into(),
            index_page: None,
            children: Vec::new(),
            pages: Vec::new(),
            parent: None,
            cascade_block: cascade,
        });

        let mut page = blank_page(section_id);
        page.original_frontmatter
            .insert("type".into(), toml::Value::String("tutorial".into()));
        page.metadata = page.original_frontmatter.clone();
        let page_id = site.push_page(page);

        let snapshot = build_snapshot(&site).unwrap();
        apply(&mut site, &snapshot);

        let page = site.page(page_id);
        assert_eq!(page.metadata.get("type").unwrap().as_str(), Some("tutorial"));
        assert!(!page.cascade_keys.contains("type"));
    }

    #[test]
    fn inherited_key_is_recorded() {
        let mut site = Site::new(Config::default());
        let mut cascade = toml::value::Table::new();
        cascade.insert("type".into(), toml::Value::String("blog".into()));
        let section_id = site.push_section(Section {
            id: SectionId(0),
            name: "blog".into(),
            path: "blog".into(),
            index_page: None,
            children: Vec::new(),
            pages: Vec::new(),
            parent: None,
            cascade_block: cascade,
        });
        let page_id = site.push_page(blank_page(section_id));

        let snapshot = build_snapshot(&site).unwrap();
        apply(&mut site, &snapshot);

        let page = site.page(page_id);
        assert_eq!(page.metadata.get("type").unwrap().as_str(), Some("blog"));
        assert!(page.cascade_keys.contains("type"));
    }

    #[test]
    fn protected_key_in_cascade_is_fatal() {
        let mut site = Site::new(Config::default());
        let mut cascade = toml::value::Table::new();
        cascade.insert("_site".into(), toml::Value::String("x".into()));
        site.push_section(Section {
            id: SectionId(0),
            name: "blog".into(),
            path: "blog".into(),
            index_page: None,
            children: Vec::new(),
            pages: Vec::new(),
            parent: None,
            cascade_block: cascade,
        });
        assert!(build_snapshot(&site).is_err());
    }
}
