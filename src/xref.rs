// src/xref.rs
//
// C4: single-pass cross-reference index over all pages (including
// generated ones), built after cascade and frozen before rendering
// (§3 invariant 3). Keyed by `PageId` per Design Notes §9's
// "arena + integer indices over pointer-based graphs" guidance.

use std::collections::HashMap;

use thiserror::Error;

use crate::site::{meta_str, PageId, Site};

#[derive(Error, Debug)]
pub(crate) enum CrossRefError {
    #[error("duplicate frontmatter id {id:?}: already claimed by {existing:?}, also declared by {new:?}")]
    DuplicateId {
        id: String,
        existing: String,
        new: String,
    },
    #[error("duplicate by-path key {path:?} between two source pages: {existing:?} and {new:?}")]
    DuplicatePath {
        path: String,
        existing: String,
        new: String,
    },
}

#[derive(Default)]
pub(crate) struct CrossRefIndex {
    pub by_path: HashMap<String, PageId>,
    pub by_slug: HashMap<String, Vec<PageId>>,
    pub by_id: HashMap<String, PageId>,
    /// Populated incrementally as pages are rendered and their headings
    /// are discovered (§4.4: "deferred to parse time"), but the map
    /// object itself is allocated here and shared.
    pub by_heading: HashMap<String, Vec<(PageId, String)>>,
}

/// Build the four lookup tables in one pass over `site.pages` (§4.4).
/// A path collision between two source pages is fatal; a collision
/// between a source page and a generated one resolves in the source's
/// favor and the generated entry is simply skipped from `by_path`.
pub(crate) fn build(site: &mut Site) -> Result<(), CrossRefError> {
    let mut by_path: HashMap<String, PageId> = HashMap::new();
    let mut by_slug: HashMap<String, Vec<PageId>> = HashMap::new();
    let mut by_id: HashMap<String, PageId> = HashMap::new();

    for page in &site.pages {
        if let Some(path) = &page.source_path {
            let key = path.to_string_lossy().into_owned();
            match by_path.get(&key) {
                None => {
                    by_path.insert(key, page.id);
                }
                Some(&existing_id) => {
                    let existing = &site.pages[existing_id.0 as usize];
                    if existing.generated && !page.generated {
                        by_path.insert(key, page.id);
                    } else if existing.generated && page.generated {
                        // both generated: keep first, not fatal
                    } else if !existing.generated && page.generated {
                        // source wins, generated skipped
                    } else {
                        return Err(CrossRefError::DuplicatePath {
                            path: key,
                            existing: existing.key(),
                            new: page.key(),
                        });
                    }
                }
            }
        }

        if !page.slug.is_empty() {
            by_slug.entry(page.slug.clone()).or_default().push(page.id);
        }

        if let Some(id) = meta_str(&page.metadata, "id") {
            if let Some(&existing_id) = by_id.get(&id) {
                let existing = &site.pages[existing_id.0 as usize];
                return Err(CrossRefError::DuplicateId {
                    id,
                    existing: existing.key(),
                    new: page.key(),
                });
            }
            by_id.insert(id, page.id);
        }
    }

    site.xref = CrossRefIndex {
        by_path,
        by_slug,
        by_id,
        by_heading: HashMap::new(),
    };
    Ok(())
}

#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Found { href: String, default_text: String },
    Broken { target: String },
}

/// Resolve `[[path]]`/`[[path|Label]]`/`[[id:foo]]` per §4.4's rules.
/// `[[#heading]]` is handled separately in the markdown pipeline, against
/// the *current* page's own heading slugs rather than this index.
pub(crate) fn resolve(site: &Site, target: &str) -> Resolved {
    if let Some(id) = target.strip_prefix("id:") {
        return match site.xref.by_id.get(id) {
            Some(&page_id) => Resolved::Found {
                href: site.page(page_id).output_url.clone().unwrap_or_default(),
                default_text: id.to_string(),
            },
            None => Resolved::Broken {
                target: target.to_string(),
            },
        };
    }

    if let Some(&page_id) = site.xref.by_path.get(target) {
        return Resolved::Found {
            href: site.page(page_id).output_url.clone().unwrap_or_default(),
            default_text: target.to_string(),
        };
    }
    if let Some(&page_id) = site.xref.by_id.get(target) {
        return Resolved::Found {
            href: site.page(page_id).output_url.clone().unwrap_or_default(),
            default_text: target.to_string(),
        };
    }
    Resolved::Broken {
        target: target.to_string(),
    }
}
