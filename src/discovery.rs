// src/discovery.rs
//
// C2: walks the content root depth-first, sorted alphabetically at each
// level, building the Section tree and Page records (§4.2). Grounded on
// the teacher's `utils.rs::find_markdown_files`/`get_content_type`,
// generalized from a flat file list into the section tree the spec
// requires.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::frontmatter::{self, FrontmatterError};
use crate::site::{meta_bool, meta_i64, meta_str, meta_str_list, parse_meta_date, Page, Section, SectionId, Site};

#[derive(Error, Debug)]
pub(crate) enum DiscoveryError {
    #[error("I/O error walking content directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Frontmatter(#[from] FrontmatterError),
}

const CONTENT_EXTENSIONS: &[&str] = &["md", "markdown"];

fn is_content_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CONTENT_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Populates `site.sections`/`site.pages`/`site.root_sections` from the
/// content tree rooted at `content_root`. Pages with `draft: true` are
/// skipped unless `include_drafts` is set.
pub(crate) fn discover(
    site: &mut Site,
    content_root: &Path,
    include_drafts: bool,
) -> Result<(), DiscoveryError> {
    if !content_root.exists() {
        debug!("discovery::empty content root {:?} does not exist", content_root);
        return Ok(());
    }
    let root_id = walk_section(site, content_root, content_root, None, include_drafts)?;
    site.root_sections = vec![root_id];
    Ok(())
}

fn walk_section(
    site: &mut Site,
    dir: &Path,
    content_root: &Path,
    parent: Option<SectionId>,
    include_drafts: bool,
) -> Result<SectionId, DiscoveryError> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let section_id = site.push_section(Section {
        id: SectionId(0),
        name,
        path: dir.to_path_buf(),
        index_page: None,
        children: Vec::new(),
        pages: Vec::new(),
        parent,
        cascade_block: toml::value::Table::new(),
    });

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| DiscoveryError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    let mut subdirs = Vec::new();
    for entry in entries {
        if entry.is_dir() {
            subdirs.push(entry);
        } else if is_content_file(&entry) {
            let is_index = entry
                .file_stem()
                .map(|s| s == "_index")
                .unwrap_or(false);
            if let Some(page_id) = load_page(site, &entry, content_root, include_drafts)? {
                site.page_mut(page_id).section = Some(section_id);
                if is_index {
                    let cascade = site
                        .page(page_id)
                        .original_frontmatter
                        .get("cascade")
                        .and_then(|v| v.as_table())
                        .cloned()
                        .unwrap_or_default();
                    let section = site.section_mut(section_id);
                    section.index_page = Some(page_id);
                    section.cascade_block = cascade;
                } else {
                    site.section_mut(section_id).pages.push(page_id);
                }
            }
        }
    }

    for subdir in subdirs {
        let child_id = walk_section(site, &subdir, content_root, Some(section_id), include_drafts)?;
        site.section_mut(section_id).children.push(child_id);
    }

    Ok(section_id)
}

fn load_page(
    site: &mut Site,
    path: &Path,
    content_root: &Path,
    include_drafts: bool,
) -> Result<Option<crate::site::PageId>, DiscoveryError> {
    let raw = frontmatter::read_file(path).map_err(DiscoveryError::Frontmatter)?;
    let split = match frontmatter::split(&raw, path) {
        Ok(s) => s,
        Err(e) => {
            warn!("discovery::frontmatter {:?}: {e}", path);
            frontmatter::split("", path).unwrap_or_else(|_| frontmatter::SplitContent {
                metadata: toml::value::Table::new(),
                body: raw.clone(),
                format: frontmatter::FrontmatterFormat::None,
            })
        }
    };

    let draft = meta_bool(&split.metadata, "draft", false);
    if draft && !include_drafts {
        debug!("discovery::skip draft {:?}", path);
        return Ok(None);
    }

    let rel_path = path
        .strip_prefix(content_root)
        .unwrap_or(path)
        .with_extension("");

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let slug = meta_str(&split.metadata, "slug").unwrap_or_else(|| slug::slugify(&stem));
    let tags = meta_str_list(&split.metadata, "tags");
    let categories = meta_str_list(&split.metadata, "categories");
    let weight = meta_i64(&split.metadata, "weight", 0);
    let date = parse_meta_date(&split.metadata, "date");
    let custom_id = meta_str(&split.metadata, "id");
    let content_type = meta_str(&split.metadata, "type");

    let fingerprint = {
        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        hex::encode(hasher.finalize())
    };

    let page = Page {
        id: crate::site::PageId(0),
        source_path: Some(rel_path),
        raw_source: split.body,
        original_frontmatter: split.metadata.clone(),
        metadata: split.metadata,
        rendered_html: None,
        output_path: None,
        output_url: None,
        extracted_links: Vec::new(),
        toc: None,
        headings: Vec::new(),
        tags,
        categories,
        weight,
        date,
        slug,
        custom_id,
        content_type,
        draft,
        generated: false,
        virtual_page: false,
        posts: Vec::new(),
        paginator: None,
        page_num: None,
        section: None,
        cascade_keys: std::collections::HashSet::new(),
        fingerprint,
    };

    Ok(Some(site.push_page(page)))
}

// Minimal hex encoding so we don't pull in a dedicated `hex` dependency
// for one call site; mirrors what `blake3`'s own `to_hex()` does.
mod hex {
    pub(super) fn encode(bytes: impl AsRef<[u8]>) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(bytes.as_ref().len() * 2);
        for b in bytes.as_ref() {
            write!(out, "{b:02x}").unwrap();
        }
        out
    }
}
