// src/cache.rs
//
// C12: SHA256 file hashing, per-page dependency edges, and the
// work-filter algorithm (§4.12). Persistence follows the teacher's
// `asset_hash.rs` manifest-as-JSON export pattern, re-keyed to SHA256
// (vs. the teacher's BLAKE3, kept for asset fingerprints in `assets.rs`)
// because §3/§4.12 name SHA256 literally.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::site::{PageId, Site};

const SCHEMA_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub(crate) enum CacheError {
    #[error("I/O error reading/writing cache at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache deserialization failed: {0}")]
    Deserialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct BuildCache {
    pub schema_version: u32,
    pub config_hash: String,
    /// Every content/template/partial/data file hashed during the last
    /// successful build.
    pub file_hashes: HashMap<String, String>,
    /// Page source-relative key → dependency paths touched while
    /// rendering it last time (templates, partials, data files, assets,
    /// cross-referenced pages).
    pub page_deps: HashMap<String, Vec<String>>,
}

impl Default for BuildCache {
    fn default() -> Self {
        BuildCache {
            schema_version: SCHEMA_VERSION,
            config_hash: String::new(),
            file_hashes: HashMap::new(),
            page_deps: HashMap::new(),
        }
    }
}

pub(crate) fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

pub(crate) fn file_hash(path: &Path) -> Result<String, CacheError> {
    let bytes = fs::read(path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(hash_bytes(&bytes))
}

/// Loads the cache file, discarding it (returning a fresh default) on a
/// schema-version mismatch or any parse failure (§4.12: "full rebuild").
pub(crate) fn load(path: &Path) -> BuildCache {
    let Ok(raw) = fs::read_to_string(path) else {
        return BuildCache::default();
    };
    match serde_json::from_str::<BuildCache>(&raw) {
        Ok(cache) if cache.schema_version == SCHEMA_VERSION => cache,
        Ok(_) => {
            warn!("cache::schema_mismatch discarding cache");
            BuildCache::default()
        }
        Err(e) => {
            warn!("cache::corrupt {e}, discarding cache");
            BuildCache::default()
        }
    }
}

/// Persists the cache atomically: write to a sibling temp file, rename
/// into place.
pub(crate) fn save(cache: &BuildCache, path: &Path) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CacheError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let serialized = serde_json::to_string_pretty(cache)?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &serialized).map_err(|e| CacheError::Io {
        path: tmp_path.clone(),
        source: e,
    })?;
    fs::rename(&tmp_path, path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!("cache::saved {} file hashes", cache.file_hashes.len());
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct WorkSet {
    pub pages: HashSet<PageId>,
    /// True when nothing changed; phases 10-12 are skipped but the
    /// cache is still saved (§4.12).
    pub no_changes: bool,
}

/// Implements the seven-step work-filter algorithm (§4.12), steps 1-4
/// (changed-file set, direct, template fanout, cascade fanout); step 5
/// (taxonomy fanout) is folded in by checking whether any listing
/// page's `posts` set (generated archive/term/pagination pages and
/// user-authored `_index` pages alike) intersects the pages already
/// selected. Step 6 (config fanout) short-circuits to "every page".
/// Step 7 (assets) is the asset orchestrator's own concern and not
/// modeled here.
pub(crate) fn compute_work_set(
    site: &Site,
    old_cache: &BuildCache,
    current_hashes: &HashMap<String, String>,
    config_hash: &str,
) -> WorkSet {
    if config_hash != old_cache.config_hash {
        info!("cache::config_fanout config changed, full rebuild");
        return WorkSet {
            pages: site.pages.iter().map(|p| p.id).collect(),
            no_changes: false,
        };
    }

    let changed: HashSet<&str> = current_hashes
        .iter()
        .filter(|(path, hash)| old_cache.file_hashes.get(*path) != Some(*hash))
        .map(|(path, _)| path.as_str())
        .collect();

    if changed.is_empty() {
        return WorkSet {
            pages: HashSet::new(),
            no_changes: true,
        };
    }

    let mut selected: HashSet<PageId> = HashSet::new();

    for page in &site.pages {
        let source_key = page
            .source_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let directly_changed = source_key
            .as_deref()
            .map(|k| changed.contains(k))
            .unwrap_or(false);

        let fanout_changed = old_cache
            .page_deps
            .get(&page.key())
            .map(|deps| deps.iter().any(|d| changed.contains(d.as_str())))
            .unwrap_or(false);

        if directly_changed || fanout_changed {
            selected.insert(page.id);
        }
    }

    for section in &site.sections {
        let cascade_key = format!("{}::_index", section.path.to_string_lossy());
        if changed.contains(cascade_key.as_str()) {
            for &page_id in &section.pages {
                selected.insert(page_id);
            }
        }
    }

    // A listing page (generated archive or user-authored `_index`) is
    // re-rendered whenever any post it lists was selected, since its
    // rendered output embeds those posts' summaries.
    for page in &site.pages {
        if !page.posts.is_empty() && page.posts.iter().any(|p| selected.contains(p)) {
            selected.insert(page.id);
        }
    }

    WorkSet {
        no_changes: selected.is_empty(),
        pages: selected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::site::Page;
    use std::collections::HashSet as StdHashSet;
    use tempfile::tempdir;

    fn blank_page(source: &str) -> Page {
        Page {
            id: PageId(0),
            source_path: Some(source.into()),
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
            cascade_keys: StdHashSet::new(),
            fingerprint: "f".into(),
        }
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = hash_bytes(b"hello");
        let b = hash_bytes(b"hello");
        let c = hash_bytes(b"world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("build.cache.v1");
        let mut cache = BuildCache::default();
        cache.config_hash = "abc".into();
        cache.file_hashes.insert("a.md".into(), "h1".into());
        save(&cache, &path).unwrap();
        let loaded = load(&path);
        assert_eq!(loaded.config_hash, "abc");
        assert_eq!(loaded.file_hashes.get("a.md"), Some(&"h1".to_string()));
    }

    #[test]
    fn config_change_triggers_full_rebuild() {
        let mut site = Site::new(Config::default());
        site.push_page(blank_page("a.md"));
        let old_cache = BuildCache {
            config_hash: "old".into(),
            ..Default::default()
        };
        let work = compute_work_set(&site, &old_cache, &HashMap::new(), "new");
        assert_eq!(work.pages.len(), 1);
        assert!(!work.no_changes);
    }

    #[test]
    fn no_changed_files_yields_no_changes() {
        let mut site = Site::new(Config::default());
        site.push_page(blank_page("a.md"));
        let mut current = HashMap::new();
        current.insert("a.md".to_string(), "h1".to_string());
        let old_cache = BuildCache {
            config_hash: "same".into(),
            file_hashes: current.clone(),
            ..Default::default()
        };
        let work = compute_work_set(&site, &old_cache, &current, "same");
        assert!(work.no_changes);
    }

    #[test]
    fn changed_source_file_selects_its_page() {
        let mut site = Site::new(Config::default());
        site.push_page(blank_page("a.md"));
        let mut current = HashMap::new();
        current.insert("a.md".to_string(), "new_hash".to_string());
        let mut old_hashes = HashMap::new();
        old_hashes.insert("a.md".to_string(), "old_hash".to_string());
        let old_cache = BuildCache {
            config_hash: "same".into(),
            file_hashes: old_hashes,
            ..Default::default()
        };
        let work = compute_work_set(&site, &old_cache, &current, "same");
        assert_eq!(work.pages.len(), 1);
    }
}
