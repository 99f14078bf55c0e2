// src/site.rs
//
// Core data model: Site owns everything else behind arenas of Page/Section,
// indexed by newtype ids rather than shared pointers (Design Notes §9).

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use time::OffsetDateTime;

use crate::cache::BuildCache;
use crate::config::Config;
use crate::menu::MenuTree;
use crate::strategy::StrategyRegistry;
use crate::taxonomy::TaxonomyMap;
use crate::xref::CrossRefIndex;

/// Index into `Site::pages`. Never reused within a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub(crate) struct PageId(pub u32);

/// Index into `Site::sections`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub(crate) struct SectionId(pub u32);

/// Lazily computed table-of-contents tree, built on first access from the
/// heading list (Design Notes §9: explicit memoized function, not an
/// implicit cache-on-first-access decorator).
#[derive(Debug, Clone, Default)]
pub(crate) struct Toc {
    pub items: Vec<TocEntry>,
    pub html: String,
}

#[derive(Debug, Clone)]
pub(crate) struct TocEntry {
    pub level: u8,
    pub text: String,
    pub anchor: String,
    pub children: Vec<TocEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkKind {
    Internal,
    External,
}

#[derive(Debug, Clone)]
pub(crate) struct ExtractedLink {
    pub href: String,
    pub kind: LinkKind,
}

/// Pagination metadata attached to generated listing pages (§4.5).
#[derive(Debug, Clone)]
pub(crate) struct Paginator {
    pub current: usize,
    pub total: usize,
    pub per_page: usize,
    pub base_url: String,
}

/// A content unit: a source markdown file, or a virtual page with no
/// backing file (taxonomy archive, pagination page, 404, redirect stub).
#[derive(Debug, Clone)]
pub(crate) struct Page {
    pub id: PageId,
    /// Content-relative path without extension, e.g. `blog/hello`. Empty
    /// for purely virtual pages that aren't addressable by path.
    pub source_path: Option<PathBuf>,
    pub raw_source: String,
    /// Frontmatter exactly as authored, before cascade is applied.
    pub original_frontmatter: toml::value::Table,
    /// Mutable metadata: starts as a copy of original_frontmatter, then
    /// gets cascade-filled keys merged in (§4.3).
    pub metadata: toml::value::Table,
    pub rendered_html: Option<String>,
    pub output_path: Option<PathBuf>,
    pub output_url: Option<String>,
    pub extracted_links: Vec<ExtractedLink>,
    pub toc: Option<Toc>,
    pub headings: Vec<(u8, String, String)>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub weight: i64,
    pub date: Option<OffsetDateTime>,
    pub slug: String,
    pub custom_id: Option<String>,
    pub content_type: Option<String>,
    pub draft: bool,
    pub generated: bool,
    pub virtual_page: bool,
    pub posts: Vec<PageId>,
    pub paginator: Option<Paginator>,
    pub page_num: Option<usize>,
    pub section: Option<SectionId>,
    pub cascade_keys: HashSet<String>,
    /// SHA256 of raw_source, used as a cache key and for content-stable
    /// equality/hashing (§3: "Page equality ... content-stable").
    pub fingerprint: String,
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.source_path == other.source_path && self.fingerprint == other.fingerprint
    }
}
impl Eq for Page {}
impl std::hash::Hash for Page {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.source_path.hash(state);
        self.fingerprint.hash(state);
    }
}

impl Page {
    pub(crate) fn key(&self) -> String {
        match &self.source_path {
            Some(p) => p.to_string_lossy().into_owned(),
            None => format!("<virtual:{}>", self.id.0),
        }
    }
}

/// A directory in the content tree.
#[derive(Debug, Clone)]
pub(crate) struct Section {
    pub id: SectionId,
    pub name: String,
    pub path: PathBuf,
    pub index_page: Option<PageId>,
    pub children: Vec<SectionId>,
    pub pages: Vec<PageId>,
    pub parent: Option<SectionId>,
    /// Raw `cascade` block as authored on this section's index page, if any.
    pub cascade_block: toml::value::Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssetClass {
    CssEntry,
    CssModule,
    Static,
}

#[derive(Debug, Clone)]
pub(crate) struct Asset {
    pub source_path: PathBuf,
    pub class: AssetClass,
    pub fingerprint: Option<String>,
    pub output_path: Option<PathBuf>,
}

/// Root container built once per `build()` call (§3 Site). Not `Clone`;
/// shared across render workers behind `Arc` once phases 2-8 complete.
pub(crate) struct Site {
    pub config: Config,
    pub sections: Vec<Section>,
    pub pages: Vec<Page>,
    pub root_sections: Vec<SectionId>,
    pub assets: Vec<Asset>,
    pub taxonomies: TaxonomyMap,
    pub menus: MenuTree,
    pub xref: CrossRefIndex,
    pub cache: BuildCache,
    pub strategies: StrategyRegistry,
}

/// Small accessors over the raw `toml::value::Table` metadata map, shared
/// by discovery, cascade, strategy, and taxonomy so each doesn't grow its
/// own ad-hoc lookup.
pub(crate) fn meta_str(table: &toml::value::Table, key: &str) -> Option<String> {
    table.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

pub(crate) fn meta_bool(table: &toml::value::Table, key: &str, default: bool) -> bool {
    table.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

pub(crate) fn meta_i64(table: &toml::value::Table, key: &str, default: i64) -> i64 {
    table.get(key).and_then(|v| v.as_integer()).unwrap_or(default)
}

pub(crate) fn meta_str_list(table: &toml::value::Table, key: &str) -> Vec<String> {
    match table.get(key) {
        Some(toml::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(toml::Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Parses a `date` metadata value, accepting TOML's native datetime type
/// (when front matter was TOML) or an RFC3339/`YYYY-MM-DD` string (when it
/// was YAML/JSON, which have no native date type).
pub(crate) fn parse_meta_date(table: &toml::value::Table, key: &str) -> Option<OffsetDateTime> {
    match table.get(key)? {
        toml::Value::Datetime(dt) => OffsetDateTime::parse(
            &dt.to_string(),
            &time::format_description::well_known::Rfc3339,
        )
        .ok()
        .or_else(|| {
            let naive = format!("{}T00:00:00Z", dt.to_string().split('T').next()?);
            OffsetDateTime::parse(&naive, &time::format_description::well_known::Rfc3339).ok()
        }),
        toml::Value::String(s) => parse_date_str(s),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339) {
        return Some(dt);
    }
    let format = time::macros::format_description!("[year]-[month]-[day]");
    if let Ok(date) = time::Date::parse(s, &format) {
        return Some(date.midnight().assume_utc());
    }
    None
}

impl Site {
    pub(crate) fn new(config: Config) -> Self {
        Site {
            config,
            sections: Vec::new(),
            pages: Vec::new(),
            root_sections: Vec::new(),
            assets: Vec::new(),
            taxonomies: TaxonomyMap::default(),
            menus: MenuTree::default(),
            xref: CrossRefIndex::default(),
            cache: BuildCache::default(),
            strategies: StrategyRegistry::with_builtins(),
        }
    }

    pub(crate) fn page(&self, id: PageId) -> &Page {
        &self.pages[id.0 as usize]
    }

    pub(crate) fn page_mut(&mut self, id: PageId) -> &mut Page {
        &mut self.pages[id.0 as usize]
    }

    pub(crate) fn section(&self, id: SectionId) -> &Section {
        &self.sections[id.0 as usize]
    }

    pub(crate) fn section_mut(&mut self, id: SectionId) -> &mut Section {
        &mut self.sections[id.0 as usize]
    }

    pub(crate) fn push_page(&mut self, mut page: Page) -> PageId {
        let id = PageId(self.pages.len() as u32);
        page.id = id;
        self.pages.push(page);
        id
    }

    pub(crate) fn push_section(&mut self, mut section: Section) -> SectionId {
        let id = SectionId(self.sections.len() as u32);
        section.id = id;
        self.sections.push(section);
        id
    }
}
