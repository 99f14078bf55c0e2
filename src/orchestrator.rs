// src/orchestrator.rs
//
// C16: the fourteen-phase build driver (§4.1, §5). Grounded on the
// teacher's `build.rs::run_build_with_spans` span-per-phase shape,
// generalized from a flat load/render/write pipeline to the phase
// sequence the arena model requires: discovery, cascade, cross-ref,
// section finalization, taxonomies, menus, output paths, work
// filtering, parallel rendering, assets, post-processing, cache save,
// health check. Phase boundaries are hard barriers; nothing from
// phase N+1 starts before phase N's loop above it returns.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, info_span, warn};
use walkdir::WalkDir;

use crate::cache::{self, BuildCache, WorkSet};
use crate::cascade;
use crate::config::{self, HealthProfile};
use crate::discovery;
use crate::error::RunError;
use crate::health::{self, Finding, HealthContext, HealthError};
use crate::menu;
use crate::output;
use crate::parallel::{self, RenderOutcome};
use crate::postprocess;
use crate::render;
use crate::site::{Page, PageId, Paginator, Site};
use crate::strategy;
use crate::taxonomy;
use crate::xref;

/// What to build and how (§6 CLI flags map onto this 1:1).
#[derive(Debug, Clone)]
pub(crate) struct BuildOpts {
    pub incremental: bool,
    pub parallel: bool,
    pub strict: bool,
    pub profile: HealthProfile,
    pub include_drafts: bool,
}

impl Default for BuildOpts {
    fn default() -> Self {
        BuildOpts {
            incremental: false,
            parallel: true,
            strict: false,
            profile: HealthProfile::Writer,
            include_drafts: false,
        }
    }
}

/// Everything a caller (CLI, watch mode, flamegraph harness) might want
/// to report after a build (§4.1's `build(opts) → BuildStats`).
#[derive(Debug, Default)]
pub(crate) struct BuildStats {
    pub pages_total: usize,
    pub pages_rendered: usize,
    pub pages_skipped: usize,
    pub assets_processed: usize,
    pub render_errors: Vec<render::RenderError>,
    pub broken_refs: Vec<String>,
    pub health_findings: Vec<Finding>,
    pub no_changes: bool,
    pub duration_ms: u128,
}

/// Runs the full pipeline once. Recoverable per-page errors accumulate
/// in the returned stats; discovery/cascade/cross-ref/config failures
/// and, in strict mode, any render error are fatal and stop the build
/// (§4.1, §7).
pub(crate) fn build(root: &Path, config_path: &Path, opts: &BuildOpts) -> Result<BuildStats, RunError> {
    let started = Instant::now();
    let mut stats = BuildStats::default();

    // Phase 1: Initialization.
    let _span = info_span!("init").entered();
    let config = config::load_config(config_path)?;
    let cache_path = match std::env::var_os("BENGAL_CACHE_DIR") {
        Some(dir) => PathBuf::from(dir).join("build.cache.v1"),
        None => root.join(".bengal-cache.json"),
    };
    let template_dir = root.join("themes").join(&config.theme).join("templates");
    let config_hash = compute_config_hash(config_path, &template_dir)?;
    let old_cache = if config.cache_enabled && opts.incremental {
        cache::load(&cache_path)
    } else {
        BuildCache::default()
    };
    drop(_span);

    // Phase 2: Discovery.
    let _span = info_span!("discovery").entered();
    let mut site = Site::new(config);
    let content_root = site.config.content_dir_path(root);
    discovery::discover(&mut site, &content_root, opts.include_drafts)?;
    drop(_span);

    // Phase 3: Cascade.
    let _span = info_span!("cascade").entered();
    let snapshot = cascade::build_snapshot(&site)?;
    cascade::apply(&mut site, &snapshot);
    drop(_span);

    // Phase 4: Cross-reference index.
    let _span = info_span!("xref").entered();
    xref::build(&mut site)?;
    drop(_span);

    // Phase 5: Section finalization — every section lacking an
    // `_index` page gets a synthetic archive/listing page so it still
    // has something to render and link to.
    let _span = info_span!("section_finalization").entered();
    finalize_sections(&mut site, &content_root);
    populate_user_section_indexes(&mut site, &content_root);
    drop(_span);

    // Phase 6: Taxonomies.
    let _span = info_span!("taxonomies").entered();
    taxonomy::materialize(&mut site);
    drop(_span);

    // Phase 7: Menus.
    let _span = info_span!("menus").entered();
    site.menus = menu::build(&site);
    drop(_span);

    // Phase 8: Output path assignment.
    let _span = info_span!("output_paths").entered();
    render::assign_output_paths(&mut site);
    drop(_span);

    stats.pages_total = site.pages.len();

    // Phase 9: Work filter.
    let _span = info_span!("work_filter").entered();
    let current_hashes = compute_current_hashes(&site);
    let work = if opts.incremental && site.config.cache_enabled {
        cache::compute_work_set(&site, &old_cache, &current_hashes, &config_hash)
    } else {
        WorkSet {
            pages: site.pages.iter().map(|p| p.id).collect(),
            no_changes: false,
        }
    };
    stats.no_changes = work.no_changes;
    stats.pages_skipped = stats.pages_total.saturating_sub(work.pages.len());
    drop(_span);

    let output_root = site.config.output_dir_path(root);

    if work.no_changes {
        info!("orchestrator::no_changes skipping render/asset/postprocess phases");
    } else {
        // Phase 10: Rendering.
        let _span = info_span!("render", count = work.pages.len()).entered();
        let page_ids: Vec<PageId> = site.pages.iter().map(|p| p.id).filter(|id| work.pages.contains(id)).collect();
        let RenderOutcome { errors, broken_refs } =
            parallel::render_all(&mut site, &page_ids, &output_root, opts.strict, opts.parallel);
        stats.pages_rendered = page_ids.len().saturating_sub(errors.len());
        stats.broken_refs = broken_refs;
        let had_errors = !errors.is_empty();
        stats.render_errors = errors;
        drop(_span);

        if had_errors && opts.strict {
            warn!("orchestrator::strict_abort {} render error(s)", stats.render_errors.len());
            return Err(RunError::Health(HealthError::RenderFailure(stats.render_errors.len())));
        }

        // Phase 11: Asset processing.
        let _span = info_span!("assets").entered();
        let asset_outcome = crate::assets::process(&mut site, root)?;
        let copied = output::copy_static_files(&site.config, root, &asset_outcome.claimed)?;
        stats.assets_processed = asset_outcome.claimed.len() + copied;
        drop(_span);

        // Phase 12: Post-processing.
        let _span = info_span!("postprocess").entered();
        postprocess::run(&site, root)?;
        drop(_span);
    }

    // Phase 13: Cache save.
    let _span = info_span!("cache_save").entered();
    let cache_save_ok = if site.config.cache_enabled {
        let new_cache = BuildCache {
            schema_version: old_cache.schema_version,
            config_hash,
            file_hashes: current_hashes,
            page_deps: HashMap::new(),
        };
        match cache::save(&new_cache, &cache_path) {
            Ok(()) => true,
            Err(e) => {
                warn!("orchestrator::cache_save_failed {e}");
                false
            }
        }
    } else {
        true
    };
    drop(_span);

    // Phase 14: Health check.
    let _span = info_span!("health").entered();
    let directive_counts = approximate_directive_counts(&site);
    let duration_ms = started.elapsed().as_millis();
    let health_ctx = HealthContext {
        site: &site,
        output_root: &output_root,
        broken_refs: &stats.broken_refs,
        directive_counts: &directive_counts,
        cache_save_ok,
        performance_budget_ms: None,
        build_duration_ms: duration_ms,
    };
    let findings = health::run(&health_ctx, opts.profile);
    health::enforce_strict(&findings, opts.strict || site.config.health.strict)?;
    stats.health_findings = findings;
    drop(_span);

    stats.duration_ms = duration_ms;
    info!(
        "orchestrator::done {}/{} rendered, {} skipped, {}ms",
        stats.pages_rendered, stats.pages_total, stats.pages_skipped, stats.duration_ms
    );
    Ok(stats)
}

/// Folds every template file's bytes into the config hash: there is no
/// per-page template dependency graph (§4.12 step 2) to thread through
/// `BuildCache::page_deps`, so a template edit is treated the same as a
/// config edit and forces a full rebuild rather than silently serving
/// stale pages from a narrower incremental pass.
fn compute_config_hash(config_path: &Path, template_dir: &Path) -> Result<String, RunError> {
    let mut combined = std::fs::read(config_path).map_err(|e| RunError::IoError(e.to_string()))?;
    if template_dir.exists() {
        let mut files: Vec<PathBuf> = WalkDir::new(template_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        for path in files {
            if let Ok(bytes) = std::fs::read(&path) {
                combined.extend(bytes);
            }
        }
    }
    Ok(cache::hash_bytes(&combined))
}

/// Builds the "what changed" input for `cache::compute_work_set`: one
/// entry per content page keyed by its source-relative path, plus one
/// `<section path>::_index` entry per section so a cascade-affecting
/// edit to an index page fans out to every page in that section.
fn compute_current_hashes(site: &Site) -> HashMap<String, String> {
    let mut hashes = HashMap::new();
    for page in &site.pages {
        if let Some(source_path) = &page.source_path {
            hashes.insert(source_path.to_string_lossy().into_owned(), page.fingerprint.clone());
        }
    }
    for section in &site.sections {
        if let Some(index_id) = section.index_page {
            let key = format!("{}::_index", section.path.to_string_lossy());
            hashes.insert(key, site.page(index_id).fingerprint.clone());
        }
    }
    hashes
}

/// Synthesizes a listing page for every section that has no `_index.md`
/// of its own, mirroring `taxonomy.rs::materialize`'s virtual-page
/// construction: template/sort order come from the detected strategy,
/// and the listing paginates when that strategy allows it (§4.7, §4.9).
fn finalize_sections(site: &mut Site, content_root: &Path) {
    let section_ids: Vec<_> = site.sections.iter().map(|s| s.id).collect();
    for section_id in section_ids {
        if site.section(section_id).index_page.is_some() {
            continue;
        }
        let member_pages = site.section(section_id).pages.clone();
        if member_pages.is_empty() {
            continue;
        }

        let strategy_name = strategy::detect_for_section(site, section_id);
        let per_page = site.config.pagination.per_page.max(1);
        let allows_pagination = site
            .strategies
            .get(&strategy_name)
            .map(|s| s.allows_pagination())
            .unwrap_or(true);

        let ordered: Vec<PageId> = {
            let pages: Vec<&Page> = member_pages.iter().map(|&id| site.page(id)).collect();
            strategy::sort_pages_by_name(&strategy_name, pages).into_iter().map(|p| p.id).collect()
        };

        let section_path = site.section(section_id).path.clone();
        let rel_path = section_path.strip_prefix(content_root).unwrap_or(&section_path).to_path_buf();
        let base_url = if rel_path.as_os_str().is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", rel_path.to_string_lossy().replace('\\', "/"))
        };

        let total_pages = if allows_pagination {
            ordered.len().div_ceil(per_page).max(1)
        } else {
            1
        };

        let section_name = site.section(section_id).name.clone();
        let template = site
            .strategies
            .get(&strategy_name)
            .map(|s| s.default_index_template().to_string())
            .unwrap_or_else(|| "index.html".to_string());

        let mut first_index_page = None;
        for page_num in 1..=total_pages {
            let slice = if allows_pagination {
                let start = (page_num - 1) * per_page;
                let end = (start + per_page).min(ordered.len());
                ordered[start..end].to_vec()
            } else {
                ordered.clone()
            };
            let url = if page_num == 1 {
                base_url.clone()
            } else {
                format!("{base_url}page/{page_num}/")
            };

            let mut metadata = toml::value::Table::new();
            metadata.insert("title".into(), toml::Value::String(section_name.clone()));
            metadata.insert("template".into(), toml::Value::String(template.clone()));

            let page = Page {
                id: PageId(0),
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
                slug: section_name.clone(),
                custom_id: None,
                content_type: None,
                draft: false,
                generated: true,
                virtual_page: true,
                posts: slice,
                paginator: allows_pagination.then(|| Paginator {
                    current: page_num,
                    total: total_pages,
                    per_page,
                    base_url: base_url.clone(),
                }),
                page_num: Some(page_num),
                section: Some(section_id),
                cascade_keys: Default::default(),
                fingerprint: format!("section-archive:{}:{page_num}", rel_path.display()),
            };
            let page_id = site.push_page(page);
            if page_num == 1 {
                first_index_page = Some(page_id);
            }
        }

        if let Some(index_id) = first_index_page {
            site.section_mut(section_id).index_page = Some(index_id);
        }
    }
}

/// Populates `posts`/`paginator` on a section's user-authored `_index`
/// page from its member pages, the listing counterpart to what
/// `finalize_sections` synthesizes for sections without one — a
/// `{% for p in page.posts %}` in a hand-written `_index.md`'s template
/// is otherwise always empty. Pages beyond the first still need their
/// own URL, so page 2+ are generated virtual pages exactly like
/// `finalize_sections` makes them; only page 1's listing lands on the
/// real `_index` page, leaving its own template/metadata untouched.
fn populate_user_section_indexes(site: &mut Site, content_root: &Path) {
    let section_ids: Vec<_> = site.sections.iter().map(|s| s.id).collect();
    for section_id in section_ids {
        let Some(index_id) = site.section(section_id).index_page else {
            continue;
        };
        if site.page(index_id).generated {
            continue;
        }
        let member_pages = site.section(section_id).pages.clone();
        if member_pages.is_empty() {
            continue;
        }

        let strategy_name = strategy::detect_for_section(site, section_id);
        let per_page = site.config.pagination.per_page.max(1);
        let (allows_pagination, template, ordered): (bool, String, Vec<PageId>) = {
            let strategy = site.strategies.get(&strategy_name);
            let allows_pagination = strategy.map(|s| s.allows_pagination()).unwrap_or(true);
            let template = strategy
                .map(|s| s.default_index_template().to_string())
                .unwrap_or_else(|| "index.html".to_string());
            let pages: Vec<&Page> = member_pages.iter().map(|&id| site.page(id)).collect();
            let displayed = strategy.map(|s| s.filter_display_pages(pages)).unwrap_or_default();
            let ordered = strategy
                .map(|s| s.sort_pages(displayed))
                .unwrap_or_default()
                .into_iter()
                .map(|p| p.id)
                .collect();
            (allows_pagination, template, ordered)
        };

        if ordered.is_empty() {
            continue;
        }

        let section_path = site.section(section_id).path.clone();
        let rel_path = section_path.strip_prefix(content_root).unwrap_or(&section_path).to_path_buf();
        let base_url = if rel_path.as_os_str().is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", rel_path.to_string_lossy().replace('\\', "/"))
        };

        let total_pages = if allows_pagination {
            ordered.len().div_ceil(per_page).max(1)
        } else {
            1
        };

        let first_end = if allows_pagination { per_page.min(ordered.len()) } else { ordered.len() };

        {
            let page = site.page_mut(index_id);
            page.posts = ordered[..first_end].to_vec();
            page.page_num = Some(1);
            page.paginator = allows_pagination.then(|| Paginator {
                current: 1,
                total: total_pages,
                per_page,
                base_url: base_url.clone(),
            });
        }

        let section_name = site.section(section_id).name.clone();
        for page_num in 2..=total_pages {
            let start = (page_num - 1) * per_page;
            let end = (start + per_page).min(ordered.len());
            let slice = ordered[start..end].to_vec();
            let url = format!("{base_url}page/{page_num}/");

            let mut metadata = toml::value::Table::new();
            metadata.insert("title".into(), toml::Value::String(section_name.clone()));
            metadata.insert("template".into(), toml::Value::String(template.clone()));

            let page = Page {
                id: PageId(0),
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
                slug: section_name.clone(),
                custom_id: None,
                content_type: None,
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
                section: Some(section_id),
                cascade_keys: Default::default(),
                fingerprint: format!("section-archive:{}:{page_num}", rel_path.display()),
            };
            site.push_page(page);
        }
    }
}

/// Every directive render function leaves a distinctive class/attribute
/// marker in its output (`markdown/directives.rs`); since no render
/// call threads a live counter back to the orchestrator, this scans the
/// finished HTML once per page for the health check's "too many
/// directives on one page" validator (§4.15).
const DIRECTIVE_MARKERS: &[&str] = &[
    "admonition admonition-",
    "directive directive-unknown",
    "class=\"dropdown\"",
    "class=\"tabs\"",
    "class=\"code-tabs\"",
];

fn approximate_directive_counts(site: &Site) -> HashMap<PageId, usize> {
    let mut counts = HashMap::new();
    for page in &site.pages {
        let Some(html) = &page.rendered_html else { continue };
        let mut count = 0;
        for marker in DIRECTIVE_MARKERS {
            count += html.matches(marker).count();
        }
        if count > 0 {
            counts.insert(page.id, count);
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn scaffold_site(root: &Path) {
        fs::create_dir_all(root.join("content/blog")).unwrap();
        fs::write(
            root.join("content/blog/hello.md"),
            "---\ntitle: Hello\ndate: 2025-01-02\n---\n# Hi\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("themes/default/templates/blog")).unwrap();
        fs::create_dir_all(root.join("themes/default/templates")).unwrap();
        fs::write(
            root.join("themes/default/templates/page.html"),
            "<html><body>{{ page.content }}</body></html>",
        )
        .unwrap();
        fs::write(
            root.join("themes/default/templates/index.html"),
            "<html><body>index {{ page.title }}</body></html>",
        )
        .unwrap();
        fs::write(
            root.join("themes/default/templates/blog/list.html"),
            "<html><body>{% for p in page.posts %}{{ p.title }}{% endfor %}</body></html>",
        )
        .unwrap();
        fs::write(
            root.join("themes/default/templates/blog/single.html"),
            "<html><body>{{ page.content }}</body></html>",
        )
        .unwrap();
        fs::write(root.join("bengal.toml"), "title = \"Test Site\"\n").unwrap();
    }

    #[test]
    fn full_build_renders_pages_and_archive() {
        let dir = tempdir().unwrap();
        scaffold_site(dir.path());

        let opts = BuildOpts::default();
        let stats = build(dir.path(), &dir.path().join("bengal.toml"), &opts).unwrap();

        assert!(stats.pages_rendered >= 1);
        assert!(stats.render_errors.is_empty());
        assert!(dir.path().join("public/blog/hello/index.html").exists());
        assert!(dir.path().join("public/blog/index.html").exists());
    }

    #[test]
    fn second_incremental_build_with_no_edits_reports_no_changes() {
        let dir = tempdir().unwrap();
        scaffold_site(dir.path());

        let mut opts = BuildOpts::default();
        build(dir.path(), &dir.path().join("bengal.toml"), &opts).unwrap();

        opts.incremental = true;
        let stats = build(dir.path(), &dir.path().join("bengal.toml"), &opts).unwrap();
        assert!(stats.no_changes);
    }
}
