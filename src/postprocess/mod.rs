// src/postprocess/mod.rs
//
// C14: sitemap, RSS, search index, 404, alias redirects. Each emitter
// is grounded on the teacher's standalone `sitemap.rs`/`rss.rs`/
// `redirect.rs`, generalized from the teacher's `LoadedContent`/
// `Config::content` shape to `Site`'s arena + `config.taxonomies`-free
// single blog-section default (§4.14). All writes go through
// `output::write_output_file`, same as the teacher's callers did.

pub(crate) mod index_json;
pub(crate) mod notfound;
pub(crate) mod redirects;
pub(crate) mod rss;
pub(crate) mod sitemap;

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::error::StaticError;
use crate::output::WriteError;
use crate::site::Site;

#[derive(Error, Debug)]
pub(crate) enum PostprocessError {
    #[error("failed to write post-processing output: {0}")]
    Write(#[from] WriteError),
    #[error("failed to write redirect stub: {0}")]
    Static(#[from] StaticError),
}

/// Minimal tag stripper shared by the RSS and search-index emitters,
/// which both need plain-text summaries from rendered HTML.
pub(crate) fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Default)]
pub(crate) struct PostprocessStats {
    pub sitemap_written: bool,
    pub rss_written: bool,
    pub index_written: bool,
    pub notfound_written: bool,
    pub redirects_written: usize,
}

/// Runs every post-processing emitter (§4.1 phase 12). Each emitter is
/// independent; a later one still runs if an earlier one is skipped by
/// config, but any I/O error aborts the whole phase (§7: PostprocessError
/// is always a warning outside strict mode, fatal inside it — decided by
/// the caller).
pub(crate) fn run(site: &Site, root: &Path) -> Result<PostprocessStats, PostprocessError> {
    let output_root = site.config.output_dir_path(root);
    let mut stats = PostprocessStats::default();

    let sitemap_xml = sitemap::generate(site, root);
    crate::output::write_output_file(&output_root.join("sitemap.xml"), &sitemap_xml)?;
    stats.sitemap_written = true;

    if site.config.rss.enabled {
        if let Some(xml) = rss::generate(site) {
            crate::output::write_output_file(&output_root.join("rss.xml"), &xml)?;
            stats.rss_written = true;
        }
    }

    if site.config.search.enabled {
        let (json, text) = index_json::generate(site);
        crate::output::write_output_file(&output_root.join("search-index.json"), &json)?;
        if site
            .config
            .output_formats
            .site_wide
            .iter()
            .any(|f| f == "search_index_txt")
        {
            crate::output::write_output_file(&output_root.join("search-index.txt"), &text)?;
        }
        stats.index_written = true;
    }

    if let Some(html) = notfound::generate(site) {
        crate::output::write_output_file(&output_root.join("404.html"), &html)?;
        stats.notfound_written = true;
    }

    stats.redirects_written = redirects::generate(site, &output_root)?;

    info!(
        "postprocess::done sitemap={} rss={} index={} redirects={}",
        stats.sitemap_written, stats.rss_written, stats.index_written, stats.redirects_written
    );

    Ok(stats)
}
