// src/render.rs
//
// C10: per-page rendering pipeline (output path, preprocess, parse,
// enhance, template selection, context assembly, template render,
// atomic write). Grounded on the teacher's `build.rs::run_build`
// per-file loop and `template.rs::render_html`, generalized from a
// flat `LoadedContent` list to the page/section arena and split into
// a path-assignment pass (phase 8) plus a per-page render call
// (phase 10, driven by `parallel.rs`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use minijinja::value::Value;
use minijinja::{context, Environment};
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::Config;
use crate::markdown::{self, preprocess};
use crate::menu::MenuNode;
use crate::site::{meta_str, Page, PageId, Site};
use crate::strategy;
use crate::template;
use crate::xref;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderErrorKind {
    Preprocess,
    Parse,
    Template,
    Write,
}

/// Per-page render failure, carrying enough detail for a strict-mode
/// diagnostic without re-deriving it at the reporting site.
#[derive(Debug)]
pub(crate) struct RenderError {
    pub page: String,
    pub kind: RenderErrorKind,
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub message: String,
    pub template_chain: Vec<String>,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} error rendering {}: {}", self.kind, self.page, self.message)?;
        if let Some(file) = &self.file {
            write!(f, " ({file}")?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
                if let Some(col) = self.column {
                    write!(f, ":{col}")?;
                }
            }
            write!(f, ")")?;
        }
        if !self.template_chain.is_empty() {
            write!(f, " [template chain: {}]", self.template_chain.join(" -> "))?;
        }
        if let Some(s) = &self.suggestion {
            write!(f, "; suggestion: {s}")?;
        }
        Ok(())
    }
}
impl std::error::Error for RenderError {}

impl RenderError {
    fn new(page: &Page, kind: RenderErrorKind, message: impl Into<String>) -> Self {
        RenderError {
            page: page.key(),
            kind,
            file: None,
            line: None,
            column: None,
            message: message.into(),
            template_chain: Vec::new(),
            suggestion: None,
        }
    }

    fn from_minijinja(page: &Page, template_name: &str, err: &minijinja::Error) -> Self {
        RenderError {
            page: page.key(),
            kind: RenderErrorKind::Template,
            file: Some(err.name().unwrap_or(template_name).to_string()),
            line: err.line(),
            column: None,
            message: err.to_string(),
            template_chain: minijinja_chain(err),
            suggestion: template::suggest_for_error(err),
        }
    }
}

fn minijinja_chain(err: &minijinja::Error) -> Vec<String> {
    let mut chain = Vec::new();
    if let Some(name) = err.name() {
        chain.push(name.to_string());
    }
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(mj) = e.downcast_ref::<minijinja::Error>() {
            if let Some(name) = mj.name() {
                chain.push(name.to_string());
            }
        }
        source = e.source();
    }
    chain
}

/// Content types that get a structural badge wrapper on enhance (§4.10
/// step 4); everything else passes through untouched.
const ENHANCED_TYPES: &[&str] = &["python-module", "cli-command", "api-reference", "cli-reference"];

fn enhance(html: &str, content_type: Option<&str>) -> String {
    match content_type {
        Some(t) if ENHANCED_TYPES.contains(&t) => {
            format!("<div class=\"content-type-{t}\"><span class=\"badge badge-{t}\">{t}</span>{html}</div>")
        }
        _ => html.to_string(),
    }
}

fn url_to_output_rel(url: &str) -> PathBuf {
    let trimmed = url.trim_start_matches('/');
    if trimmed.is_empty() || url.ends_with('/') {
        PathBuf::from(trimmed).join("index.html")
    } else {
        PathBuf::from(format!("{trimmed}.html"))
    }
}

/// Output path/URL assignment (§4.10 step 1). Pages backed by a source
/// file follow the pretty-url rule; virtual pages (taxonomy archives,
/// pagination, generated section indexes) already carry their final
/// `output_url` from whoever created them and just need it turned into
/// a filesystem-relative path.
pub(crate) fn compute_output_path(page: &Page, config: &Config) -> (PathBuf, String) {
    let Some(source_path) = &page.source_path else {
        let url = page.output_url.clone().unwrap_or_else(|| "/".to_string());
        return (url_to_output_rel(&url), url);
    };

    let stem = source_path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let parent = source_path.parent().unwrap_or_else(|| Path::new(""));
    let parent_str = parent.to_string_lossy();

    if config.pretty_urls && (stem == "index" || stem == "_index") {
        let rel = parent.join("index.html");
        let url = if parent_str.is_empty() {
            "/".to_string()
        } else {
            format!("/{parent_str}/")
        };
        return (rel, url);
    }

    if config.pretty_urls {
        let rel = parent.join(stem).join("index.html");
        let url = if parent_str.is_empty() {
            format!("/{stem}/")
        } else {
            format!("/{parent_str}/{stem}/")
        };
        return (rel, url);
    }

    let rel = parent.join(format!("{stem}.html"));
    let url = if parent_str.is_empty() {
        format!("/{stem}.html")
    } else {
        format!("/{parent_str}/{stem}.html")
    };
    (rel, url)
}

/// Assigns `output_path`/`output_url` on every page in the arena.
pub(crate) fn assign_output_paths(site: &mut Site) {
    let ids: Vec<PageId> = site.pages.iter().map(|p| p.id).collect();
    for id in ids {
        let (rel, url) = compute_output_path(site.page(id), &site.config);
        let page = site.page_mut(id);
        page.output_path = Some(rel);
        page.output_url = Some(url);
    }
}

/// Template selection priority (§4.7): explicit `template:` frontmatter,
/// then explicit `type:` via the strategy registry, then the section's
/// detected strategy. Generated pages (taxonomy archives, pagination)
/// set `template` directly at creation time and are resolved by the
/// first branch.
fn select_template(site: &Site, page: &Page) -> String {
    if let Some(t) = meta_str(&page.metadata, "template") {
        return t;
    }

    if let Some(t) = meta_str(&page.metadata, "type") {
        if let Some(strategy) = site.strategies.get(&t) {
            let is_index = page
                .section
                .map(|s| site.section(s).index_page == Some(page.id))
                .unwrap_or(false);
            return if is_index {
                strategy.default_index_template().to_string()
            } else {
                strategy.default_single_template().to_string()
            };
        }
    }

    let Some(section_id) = page.section else {
        return "page.html".to_string();
    };
    let strategy_name = strategy::detect_for_section(site, section_id);
    let strategy = site
        .strategies
        .get(&strategy_name)
        .expect("detect_for_section always returns a registered strategy name");
    let is_index = site.section(section_id).index_page == Some(page.id);
    if is_index {
        strategy.default_index_template().to_string()
    } else {
        strategy.default_single_template().to_string()
    }
}

#[derive(Serialize)]
struct PageSummary {
    title: String,
    url: String,
    date: Option<String>,
    summary: String,
    tags: Vec<String>,
}

fn format_date(dt: OffsetDateTime) -> String {
    dt.format(&time::format_description::well_known::Rfc3339).unwrap_or_default()
}

fn page_summary(site: &Site, id: PageId) -> PageSummary {
    let page = site.page(id);
    let summary = meta_str(&page.metadata, "summary").unwrap_or_else(|| {
        page.raw_source.chars().take(200).collect::<String>()
    });
    PageSummary {
        title: meta_str(&page.metadata, "title").unwrap_or_default(),
        url: page.output_url.clone().unwrap_or_default(),
        date: page.date.map(format_date),
        summary,
        tags: page.tags.clone(),
    }
}

#[derive(Serialize)]
struct PaginatorView {
    current: usize,
    total: usize,
    per_page: usize,
    base_url: String,
}

#[derive(Serialize)]
struct PageView {
    title: String,
    date: Option<String>,
    url: String,
    slug: String,
    tags: Vec<String>,
    categories: Vec<String>,
    weight: i64,
    content: String,
    toc: String,
    metadata: toml::value::Table,
    page_num: Option<usize>,
    paginator: Option<PaginatorView>,
    posts: Vec<PageSummary>,
}

fn build_page_view(site: &Site, page: &Page, content: String, toc: String) -> PageView {
    PageView {
        title: meta_str(&page.metadata, "title").unwrap_or_default(),
        date: page.date.map(format_date),
        url: page.output_url.clone().unwrap_or_default(),
        slug: page.slug.clone(),
        tags: page.tags.clone(),
        categories: page.categories.clone(),
        weight: page.weight,
        content,
        toc,
        metadata: page.metadata.clone(),
        page_num: page.page_num,
        paginator: page.paginator.as_ref().map(|p| PaginatorView {
            current: p.current,
            total: p.total,
            per_page: p.per_page,
            base_url: p.base_url.clone(),
        }),
        posts: page.posts.iter().map(|&id| page_summary(site, id)).collect(),
    }
}

fn menu_view(node: &MenuNode) -> minijinja::Value {
    context! {
        name => node.name.clone(),
        url => node.url.clone(),
        weight => node.weight,
        children => node.children.iter().map(menu_view).collect::<Vec<_>>(),
    }
}

fn site_context(site: &Site) -> Value {
    let menus: HashMap<String, Vec<Value>> = site
        .menus
        .menus
        .iter()
        .map(|(name, nodes)| (name.clone(), nodes.iter().map(menu_view).collect()))
        .collect();
    context! {
        title => site.config.title.clone(),
        baseurl => site.config.baseurl.clone(),
        menus => menus,
    }
}

fn preprocess_context(site: &Site, page: &Page) -> minijinja::Value {
    context! {
        page => Value::from_serialize(&page.metadata),
        site => site_context(site),
        config => Value::from_serialize(&site.config.dynamic),
    }
}

/// Renders one page to a complete HTML document, without writing it —
/// `parallel.rs` owns the write since it also needs to create parent
/// directories behind the shared mutex.
pub(crate) fn render_page(
    site: &Site,
    page_id: PageId,
    env: &Environment<'static>,
    syntax_theme: &str,
) -> Result<(String, Vec<String>), RenderError> {
    let page = site.page(page_id);

    let preprocess_flag = page.metadata.get("preprocess").and_then(|v| v.as_bool());
    let source_rel = page
        .source_path
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let source = if preprocess::should_preprocess(&page.raw_source, preprocess_flag, &site.config, &source_rel) {
        preprocess::render(&page.raw_source, &preprocess_context(site, page))
            .map_err(|e| RenderError::new(page, RenderErrorKind::Preprocess, e.to_string()))?
    } else {
        page.raw_source.clone()
    };

    let parsed = markdown::render(&source, |target| xref::resolve(site, target))
        .map_err(|e| RenderError::new(page, RenderErrorKind::Parse, e.to_string()))?;

    let highlighted = crate::syntax::highlight_html(&parsed.html, syntax_theme)
        .map_err(|e| RenderError::new(page, RenderErrorKind::Parse, e.to_string()))?;

    let body = enhance(&highlighted, page.content_type.as_deref());

    let template_name = select_template(site, page);
    let template = env
        .get_template(&template_name)
        .map_err(|e| RenderError::from_minijinja(page, &template_name, &e))?;

    let view = build_page_view(site, page, body, parsed.toc.html.clone());
    let ctx = context! {
        page => Value::from_serialize(&view),
        site => site_context(site),
        config => Value::from_serialize(&site.config.dynamic),
        strict_mode => site.config.strict_mode,
        baseurl => site.config.baseurl.clone(),
    };

    let rendered = template
        .render(ctx)
        .map_err(|e| RenderError::from_minijinja(page, &template_name, &e))?;

    Ok((rendered, parsed.broken_refs))
}
