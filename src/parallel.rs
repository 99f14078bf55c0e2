// src/parallel.rs
//
// C11: fixed worker pool driving `render.rs` over the work-set,
// grounded on the teacher's `files.into_par_iter()` shape in
// `build.rs::run_build`, generalized with a thread-local template
// environment per worker, a mutex-guarded directory-creation set
// shared across writers, a cooperative abort flag for strict-mode
// short-circuiting, and a sequential fallback for tiny work-sets
// (§4.11, §5). The markdown pipeline itself carries no per-call engine
// state worth caching (`markdown::render` is a pure function over
// process-wide static regexes), so only the template `Environment`
// needs a thread-local slot.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use minijinja::Environment;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::warn;

use crate::render::{self, RenderError, RenderErrorKind};
use crate::site::{PageId, Site};
use crate::template;

pub(crate) struct RenderOutcome {
    pub errors: Vec<RenderError>,
    pub broken_refs: Vec<String>,
}

struct Shared<'a> {
    site: &'a Site,
    output_root: &'a Path,
    template_dir: PathBuf,
    strict: bool,
    created_dirs: Mutex<HashSet<PathBuf>>,
    abort: AtomicBool,
}

/// Renders and writes every page in `page_ids`. `rendered_html` on each
/// page is filled in by a final sequential pass since workers only hold
/// a shared `&Site` (downstream consumers like the search index need
/// the rendered body, not just the write-to-disk side effect).
pub(crate) fn render_all(
    site: &mut Site,
    page_ids: &[PageId],
    output_root: &Path,
    strict: bool,
    parallel: bool,
) -> RenderOutcome {
    let template_dir = Path::new("themes").join(&site.config.theme).join("templates");
    let max_workers = site.config.max_workers.max(1);

    let shared = Shared {
        site: &*site,
        output_root,
        template_dir,
        strict,
        created_dirs: Mutex::new(HashSet::new()),
        abort: AtomicBool::new(false),
    };

    let results: Vec<(PageId, Result<(String, Vec<String>), RenderError>)> = if !parallel || page_ids.len() <= 1 {
        page_ids.iter().map(|&id| (id, render_one(&shared, id))).collect()
    } else {
        match ThreadPoolBuilder::new().num_threads(max_workers).build() {
            Ok(pool) => pool.install(|| {
                page_ids
                    .par_iter()
                    .map(|&id| {
                        if shared.abort.load(Ordering::Relaxed) {
                            return (id, Err(abort_error(shared.site, id)));
                        }
                        let outcome = render_one(&shared, id);
                        if outcome.is_err() && shared.strict {
                            shared.abort.store(true, Ordering::Relaxed);
                        }
                        (id, outcome)
                    })
                    .collect()
            }),
            Err(e) => {
                warn!("parallel::pool_build_failed {e}, falling back to sequential rendering");
                page_ids.iter().map(|&id| (id, render_one(&shared, id))).collect()
            }
        }
    };

    drop(shared);

    let mut errors = Vec::new();
    let mut broken_refs = Vec::new();
    let mut rendered: Vec<(PageId, String)> = Vec::new();

    for (id, outcome) in results {
        match outcome {
            Ok((html, refs)) => {
                broken_refs.extend(refs);
                rendered.push((id, html));
            }
            Err(e) => errors.push(e),
        }
    }

    for (id, html) in rendered {
        site.page_mut(id).rendered_html = Some(html);
    }

    RenderOutcome { errors, broken_refs }
}

fn abort_error(site: &Site, page_id: PageId) -> RenderError {
    RenderError {
        page: site.page(page_id).key(),
        kind: RenderErrorKind::Write,
        file: None,
        line: None,
        column: None,
        message: "skipped after an earlier fatal render error in strict mode".to_string(),
        template_chain: Vec::new(),
        suggestion: None,
    }
}

thread_local! {
    static ENV: RefCell<Option<Environment<'static>>> = const { RefCell::new(None) };
}

fn render_one(shared: &Shared, page_id: PageId) -> Result<(String, Vec<String>), RenderError> {
    let (html, broken_refs) = ENV.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(template::create_environment(&shared.template_dir, None, None, shared.strict));
        }
        let env = slot.as_ref().unwrap();
        render::render_page(shared.site, page_id, env, crate::syntax::DEFAULT_THEME)
    })?;

    let page = shared.site.page(page_id);
    let Some(rel) = &page.output_path else {
        return Err(RenderError {
            page: page.key(),
            kind: RenderErrorKind::Write,
            file: None,
            line: None,
            column: None,
            message: "page has no assigned output path".to_string(),
            template_chain: Vec::new(),
            suggestion: Some("output paths must be assigned before rendering (phase 8)".to_string()),
        });
    };
    let dest = shared.output_root.join(rel);
    ensure_parent_dir(shared, &dest);

    crate::output::write_output_file(&dest, &html).map_err(|e| RenderError {
        page: page.key(),
        kind: RenderErrorKind::Write,
        file: Some(dest.display().to_string()),
        line: None,
        column: None,
        message: e.to_string(),
        template_chain: Vec::new(),
        suggestion: None,
    })?;

    Ok((html, broken_refs))
}

fn ensure_parent_dir(shared: &Shared, dest: &Path) {
    let Some(parent) = dest.parent() else { return };
    let mut created = shared.created_dirs.lock().unwrap();
    if created.insert(parent.to_path_buf()) {
        drop(created);
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("parallel::mkdir_failed {:?}: {e}", parent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::site::Site;
    use tempfile::tempdir;

    #[test]
    fn empty_work_set_renders_nothing() {
        let dir = tempdir().unwrap();
        let mut site = Site::new(Config::default());
        let outcome = render_all(&mut site, &[], dir.path(), false, true);
        assert!(outcome.errors.is_empty());
        assert!(outcome.broken_refs.is_empty());
    }
}
