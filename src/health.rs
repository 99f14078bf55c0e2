// src/health.rs
//
// C15: validator registry with profile gating (§4.15). No direct
// teacher analog (marie-ssg has no health-check subcommand); shaped
// after the teacher's `RunError`/severity style and `build.rs`'s
// `BuildStats` struct for what a validator inspects.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::config::HealthProfile;
use crate::site::{PageId, Site};

#[derive(Error, Debug)]
pub(crate) enum HealthError {
    #[error("{0} health finding(s) at error severity in strict mode")]
    StrictFailure(usize),
    #[error("{0} page(s) failed to render in strict mode")]
    RenderFailure(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub(crate) struct Finding {
    pub severity: Severity,
    pub category: &'static str,
    pub message: String,
    pub suggestion: Option<String>,
}

impl Finding {
    fn new(severity: Severity, category: &'static str, message: impl Into<String>) -> Self {
        Finding {
            severity,
            category,
            message: message.into(),
            suggestion: None,
        }
    }

    fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Everything a validator might need, assembled by the orchestrator
/// after phases 10-13 complete — validators never re-derive data the
/// build already computed.
pub(crate) struct HealthContext<'a> {
    pub site: &'a Site,
    pub output_root: &'a Path,
    pub broken_refs: &'a [String],
    pub directive_counts: &'a HashMap<PageId, usize>,
    pub cache_save_ok: bool,
    pub performance_budget_ms: Option<u128>,
    pub build_duration_ms: u128,
}

fn profile_rank(profile: HealthProfile) -> u8 {
    match profile {
        HealthProfile::Writer => 0,
        HealthProfile::ThemeDev => 1,
        HealthProfile::Dev => 2,
    }
}

fn check_configuration(ctx: &HealthContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    if ctx.site.config.title.is_empty() {
        findings.push(
            Finding::new(Severity::Info, "configuration", "site title is empty")
                .with_suggestion("set `title` in bengal.toml"),
        );
    }
    if !ctx.site.config.baseurl.ends_with('/') {
        findings.push(Finding::new(
            Severity::Warning,
            "configuration",
            format!("baseurl {:?} does not end with a slash", ctx.site.config.baseurl),
        ));
    }
    findings
}

fn check_output_presence(ctx: &HealthContext) -> Vec<Finding> {
    if !ctx.output_root.exists() {
        return vec![Finding::new(
            Severity::Error,
            "output",
            format!("output directory {:?} does not exist", ctx.output_root),
        )];
    }
    match ctx.output_root.read_dir() {
        Ok(mut entries) if entries.next().is_none() => vec![Finding::new(
            Severity::Error,
            "output",
            "output directory is empty",
        )],
        Err(e) => vec![Finding::new(
            Severity::Error,
            "output",
            format!("could not read output directory: {e}"),
        )],
        _ => Vec::new(),
    }
}

fn check_rendering(ctx: &HealthContext) -> Vec<Finding> {
    let expected = ctx.site.pages.iter().filter(|p| !p.draft).count();
    let rendered = ctx
        .site
        .pages
        .iter()
        .filter(|p| !p.draft && p.rendered_html.is_some())
        .count();
    if rendered < expected {
        return vec![Finding::new(
            Severity::Error,
            "rendering",
            format!("{rendered}/{expected} non-draft pages rendered"),
        )];
    }
    Vec::new()
}

fn check_directives(ctx: &HealthContext) -> Vec<Finding> {
    ctx.directive_counts
        .iter()
        .filter(|(_, &count)| count > 10)
        .map(|(page_id, count)| {
            Finding::new(
                Severity::Warning,
                "directives",
                format!("page {:?} has {count} directives (>10)", ctx.site.page(*page_id).key()),
            )
        })
        .collect()
}

fn check_navigation(ctx: &HealthContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (name, entries) in &ctx.site.menus.menus {
        if entries.is_empty() {
            findings.push(Finding::new(
                Severity::Warning,
                "navigation",
                format!("menu {name:?} has no entries"),
            ));
        }
    }
    findings
}

fn check_links(ctx: &HealthContext) -> Vec<Finding> {
    ctx.broken_refs
        .iter()
        .map(|target| {
            Finding::new(
                Severity::Warning,
                "links",
                format!("broken reference: {target:?}"),
            )
        })
        .collect()
}

fn check_taxonomies(ctx: &HealthContext) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (kind, terms) in &ctx.site.taxonomies.kinds {
        for term in terms.values() {
            if term.pages.is_empty() {
                findings.push(Finding::new(
                    Severity::Info,
                    "taxonomies",
                    format!("orphan term {:?} in taxonomy {kind:?}", term.display_name),
                ));
            }
        }
    }
    findings
}

fn check_cache_integrity(ctx: &HealthContext) -> Vec<Finding> {
    if ctx.cache_save_ok {
        Vec::new()
    } else {
        vec![Finding::new(
            Severity::Error,
            "cache",
            "incremental cache failed to save",
        )]
    }
}

fn check_performance_budget(ctx: &HealthContext) -> Vec<Finding> {
    match ctx.performance_budget_ms {
        Some(budget) if ctx.build_duration_ms > budget => vec![Finding::new(
            Severity::Warning,
            "performance",
            format!(
                "build took {}ms, over the {}ms budget",
                ctx.build_duration_ms, budget
            ),
        )],
        _ => Vec::new(),
    }
}

type ValidatorFn = fn(&HealthContext) -> Vec<Finding>;

const VALIDATORS: &[(&str, ValidatorFn, u8)] = &[
    ("configuration", check_configuration, 0),
    ("output_presence", check_output_presence, 0),
    ("rendering", check_rendering, 0),
    ("links", check_links, 0),
    ("directives", check_directives, 1),
    ("navigation", check_navigation, 1),
    ("taxonomies", check_taxonomies, 2),
    ("cache_integrity", check_cache_integrity, 2),
    ("performance_budget", check_performance_budget, 2),
];

/// Runs every validator whose minimum profile rank is at or below
/// `profile`'s rank — the table in §4.15 is cumulative, not disjoint.
pub(crate) fn run(ctx: &HealthContext, profile: HealthProfile) -> Vec<Finding> {
    let rank = profile_rank(profile);
    let mut findings = Vec::new();
    for (name, validator, min_rank) in VALIDATORS {
        if *min_rank > rank {
            continue;
        }
        let results = validator(ctx);
        if !results.is_empty() {
            warn!("health::{name} {} finding(s)", results.len());
        }
        findings.extend(results);
    }
    findings
}

pub(crate) fn enforce_strict(findings: &[Finding], strict: bool) -> Result<(), HealthError> {
    let error_count = findings.iter().filter(|f| f.severity == Severity::Error).count();
    if strict && error_count > 0 {
        return Err(HealthError::StrictFailure(error_count));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::site::Site;
    use tempfile::tempdir;

    fn context<'a>(site: &'a Site, output_root: &'a Path, broken_refs: &'a [String], counts: &'a HashMap<PageId, usize>) -> HealthContext<'a> {
        HealthContext {
            site,
            output_root,
            broken_refs,
            directive_counts: counts,
            cache_save_ok: true,
            performance_budget_ms: None,
            build_duration_ms: 0,
        }
    }

    #[test]
    fn missing_output_dir_is_an_error() {
        let site = Site::new(Config::default());
        let missing = Path::new("/nonexistent/bengal/output");
        let broken = Vec::new();
        let counts = HashMap::new();
        let ctx = context(&site, missing, &broken, &counts);
        let findings = check_output_presence(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
    }

    #[test]
    fn writer_profile_skips_taxonomy_validator() {
        let site = Site::new(Config::default());
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "x").unwrap();
        let broken = Vec::new();
        let counts = HashMap::new();
        let ctx = context(&site, dir.path(), &broken, &counts);
        let findings = run(&ctx, HealthProfile::Writer);
        assert!(!findings.iter().any(|f| f.category == "taxonomies"));
    }

    #[test]
    fn dev_profile_runs_taxonomy_validator() {
        let mut site = Site::new(Config::default());
        site.taxonomies.kinds.entry("tags".into()).or_default();
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "x").unwrap();
        let broken = Vec::new();
        let counts = HashMap::new();
        let ctx = context(&site, dir.path(), &broken, &counts);
        let findings = run(&ctx, HealthProfile::Dev);
        assert!(findings.iter().any(|f| f.category == "cache"
            || f.category == "performance"
            || f.category == "configuration"));
    }

    #[test]
    fn strict_mode_errors_on_error_severity() {
        let findings = vec![Finding::new(Severity::Error, "output", "missing")];
        assert!(enforce_strict(&findings, true).is_err());
        assert!(enforce_strict(&findings, false).is_ok());
    }
}
