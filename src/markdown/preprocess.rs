// src/markdown/preprocess.rs
//
// Inline `{{ expr }}` substitution applied to the raw markdown body
// before parsing (§4.8), gated by `page.metadata.preprocess` and
// `config.preprocess_mode`. Reuses the `minijinja` engine already
// pulled in for C9 rather than hand-rolling a second template language.

use minijinja::Environment;
use thiserror::Error;

use crate::config::{Config, PreprocessMode};

#[derive(Error, Debug)]
pub(crate) enum PreprocessError {
    #[error("preprocessing failed: {0}")]
    Render(#[from] minijinja::Error),
}

/// Whether `source` should be preprocessed at all, combining the
/// page-level `preprocess` flag with `config.preprocess_mode` and the
/// `preprocessing.skip_patterns` glob list (§4.8, §6).
pub(crate) fn should_preprocess(
    source: &str,
    page_flag: Option<bool>,
    config: &Config,
    source_rel_path: &str,
) -> bool {
    if page_flag == Some(false) {
        return false;
    }
    match config.preprocess_mode {
        PreprocessMode::None => return false,
        PreprocessMode::All => {}
        PreprocessMode::Auto | PreprocessMode::Smart => {
            if !source.contains("{{") {
                return false;
            }
        }
    }
    for pattern in &config.preprocessing.skip_patterns {
        if glob_match(pattern, source_rel_path) {
            return false;
        }
    }
    true
}

/// Minimal glob matcher supporting a single trailing/leading `*` per
/// segment, enough for simple skip patterns like `drafts/*` or `*.draft.md`.
fn glob_match(pattern: &str, path: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        return path.starts_with(prefix);
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return path.ends_with(suffix);
    }
    pattern == path
}

/// Render `{{ expr }}` expressions in `source` against `{page, site,
/// config}`. Errors are non-fatal by default and fatal only in strict
/// mode (§7); the caller decides which.
pub(crate) fn render(source: &str, context: &minijinja::Value) -> Result<String, PreprocessError> {
    let mut env = Environment::new();
    env.set_syntax(minijinja::Syntax {
        block_start: "{%".into(),
        block_end: "%}".into(),
        variable_start: "{{".into(),
        variable_end: "}}".into(),
        comment_start: "{#".into(),
        comment_end: "#}".into(),
    })?;
    env.add_template("__preprocess__", source)?;
    let tmpl = env.get_template("__preprocess__")?;
    Ok(tmpl.render(context)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn substitutes_simple_expression() {
        let out = render("Hello {{ page.title }}!", &context! { page => context!{ title => "World" } }).unwrap();
        assert_eq!(out, "Hello World!");
    }

    #[test]
    fn skip_when_no_braces_in_auto_mode() {
        let config = Config::default();
        assert!(!should_preprocess("no substitution here", None, &config, "a.md"));
    }

    #[test]
    fn page_flag_false_disables_even_with_braces() {
        let config = Config::default();
        assert!(!should_preprocess("{{ x }}", Some(false), &config, "a.md"));
    }

    #[test]
    fn skip_pattern_disables() {
        let mut config = Config::default();
        config.preprocessing.skip_patterns.push("drafts/*".into());
        assert!(!should_preprocess("{{ x }}", None, &config, "drafts/a.md"));
    }
}
