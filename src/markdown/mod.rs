// src/markdown/mod.rs
//
// C8 pipeline: preprocess -> extract cross-references -> extract
// directives -> base markdown parse -> heading anchors -> placeholder
// substitution. Grounded on the teacher's
// `content.rs::convert_content_with_highlighting`, which chains parse,
// anchor injection, and syntax highlighting the same way; generalized
// here to also splice in directives and cross-references via the
// placeholder-substitution technique `syntax.rs::highlight_html` uses
// for code blocks, rather than a second HTML/DOM pass.

pub(crate) mod directives;
pub(crate) mod preprocess;
pub(crate) mod toc;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::site::{ExtractedLink, LinkKind, Toc};
use crate::xref::Resolved;

#[derive(Error, Debug)]
pub(crate) enum MarkdownError {
    #[error("preprocessing failed: {0}")]
    Preprocess(#[from] preprocess::PreprocessError),
    #[error("markdown parsing failed: {0}")]
    Parse(String),
}

pub(crate) struct ParsedMarkdown {
    pub html: String,
    pub headings: Vec<(u8, String, String)>,
    pub toc: Toc,
    pub extracted_links: Vec<ExtractedLink>,
    pub broken_refs: Vec<String>,
}

static XREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<a\s+[^>]*href="([^"]*)""#).unwrap());

fn markdown_options() -> markdown::Options {
    markdown::Options {
        compile: markdown::CompileOptions {
            allow_dangerous_html: false,
            gfm_tagfilter: true,
            ..markdown::CompileOptions::gfm()
        },
        ..markdown::Options::gfm()
    }
}

fn to_base_html(source: &str) -> Result<String, MarkdownError> {
    markdown::to_html_with_options(source, &markdown_options()).map_err(MarkdownError::Parse)
}

/// Extracts `[[path]]`, `[[path|Label]]`, `[[id:foo]]`, and
/// `[[#heading]]` references, leaving inline tokens in their place so
/// the base parser treats them as ordinary text (§4.4, §4.8).
fn extract_xrefs(
    source: &str,
    mut resolve: impl FnMut(&str) -> Resolved,
    own_headings: &[(u8, String, String)],
) -> (String, HashMap<String, String>, Vec<String>) {
    let mut placeholders = HashMap::new();
    let mut broken = Vec::new();
    let mut counter = 0;

    let rewritten = XREF_RE
        .replace_all(source, |caps: &regex::Captures| {
            let raw = caps[1].to_string();
            let (target, label) = match raw.split_once('|') {
                Some((t, l)) => (t.trim().to_string(), Some(l.trim().to_string())),
                None => (raw.trim().to_string(), None),
            };

            let html = if let Some(heading_slug) = target.strip_prefix('#') {
                match own_headings.iter().find(|(_, _, anchor)| anchor == heading_slug) {
                    Some((_, text, anchor)) => format!(
                        "<a href=\"#{anchor}\">{}</a>",
                        label.unwrap_or_else(|| text.clone())
                    ),
                    None => {
                        broken.push(format!("#{heading_slug}"));
                        format!("<span class=\"broken-ref\">{raw}</span>")
                    }
                }
            } else {
                match resolve(&target) {
                    Resolved::Found { href, default_text } => format!(
                        "<a href=\"{href}\">{}</a>",
                        label.unwrap_or(default_text)
                    ),
                    Resolved::Broken { target } => {
                        broken.push(target.clone());
                        format!("<span class=\"broken-ref\">{raw}</span>")
                    }
                }
            };

            let placeholder = format!("BENGALXREF{counter}");
            counter += 1;
            placeholders.insert(placeholder.clone(), html);
            placeholder
        })
        .into_owned();

    (rewritten, placeholders, broken)
}

fn substitute_placeholders(mut html: String, placeholders: &HashMap<String, String>) -> String {
    for (key, value) in placeholders {
        let wrapped = format!("<p>{key}</p>");
        if html.contains(&wrapped) {
            html = html.replace(&wrapped, value);
        } else {
            html = html.replace(key, value);
        }
    }
    html
}

fn extract_links(html: &str) -> Vec<ExtractedLink> {
    LINK_RE
        .captures_iter(html)
        .map(|caps| {
            let href = caps[1].to_string();
            let kind = if href.starts_with("http://") || href.starts_with("https://") || href.starts_with("//") {
                LinkKind::External
            } else {
                LinkKind::Internal
            };
            ExtractedLink { href, kind }
        })
        .collect()
}

/// Runs the full body -> HTML pipeline for one page. `own_headings` is
/// empty on the first pass; `[[#heading]]` self-references that need a
/// second look are reported in `broken_refs` rather than retried, since
/// headings are only known after this same call completes (§4.4).
pub(crate) fn render(
    source: &str,
    resolve_xref: impl FnMut(&str) -> Resolved,
) -> Result<ParsedMarkdown, MarkdownError> {
    let (after_xref, xref_placeholders, broken_refs) = extract_xrefs(source, resolve_xref, &[]);
    let (after_directives, directive_placeholders) =
        directives::expand(&after_xref, |body| to_base_html(body).unwrap_or_default());

    let base_html = to_base_html(&after_directives)?;
    let mut html = substitute_placeholders(base_html, &directive_placeholders);
    html = substitute_placeholders(html, &xref_placeholders);

    let (html, headings) = toc::inject_anchors(&html);
    let tree = toc::build_tree(&headings);
    let toc_html = toc::render_html(&tree);
    let extracted_links = extract_links(&html);

    Ok(ParsedMarkdown {
        html,
        headings,
        toc: Toc {
            items: tree,
            html: toc_html,
        },
        extracted_links,
        broken_refs,
    })
}
