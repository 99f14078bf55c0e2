// src/markdown/directives.rs
//
// Directive plugin layer (§4.8): a fenced block opened by `` ```{name} ``
// (three or four backticks, four allowing nested three-backtick fences)
// is extracted, its body parsed recursively as markdown, and replaced
// with a styled HTML container. Extraction is done by manual line
// scanning rather than a single regex, the same architectural move the
// teacher makes in `syntax.rs::highlight_html` for locating `<pre><code>`
// blocks without a full DOM parser.

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub(crate) enum DirectiveError {
    #[error("unclosed directive fence for {name:?} starting at line {line}")]
    Unclosed { name: String, line: usize },
}

const KNOWN_ADMONITIONS: &[&str] = &[
    "note", "tip", "warning", "danger", "error", "info", "example", "success", "caution",
];

struct RawDirective {
    name: String,
    title: String,
    options: HashMap<String, String>,
    body: String,
}

/// Extracts every top-level directive fence from `source`, replacing each
/// with a standalone placeholder paragraph (`BENGAL_DIRECTIVE_<n>` on its
/// own line) so the base markdown parser leaves it untouched. Returns the
/// rewritten source plus a table of placeholder → rendered HTML, which
/// the caller substitutes into the parser's output.
///
/// `render_body` converts an inner markdown fragment to HTML; passed in
/// so this module doesn't need to depend on the concrete markdown crate
/// options in use for the outer document.
pub(crate) fn expand(
    source: &str,
    mut render_body: impl FnMut(&str) -> String,
) -> (String, HashMap<String, String>) {
    let lines: Vec<&str> = source.lines().collect();
    let mut out = String::new();
    let mut placeholders = HashMap::new();
    let mut i = 0;
    let mut counter = 0;

    while i < lines.len() {
        let line = lines[i];
        if let Some((fence_len, name, title)) = parse_open_fence(line) {
            match find_close(&lines, i + 1, fence_len) {
                Some((options, body_lines, close_idx)) => {
                    let raw = RawDirective {
                        name: name.clone(),
                        title,
                        options,
                        body: body_lines.join("\n"),
                    };
                    let html = render_directive(&raw, &mut render_body);
                    let placeholder = format!("BENGAL_DIRECTIVE_{counter}");
                    counter += 1;
                    placeholders.insert(placeholder.clone(), html);
                    out.push_str("\n\n");
                    out.push_str(&placeholder);
                    out.push_str("\n\n");
                    i = close_idx + 1;
                    continue;
                }
                None => {
                    warn!("directive::unclosed {name:?} at line {}", i + 1);
                    out.push_str(line);
                    out.push('\n');
                    i += 1;
                    continue;
                }
            }
        }
        out.push_str(line);
        out.push('\n');
        i += 1;
    }

    (out, placeholders)
}

/// Matches an opening fence line: 3-4 backticks, `{name}`, optional title.
fn parse_open_fence(line: &str) -> Option<(usize, String, String)> {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    if indent > 3 {
        return None;
    }
    let backtick_len = trimmed.chars().take_while(|&c| c == '`').count();
    if !(3..=4).contains(&backtick_len) {
        return None;
    }
    let rest = &trimmed[backtick_len..];
    let rest = rest.strip_prefix('{')?;
    let close = rest.find('}')?;
    let name = rest[..close].trim().to_string();
    if name.is_empty() {
        return None;
    }
    let title = rest[close + 1..].trim().to_string();
    Some((backtick_len, name, title))
}

fn find_close(
    lines: &[&str],
    start: usize,
    fence_len: usize,
) -> Option<(HashMap<String, String>, Vec<String>, usize)> {
    let closing = "`".repeat(fence_len);
    let mut idx = start;
    let mut options = HashMap::new();

    // Option lines: `:key: value`, until the first blank line.
    while idx < lines.len() {
        let line = lines[idx];
        let trimmed = line.trim();
        if trimmed.is_empty() {
            idx += 1;
            break;
        }
        if let Some(rest) = trimmed.strip_prefix(':') {
            if let Some(colon) = rest.find(':') {
                let key = rest[..colon].trim().to_string();
                let value = rest[colon + 1..].trim().to_string();
                options.insert(key, value);
                idx += 1;
                continue;
            }
        }
        break;
    }

    let body_start = idx;
    while idx < lines.len() {
        if lines[idx].trim() == closing {
            let body = lines[body_start..idx].iter().map(|s| s.to_string()).collect();
            return Some((options, body, idx));
        }
        idx += 1;
    }
    None
}

fn render_directive(raw: &RawDirective, render_body: &mut impl FnMut(&str) -> String) -> String {
    match raw.name.as_str() {
        "tabs" | "code-tabs" => render_tabs(raw, render_body),
        "dropdown" | "details" => render_dropdown(raw, render_body),
        name if KNOWN_ADMONITIONS.contains(&name) => render_admonition(raw, render_body),
        other => {
            warn!("directive::unknown {other:?}, falling back to styled container");
            format!(
                "<div class=\"directive directive-unknown\" data-directive=\"{}\">{}</div>",
                html_escape_attr(other),
                render_body(&raw.body)
            )
        }
    }
}

fn render_admonition(raw: &RawDirective, render_body: &mut impl FnMut(&str) -> String) -> String {
    let title = if raw.title.is_empty() {
        capitalize(&raw.name)
    } else {
        raw.title.clone()
    };
    format!(
        "<div class=\"admonition admonition-{}\"><p class=\"admonition-title\">{}</p>{}</div>",
        raw.name,
        title,
        render_body(&raw.body)
    )
}

fn render_dropdown(raw: &RawDirective, render_body: &mut impl FnMut(&str) -> String) -> String {
    let title = if raw.title.is_empty() {
        "Details".to_string()
    } else {
        raw.title.clone()
    };
    let open = if raw.options.get("open").map(String::as_str) == Some("true") {
        " open"
    } else {
        ""
    };
    format!(
        "<details class=\"dropdown\"{open}><summary>{title}</summary>{}</details>",
        render_body(&raw.body)
    )
}

/// Tab bodies are delimited by `### Tab: <name>` markers (§4.8).
fn render_tabs(raw: &RawDirective, render_body: &mut impl FnMut(&str) -> String) -> String {
    let mut tabs: Vec<(String, String)> = Vec::new();
    let mut current_name: Option<String> = None;
    let mut current_body = String::new();

    for line in raw.body.lines() {
        if let Some(name) = line.trim().strip_prefix("### Tab:") {
            if let Some(prev) = current_name.take() {
                tabs.push((prev, std::mem::take(&mut current_body)));
            }
            current_name = Some(name.trim().to_string());
        } else if current_name.is_some() {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }
    if let Some(prev) = current_name {
        tabs.push((prev, current_body));
    }

    let mut nav = String::new();
    let mut panels = String::new();
    for (i, (name, body)) in tabs.iter().enumerate() {
        let active = if i == 0 { " active" } else { "" };
        nav.push_str(&format!(
            "<button class=\"tab-label{active}\" data-tab=\"{i}\">{name}</button>"
        ));
        panels.push_str(&format!(
            "<div class=\"tab-panel{active}\" data-tab=\"{i}\">{}</div>",
            render_body(body)
        ));
    }
    let class = if raw.name == "code-tabs" {
        "code-tabs"
    } else {
        "tabs"
    };
    format!("<div class=\"{class}\"><div class=\"tab-nav\">{nav}</div>{panels}</div>")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn html_escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}
