// src/markdown/toc.rs
//
// Heading-anchor injection and TOC construction (§4.8, §3). A single
// regex pass scans rendered `<h1>`-`<h6>` tags, assigns slugified,
// collision-suffixed `id` attributes, and appends a `headerlink` anchor
// — grounded on the teacher's regex-driven post-processing style in
// `syntax.rs`, rather than a second DOM pass.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use slug::slugify;

use crate::site::TocEntry;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<h([1-6])(?P<attrs>[^>]*)>(?P<inner>.*?)</h[1-6]>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Rewrites every heading in `html` to carry a unique `id`, appends a
/// same-page anchor link, and returns the rewritten HTML plus the flat
/// list of `(level, text, anchor)` headings in document order.
pub(crate) fn inject_anchors(html: &str) -> (String, Vec<(u8, String, String)>) {
    let mut seen: HashMap<String, u32> = HashMap::new();
    let mut headings = Vec::new();

    let rewritten = HEADING_RE.replace_all(html, |caps: &regex::Captures| {
        let level: u8 = caps[1].parse().unwrap_or(1);
        let attrs = &caps["attrs"];
        let inner = &caps["inner"];
        let text = TAG_RE.replace_all(inner, "").trim().to_string();

        let base = if text.is_empty() {
            "section".to_string()
        } else {
            slugify(&text)
        };
        let id = match seen.get(&base) {
            None => {
                seen.insert(base.clone(), 1);
                base.clone()
            }
            Some(&n) => {
                let mut candidate = format!("{base}-{}", n + 1);
                let mut bump = n + 1;
                while seen.contains_key(&candidate) {
                    bump += 1;
                    candidate = format!("{base}-{bump}");
                }
                seen.insert(base.clone(), bump);
                seen.insert(candidate.clone(), 1);
                candidate
            }
        };

        headings.push((level, text, id.clone()));

        format!(
            "<h{level}{attrs} id=\"{id}\">{inner}<a class=\"headerlink\" href=\"#{id}\" aria-label=\"Permalink\">¶</a></h{level}>"
        )
    });

    (rewritten.into_owned(), headings)
}

/// Builds a nested TOC tree from a flat heading list (§3 Toc). Headings
/// deeper than their predecessor nest under it; shallower or equal
/// headings pop back up the stack. Computed explicitly per page rather
/// than lazily memoized, per Open Question decision (§5).
pub(crate) fn build_tree(headings: &[(u8, String, String)]) -> Vec<TocEntry> {
    let mut root: Vec<TocEntry> = Vec::new();
    let mut stack: Vec<(u8, usize)> = Vec::new(); // (level, index path unused; we nest via recursion helper)

    for (level, text, anchor) in headings {
        let entry = TocEntry {
            level: *level,
            text: text.clone(),
            anchor: anchor.clone(),
            children: Vec::new(),
        };
        insert_entry(&mut root, &mut stack, *level, entry);
    }
    root
}

fn insert_entry(root: &mut Vec<TocEntry>, stack: &mut Vec<(u8, usize)>, level: u8, entry: TocEntry) {
    while let Some(&(top_level, _)) = stack.last() {
        if top_level >= level {
            stack.pop();
        } else {
            break;
        }
    }

    if stack.is_empty() {
        root.push(entry);
        stack.push((level, root.len() - 1));
        return;
    }

    let mut node = root;
    for &(_, idx) in stack.iter() {
        node = &mut node[idx].children;
    }
    node.push(entry);
    stack.push((level, node.len() - 1));
}

pub(crate) fn render_html(entries: &[TocEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let mut out = String::from("<ul class=\"toc\">");
    for entry in entries {
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            entry.anchor, entry.text
        ));
        if !entry.children.is_empty() {
            out.push_str(&render_html(&entry.children));
        }
        out.push_str("</li>");
    }
    out.push_str("</ul>");
    out
}
