// src/postprocess/redirects.rs
//
// Grounded on the teacher's `redirect.rs::generate_redirect_html`/
// `get_redirect_output_path`, reworked from `config.site.domain` to
// `config.baseurl` and from scanning a flat content list to reading
// each page's `aliases` frontmatter (§4.14).

use std::path::{Path, PathBuf};

use crate::error::StaticError;
use crate::site::{meta_str_list, Page, Site};

fn generate_redirect_html(target_path: &str, base_url: &str) -> String {
    let canonical_url = format!("{}{}", base_url.trim_end_matches('/'), target_path);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta http-equiv="refresh" content="0; url={target_path}">
  <link rel="canonical" href="{canonical_url}">
  <title>Redirecting...</title>
</head>
<body>
  <p>Redirecting to <a href="{target_path}">{target_path}</a>...</p>
</body>
</html>
"#
    )
}

fn alias_output_path(output_root: &Path, alias: &str) -> PathBuf {
    let path = alias.trim_start_matches('/');
    let file_path = if alias.ends_with('/') {
        format!("{path}index.html")
    } else if alias.ends_with(".html") {
        path.to_string()
    } else {
        format!("{path}/index.html")
    };
    output_root.join(file_path)
}

fn aliases_for(page: &Page) -> Vec<String> {
    meta_str_list(&page.metadata, "aliases")
}

/// Writes one redirect stub per `aliases:` entry across every page;
/// returns the count written.
pub(crate) fn generate(site: &Site, output_root: &Path) -> Result<usize, StaticError> {
    let base_url = &site.config.baseurl;
    let mut written = 0;

    for page in &site.pages {
        let Some(target) = &page.output_url else { continue };
        for alias in aliases_for(page) {
            let html = generate_redirect_html(target, base_url);
            let dest = alias_output_path(output_root, &alias);
            crate::output::write_output_file(&dest, &html).map_err(|e| StaticError::Io {
                path: dest.clone(),
                source: std::io::Error::other(e),
            })?;
            written += 1;
        }
    }

    Ok(written)
}
