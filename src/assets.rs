// src/assets.rs
//
// C13: classifies everything under `assets_dir` into CSS entries, CSS
// modules, and plain static files, then fingerprints and emits each
// (§4.13). Supersedes the teacher's `asset_hash.rs` flat css/js scan;
// keeps its BLAKE3 8-hex-prefix fingerprint scheme and
// `hashed_filename` shape, generalized to resolve `@import` chains
// before hashing a CSS entry rather than hashing each file standalone.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::StaticError;
use crate::site::{Asset, AssetClass, Site};
use crate::template::AssetManifest;

static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@import\s+(?:url\()?["']?([^"')]+)["']?\)?\s*;?"#).unwrap());

const FINGERPRINT_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "gif", "svg", "webp", "woff", "woff2", "ico", "js"];

pub(crate) struct AssetOutcome {
    pub manifest: AssetManifest,
    /// Source paths already handled here; `output::copy_static_files`
    /// must skip these so they aren't written twice.
    pub claimed: Vec<PathBuf>,
}

fn compute_fingerprint(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex()[..8].to_string()
}

fn hashed_filename(original: &str, hash: &str) -> String {
    match original.rfind('.') {
        Some(dot) => format!("{}.{}{}", &original[..dot], hash, &original[dot..]),
        None => format!("{original}.{hash}"),
    }
}

fn is_hashed_filename(filename: &str) -> bool {
    let Some((name_with_hash, ext)) = filename.rsplit_once('.') else { return false };
    if !FINGERPRINT_EXTENSIONS.contains(&ext) && ext != "css" {
        return false;
    }
    let Some((_, potential_hash)) = name_with_hash.rsplit_once('.') else { return false };
    potential_hash.len() == 8 && potential_hash.chars().all(|c| c.is_ascii_hexdigit())
}

/// Removes previously emitted fingerprinted files before a rebuild so a
/// renamed or deleted asset doesn't leave its old hashed copy behind
/// (teacher's `asset_hash.rs::cleanup_old_hashed_files`).
fn cleanup_old_hashed_files(output_dir: &Path) -> Result<usize, StaticError> {
    if !output_dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in WalkDir::new(output_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            if is_hashed_filename(filename) {
                debug!("assets::cleanup {:?}", path);
                fs::remove_file(path).map_err(|e| StaticError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                removed += 1;
            }
        }
    }
    Ok(removed)
}

fn resolve_import_targets(css_path: &Path, content: &str) -> Vec<PathBuf> {
    let base_dir = css_path.parent().unwrap_or_else(|| Path::new("."));
    IMPORT_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let target = caps[1].trim();
            if target.starts_with("http://") || target.starts_with("https://") || target.starts_with("//") {
                return None;
            }
            let import_path = base_dir.join(target);
            import_path.exists().then_some(import_path)
        })
        .collect()
}

/// Depth-first concatenation of an entry's import graph: each imported
/// module's flattened content is spliced in where its `@import`
/// statement appeared, and `seen` prevents re-visiting a module twice
/// (diamond imports) or looping on a cycle. Returns the flattened CSS
/// plus every file path touched, so a change to any import invalidates
/// the entry's cache key (§4.12 fanout).
fn flatten_entry(path: &Path, seen: &mut HashSet<PathBuf>) -> Result<(String, Vec<PathBuf>), StaticError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !seen.insert(canonical) {
        return Ok((String::new(), Vec::new()));
    }

    let content = fs::read_to_string(path).map_err(|e| StaticError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut touched = vec![path.to_path_buf()];
    let mut out = String::with_capacity(content.len());
    let mut last_end = 0;

    for caps in IMPORT_RE.captures_iter(&content) {
        let whole = caps.get(0).unwrap();
        let target = caps[1].trim();
        out.push_str(&content[last_end..whole.start()]);
        last_end = whole.end();

        if target.starts_with("http://") || target.starts_with("https://") || target.starts_with("//") {
            out.push_str(&content[whole.start()..whole.end()]);
            continue;
        }

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let import_path = base_dir.join(target);
        if import_path.exists() {
            let (imported_css, imported_touched) = flatten_entry(&import_path, seen)?;
            out.push_str(&imported_css);
            touched.extend(imported_touched);
        } else {
            debug!("assets::missing_import {:?}", import_path);
        }
    }
    out.push_str(&content[last_end..]);

    Ok((out, touched))
}

fn fingerprinted_css_path(relative: &Path, fingerprint: &str) -> PathBuf {
    let stem = relative.file_stem().and_then(|s| s.to_str()).unwrap_or("style");
    let parent = relative.parent().unwrap_or_else(|| Path::new(""));
    parent.join("css").join(format!("{stem}.{fingerprint}.css"))
}

/// Classifies and processes every file under `assets_dir` (§4.13).
/// `style.css`, or any CSS file nothing else imports, is an entry;
/// every CSS file that is imported somewhere is a module and gets no
/// standalone output of its own. Everything else is a plain static
/// file, fingerprinted when its extension is one a browser would want
/// cache-busted. Stale fingerprinted output from a previous build is
/// swept first so renamed/removed assets don't leave orphans behind.
pub(crate) fn process(site: &mut Site, root: &Path) -> Result<AssetOutcome, StaticError> {
    let assets_dir = site.config.assets_dir_path(root);
    let output_dir = site.config.output_dir_path(root);
    let mut manifest = AssetManifest::new();
    let mut claimed = Vec::new();
    let mut assets = Vec::new();

    cleanup_old_hashed_files(&output_dir)?;

    if !assets_dir.exists() {
        site.assets = assets;
        return Ok(AssetOutcome { manifest, claimed });
    }

    let css_files: Vec<PathBuf> = WalkDir::new(&assets_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("css"))
        .collect();

    let mut imported: HashSet<PathBuf> = HashSet::new();
    for css in &css_files {
        let Ok(content) = fs::read_to_string(css) else { continue };
        for target in resolve_import_targets(css, &content) {
            imported.insert(target.canonicalize().unwrap_or(target));
        }
    }

    // A file literally named `style.css` is always an entry point (§4.13);
    // any other CSS file that nothing imports is treated as one too, so an
    // unreferenced stylesheet still gets processed rather than silently
    // dropped.
    let is_entry = |p: &Path| {
        p.file_name().and_then(|n| n.to_str()) == Some("style.css")
            || !imported.contains(&p.canonicalize().unwrap_or_else(|_| p.to_path_buf()))
    };
    let entries: Vec<&PathBuf> = css_files.iter().filter(|p| is_entry(p)).collect();
    let mut module_count = 0;

    for source_path in &entries {
        let relative = source_path.strip_prefix(&assets_dir).unwrap_or(source_path).to_path_buf();
        let mut seen = HashSet::new();
        let (flattened, touched) = flatten_entry(source_path, &mut seen)?;
        let fingerprint = compute_fingerprint(flattened.as_bytes());
        let output_rel = fingerprinted_css_path(&relative, &fingerprint);
        let dest = output_dir.join(&output_rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| StaticError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(&dest, &flattened).map_err(|e| StaticError::Io {
            path: dest.clone(),
            source: e,
        })?;

        manifest.insert(
            relative.to_string_lossy().replace('\\', "/"),
            output_rel.to_string_lossy().replace('\\', "/"),
        );
        claimed.push((*source_path).clone());

        for touched_path in &touched {
            if *touched_path != **source_path {
                module_count += 1;
                claimed.push(touched_path.clone());
                assets.push(Asset {
                    source_path: touched_path.clone(),
                    class: AssetClass::CssModule,
                    fingerprint: None,
                    output_path: None,
                });
            }
        }

        assets.push(Asset {
            source_path: (*source_path).clone(),
            class: AssetClass::CssEntry,
            fingerprint: Some(fingerprint),
            output_path: Some(output_rel),
        });
    }

    if !entries.is_empty() {
        info!("assets::css {} entr(y/ies), {module_count} module(s)", entries.len());
    }

    let mut fingerprinted_statics = 0;
    for walk_entry in WalkDir::new(&assets_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let source_path = walk_entry.path().to_path_buf();
        if claimed.contains(&source_path) {
            continue;
        }
        let ext = source_path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext == "css" || !FINGERPRINT_EXTENSIONS.contains(&ext) {
            continue;
        }

        let relative = source_path.strip_prefix(&assets_dir).unwrap_or(&source_path).to_path_buf();
        let bytes = fs::read(&source_path).map_err(|e| StaticError::Io {
            path: source_path.clone(),
            source: e,
        })?;
        let fingerprint = compute_fingerprint(&bytes);
        let original_name = source_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let hashed_name = hashed_filename(original_name, &fingerprint);
        let output_rel = relative.parent().map(|p| p.join(&hashed_name)).unwrap_or_else(|| PathBuf::from(&hashed_name));
        let dest = output_dir.join(&output_rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| StaticError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::copy(&source_path, &dest).map_err(|e| StaticError::Io {
            path: dest.clone(),
            source: e,
        })?;

        manifest.insert(
            relative.to_string_lossy().replace('\\', "/"),
            output_rel.to_string_lossy().replace('\\', "/"),
        );
        assets.push(Asset {
            source_path: source_path.clone(),
            class: AssetClass::Static,
            fingerprint: Some(fingerprint),
            output_path: Some(output_rel),
        });
        claimed.push(source_path);
        fingerprinted_statics += 1;
    }

    if fingerprinted_statics > 0 {
        info!("assets::static {fingerprinted_statics} fingerprinted file(s)");
    }

    site.assets = assets;
    Ok(AssetOutcome { manifest, claimed })
}
