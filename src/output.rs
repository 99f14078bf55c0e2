// src/output.rs
//
// Filesystem writes. `write_output_file` now writes to a sibling temp
// file and renames into place (§3 invariant 5: "a crashed build never
// leaves a half-written output file"), generalized from the teacher's
// direct `fs::write`. Static-file copying keeps the teacher's
// mtime/size skip-check and root_static remapping.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::{config::Config, error::StaticError};

#[derive(Error, Debug)]
pub(crate) enum WriteError {
    #[error("I/O error writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Checks if a file should be copied by comparing size and mtime.
fn should_copy_file(source: &Path, dest: &Path) -> bool {
    let dest_meta = match fs::metadata(dest) {
        Ok(meta) => meta,
        Err(_) => return true,
    };
    let source_meta = match fs::metadata(source) {
        Ok(meta) => meta,
        Err(_) => return true,
    };
    if source_meta.len() != dest_meta.len() {
        return true;
    }
    match (source_meta.modified().ok(), dest_meta.modified().ok()) {
        (Some(src), Some(dst)) => src > dst,
        _ => true,
    }
}

/// Writes `content` to `output_path` atomically: write to `<path>.tmp`,
/// fsync not required for a static site build, then rename over the
/// final path so a reader never observes a partial file.
pub(crate) fn write_output_file(output_path: &Path, content: &str) -> Result<(), WriteError> {
    debug!("io::write → {:?} ({} bytes)", output_path, content.len());
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|e| WriteError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let tmp_path = output_path.with_extension(format!(
        "{}.tmp",
        output_path.extension().and_then(|e| e.to_str()).unwrap_or("out")
    ));
    fs::write(&tmp_path, content).map_err(|e| WriteError::Io {
        path: tmp_path.clone(),
        source: e,
    })?;
    fs::rename(&tmp_path, output_path).map_err(|e| WriteError::Io {
        path: output_path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Copies a single static asset, skipping the write when the
/// destination is already up to date (mtime/size match).
pub(crate) fn copy_file_if_changed(source: &Path, dest: &Path) -> Result<bool, StaticError> {
    if !should_copy_file(source, dest) {
        debug!("static::check ✓ {:?}", source);
        return Ok(false);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| StaticError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::copy(source, dest).map_err(|e| StaticError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;
    debug!("static::copy {:?} → {:?}", source, dest);
    Ok(true)
}

/// Walks `assets_dir`, copying every file not claimed by asset
/// processing (CSS entries/modules, handled separately by `assets.rs`)
/// into `output_dir`, then copies `config.root_static` remaps onto the
/// output root.
pub(crate) fn copy_static_files(config: &Config, root: &Path, claimed: &[PathBuf]) -> Result<usize, StaticError> {
    let assets_dir = config.assets_dir_path(root);
    let output_dir = config.output_dir_path(root);
    let mut copied = 0;

    if !assets_dir.exists() {
        debug!("static::scan no directory found");
    } else {
        for entry in WalkDir::new(&assets_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let source_path = entry.path();
            if claimed.iter().any(|c| c == source_path) {
                continue;
            }
            let relative = source_path.strip_prefix(&assets_dir).map_err(|e| StaticError::Io {
                path: source_path.to_path_buf(),
                source: std::io::Error::other(e),
            })?;
            let dest_path = output_dir.join(relative);
            if copy_file_if_changed(source_path, &dest_path)? {
                copied += 1;
            }
        }
    }

    copied += copy_root_static_files(config, root)?;
    Ok(copied)
}

fn copy_root_static_files(config: &Config, root: &Path) -> Result<usize, StaticError> {
    if config.root_static.is_empty() {
        return Ok(0);
    }
    let assets_dir = config.assets_dir_path(root);
    let output_dir = config.output_dir_path(root);
    let mut copied = 0;

    for (output_filename, source_relative) in &config.root_static {
        let source_path = assets_dir.join(source_relative);
        if !source_path.exists() {
            return Err(StaticError::Io {
                path: source_path.clone(),
                source: std::io::Error::new(ErrorKind::NotFound, "root_static source not found"),
            });
        }
        let dest_path = output_dir.join(output_filename);
        if copy_file_if_changed(&source_path, &dest_path)? {
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_output_file_replaces_partial_tmp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub/page.html");
        write_output_file(&path, "<html></html>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
        assert!(!path.with_extension("html.tmp").exists());
    }

    #[test]
    fn copy_file_if_changed_skips_identical() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.css");
        let dst = dir.path().join("b.css");
        fs::write(&src, "body{}").unwrap();
        assert!(copy_file_if_changed(&src, &dst).unwrap());
        assert!(!copy_file_if_changed(&src, &dst).unwrap());
    }

    #[test]
    fn copy_static_files_applies_root_static_remap() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.assets_dir = "assets".into();
        config.output_dir = "public".into();
        config
            .root_static
            .insert("favicon.ico".into(), "favicon.ico".into());
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/favicon.ico"), "ico").unwrap();

        let copied = copy_static_files(&config, dir.path(), &[]).unwrap();
        assert!(copied >= 1);
        assert!(dir.path().join("public/favicon.ico").exists());
    }
}
