// src/frontmatter.rs
//
// Splits a source file into (raw_body, metadata) per §4.2/C1. Generalizes
// the teacher's `content.rs::load_metadata`, which read a fixed sidecar
// `.meta.toml` file, into inline delimited front matter with three
// supported formats plus the no-frontmatter case.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub(crate) enum FrontmatterError {
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {format} front matter in {path:?}: {source}")]
    Toml {
        path: PathBuf,
        format: &'static str,
        #[source]
        source: toml::de::Error,
    },
    #[error("malformed YAML front matter in {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("malformed JSON front matter in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrontmatterFormat {
    Yaml,
    Toml,
    Json,
    None,
}

pub(crate) struct SplitContent {
    pub metadata: toml::value::Table,
    pub body: String,
    pub format: FrontmatterFormat,
}

/// Reserved metadata keys (§4.2); unknown keys pass through untouched.
pub(crate) const RESERVED_KEYS: &[&str] = &[
    "title",
    "date",
    "slug",
    "id",
    "weight",
    "draft",
    "type",
    "template",
    "layout",
    "tags",
    "categories",
    "menu",
    "cascade",
    "aliases",
    "summary",
    "description",
    "toc",
    "preprocess",
    "permalink",
    "url",
    "redirect_from",
    "_generated",
    "_virtual",
];

pub(crate) fn read_file(path: &Path) -> Result<String, FrontmatterError> {
    debug!("frontmatter::read ← {:?}", path);
    std::fs::read_to_string(path).map_err(|e| FrontmatterError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Split `source` into a metadata table and the raw markdown body. The
/// file may open with `---` (YAML), `+++` (TOML), a bare `{` (JSON), or
/// neither, per §4.2's four forms.
pub(crate) fn split(source: &str, path: &Path) -> Result<SplitContent, FrontmatterError> {
    let trimmed_start = source.trim_start_matches('\u{feff}');

    if let Some(rest) = trimmed_start.strip_prefix("---\n") {
        return split_delimited(rest, "---", path, FrontmatterFormat::Yaml);
    }
    if let Some(rest) = trimmed_start.strip_prefix("+++\n") {
        return split_delimited(rest, "+++", path, FrontmatterFormat::Toml);
    }

    let first_non_blank = trimmed_start.trim_start();
    if first_non_blank.starts_with('{') {
        if let Some((meta_raw, body)) = split_json_block(first_non_blank) {
            let metadata = json_to_toml_table(&meta_raw, path)?;
            return Ok(SplitContent {
                metadata,
                body: body.to_string(),
                format: FrontmatterFormat::Json,
            });
        }
    }

    Ok(SplitContent {
        metadata: toml::value::Table::new(),
        body: source.to_string(),
        format: FrontmatterFormat::None,
    })
}

fn split_delimited(
    rest: &str,
    delim: &str,
    path: &Path,
    format: FrontmatterFormat,
) -> Result<SplitContent, FrontmatterError> {
    let closing = format!("\n{delim}");
    let Some(end) = rest.find(&closing) else {
        // No closing delimiter: treat the whole file as body, no metadata
        // (§7 FrontmatterError is a per-file warning, handled by the caller).
        return Ok(SplitContent {
            metadata: toml::value::Table::new(),
            body: rest.to_string(),
            format: FrontmatterFormat::None,
        });
    };
    let raw_meta = &rest[..end];
    let body = rest[end + closing.len()..].trim_start_matches('\n').to_string();

    let metadata = match format {
        FrontmatterFormat::Yaml => yaml_to_toml_table(raw_meta, path)?,
        FrontmatterFormat::Toml => toml::from_str(raw_meta).map_err(|e| FrontmatterError::Toml {
            path: path.to_path_buf(),
            format: "TOML",
            source: e,
        })?,
        _ => unreachable!(),
    };

    Ok(SplitContent {
        metadata,
        body,
        format,
    })
}

/// Find the end of a balanced `{ ... }` JSON block followed by a blank
/// line, per §4.2's JSON front-matter form.
fn split_json_block(source: &str) -> Option<(String, &str)> {
    let bytes = source.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    let mut end = None;
    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i + 1);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = end?;
    let raw = &source[..end];
    let after = &source[end..];
    let body = after.trim_start_matches(['\n', '\r']);
    Some((raw.to_string(), body))
}

fn yaml_to_toml_table(raw: &str, path: &Path) -> Result<toml::value::Table, FrontmatterError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(raw).map_err(|e| FrontmatterError::Yaml {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(yaml_value_to_toml_table(value))
}

fn json_to_toml_table(raw: &str, path: &Path) -> Result<toml::value::Table, FrontmatterError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| FrontmatterError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(json_value_to_toml_table(value))
}

fn yaml_value_to_toml_table(value: serde_yaml::Value) -> toml::value::Table {
    match value {
        serde_yaml::Value::Mapping(map) => {
            let mut table = toml::value::Table::new();
            for (k, v) in map {
                if let serde_yaml::Value::String(key) = k {
                    if let Some(tv) = yaml_value_to_toml(v) {
                        table.insert(key, tv);
                    }
                }
            }
            table
        }
        _ => toml::value::Table::new(),
    }
}

fn yaml_value_to_toml(value: serde_yaml::Value) -> Option<toml::Value> {
    Some(match value {
        serde_yaml::Value::Null => return None,
        serde_yaml::Value::Bool(b) => toml::Value::Boolean(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                toml::Value::Integer(i)
            } else {
                toml::Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_yaml::Value::String(s) => toml::Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            toml::Value::Array(seq.into_iter().filter_map(yaml_value_to_toml).collect())
        }
        serde_yaml::Value::Mapping(_) => toml::Value::Table(yaml_value_to_toml_table(value)),
        serde_yaml::Value::Tagged(tagged) => yaml_value_to_toml(tagged.value)?,
    })
}

fn json_value_to_toml_table(value: serde_json::Value) -> toml::value::Table {
    match value {
        serde_json::Value::Object(map) => {
            let mut table = toml::value::Table::new();
            for (k, v) in map {
                if let Some(tv) = json_value_to_toml(v) {
                    table.insert(k, tv);
                }
            }
            table
        }
        _ => toml::value::Table::new(),
    }
}

fn json_value_to_toml(value: serde_json::Value) -> Option<toml::Value> {
    Some(match value {
        serde_json::Value::Null => return None,
        serde_json::Value::Bool(b) => toml::Value::Boolean(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                toml::Value::Integer(i)
            } else {
                toml::Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => toml::Value::String(s),
        serde_json::Value::Array(arr) => {
            toml::Value::Array(arr.into_iter().filter_map(json_value_to_toml).collect())
        }
        serde_json::Value::Object(_) => toml::Value::Table(json_value_to_toml_table(value)),
    })
}
