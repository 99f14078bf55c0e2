// src/guide.rs

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prints the Bengal guide to stdout
pub(crate) fn print_guide() {
    print!(
        r####"# Bengal Guide

Bengal is a static site generator: markdown content with TOML/YAML/JSON
frontmatter, Jinja-style templates, and an incremental build cache.

## Quick Start

```bash
bengal build                    # Build the site
bengal build --incremental      # Skip pages whose inputs haven't changed
bengal build -c prod.toml       # Build with a custom config file
bengal watch                    # Watch and rebuild on changes (macOS)
bengal flame                    # Build with profiling, output flamechart.svg
bengal guide                    # Show this guide
```

## Project Structure

```
my-site/
├── bengal.toml          # Site configuration
├── content/             # Markdown content, one directory per section
│   └── blog/
│       ├── _index.md    # Section listing page (optional, auto-generated if absent)
│       └── hello.md
├── themes/
│   └── default/
│       └── templates/   # Jinja-style templates (page.html, index.html, ...)
├── assets/               # CSS, JS, images (processed and fingerprinted)
└── public/               # Generated site (created by build)
```

## Configuration (bengal.toml)

```toml
baseurl = "/"
title = "My Website"
output_dir = "public"
content_dir = "content"
assets_dir = "assets"
theme = "default"
pretty_urls = true
strict_mode = false
cache_enabled = true
preprocess_mode = "auto"
taxonomies = ["tags", "categories"]

[pagination]
per_page = 10

[health]
profile = "writer"
strict = false

[search]
enabled = true

[menu.main]
# menu entries go here
```

## Content Frontmatter

```markdown
---
title: Hello World
date: 2024-01-15
tags: ["intro", "blog"]
template: custom.html
draft: false
---
# Hello World

Your content here...
```

## Templates (Minijinja)

Templates live under `themes/<theme>/templates/`. Page selection follows
an explicit `template` key first, falls back to section/content-type
conventions, then to a generic default.

## CLI Flags (build)

| Flag | Meaning |
|------|---------|
| `--incremental` | Only rebuild pages whose content, cascade, or config changed |
| `--no-parallel` | Disable the parallel rendering pool |
| `--strict` | Abort on the first render or health-check error |
| `--profile <name>` | Health-check profile: writer, theme-dev, dev |
| `--drafts` | Include draft content |
| `-c, --config-file <path>` | Path to the config file (default bengal.toml) |

## Environment Variables

- `BENGAL_CACHE_DIR` — overrides where the build cache is written.
- `BENGAL_NO_COLOR=1` — disable ANSI color in log output.
- `BENGAL_PROFILE=<name>` — same as `--profile`, used when the flag is absent.

## Exit Codes

- `0` — success.
- `1` — fatal config or build error.
- `2` — strict-mode or health-check validation failure.

## Output

```
public/
├── index.html
├── sitemap.xml
├── rss.xml
├── search-index.json
├── 404.html
├── assets/css/*.css
├── assets/js/*.js
└── blog/
    ├── index.html
    └── hello/index.html
```

### Flamechart Profiling

```bash
bengal flame                    # Output: flamechart.svg
bengal flame -o build.svg       # Custom output path
bengal flame -c prod.toml       # Custom config
```

---
Generated by bengal {version}
"####,
        version = VERSION
    );
}
