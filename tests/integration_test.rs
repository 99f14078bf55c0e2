// Integration tests for Bengal
//
// These tests run the CLI binary against a fixture site and validate:
// - Output file generation and the pretty-url layout
// - HTML structure and content via DOM parsing
// - Section strategy selection (blog listing vs. plain pages)
// - Date-based sorting of blog posts
// - Post-processing outputs (sitemap, RSS)
// - Graceful failure on a broken config

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use scraper::{Html, Selector};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a temporary working directory with test fixtures
fn setup_test_site() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let fixture_src = PathBuf::from("tests/fixtures/simple_site");

    copy_dir_recursive(&fixture_src, temp_dir.path()).unwrap();

    temp_dir
}

/// Recursively copy a directory
fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    if !dst.exists() {
        fs::create_dir_all(dst)?;
    }

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let path = entry.path();
        let file_name = entry.file_name();
        let dst_path = dst.join(&file_name);

        if path.is_dir() {
            copy_dir_recursive(&path, &dst_path)?;
        } else {
            fs::copy(&path, &dst_path)?;
        }
    }

    Ok(())
}

/// Runs the bengal CLI's `build` subcommand with a config file.
/// Sets the current directory to the site directory for relative paths to work.
fn run_ssg(site_dir: &Path) -> assert_cmd::assert::Assert {
    cargo_bin_cmd!("bengal")
        .current_dir(site_dir)
        .arg("build")
        .arg("-c")
        .arg("bengal.toml")
        .assert()
        .success()
}

fn parse_html_file(path: &Path) -> Html {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to read HTML file: {}", path.display()));
    Html::parse_document(&content)
}

fn select_text(html: &Html, selector: &str) -> String {
    let sel = Selector::parse(selector).unwrap();
    html.select(&sel)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn count_elements(html: &Html, selector: &str) -> usize {
    let sel = Selector::parse(selector).unwrap();
    html.select(&sel).count()
}

#[test]
fn test_cli_builds_successfully() {
    let temp_site = setup_test_site();
    run_ssg(temp_site.path());
}

#[test]
fn test_generates_all_expected_files() {
    let temp_site = setup_test_site();
    let output_dir = temp_site.path().join("public");

    run_ssg(temp_site.path());

    assert!(output_dir.join("index.html").exists(), "site index should exist");
    assert!(output_dir.join("blog/index.html").exists(), "blog archive should exist");
    assert!(
        output_dir.join("blog/hello/index.html").exists(),
        "first post should render at its pretty url"
    );
    assert!(
        output_dir.join("blog/second-post/index.html").exists(),
        "second post should render at its pretty url"
    );
    assert!(
        output_dir.join("pages/about/index.html").exists(),
        "about page should render at its pretty url"
    );
    assert!(output_dir.join("sitemap.xml").exists(), "sitemap.xml should be generated");
    assert!(output_dir.join("rss.xml").exists(), "rss.xml should be generated");
    assert!(
        output_dir.join("search-index.json").exists(),
        "search-index.json should be generated"
    );
}

#[test]
fn test_homepage_renders_site_title_and_content() {
    let temp_site = setup_test_site();
    let output_dir = temp_site.path().join("public");

    run_ssg(temp_site.path());

    let html = parse_html_file(&output_dir.join("index.html"));

    let title = select_text(&html, "h1.site-title");
    assert_eq!(title, "Test Blog");

    let welcome = select_text(&html, "section.welcome");
    assert!(
        welcome.contains("Welcome to the test site"),
        "homepage should render the markdown body: {welcome:?}"
    );

    let footer = select_text(&html, "footer");
    assert!(footer.contains("@testuser"), "footer should render the dynamic config map");
    assert!(footer.contains("https://github.com/testuser"));
}

#[test]
fn test_blog_archive_lists_posts_newest_first() {
    let temp_site = setup_test_site();
    let output_dir = temp_site.path().join("public");

    run_ssg(temp_site.path());

    let html = parse_html_file(&output_dir.join("blog/index.html"));

    assert_eq!(count_elements(&html, "article.post-summary"), 2);

    let sel = Selector::parse("article.post-summary h3").unwrap();
    let titles: Vec<String> = html.select(&sel).map(|el| el.text().collect::<String>()).collect();
    assert_eq!(
        titles,
        vec!["Second Blog Post", "My First Post"],
        "posts should be sorted by date, newest first"
    );

    let footer = select_text(&html, "footer");
    assert!(footer.contains("2 blog posts"));
}

#[test]
fn test_individual_blog_post_renders_metadata() {
    let temp_site = setup_test_site();
    let output_dir = temp_site.path().join("public");

    run_ssg(temp_site.path());

    let html = parse_html_file(&output_dir.join("blog/hello/index.html"));

    assert_eq!(select_text(&html, "h1.post-title"), "My First Post");
    assert_eq!(select_text(&html, "p.author"), "Test Author");
    assert_eq!(select_text(&html, "p.date"), "2024-01-15");

    let tags = count_elements(&html, "li.tag");
    assert_eq!(tags, 3, "all three frontmatter tags should render");

    let body = select_text(&html, "div.content");
    assert!(body.contains("Markdown support works here"));
    assert!(body.contains("item one") && body.contains("item two"), "markdown list should render");
}

#[test]
fn test_user_authored_index_page_lists_its_posts() {
    let temp_site = setup_test_site();
    let output_dir = temp_site.path().join("public");

    run_ssg(temp_site.path());

    // `content/news/_index.md` is hand-authored (unlike `blog/`, which has
    // no `_index.md` and gets a synthesized archive page instead), so this
    // exercises population of `page.posts` on a real content page.
    let html = parse_html_file(&output_dir.join("news/index.html"));

    assert_eq!(select_text(&html, "h1.section-title"), "News");
    assert_eq!(count_elements(&html, "article.post-summary"), 2);

    let sel = Selector::parse("article.post-summary h3").unwrap();
    let titles: Vec<String> = html.select(&sel).map(|el| el.text().collect::<String>()).collect();
    assert_eq!(
        titles,
        vec!["Launch Followup", "Launch Announcement"],
        "news posts should be sorted by date, newest first"
    );
}

#[test]
fn test_about_page_uses_plain_page_template() {
    let temp_site = setup_test_site();
    let output_dir = temp_site.path().join("public");

    run_ssg(temp_site.path());

    let html = parse_html_file(&output_dir.join("pages/about/index.html"));

    assert_eq!(select_text(&html, "h1.page-title"), "About");
    let body = select_text(&html, "div.content");
    assert!(body.contains("exercise the build pipeline end to end"));

    // The `pages` section has no dated posts, so it falls back to the
    // plain-page strategy rather than the blog templates.
    assert!(count_elements(&html, "h1.post-title") == 0);
}

#[test]
fn test_sitemap_contains_expected_urls() {
    let temp_site = setup_test_site();
    let output_dir = temp_site.path().join("public");

    run_ssg(temp_site.path());

    let sitemap = fs::read_to_string(output_dir.join("sitemap.xml")).unwrap();

    assert!(sitemap.contains(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(sitemap.contains(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#));
    assert!(sitemap.contains("</urlset>"));

    assert!(sitemap.contains("<loc>https://test.example.com/</loc>"));
    assert!(sitemap.contains("<loc>https://test.example.com/blog/</loc>"));
    assert!(sitemap.contains("<loc>https://test.example.com/blog/hello/</loc>"));
    assert!(sitemap.contains("<loc>https://test.example.com/blog/second-post/</loc>"));
    assert!(sitemap.contains("<loc>https://test.example.com/pages/about/</loc>"));
}

#[test]
fn test_rss_feed_contains_blog_posts() {
    let temp_site = setup_test_site();
    let output_dir = temp_site.path().join("public");

    run_ssg(temp_site.path());

    let rss = fs::read_to_string(output_dir.join("rss.xml")).unwrap();

    assert_eq!(rss.matches("<item>").count(), 2);
    assert!(rss.contains("<title>My First Post</title>"));
    assert!(rss.contains("<title>Second Blog Post</title>"));
    assert!(rss.contains("<link>https://test.example.com/blog/hello/</link>"));
}

#[test]
fn test_invalid_config_fails_gracefully() {
    let temp_site = setup_test_site();
    fs::write(temp_site.path().join("bengal.toml"), "this is not [ valid toml").unwrap();

    cargo_bin_cmd!("bengal")
        .current_dir(temp_site.path())
        .arg("build")
        .arg("-c")
        .arg("bengal.toml")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_missing_theme_fails_gracefully() {
    let temp_site = setup_test_site();
    fs::remove_dir_all(temp_site.path().join("themes")).unwrap();

    cargo_bin_cmd!("bengal")
        .current_dir(temp_site.path())
        .arg("build")
        .arg("-c")
        .arg("bengal.toml")
        .assert()
        .failure();
}

#[test]
fn test_help_flag_runs_without_building() {
    cargo_bin_cmd!("bengal")
        .arg("--help")
        .assert()
        .stdout(predicate::str::contains("Bengal"));
}
