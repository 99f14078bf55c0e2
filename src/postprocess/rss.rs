// src/postprocess/rss.rs
//
// Grounded on the teacher's `rss.rs::generate_rss`/`format_item`/
// `xml_escape`/`format_rfc2822`, reworked from the `rss_include`
// per-content-type flag to a single `config.rss.section` pick (§4.14:
// "default to the root blog section if present").

use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

use crate::site::{Page, Site};
use crate::strategy;

fn xml_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

fn format_rfc2822(date: OffsetDateTime) -> String {
    date.format(&Rfc2822).unwrap_or_default()
}

fn format_item(base_url: &str, page: &Page) -> String {
    let title = crate::site::meta_str(&page.metadata, "title").unwrap_or_default();
    let url = page
        .output_url
        .clone()
        .unwrap_or_default();
    let link = format!("{base_url}{url}");
    let mut item = String::new();
    item.push_str("    <item>\n");
    item.push_str(&format!("      <title>{}</title>\n", xml_escape(&title)));
    item.push_str(&format!("      <link>{link}</link>\n"));
    item.push_str(&format!("      <guid>{link}</guid>\n"));

    if let Some(html) = &page.rendered_html {
        let excerpt: String = super::strip_tags(html).chars().take(280).collect();
        if !excerpt.is_empty() {
            item.push_str(&format!(
                "      <description>{}</description>\n",
                xml_escape(&excerpt)
            ));
        }
    }
    if let Some(date) = page.date {
        item.push_str(&format!("      <pubDate>{}</pubDate>\n", format_rfc2822(date)));
    }
    item.push_str("    </item>\n");
    item
}

fn find_rss_section_pages<'a>(site: &'a Site) -> Option<Vec<&'a Page>> {
    let name = site.config.rss.section.clone();
    let section = if let Some(name) = name {
        site.sections.iter().find(|s| s.name == name)
    } else {
        site.root_sections
            .iter()
            .map(|&id| site.section(id))
            .find(|s| strategy::detect_for_section(site, s.id) == "blog")
    }?;
    Some(section.pages.iter().map(|&id| site.page(id)).collect())
}

/// Returns `None` when `config.rss` is enabled but there is no
/// candidate section to publish (an empty feed is not written, §4.14).
pub(crate) fn generate(site: &Site) -> Option<String> {
    let pages = find_rss_section_pages(site)?;
    if pages.is_empty() {
        return None;
    }

    let base_url = site.config.baseurl.trim_end_matches('/').to_string();
    let mut ordered = strategy::sort_pages_by_name("blog", pages);
    ordered.truncate(site.config.rss.limit.max(1));

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n");
    xml.push_str("  <channel>\n");
    xml.push_str(&format!("    <title>{}</title>\n", xml_escape(&site.config.title)));
    xml.push_str(&format!("    <link>{base_url}</link>\n"));
    xml.push_str(&format!(
        "    <atom:link href=\"{base_url}/rss.xml\" rel=\"self\" type=\"application/rss+xml\"/>\n"
    ));

    for page in ordered {
        xml.push_str(&format_item(&base_url, page));
    }

    xml.push_str("  </channel>\n");
    xml.push_str("</rss>\n");
    Some(xml)
}
