// src/strategy.rs
//
// C7: content-type strategy trait + string-keyed registry (§4.7),
// generalized from the teacher's `ContentTypeConfig` +
// `utils.rs::get_content_type_template` per Design Notes §9: "dynamic
// dispatch via duck typing" becomes "a strategy interface with an
// explicit method set".

use std::collections::HashMap;

use crate::site::{Page, SectionId, Site};

pub(crate) trait ContentStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn default_index_template(&self) -> &'static str;
    fn default_single_template(&self) -> &'static str;
    fn allows_pagination(&self) -> bool {
        true
    }
    fn sort_pages<'a>(&self, pages: Vec<&'a Page>) -> Vec<&'a Page>;
    /// Removes the index page itself and (unless told otherwise)
    /// drafts/`_generated` pages from a listing (§4.7).
    fn filter_display_pages<'a>(&self, pages: Vec<&'a Page>) -> Vec<&'a Page> {
        pages.into_iter().filter(|p| !p.generated).collect()
    }
    /// Section-name heuristic (§4.7 priority 3): does this section's name
    /// identify the strategy?
    fn detect_from_section_name(&self, _name: &str) -> bool {
        false
    }
}

fn sort_by_date_desc_title<'a>(mut pages: Vec<&'a Page>) -> Vec<&'a Page> {
    pages.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.metadata.get("title").and_then(|v| v.as_str()).cmp(
                &b.metadata.get("title").and_then(|v| v.as_str()),
            ))
    });
    pages
}

fn sort_by_weight_asc_title<'a>(mut pages: Vec<&'a Page>) -> Vec<&'a Page> {
    pages.sort_by(|a, b| {
        a.weight.cmp(&b.weight).then_with(|| {
            a.metadata
                .get("title")
                .and_then(|v| v.as_str())
                .cmp(&b.metadata.get("title").and_then(|v| v.as_str()))
        })
    });
    pages
}

macro_rules! simple_strategy {
    ($ty:ident, $name:literal, $index:literal, $single:literal, $sort:expr, $section_names:expr) => {
        pub(crate) struct $ty;
        impl ContentStrategy for $ty {
            fn name(&self) -> &'static str {
                $name
            }
            fn default_index_template(&self) -> &'static str {
                $index
            }
            fn default_single_template(&self) -> &'static str {
                $single
            }
            fn sort_pages<'a>(&self, pages: Vec<&'a Page>) -> Vec<&'a Page> {
                $sort(pages)
            }
            fn detect_from_section_name(&self, name: &str) -> bool {
                $section_names.contains(&name)
            }
        }
    };
}

simple_strategy!(
    BlogStrategy,
    "blog",
    "blog/list.html",
    "blog/single.html",
    sort_by_date_desc_title,
    ["blog", "posts", "news"]
);
simple_strategy!(
    DocsStrategy,
    "docs",
    "docs/list.html",
    "docs/single.html",
    sort_by_weight_asc_title,
    ["docs"]
);
simple_strategy!(
    TutorialStrategy,
    "tutorial",
    "tutorial/list.html",
    "tutorial/single.html",
    sort_by_weight_asc_title,
    ["tutorials"]
);
simple_strategy!(
    ApiStrategy,
    "api",
    "api/list.html",
    "api/single.html",
    (|pages: Vec<&Page>| pages), // discovery order, unchanged
    ["api"]
);
simple_strategy!(
    CliStrategy,
    "cli",
    "cli/list.html",
    "cli/single.html",
    (|pages: Vec<&Page>| pages),
    ["cli"]
);
simple_strategy!(
    PageStrategy,
    "page",
    "index.html",
    "page.html",
    sort_by_weight_asc_title,
    []
);

pub(crate) struct StrategyRegistry {
    strategies: HashMap<&'static str, Box<dyn ContentStrategy>>,
    ordered_names: Vec<&'static str>,
}

impl StrategyRegistry {
    pub(crate) fn with_builtins() -> Self {
        let mut registry = StrategyRegistry {
            strategies: HashMap::new(),
            ordered_names: Vec::new(),
        };
        registry.register(Box::new(BlogStrategy));
        registry.register(Box::new(DocsStrategy));
        registry.register(Box::new(TutorialStrategy));
        registry.register(Box::new(ApiStrategy));
        registry.register(Box::new(CliStrategy));
        registry.register(Box::new(PageStrategy));
        registry
    }

    pub(crate) fn register(&mut self, strategy: Box<dyn ContentStrategy>) {
        let name = strategy.name();
        self.ordered_names.push(name);
        self.strategies.insert(name, strategy);
    }

    pub(crate) fn get(&self, name: &str) -> Option<&dyn ContentStrategy> {
        self.strategies.get(name).map(|b| b.as_ref())
    }

    fn by_section_name(&self, section_name: &str) -> Option<&dyn ContentStrategy> {
        for name in &self.ordered_names {
            let strategy = self.strategies[name].as_ref();
            if strategy.detect_from_section_name(section_name) {
                return Some(strategy);
            }
        }
        None
    }
}

/// Selection priority (§4.7):
/// 1. explicit `template:` (handled by the caller, render.rs, directly)
/// 2. explicit `type:` via registry
/// 3. section-name heuristic
/// 4. ≥60% of section's pages have a `date` ⇒ blog
/// 5. default PageStrategy
pub(crate) fn detect_for_section(site: &Site, section_id: SectionId) -> String {
    let section = site.section(section_id);

    if let Some(index_id) = section.index_page {
        if let Some(t) = crate::site::meta_str(&site.page(index_id).metadata, "type") {
            if site.strategies.get(&t).is_some() {
                return t;
            }
        }
    }

    if let Some(strategy) = site.strategies.by_section_name(&section.name) {
        return strategy.name().to_string();
    }

    let total = section.pages.len();
    if total > 0 {
        let with_date = section
            .pages
            .iter()
            .filter(|&&id| site.page(id).date.is_some())
            .count();
        if with_date * 100 >= total * 60 {
            return "blog".to_string();
        }
    }

    "page".to_string()
}

pub(crate) fn sort_pages_by_name<'a>(name: &str, pages: Vec<&'a Page>) -> Vec<&'a Page> {
    match name {
        "blog" => sort_by_date_desc_title(pages),
        "docs" | "tutorial" | "page" => sort_by_weight_asc_title(pages),
        _ => pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::site::Section;

    #[test]
    fn section_name_heuristic_detects_blog() {
        let mut site = Site::new(Config::default());
        let id = site.push_section(Section {
            id: SectionId(0),
            name: "blog".into(),
            path: "blog".into(),
            index_page: None,
            children: Vec::new(),
            pages: Vec::new(),
            parent: None,
            cascade_block: toml::value::Table::new(),
        });
        assert_eq!(detect_for_section(&site, id), "blog");
    }

    #[test]
    fn default_strategy_is_page() {
        let mut site = Site::new(Config::default());
        let id = site.push_section(Section {
            id: SectionId(0),
            name: "random".into(),
            path: "random".into(),
            index_page: None,
            children: Vec::new(),
            pages: Vec::new(),
            parent: None,
            cascade_block: toml::value::Table::new(),
        });
        assert_eq!(detect_for_section(&site, id), "page");
    }
}
