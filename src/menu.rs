// src/menu.rs
//
// C6: merges `config.menu[name]` entries with each page's frontmatter
// `menu:` declarations into hierarchical menus (§4.6). No teacher
// analog; new component.

use std::collections::HashMap;

use tracing::warn;

use crate::site::Site;

#[derive(Debug, Clone)]
pub(crate) struct MenuNode {
    pub name: String,
    pub url: String,
    pub weight: i64,
    pub children: Vec<MenuNode>,
}

#[derive(Default)]
pub(crate) struct MenuTree {
    pub menus: HashMap<String, Vec<MenuNode>>,
}

struct RawEntry {
    name: String,
    url: String,
    weight: i64,
    parent: Option<String>,
    insertion_order: usize,
}

pub(crate) fn build(site: &Site) -> MenuTree {
    let mut by_menu: HashMap<String, Vec<RawEntry>> = HashMap::new();

    for (menu_name, entries) in &site.config.menu {
        for (i, entry) in entries.iter().enumerate() {
            by_menu.entry(menu_name.clone()).or_default().push(RawEntry {
                name: entry.name.clone(),
                url: entry.url.clone(),
                weight: entry.weight,
                parent: entry.parent.clone(),
                insertion_order: i,
            });
        }
    }

    for page in &site.pages {
        let Some(toml::Value::Table(menu_decls)) = page.metadata.get("menu") else {
            continue;
        };
        for (menu_name, decl) in menu_decls {
            let Some(decl_table) = decl.as_table() else {
                continue;
            };
            let name = decl_table
                .get("name")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| {
                    page.metadata
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or(&page.slug)
                        .to_string()
                });
            let url = decl_table
                .get("url")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| page.output_url.clone().unwrap_or_default());
            let weight = decl_table.get("weight").and_then(|v| v.as_integer()).unwrap_or(0);
            let parent = decl_table
                .get("parent")
                .and_then(|v| v.as_str())
                .map(str::to_string);

            let bucket = by_menu.entry(menu_name.clone()).or_default();
            let insertion_order = bucket.len();
            bucket.push(RawEntry {
                name,
                url,
                weight,
                parent,
                insertion_order,
            });
        }
    }

    let mut menus = HashMap::new();
    for (name, entries) in by_menu {
        menus.insert(name, build_tree(entries));
    }
    MenuTree { menus }
}

fn build_tree(entries: Vec<RawEntry>) -> Vec<MenuNode> {
    let mut children_of: HashMap<String, Vec<usize>> = HashMap::new();
    let mut roots: Vec<usize> = Vec::new();
    let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();

    for (i, entry) in entries.iter().enumerate() {
        match &entry.parent {
            Some(parent) if names.contains(parent) => {
                children_of.entry(parent.clone()).or_default().push(i);
            }
            Some(parent) => {
                warn!("menu::missing_parent {parent:?} for entry {:?}, promoting to root", entry.name);
                roots.push(i);
            }
            None => roots.push(i),
        }
    }

    fn build_node(i: usize, entries: &[RawEntry], children_of: &HashMap<String, Vec<usize>>) -> MenuNode {
        let entry = &entries[i];
        let mut children: Vec<MenuNode> = children_of
            .get(&entry.name)
            .map(|idxs| idxs.iter().map(|&c| build_node(c, entries, children_of)).collect())
            .unwrap_or_default();
        children.sort_by_key(|c| (c.weight, 0i64));
        MenuNode {
            name: entry.name.clone(),
            url: entry.url.clone(),
            weight: entry.weight,
            children,
        }
    }

    let mut nodes: Vec<MenuNode> = roots
        .into_iter()
        .map(|i| build_node(i, &entries, &children_of))
        .collect();
    nodes.sort_by(|a, b| a.weight.cmp(&b.weight));
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, MenuEntryConfig};

    #[test]
    fn sorts_siblings_by_weight_then_insertion() {
        let mut config = Config::default();
        config.menu.insert(
            "main".into(),
            vec![
                MenuEntryConfig {
                    name: "B".into(),
                    url: "/b/".into(),
                    weight: 2,
                    parent: None,
                },
                MenuEntryConfig {
                    name: "A".into(),
                    url: "/a/".into(),
                    weight: 1,
                    parent: None,
                },
            ],
        );
        let site = Site::new(config);
        let tree = build(&site);
        let main = &tree.menus["main"];
        assert_eq!(main[0].name, "A");
        assert_eq!(main[1].name, "B");
    }

    #[test]
    fn missing_parent_promotes_to_root() {
        let mut config = Config::default();
        config.menu.insert(
            "main".into(),
            vec![MenuEntryConfig {
                name: "Orphan".into(),
                url: "/o/".into(),
                weight: 0,
                parent: Some("Ghost".into()),
            }],
        );
        let site = Site::new(config);
        let tree = build(&site);
        assert_eq!(tree.menus["main"].len(), 1);
        assert_eq!(tree.menus["main"][0].name, "Orphan");
    }
}
