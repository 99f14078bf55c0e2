// src/postprocess/notfound.rs
//
// Renders `404.html` with a minimal context (§4.14). Uses the same
// template environment setup as `render.rs`, grounded on the
// teacher's `render_html`'s "render a template with a context" shape.

use minijinja::context;

use crate::site::Site;

/// Looks for a `404.html` template in the active theme; returns `None`
/// (no file written) when the theme doesn't provide one.
pub(crate) fn generate(site: &Site) -> Option<String> {
    let template_dir = std::path::Path::new("themes").join(&site.config.theme).join("templates");
    let env = crate::template::create_environment(&template_dir, None, None, false);
    let template = env.get_template("404.html").ok()?;
    template
        .render(context! { site => context!{ title => site.config.title.clone() } })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::site::Site;

    #[test]
    fn missing_template_yields_none() {
        let site = Site::new(Config::default());
        assert!(generate(&site).is_none());
    }
}
