//! Final HTML document assembly.

use serde::Serialize;

use crate::error::RenderError;
use crate::template::{TemplateSet, css_value};
use crate::types::{DEFAULT_THEME_COLOR, Settings};

/// Paged.js polyfill loaded when client-side pagination is on.
pub const PAGEDJS_SRC: &str = "https://unpkg.com/pagedjs/dist/paged.polyfill.js";

/// Built-in print stylesheet.
pub const CATALOG_CSS: &str = include_str!("../assets/catalog.css");

#[derive(Debug, Serialize)]
struct DocumentContext<'a> {
    lang: String,
    title: &'a str,
    theme_color: String,
    assets_base: &'a str,
    use_pagedjs: bool,
    pagedjs_src: &'a str,
    has_cover: bool,
    css: &'a str,
    fragments: &'a [String],
}

/// Wrap `fragments` in the `base` template.
///
/// The page carries the settings title, the brand colour as `--brand`, a
/// `<base href>` pointing at the asset base, and a hook that sets
/// `window.PAGED_DONE` once layout has finished.
pub fn assemble_document(
    templates: &TemplateSet,
    settings: &Settings,
    fragments: &[String],
) -> Result<String, RenderError> {
    let theme_color = css_value(&settings.theme_color);
    let ctx = DocumentContext {
        lang: settings.get("lang").unwrap_or_else(|| "en".to_string()),
        title: if settings.title.trim().is_empty() { "Catalog" } else { settings.title.trim() },
        theme_color: if theme_color.is_empty() {
            DEFAULT_THEME_COLOR.to_string()
        } else {
            theme_color
        },
        assets_base: settings.assets_base(),
        use_pagedjs: settings.use_pagedjs(),
        pagedjs_src: PAGEDJS_SRC,
        has_cover: settings.has_cover(),
        css: CATALOG_CSS,
        fragments,
    };
    log::info!("assembling document from {} fragment(s)", fragments.len());
    templates.render("base", &ctx)
}
