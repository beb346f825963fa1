//! Named HTML templates backed by Handlebars.
//!
//! Every stage renders through one named template. The built-in set is
//! compiled into the binary; a directory of `<name>.html.hbs` files may
//! override any of them.
//!
//! ```
//! use catalog_press::template::TemplateSet;
//! use serde_json::json;
//!
//! let mut set = TemplateSet::builtin().unwrap();
//! set.register("note", "<p>{{title}}</p>{{{markdown body}}}").unwrap();
//! let html = set.render("note", &json!({"title": "A & B", "body": "**bold**"})).unwrap();
//! assert_eq!(html, "<p>A &amp; B</p><p><strong>bold</strong></p>\n");
//! ```

use std::path::Path;

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde::Serialize;

use crate::error::RenderError;

/// File suffix of template sources.
pub const TEMPLATE_EXT: &str = ".html.hbs";

const BUILTIN: [(&str, &str); 11] = [
    ("base", include_str!("../templates/base.html.hbs")),
    ("cover", include_str!("../templates/cover.html.hbs")),
    ("toc", include_str!("../templates/toc.html.hbs")),
    ("section_cover", include_str!("../templates/section_cover.html.hbs")),
    ("series_detail", include_str!("../templates/series_detail.html.hbs")),
    ("products", include_str!("../templates/products.html.hbs")),
    ("text_block", include_str!("../templates/text_block.html.hbs")),
    ("image_full", include_str!("../templates/image_full.html.hbs")),
    ("curve", include_str!("../templates/curve.html.hbs")),
    ("spec_table", include_str!("../templates/spec_table.html.hbs")),
    ("backcover", include_str!("../templates/backcover.html.hbs")),
];

/// Names of the built-in templates.
pub fn template_names() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(name, _)| *name)
}

/// Render markdown to HTML using pulldown-cmark with GFM extensions.
pub fn markdown_to_html(content: &str) -> String {
    let mut options = pulldown_cmark::Options::empty();
    options.insert(pulldown_cmark::Options::ENABLE_TABLES);
    options.insert(pulldown_cmark::Options::ENABLE_STRIKETHROUGH);
    options.insert(pulldown_cmark::Options::ENABLE_TASKLISTS);
    let parser = pulldown_cmark::Parser::new_ext(content, options);
    let mut html_output = String::new();
    pulldown_cmark::html::push_html(&mut html_output, parser);
    html_output
}

/// Escape text for HTML/SVG element content and attribute values.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Sanitize a value for use inside a CSS declaration.
///
/// Strips characters that could break out of a property value and drops
/// values that smuggle in `url()` or `expression()`.
pub fn css_value(s: &str) -> String {
    let stripped: String = s
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '\\' | '"' | '\''))
        .collect();
    let lower = stripped.to_lowercase();
    if lower.contains("url(") || lower.contains("expression(") || lower.contains("javascript:") {
        return String::new();
    }
    stripped.trim().to_string()
}

fn markdown_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let source = match h.param(0).map(|p| p.value()) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    out.write(&markdown_to_html(&source))?;
    Ok(())
}

/// A compiled set of named templates.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    registry: Handlebars<'static>,
}

impl TemplateSet {
    fn empty() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry.register_helper("markdown", Box::new(markdown_helper));
        Self { registry }
    }

    /// The built-in templates.
    pub fn builtin() -> Result<Self, RenderError> {
        let mut set = Self::empty();
        for (name, source) in BUILTIN {
            set.register(name, source)?;
        }
        Ok(set)
    }

    /// Built-in templates overridden by `<name>.html.hbs` files in `dir`.
    /// Files with other names are registered as well, for use as partials.
    pub fn from_dir(dir: &Path) -> Result<Self, RenderError> {
        let mut set = Self::builtin()?;
        let entries = std::fs::read_dir(dir).map_err(|source| RenderError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut overridden = 0usize;
        for entry in entries {
            let path = entry
                .map_err(|source| RenderError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();
            let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(TEMPLATE_EXT))
            else {
                continue;
            };
            let source = std::fs::read_to_string(&path).map_err(|source| RenderError::Io {
                path: path.clone(),
                source,
            })?;
            set.register(name, &source)?;
            log::debug!("template `{name}` loaded from {}", path.display());
            overridden += 1;
        }
        log::info!("{overridden} template(s) loaded from {}", dir.display());
        Ok(set)
    }

    /// [`from_dir`](Self::from_dir) when `dir` exists, else the built-ins.
    pub fn load(dir: Option<&Path>) -> Result<Self, RenderError> {
        match dir {
            Some(dir) if dir.is_dir() => Self::from_dir(dir),
            Some(dir) => {
                log::debug!("no template directory at {}, using built-ins", dir.display());
                Self::builtin()
            }
            None => Self::builtin(),
        }
    }

    /// Register (or replace) a named template.
    pub fn register(&mut self, name: &str, source: &str) -> Result<(), RenderError> {
        self.registry
            .register_template_string(name, source)
            .map_err(|e| RenderError::TemplateSyntax {
                name: name.to_string(),
                source: Box::new(e),
            })
    }

    pub fn has(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    /// Render the named template against a serializable context.
    pub fn render<T: Serialize>(&self, name: &str, ctx: &T) -> Result<String, RenderError> {
        Ok(self.registry.render(name, ctx)?)
    }
}
