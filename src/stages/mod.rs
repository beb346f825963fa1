//! Stage renderers: one HTML fragment per document part.
//!
//! Every stage takes a [`StageContext`] plus, where it renders a slice of
//! the catalog, an explicit view ([`SectionView`](crate::views::SectionView),
//! [`SeriesView`](crate::views::SeriesView)) or block. Stages never mutate
//! the bundle.
//!
//! Tuning keys are looked up block param first, then settings (modelled
//! field or `extra`), then a per-stage default.

pub mod backcover;
pub mod cover;
pub mod products;
pub mod section_cover;
pub mod series_detail;
pub mod spec_table;
pub mod toc;

use crate::assets::AssetResolver;
use crate::blocks::{Block, ModelBundle};
use crate::template::{TemplateSet, css_value};
use crate::types::{DEFAULT_THEME_COLOR, Settings, lenient};

/// Everything a stage needs besides its view.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub bundle: &'a ModelBundle,
    pub templates: &'a TemplateSet,
    pub assets: &'a AssetResolver,
}

impl<'a> StageContext<'a> {
    pub fn new(bundle: &'a ModelBundle, templates: &'a TemplateSet, assets: &'a AssetResolver) -> Self {
        Self {
            bundle,
            templates,
            assets,
        }
    }

    pub fn settings(&self) -> &'a Settings {
        &self.bundle.settings
    }

    /// Brand colour, sanitized for CSS.
    pub fn brand(&self) -> String {
        css_or(&self.settings().theme_color, DEFAULT_THEME_COLOR)
    }
}

/// Block param → setting, non-empty text only.
pub(crate) fn param_or_setting(block: Option<&Block>, settings: &Settings, key: &str) -> Option<String> {
    block
        .and_then(|b| b.param_str(key))
        .or_else(|| settings.get(key))
}

/// Text lookup with a default.
pub(crate) fn text_or(block: Option<&Block>, settings: &Settings, key: &str, default: &str) -> String {
    param_or_setting(block, settings, key).unwrap_or_else(|| default.to_string())
}

/// CSS-safe lookup with a default.
pub(crate) fn css_param(block: Option<&Block>, settings: &Settings, key: &str, default: &str) -> String {
    match param_or_setting(block, settings, key) {
        Some(v) => css_or(&v, default),
        None => default.to_string(),
    }
}

/// Numeric lookup; unparsable values fall back to `default`.
pub(crate) fn number_or(block: Option<&Block>, settings: &Settings, key: &str, default: f64) -> f64 {
    if let Some(v) = block.and_then(|b| b.param_f64(key)) {
        return v;
    }
    settings
        .get(key)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Lenient boolean lookup.
pub(crate) fn flag_or(block: Option<&Block>, settings: &Settings, key: &str, default: bool) -> bool {
    if let Some(v) = block.and_then(|b| b.param_flag(key)) {
        return v;
    }
    match settings.get(key) {
        Some(s) => lenient::value_to_flag(&serde_json::Value::String(s)).unwrap_or(default),
        None => default,
    }
}

fn css_or(value: &str, default: &str) -> String {
    let v = css_value(value);
    if v.is_empty() { default.to_string() } else { v }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::builder::{BuildOptions, build_model_bundle};
    use crate::types::{Catalog, RuntimeSettings};

    /// Bundle built from JSON with the runtime asset base pointing at `root`.
    pub fn bundle_with_root(catalog: serde_json::Value, root: &std::path::Path, model_pages: bool) -> ModelBundle {
        let catalog: Catalog = serde_json::from_value(catalog).expect("catalog");
        build_model_bundle(
            catalog,
            BuildOptions {
                include_cover: true,
                model_pages,
            },
        )
        .with_runtime(RuntimeSettings {
            assets_base: crate::assets::file_uri(root),
            use_pagedjs: true,
            has_cover: true,
        })
    }

    pub fn resolver(bundle: &ModelBundle) -> AssetResolver {
        AssetResolver::from_base(bundle.settings.assets_base(), std::path::Path::new("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockKind;
    use serde_json::json;

    fn settings() -> Settings {
        serde_json::from_value(json!({
            "theme_color": "#112233",
            "overlay_opacity": "0.7",
            "section_cover_shadow": "нет",
            "subtitle": "From settings"
        }))
        .unwrap()
    }

    #[test]
    fn block_param_wins_over_setting() {
        let mut block = Block::new("c", BlockKind::Cover, 0);
        block.params.insert("subtitle".into(), json!("From block"));
        let s = settings();
        assert_eq!(param_or_setting(Some(&block), &s, "subtitle").as_deref(), Some("From block"));
        assert_eq!(param_or_setting(None, &s, "subtitle").as_deref(), Some("From settings"));
        assert_eq!(text_or(None, &s, "missing", "dflt"), "dflt");
    }

    #[test]
    fn empty_block_param_falls_through() {
        let mut block = Block::new("c", BlockKind::Cover, 0);
        block.params.insert("subtitle".into(), json!(""));
        assert_eq!(
            param_or_setting(Some(&block), &settings(), "subtitle").as_deref(),
            Some("From settings")
        );
    }

    #[test]
    fn numeric_and_flag_lookups() {
        let s = settings();
        assert_eq!(number_or(None, &s, "overlay_opacity", 0.4), 0.7);
        assert_eq!(number_or(None, &s, "gap_mm", 6.0), 6.0);
        assert!(!flag_or(None, &s, "section_cover_shadow", true));
        assert!(flag_or(None, &s, "section_cover_gradient", true));
    }

    #[test]
    fn css_lookups_are_sanitized() {
        let mut block = Block::new("c", BlockKind::Cover, 0);
        block.params.insert("title_color".into(), json!("red;}</style>"));
        assert_eq!(css_param(Some(&block), &settings(), "title_color", "#FFFFFF"), "red/style");
        assert_eq!(css_param(None, &settings(), "title_color", "#FFFFFF"), "#FFFFFF");
    }
}
