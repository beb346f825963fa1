//! Front cover page.

use serde::Serialize;

use super::{StageContext, css_param, number_or, param_or_setting, text_or};
use crate::blocks::{Block, BlockKind};
use crate::error::RenderError;

#[derive(Debug, Serialize)]
struct CoverContext {
    anchor: String,
    bg: Option<String>,
    bg_exists: bool,
    bg_abs: String,
    logo: Option<String>,
    logo_exists: bool,
    logo_abs: String,
    logo_svg_inline: Option<String>,
    title: String,
    year: String,
    subtitle: String,
    overlay_opacity: f64,
    place_items: &'static str,
    logo_max_w_mm: f64,
    logo_max_h_mm: f64,
    gap_mm: f64,
    title_size_pt: f64,
    subtitle_size_pt: f64,
    title_color: String,
    subtitle_color: String,
    title_shadow: String,
    brand_color: String,
    page_break_before: bool,
}

/// Map the `v_align` keyword to a CSS `place-items` value.
pub fn place_items(v_align: &str) -> &'static str {
    match v_align.trim().to_lowercase().as_str() {
        "top" => "start",
        "bottom" => "end",
        _ => "center",
    }
}

/// Render the front cover from the first `cover` block.
pub fn render(cx: &StageContext<'_>, block: &Block) -> Result<String, RenderError> {
    let settings = cx.settings();
    let b = Some(block);

    let bg = param_or_setting(b, settings, "bg")
        .or_else(|| settings.get("cover_bg"))
        .and_then(|r| cx.assets.resolve(&r));
    let logo = param_or_setting(b, settings, "logo")
        .or_else(|| settings.get("cover_logo"))
        .and_then(|r| cx.assets.resolve(&r));

    let logo_svg_inline = logo
        .as_ref()
        .filter(|l| l.src.to_lowercase().ends_with(".svg"))
        .and_then(|l| cx.assets.read_svg(l));

    let ctx = CoverContext {
        anchor: block.anchor(),
        bg_exists: bg.as_ref().is_some_and(|a| a.exists),
        bg_abs: bg.as_ref().map(|a| a.abs_display()).unwrap_or_default(),
        bg: bg.map(|a| a.src),
        logo_exists: logo.as_ref().is_some_and(|a| a.exists),
        logo_abs: logo.as_ref().map(|a| a.abs_display()).unwrap_or_default(),
        logo: logo.filter(|_| logo_svg_inline.is_none()).map(|a| a.src),
        logo_svg_inline,
        title: block
            .title_text()
            .map(str::to_string)
            .unwrap_or_else(|| text_or(b, settings, "title", "")),
        year: text_or(b, settings, "year", ""),
        subtitle: text_or(b, settings, "subtitle", ""),
        overlay_opacity: number_or(b, settings, "overlay_opacity", 0.4).clamp(0.0, 1.0),
        place_items: place_items(&text_or(b, settings, "v_align", "center")),
        logo_max_w_mm: number_or(b, settings, "logo_max_w_mm", 80.0),
        logo_max_h_mm: number_or(b, settings, "logo_max_h_mm", 40.0),
        gap_mm: number_or(b, settings, "gap_mm", 6.0),
        title_size_pt: number_or(b, settings, "title_size_pt", 36.0),
        subtitle_size_pt: number_or(b, settings, "subtitle_size_pt", 16.0),
        title_color: css_param(b, settings, "title_color", "#FFFFFF"),
        subtitle_color: css_param(b, settings, "subtitle_color", "rgba(255,255,255,.95)"),
        title_shadow: css_param(b, settings, "title_shadow", "0 2px 10px rgba(0,0,0,.35)"),
        brand_color: cx.brand(),
        page_break_before: true,
    };
    log::debug!("rendering cover {}", block.id);
    cx.templates.render("cover", &ctx)
}

/// Render the cover when the bundle has a cover block.
pub fn render_first(cx: &StageContext<'_>) -> Result<Option<String>, RenderError> {
    cx.bundle
        .first_of(BlockKind::Cover)
        .map(|block| render(cx, block))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::{bundle_with_root, resolver};
    use crate::template::TemplateSet;
    use serde_json::json;

    #[test]
    fn alignment_keywords() {
        assert_eq!(place_items("top"), "start");
        assert_eq!(place_items("Bottom"), "end");
        assert_eq!(place_items("center"), "center");
        assert_eq!(place_items("sideways"), "center");
    }

    #[test]
    fn inlines_existing_svg_logo() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("logo.svg"), r#"<svg id="brand-logo"></svg>"#).unwrap();
        let bundle = bundle_with_root(
            json!({"settings": {"title": "Catalog 2025", "year": 2025, "cover_logo": "logo.svg",
                                "cover_bg": "images/missing.jpg"}}),
            dir.path(),
            false,
        );
        let templates = TemplateSet::builtin().unwrap();
        let assets = resolver(&bundle);
        let cx = StageContext::new(&bundle, &templates, &assets);

        let html = render_first(&cx).unwrap().unwrap();
        assert!(html.contains(r#"<svg id="brand-logo"></svg>"#));
        assert!(!html.contains(r#"src="logo.svg""#));
        assert!(html.contains("Catalog 2025"));
        assert!(html.contains("2025"));
        assert!(html.contains("background not found: images/missing.jpg"));
    }

    #[test]
    fn missing_svg_logo_falls_back_to_img() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = bundle_with_root(json!({"settings": {"cover_logo": "logo.svg"}}), dir.path(), false);
        let templates = TemplateSet::builtin().unwrap();
        let assets = resolver(&bundle);
        let cx = StageContext::new(&bundle, &templates, &assets);

        let html = render_first(&cx).unwrap().unwrap();
        assert!(html.contains(r#"src="logo.svg""#));
        assert!(html.contains("logo not found"));
    }

    #[test]
    fn cover_params_override_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = bundle_with_root(json!({"settings": {"subtitle": "Settings subtitle"}}), dir.path(), false);
        let mut blocks = bundle.blocks().to_vec();
        blocks[0].params.insert("subtitle".into(), json!("Block subtitle"));
        blocks[0].params.insert("v_align".into(), json!("bottom"));
        bundle.replace_blocks(blocks);

        let templates = TemplateSet::builtin().unwrap();
        let assets = resolver(&bundle);
        let cx = StageContext::new(&bundle, &templates, &assets);
        let html = render_first(&cx).unwrap().unwrap();
        assert!(html.contains("Block subtitle"));
        assert!(!html.contains("Settings subtitle"));
        assert!(html.contains("place-items: end"));
    }

    #[test]
    fn no_cover_block_no_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = bundle_with_root(json!({}), dir.path(), false);
        let blocks = bundle.blocks().iter().filter(|b| b.kind != BlockKind::Cover).cloned().collect();
        bundle.replace_blocks(blocks);
        let templates = TemplateSet::builtin().unwrap();
        let assets = resolver(&bundle);
        let cx = StageContext::new(&bundle, &templates, &assets);
        assert_eq!(render_first(&cx).unwrap(), None);
    }
}
