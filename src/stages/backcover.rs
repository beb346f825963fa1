//! Back cover page with company contacts.

use serde::Serialize;

use super::{StageContext, css_param, number_or, param_or_setting, text_or};
use crate::blocks::{Block, BlockKind};
use crate::error::RenderError;

#[derive(Debug, Serialize)]
struct BackcoverContext {
    anchor: String,
    bg_img: Option<String>,
    bg_img_exists: bool,
    bg_color: String,
    logo: Option<String>,
    text: String,
    text_size_pt: f64,
    company_name: String,
    company_address: String,
    company_contacts: String,
    company_site: String,
    gap_mm: f64,
    page_break_before: bool,
}

/// Render the back cover from a `backcover` block.
pub fn render(cx: &StageContext<'_>, block: &Block) -> Result<String, RenderError> {
    let settings = cx.settings();
    let b = Some(block);

    let bg = param_or_setting(b, settings, "backcover_bg")
        .or_else(|| block.param_str("bg"))
        .and_then(|r| cx.assets.resolve(&r));
    let logo = param_or_setting(b, settings, "backcover_logo").and_then(|r| cx.assets.resolve(&r));

    let ctx = BackcoverContext {
        anchor: block.anchor(),
        bg_img_exists: bg.as_ref().is_some_and(|a| a.exists),
        bg_img: bg.map(|a| a.src),
        bg_color: css_param(b, settings, "backcover_bg_color", &cx.brand()),
        logo: logo.map(|a| a.src),
        text: text_or(b, settings, "backcover_text", ""),
        text_size_pt: number_or(b, settings, "backcover_text_size_pt", 12.0),
        company_name: text_or(b, settings, "company_name", ""),
        company_address: text_or(b, settings, "company_address", ""),
        company_contacts: param_or_setting(b, settings, "company_contacts")
            .or_else(|| settings.get("contacts"))
            .unwrap_or_default(),
        company_site: text_or(b, settings, "company_site", ""),
        gap_mm: number_or(b, settings, "backcover_gap_mm", 8.0),
        page_break_before: true,
    };
    log::debug!("rendering back cover {}", block.id);
    cx.templates.render("backcover", &ctx)
}

/// Render the back cover when the bundle has a backcover block.
pub fn render_first(cx: &StageContext<'_>) -> Result<Option<String>, RenderError> {
    cx.bundle
        .first_of(BlockKind::Backcover)
        .map(|block| render(cx, block))
        .transpose()
}
