//! Two-page series presentation: hero and description, then construction,
//! features and tags.

use serde::Serialize;

use super::StageContext;
use crate::error::RenderError;
use crate::views::SeriesView;

#[derive(Debug, Serialize)]
struct HeroImage {
    src: String,
    exists: bool,
    abs: String,
}

#[derive(Debug, Serialize)]
struct SeriesDetailContext<'a> {
    anchor: String,
    anchor_p2: String,
    title: &'a str,
    code: &'a str,
    section_title: &'a str,
    hero: Option<HeroImage>,
    banner_md: &'a str,
    description_md: &'a str,
    construction_md: &'a str,
    construction_label: &'static str,
    features: Vec<String>,
    features_label: &'static str,
    tags: Vec<&'a str>,
    brand: String,
}

/// One bullet per non-empty line, leading list markers removed.
pub fn feature_lines(features: &str) -> Vec<String> {
    features
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| line.strip_prefix("• "))
                .unwrap_or(line)
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn render(cx: &StageContext<'_>, view: &SeriesView<'_>) -> Result<String, RenderError> {
    let series = view.series;
    let anchor = view.anchor();
    let hero = cx.assets.resolve(&series.hero.photo).map(|a| HeroImage {
        exists: a.exists,
        abs: a.abs_display(),
        src: a.src,
    });

    let ctx = SeriesDetailContext {
        anchor_p2: format!("{anchor}-p2"),
        anchor,
        title: view.title(),
        code: series.code.trim(),
        section_title: view.section.title(),
        hero,
        banner_md: series.hero.banner_md.trim(),
        description_md: series.summary_md.trim(),
        construction_md: series.construction_md.trim(),
        construction_label: "Construction",
        features: feature_lines(&series.features),
        features_label: "Features",
        tags: series
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect(),
        brand: cx.brand(),
    };
    log::debug!("rendering series detail `{}`", ctx.title);
    cx.templates.render("series_detail", &ctx)
}
