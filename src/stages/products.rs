//! Series content pages: tables, images and performance curves.
//!
//! Renders the `table` and `media` role blocks parented to a series heading,
//! in block order, each through the template named after its block type.

use std::fmt::Write as _;

use serde::Serialize;

use super::StageContext;
use crate::blocks::{Block, BlockKind};
use crate::error::RenderError;
use crate::template::escape_html;
use crate::types::CurveDataset;
use crate::views::SeriesView;

const CHART_W: f64 = 600.0;
const CHART_H: f64 = 340.0;
const PAD_LEFT: f64 = 56.0;
const PAD_RIGHT: f64 = 16.0;
const PAD_TOP: f64 = 16.0;
const PAD_BOTTOM: f64 = 44.0;
const TICKS: usize = 5;

/// Line colours, cycled per curve series.
const PALETTE: [&str; 6] = ["#E53935", "#1E88E5", "#43A047", "#FB8C00", "#8E24AA", "#00897B"];

#[derive(Debug, Serialize)]
struct ProductsContext<'a> {
    anchor: String,
    title: &'a str,
    section_title: &'a str,
    items: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TextBlockContext<'a> {
    anchor: String,
    title: Option<&'a str>,
    text_md: String,
    role: &'a str,
    table_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageContext {
    anchor: String,
    src: String,
    exists: bool,
    abs: String,
    caption: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendItem {
    pub label: String,
    pub color: &'static str,
}

#[derive(Debug, Serialize)]
struct CurveContext<'a> {
    anchor: String,
    title: Option<&'a str>,
    caption: String,
    svg: String,
    legend: Vec<LegendItem>,
}

/// Whether a block belongs on the products pages.
pub fn is_content_block(block: &Block) -> bool {
    matches!(block.role(), Some("table" | "media"))
}

/// Render the products fragment for one series. `None` when the series has
/// no table or media blocks.
pub fn render(cx: &StageContext<'_>, view: &SeriesView<'_>) -> Result<Option<String>, RenderError> {
    let mut items = Vec::new();
    for block in view.blocks(cx.bundle).into_iter().filter(|b| is_content_block(b)) {
        items.push(render_block(cx, block)?);
    }
    if items.is_empty() {
        log::debug!("series `{}` has no product content", view.title());
        return Ok(None);
    }

    let ctx = ProductsContext {
        anchor: format!("{}-products", view.anchor()),
        title: view.title(),
        section_title: view.section.title(),
        items,
    };
    cx.templates.render("products", &ctx).map(Some)
}

/// Render a single content block through its block-type template.
pub fn render_block(cx: &StageContext<'_>, block: &Block) -> Result<String, RenderError> {
    match block.kind {
        BlockKind::Curve => match curve_context(block) {
            Some(ctx) => cx.templates.render("curve", &ctx),
            None => {
                log::warn!("curve block {} has no plottable points, rendering as image", block.id);
                cx.templates.render("image_full", &image_context(cx, block))
            }
        },
        BlockKind::ImageFull => cx.templates.render("image_full", &image_context(cx, block)),
        _ => {
            let ctx = TextBlockContext {
                anchor: block.anchor(),
                title: block.title_text(),
                text_md: block.param_str("text_md").unwrap_or_default(),
                role: block.role().unwrap_or("text"),
                table_type: block.param_str("table_type"),
            };
            cx.templates.render("text_block", &ctx)
        }
    }
}

fn image_context(cx: &StageContext<'_>, block: &Block) -> ImageContext {
    let reference = block.param_str("media").unwrap_or_default();
    let asset = cx.assets.resolve(&reference);
    ImageContext {
        anchor: block.anchor(),
        exists: asset.as_ref().is_some_and(|a| a.exists),
        abs: asset.as_ref().map(|a| a.abs_display()).unwrap_or_default(),
        src: asset.map(|a| a.src).unwrap_or(reference),
        caption: block.param_str("caption").unwrap_or_default(),
    }
}

fn curve_context(block: &Block) -> Option<CurveContext<'_>> {
    let dataset: CurveDataset = serde_json::from_value(block.params.get("dataset")?.clone()).ok()?;
    let svg = curve_svg(&dataset)?;
    Some(CurveContext {
        anchor: block.anchor(),
        title: block.title_text(),
        caption: block.param_str("caption").unwrap_or_default(),
        svg,
        legend: legend(&dataset),
    })
}

/// Legend entries for the non-empty series of a dataset.
pub fn legend(dataset: &CurveDataset) -> Vec<LegendItem> {
    dataset
        .series
        .iter()
        .filter(|s| !s.points.is_empty())
        .enumerate()
        .map(|(i, s)| LegendItem {
            label: if s.label.trim().is_empty() {
                format!("Series {}", i + 1)
            } else {
                s.label.clone()
            },
            color: PALETTE[i % PALETTE.len()],
        })
        .collect()
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() {
        return None;
    }
    if (hi - lo).abs() < f64::EPSILON {
        Some((lo - 1.0, hi + 1.0))
    } else {
        Some((lo, hi))
    }
}

fn tick_label(v: f64) -> String {
    if v.fract().abs() < 1e-9 {
        format!("{v:.0}")
    } else {
        format!("{v:.1}")
    }
}

/// Inline SVG chart: one polyline per series, axes labelled with units.
/// `None` when the dataset has no points at all.
pub fn curve_svg(dataset: &CurveDataset) -> Option<String> {
    let points = || dataset.series.iter().flat_map(|s| s.points.iter());
    let (x_min, x_max) = bounds(points().map(|p| p.0))?;
    let (y_lo, y_hi) = bounds(points().map(|p| p.1))?;
    let (y_min, y_max) = (y_lo.min(0.0), y_hi);

    let plot_w = CHART_W - PAD_LEFT - PAD_RIGHT;
    let plot_h = CHART_H - PAD_TOP - PAD_BOTTOM;
    let sx = |x: f64| PAD_LEFT + (x - x_min) / (x_max - x_min) * plot_w;
    let sy = |y: f64| PAD_TOP + plot_h - (y - y_min) / (y_max - y_min) * plot_h;

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {CHART_W} {CHART_H}" class="curve-chart">"#
    );

    for i in 0..=TICKS {
        let t = i as f64 / TICKS as f64;
        let gy = PAD_TOP + plot_h * (1.0 - t);
        let gx = PAD_LEFT + plot_w * t;
        let _ = write!(
            svg,
            r##"<line x1="{PAD_LEFT}" y1="{gy:.1}" x2="{:.1}" y2="{gy:.1}" stroke="#e0e0e0" stroke-width="0.5"/>"##,
            PAD_LEFT + plot_w
        );
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="9" text-anchor="end">{}</text>"#,
            PAD_LEFT - 4.0,
            gy + 3.0,
            tick_label(y_min + (y_max - y_min) * t)
        );
        let _ = write!(
            svg,
            r#"<text x="{gx:.1}" y="{:.1}" font-size="9" text-anchor="middle">{}</text>"#,
            PAD_TOP + plot_h + 12.0,
            tick_label(x_min + (x_max - x_min) * t)
        );
    }

    let _ = write!(
        svg,
        r##"<path d="M{PAD_LEFT} {PAD_TOP} V{:.1} H{:.1}" fill="none" stroke="#333" stroke-width="1"/>"##,
        PAD_TOP + plot_h,
        PAD_LEFT + plot_w
    );

    for (i, series) in dataset.series.iter().filter(|s| !s.points.is_empty()).enumerate() {
        let coords: Vec<String> = series
            .points
            .iter()
            .map(|&(x, y)| format!("{:.1},{:.1}", sx(x), sy(y)))
            .collect();
        let _ = write!(
            svg,
            r#"<polyline fill="none" stroke="{}" stroke-width="2" points="{}"><title>{}</title></polyline>"#,
            PALETTE[i % PALETTE.len()],
            coords.join(" "),
            escape_html(&series.label)
        );
    }

    if !dataset.x_unit.trim().is_empty() {
        let _ = write!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="middle">{}</text>"#,
            PAD_LEFT + plot_w / 2.0,
            CHART_H - 6.0,
            escape_html(dataset.x_unit.trim())
        );
    }
    if !dataset.y_unit.trim().is_empty() {
        let _ = write!(
            svg,
            r#"<text x="12" y="{:.1}" font-size="10" text-anchor="middle" transform="rotate(-90 12 {:.1})">{}</text>"#,
            PAD_TOP + plot_h / 2.0,
            PAD_TOP + plot_h / 2.0,
            escape_html(dataset.y_unit.trim())
        );
    }

    svg.push_str("</svg>");
    Some(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::{bundle_with_root, resolver};
    use crate::template::TemplateSet;
    use crate::types::CurveSeries;
    use crate::views;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dataset() -> CurveDataset {
        CurveDataset {
            x_unit: "m³/h".into(),
            y_unit: "Pa".into(),
            series: vec![
                CurveSeries {
                    label: "VR-1 <max>".into(),
                    points: vec![(0.0, 400.0), (500.0, 300.0), (1000.0, 0.0)],
                },
                CurveSeries {
                    label: String::new(),
                    points: vec![(0.0, 200.0), (600.0, 0.0)],
                },
                CurveSeries {
                    label: "empty".into(),
                    points: vec![],
                },
            ],
        }
    }

    #[test]
    fn svg_has_one_polyline_per_series() {
        let svg = curve_svg(&dataset()).unwrap();
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("m³/h"));
        assert!(svg.contains(">Pa</text>"));
        assert!(svg.contains("VR-1 &lt;max&gt;"));
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn polyline_spans_plot_area() {
        let svg = curve_svg(&dataset()).unwrap();
        // (0, 400) is the top-left corner of the plot, (1000, 0) the bottom-right.
        assert!(svg.contains(r#"points="56.0,16.0 "#));
        assert!(svg.contains("584.0,296.0\""));
    }

    #[test]
    fn empty_dataset_has_no_chart() {
        assert_eq!(curve_svg(&CurveDataset::default()), None);
    }

    #[test]
    fn legend_skips_empty_series_and_names_unlabelled() {
        let legend = legend(&dataset());
        assert_eq!(legend.len(), 2);
        assert_eq!(legend[1].label, "Series 2");
        assert_eq!(legend[0].color, PALETTE[0]);
    }

    #[test]
    fn renders_tables_and_media_in_block_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("drawing.png"), b"png").unwrap();
        let bundle = bundle_with_root(
            json!({"sections": [{"title": "Fans", "intro_md": "Intro text", "series": [{
                "name": "VR", "summary_md": "Not a product block",
                "tables": [{"type": "technical", "title": "Specs",
                            "columns": [{"key": "m", "title": "Model"}], "rows": [{"m": "VR-1"}]}],
                "media": [
                    {"type": "drawing", "file": "drawing.png", "caption": "Dimensions"},
                    {"type": "curve", "file": "curve.png", "caption": "Airflow",
                     "dataset": {"x_unit": "m³/h", "y_unit": "Pa",
                                 "series": [{"label": "VR-1", "points": [[0, 100], [200, 0]]}]}}
                ]
            }]}]}),
            dir.path(),
            false,
        );
        let templates = TemplateSet::builtin().unwrap();
        let assets = resolver(&bundle);
        let cx = StageContext::new(&bundle, &templates, &assets);
        let sections = views::sections(&bundle);
        let series = sections[0].series(&bundle);

        let html = render(&cx, &series[0]).unwrap().unwrap();
        let table = html.find("<td>VR-1</td>").unwrap();
        let image = html.find(r#"src="drawing.png""#).unwrap();
        let curve = html.find("<polyline").unwrap();
        assert!(table < image && image < curve);
        assert!(html.contains("table-technical"));
        assert!(!html.contains("Not a product block"));
        assert!(!html.contains("Intro text"));
    }

    #[test]
    fn series_without_content_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = bundle_with_root(
            json!({"sections": [{"series": [{"name": "Bare", "summary_md": "Only text"}]}]}),
            dir.path(),
            false,
        );
        let templates = TemplateSet::builtin().unwrap();
        let assets = resolver(&bundle);
        let cx = StageContext::new(&bundle, &templates, &assets);
        let sections = views::sections(&bundle);
        assert_eq!(render(&cx, &sections[0].series(&bundle)[0]).unwrap(), None);
    }

    #[test]
    fn unplottable_curve_falls_back_to_image() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = bundle_with_root(json!({}), dir.path(), false);
        let templates = TemplateSet::builtin().unwrap();
        let assets = resolver(&bundle);
        let cx = StageContext::new(&bundle, &templates, &assets);

        let mut block = Block::new("c1", BlockKind::Curve, 0);
        block.params.insert("media".into(), json!("curve.png"));
        block.params.insert("dataset".into(), json!({"series": [{"label": "x", "points": []}]}));
        let html = render_block(&cx, &block).unwrap();
        assert!(html.contains("image not found: curve.png"));
    }
}
