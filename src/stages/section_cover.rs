//! Full-page section openers.

use serde::Serialize;
use serde_json::Value;

use super::{StageContext, css_param, flag_or, text_or};
use crate::error::RenderError;
use crate::types::{Section, Settings};
use crate::views::SectionView;

/// Default image location pattern.
pub const DEFAULT_PATTERN: &str = "images/{code}.jpg";
/// Subtitle length limit, in characters.
pub const SUBTITLE_MAX: usize = 180;

#[derive(Debug, Serialize)]
struct SectionCoverContext {
    anchor: String,
    image: String,
    image_abs: String,
    image_exists: bool,
    title: String,
    subtitle: String,
    align: String,
    pos: String,
    text_color: String,
    use_shadow: bool,
    use_gradient: bool,
    brand: String,
}

/// ASCII slug used in place of a missing section code.
fn code_from_title(title: &str) -> String {
    let mut out = String::new();
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let out = out.trim_matches('-');
    if out.is_empty() { "section".to_string() } else { out.to_string() }
}

/// Relative image reference for a section cover.
///
/// `section_cover_map[code]` wins; otherwise `section_cover_pattern`
/// (default [`DEFAULT_PATTERN`]) with `{code}` and `{title}` substituted.
pub fn image_src(section: &Section, settings: &Settings) -> String {
    let code = section.code.trim();
    if !code.is_empty()
        && let Some(Value::Object(map)) = settings.get_value("section_cover_map")
        && let Some(Value::String(src)) = map.get(code)
        && !src.trim().is_empty()
    {
        return src.trim().to_string();
    }

    let code = if code.is_empty() {
        code_from_title(&section.title)
    } else {
        code.to_string()
    };
    settings
        .get("section_cover_pattern")
        .unwrap_or_else(|| DEFAULT_PATTERN.to_string())
        .replace("{code}", &code)
        .replace("{title}", &section.title)
}

/// First line of `markdown`, stripped of `**`, `__` and backticks, truncated
/// to [`SUBTITLE_MAX`] characters with an ellipsis.
pub fn first_line(markdown: &str) -> String {
    let Some(line) = markdown.trim().lines().next() else {
        return String::new();
    };
    let plain = line.trim().replace("**", "").replace("__", "").replace('`', "");
    if plain.chars().count() > SUBTITLE_MAX {
        let cut: String = plain.chars().take(SUBTITLE_MAX - 1).collect();
        format!("{}…", cut.trim_end())
    } else {
        plain
    }
}

/// Render the opener for one section.
pub fn render(cx: &StageContext<'_>, view: &SectionView<'_>) -> Result<String, RenderError> {
    let settings = cx.settings();
    let src = image_src(view.section, settings);
    let asset = cx.assets.resolve(&src);

    let ctx = SectionCoverContext {
        anchor: view.anchor(),
        image_exists: asset.as_ref().is_some_and(|a| a.exists),
        image_abs: asset.as_ref().map(|a| a.abs_display()).unwrap_or_default(),
        image: asset.map(|a| a.src).unwrap_or(src),
        title: view.title().to_string(),
        subtitle: first_line(&view.section.intro_md),
        align: text_or(None, settings, "section_cover_title_align", "left").to_lowercase(),
        pos: text_or(None, settings, "section_cover_title_pos", "bottom-left").to_lowercase(),
        text_color: css_param(None, settings, "section_cover_text_color", "#fff"),
        use_shadow: flag_or(None, settings, "section_cover_shadow", true),
        use_gradient: flag_or(None, settings, "section_cover_gradient", true),
        brand: cx.brand(),
    };
    log::debug!("rendering section cover `{}`", ctx.title);
    cx.templates.render("section_cover", &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::{bundle_with_root, resolver};
    use crate::template::TemplateSet;
    use crate::views;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn section(code: &str, title: &str) -> Section {
        Section {
            code: code.into(),
            title: title.into(),
            ..Section::default()
        }
    }

    #[test]
    fn image_from_map_then_pattern() {
        let settings: Settings = serde_json::from_value(json!({
            "section_cover_map": {"fans": "covers/fans-special.png"},
            "section_cover_pattern": "covers/{code}-{title}.jpg"
        }))
        .unwrap();
        assert_eq!(image_src(&section("fans", "Fans"), &settings), "covers/fans-special.png");
        assert_eq!(image_src(&section("heat", "Heaters"), &settings), "covers/heat-Heaters.jpg");
    }

    #[test]
    fn default_pattern_and_title_slug() {
        let settings = Settings::default();
        assert_eq!(image_src(&section("fans", ""), &settings), "images/fans.jpg");
        assert_eq!(image_src(&section("", "Air Curtains!"), &settings), "images/Air-Curtains.jpg");
        assert_eq!(image_src(&section("", "Вентиляторы"), &settings), "images/section.jpg");
    }

    #[test]
    fn subtitle_is_first_plain_line() {
        assert_eq!(first_line("**Quiet** `fans`\nSecond line"), "Quiet fans");
        assert_eq!(first_line(""), "");
        let long = "x".repeat(300);
        let s = first_line(&long);
        assert_eq!(s.chars().count(), SUBTITLE_MAX);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn renders_with_existing_image() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images/fans.jpg"), b"jpg").unwrap();
        let bundle = bundle_with_root(
            json!({"settings": {"section_cover_title_pos": "TOP-RIGHT"},
                   "sections": [{"code": "fans", "title": "Fans", "intro_md": "Axial and __duct__ fans"},
                                {"code": "heat", "title": "Heaters"}]}),
            dir.path(),
            false,
        );
        let templates = TemplateSet::builtin().unwrap();
        let assets = resolver(&bundle);
        let cx = StageContext::new(&bundle, &templates, &assets);
        let sections = views::sections(&bundle);

        let html = render(&cx, &sections[0]).unwrap();
        assert!(html.contains(r#"src="images/fans.jpg""#));
        assert!(html.contains("Axial and duct fans"));
        assert!(html.contains("pos-top-right"));
        assert!(html.contains(&sections[0].anchor()));

        let html = render(&cx, &sections[1]).unwrap();
        assert!(html.contains("section image not found: images/heat.jpg"));
    }
}
