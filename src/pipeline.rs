//! Stage orchestration: bundle in, HTML document out.
//!
//! Fragment order is fixed: cover, contents, then per section its cover
//! followed by each series' detail pages, product pages and model pages,
//! and finally the back cover. Both covers are left out when the runtime
//! settings turn covers off.

use crate::assemble::assemble_document;
use crate::assets::AssetResolver;
use crate::blocks::ModelBundle;
use crate::error::RenderError;
use crate::stages::{self, StageContext};
use crate::template::TemplateSet;
use crate::views;

/// Run every stage and collect the fragments in document order.
pub fn render_fragments(cx: &StageContext<'_>) -> Result<Vec<String>, RenderError> {
    let bundle = cx.bundle;
    let covers = bundle.settings.has_cover();
    let mut fragments = Vec::new();

    if covers && let Some(cover) = stages::cover::render_first(cx)? {
        fragments.push(cover);
    }
    fragments.push(stages::toc::render(cx)?);

    for section in views::sections(bundle) {
        fragments.push(stages::section_cover::render(cx, &section)?);
        for series in section.series(bundle) {
            fragments.push(stages::series_detail::render(cx, &series)?);
            if let Some(products) = stages::products::render(cx, &series)? {
                fragments.push(products);
            }
            for block in series.spec_tables(bundle) {
                fragments.push(stages::spec_table::render(cx, block)?);
            }
        }
    }

    if covers && let Some(backcover) = stages::backcover::render_first(cx)? {
        fragments.push(backcover);
    }
    log::debug!("rendered {} fragment(s)", fragments.len());
    Ok(fragments)
}

/// Verify the block list, render all fragments and assemble the document.
pub fn render_document(
    bundle: &ModelBundle,
    templates: &TemplateSet,
    assets: &AssetResolver,
) -> Result<String, RenderError> {
    bundle.check_integrity()?;
    let cx = StageContext::new(bundle, templates, assets);
    let fragments = render_fragments(&cx)?;
    assemble_document(templates, &bundle.settings, &fragments)
}
