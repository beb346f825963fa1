//! Table of contents page.

use serde::Serialize;

use super::StageContext;
use crate::blocks::BlockKind;
use crate::error::RenderError;
use crate::toc::{TocEntry, resolve_toc};

#[derive(Debug, Serialize)]
struct TocContext<'a> {
    title: &'a str,
    anchor: String,
    page_break_before: bool,
    entries: &'a [TocEntry],
}

/// Resolve the contents tree and render it under the `toc` block's title.
pub fn render(cx: &StageContext<'_>) -> Result<String, RenderError> {
    let entries = resolve_toc(cx.bundle)?;
    let block = cx.bundle.first_of(BlockKind::Toc);
    let ctx = TocContext {
        title: block.and_then(|b| b.title_text()).unwrap_or("Contents"),
        anchor: block.map(|b| b.anchor()).unwrap_or_else(|| "toc".to_string()),
        page_break_before: block.is_none_or(|b| b.page_break_before),
        entries: &entries,
    };
    log::debug!("rendering toc with {} top-level entr(ies)", entries.len());
    cx.templates.render("toc", &ctx)
}
