//! Table-of-contents hierarchy resolver.
//!
//! Rebuilds a two-level contents tree (section → series) from the flat
//! block list. Heading levels come from an explicit `toc_level` parameter
//! when present, and are otherwise inferred by counting `section_heading`
//! ancestors along the `parent_id` chain. The resolver depends only on type
//! tags and parent links, so hand-edited block lists resolve the same way as
//! builder output.

use serde::Serialize;

use crate::blocks::{Block, BlockKind, ModelBundle};
use crate::error::BlockError;

/// Hard cap on parent-chain steps.
pub const MAX_PARENT_DEPTH: usize = 100;

/// One contents line. Only level-1 entries carry children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub title: String,
    pub anchor: String,
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    fn new(level: u8, title: &str, block: &Block) -> Self {
        Self {
            level,
            title: title.to_string(),
            anchor: block.anchor(),
            children: Vec::new(),
        }
    }
}

/// Ancestors of `block`, nearest first. A missing parent ends the chain.
///
/// # Errors
///
/// [`BlockError::ParentCycle`] when the chain is longer than
/// [`MAX_PARENT_DEPTH`].
pub fn ancestors<'a>(bundle: &'a ModelBundle, block: &'a Block) -> Result<Vec<&'a Block>, BlockError> {
    let mut chain = Vec::new();
    let mut current = block;
    while let Some(parent) = bundle.parent_of(current) {
        if chain.len() == MAX_PARENT_DEPTH {
            return Err(BlockError::ParentCycle {
                id: block.id.clone(),
                limit: MAX_PARENT_DEPTH,
            });
        }
        chain.push(parent);
        current = parent;
    }
    Ok(chain)
}

fn explicit_level(block: &Block) -> Option<u8> {
    match block.param_usize("toc_level") {
        Some(1) => Some(1),
        Some(2) => Some(2),
        _ => None,
    }
}

/// TOC level of a `section_heading`: the explicit hint when it is 1 or 2,
/// otherwise 1 with no heading ancestors and 2 with any. Deeper nesting
/// collapses to 2.
pub fn heading_level(bundle: &ModelBundle, block: &Block) -> Result<u8, BlockError> {
    if let Some(level) = explicit_level(block) {
        return Ok(level);
    }
    let heading_ancestors = ancestors(bundle, block)?
        .iter()
        .filter(|b| b.kind == BlockKind::SectionHeading)
        .count();
    Ok(if heading_ancestors == 0 { 1 } else { 2 })
}

/// Resolve the contents tree for `bundle`.
///
/// A block is listed when its `show_in_toc` flag is set; a `show_in_toc`
/// parameter, when present, overrides the flag.
///
/// # Errors
///
/// Propagates [`BlockError::ParentCycle`] from level inference.
pub fn resolve_toc(bundle: &ModelBundle) -> Result<Vec<TocEntry>, BlockError> {
    let mut entries: Vec<TocEntry> = Vec::new();
    let mut open: Option<usize> = None;

    for block in bundle.blocks() {
        let included = block.param_flag("show_in_toc").unwrap_or(block.show_in_toc);

        let (level, title) = match block.kind {
            BlockKind::SectionHeading => {
                let level = heading_level(bundle, block)?;
                match (included, block.title_text()) {
                    (false, _) | (_, None) => {
                        if level == 1 {
                            open = None;
                        }
                        continue;
                    }
                    (_, Some(title)) => (level, title.to_string()),
                }
            }
            BlockKind::SpecTable => {
                if !included {
                    continue;
                }
                let title = block
                    .title_text()
                    .map(str::to_string)
                    .or_else(|| block.first_sku());
                let Some(title) = title else { continue };
                (2, title)
            }
            _ => {
                if !included {
                    continue;
                }
                let Some(title) = block.title_text() else { continue };
                (explicit_level(block).unwrap_or(1), title.to_string())
            }
        };

        let entry = TocEntry::new(level, &title, block);
        if level == 1 {
            entries.push(entry);
            open = Some(entries.len() - 1);
        } else if let Some(parent) = open {
            entries[parent].children.push(entry);
        } else {
            entries.push(entry);
        }
    }

    log::debug!("resolved {} top-level TOC entr(ies)", entries.len());
    Ok(entries)
}
