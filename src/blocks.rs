//! Render blocks and the [`ModelBundle`] aggregate.
//!
//! A [`Block`] is the unit the render stages and the table of contents work
//! on. Blocks form a flat, totally ordered sequence; `parent_id` links lay a
//! tree over it. The bundle keeps an identifier → position index that is
//! rebuilt from scratch whenever the block list changes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BlockError;
use crate::types::{RuntimeSettings, Section, Series, Settings, lenient};

/// Type-specific block parameters.
pub type Params = Map<String, Value>;

/// Closed set of block types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Cover,
    Toc,
    SectionHeading,
    TextBlock,
    ImageFull,
    Curve,
    SpecTable,
    Backcover,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Toc => "toc",
            Self::SectionHeading => "section_heading",
            Self::TextBlock => "text_block",
            Self::ImageFull => "image_full",
            Self::Curve => "curve",
            Self::SpecTable => "spec_table",
            Self::Backcover => "backcover",
        }
    }
}

/// Atomic renderable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub page_break_before: bool,
    #[serde(default)]
    pub show_in_toc: bool,
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Block {
    pub fn new(id: impl Into<String>, kind: BlockKind, order: i64) -> Self {
        Self {
            id: id.into(),
            kind,
            title: None,
            subtitle: None,
            params: Params::new(),
            page_break_before: false,
            show_in_toc: false,
            order,
            parent_id: None,
        }
    }

    /// In-document anchor targeted by TOC links.
    pub fn anchor(&self) -> String {
        anchor_for(&self.id)
    }

    pub fn param_str(&self, key: &str) -> Option<String> {
        param_string(&self.params, key)
    }

    pub fn param_flag(&self, key: &str) -> Option<bool> {
        param_flag(&self.params, key)
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(lenient::value_to_f64)
    }

    /// First entry of a comma-separated `sku` parameter.
    pub fn first_sku(&self) -> Option<String> {
        self.param_str("sku")?
            .split(',')
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn param_usize(&self, key: &str) -> Option<usize> {
        param_usize(&self.params, key)
    }

    /// Content role assigned by the block builder (`intro`, `hero`, …).
    pub fn role(&self) -> Option<&str> {
        self.params.get("role").and_then(Value::as_str)
    }

    /// Non-empty title, if any.
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Anchor for a block identifier: `sec-{id}`.
pub fn anchor_for(id: &str) -> String {
    format!("sec-{id}")
}

// ------------------------------------------------------------------
// Parameter extraction helpers
// ------------------------------------------------------------------

/// Non-empty text of a scalar parameter.
pub fn param_string(params: &Params, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(lenient::value_to_string)
        .filter(|s| !s.is_empty())
}

/// Lenient boolean parameter; `None` when absent or unrecognized.
pub fn param_flag(params: &Params, key: &str) -> Option<bool> {
    params.get(key).and_then(lenient::value_to_flag)
}

/// Non-negative integer parameter, accepting numeric strings.
pub fn param_usize(params: &Params, key: &str) -> Option<usize> {
    match params.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ------------------------------------------------------------------
// ModelBundle
// ------------------------------------------------------------------

/// Aggregate root: source data plus the render block list.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub settings: Settings,
    pub sections: Vec<Section>,
    blocks: Vec<Block>,
    index: HashMap<String, usize>,
}

impl ModelBundle {
    /// Create a bundle. Blocks are sorted by `order` (stable) and indexed.
    pub fn new(settings: Settings, sections: Vec<Section>, blocks: Vec<Block>) -> Self {
        let mut bundle = Self {
            settings,
            sections,
            blocks: Vec::new(),
            index: HashMap::new(),
        };
        bundle.replace_blocks(blocks);
        bundle
    }

    /// Attach driver-computed runtime settings.
    pub fn with_runtime(mut self, runtime: RuntimeSettings) -> Self {
        self.settings = std::mem::take(&mut self.settings).with_runtime(runtime);
        self
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Swap in a new block list and rebuild the index.
    pub fn replace_blocks(&mut self, mut blocks: Vec<Block>) {
        blocks.sort_by_key(|b| b.order);
        self.blocks = blocks;
        self.rebuild_index();
    }

    /// Rebuild the identifier index from the current block list.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .blocks
            .iter()
            .enumerate()
            .map(|(pos, b)| (b.id.clone(), pos))
            .collect();
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.position(id).map(|pos| &self.blocks[pos])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn parent_of(&self, block: &Block) -> Option<&Block> {
        block.parent_id.as_deref().and_then(|pid| self.get(pid))
    }

    /// Direct children of a block, in render order.
    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.blocks
            .iter()
            .filter(move |b| b.parent_id.as_deref() == Some(id))
    }

    pub fn first_of(&self, kind: BlockKind) -> Option<&Block> {
        self.blocks.iter().find(|b| b.kind == kind)
    }

    pub fn blocks_of(&self, kind: BlockKind) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.kind == kind)
    }

    /// The level-1 heading emitted for `sections[section_index]`.
    pub fn section_heading(&self, section_index: usize) -> Option<&Block> {
        self.blocks_of(BlockKind::SectionHeading).find(|b| {
            b.param_usize("section_index") == Some(section_index)
                && !b.params.contains_key("series_index")
        })
    }

    /// The level-2 heading emitted for `sections[s].series[i]`.
    pub fn series_heading(&self, section_index: usize, series_index: usize) -> Option<&Block> {
        self.blocks_of(BlockKind::SectionHeading).find(|b| {
            b.param_usize("section_index") == Some(section_index)
                && b.param_usize("series_index") == Some(series_index)
        })
    }

    pub fn series(&self, section_index: usize, series_index: usize) -> Option<&Series> {
        self.sections.get(section_index)?.series.get(series_index)
    }

    /// Verify the block-list invariants: unique identifiers, strictly
    /// increasing orders, and parents that exist and precede their children.
    pub fn check_integrity(&self) -> Result<(), BlockError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut previous: Option<i64> = None;

        for (pos, block) in self.blocks.iter().enumerate() {
            if !seen.insert(block.id.as_str()) {
                return Err(BlockError::DuplicateId(block.id.clone()));
            }
            if let Some(prev) = previous
                && block.order <= prev
            {
                return Err(BlockError::OrderNotIncreasing {
                    id: block.id.clone(),
                    order: block.order,
                    previous: prev,
                });
            }
            previous = Some(block.order);

            if let Some(parent) = &block.parent_id {
                match self.position(parent) {
                    None => {
                        return Err(BlockError::DanglingParent {
                            id: block.id.clone(),
                            parent: parent.clone(),
                        });
                    }
                    Some(parent_pos) if parent_pos >= pos => {
                        return Err(BlockError::ForwardParent {
                            id: block.id.clone(),
                            parent: parent.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn block(id: &str, kind: BlockKind, order: i64, parent: Option<&str>) -> Block {
        Block {
            parent_id: parent.map(str::to_string),
            ..Block::new(id, kind, order)
        }
    }

    fn bundle(blocks: Vec<Block>) -> ModelBundle {
        ModelBundle::new(Settings::default(), Vec::new(), blocks)
    }

    #[test]
    fn blocks_are_sorted_and_indexed() {
        let b = bundle(vec![
            block("b", BlockKind::TextBlock, 20, Some("a")),
            block("a", BlockKind::SectionHeading, 10, None),
        ]);
        let ids: Vec<&str> = b.blocks().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(b.position("b"), Some(1));
        assert_eq!(b.parent_of(&b.blocks()[1]).map(|p| p.id.as_str()), Some("a"));
        assert!(b.check_integrity().is_ok());
    }

    #[test]
    fn replacing_blocks_rebuilds_index() {
        let mut b = bundle(vec![block("a", BlockKind::Toc, 0, None)]);
        b.replace_blocks(vec![block("z", BlockKind::Toc, 0, None)]);
        assert!(b.get("a").is_none());
        assert_eq!(b.get("z").map(|b| b.kind), Some(BlockKind::Toc));
    }

    #[test]
    fn integrity_detects_duplicate_ids() {
        let b = bundle(vec![
            block("a", BlockKind::Toc, 0, None),
            block("a", BlockKind::Backcover, 10, None),
        ]);
        assert_eq!(b.check_integrity(), Err(BlockError::DuplicateId("a".into())));
    }

    #[test]
    fn integrity_detects_repeated_order() {
        let b = bundle(vec![
            block("a", BlockKind::Toc, 10, None),
            block("b", BlockKind::Backcover, 10, None),
        ]);
        assert!(matches!(
            b.check_integrity(),
            Err(BlockError::OrderNotIncreasing { order: 10, previous: 10, .. })
        ));
    }

    #[test]
    fn integrity_detects_dangling_and_forward_parents() {
        let b = bundle(vec![block("a", BlockKind::TextBlock, 0, Some("ghost"))]);
        assert!(matches!(b.check_integrity(), Err(BlockError::DanglingParent { .. })));

        let b = bundle(vec![
            block("child", BlockKind::TextBlock, 0, Some("parent")),
            block("parent", BlockKind::SectionHeading, 10, None),
        ]);
        assert!(matches!(b.check_integrity(), Err(BlockError::ForwardParent { .. })));
    }

    #[test]
    fn param_helpers_are_lenient() {
        let mut b = Block::new("x", BlockKind::SectionHeading, 0);
        b.params.insert("toc_level".into(), json!("2"));
        b.params.insert("show_in_toc".into(), json!("нет"));
        b.params.insert("caption".into(), json!(""));
        b.params.insert("section_index".into(), json!(3));
        assert_eq!(b.param_usize("toc_level"), Some(2));
        assert_eq!(b.param_flag("show_in_toc"), Some(false));
        assert_eq!(b.param_str("caption"), None);
        assert_eq!(b.param_usize("section_index"), Some(3));
        assert_eq!(b.param_flag("missing"), None);
    }

    #[test]
    fn block_json_round_trips_with_type_tag() {
        let mut b = Block::new("sec-fans-abc123", BlockKind::SectionHeading, 20);
        b.title = Some("Fans".into());
        b.show_in_toc = true;
        let value = serde_json::to_value(&b).unwrap();
        assert_eq!(value["type"], json!("section_heading"));
        assert!(value.get("parent_id").is_none());
        let back: Block = serde_json::from_value(value).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn hand_written_block_list_deserializes() {
        let blocks: Vec<Block> = serde_json::from_value(json!([
            {"id": "s1", "type": "section_heading", "title": "Fans", "order": 0},
            {"id": "t1", "type": "text_block", "order": 10, "parent_id": "s1",
             "params": {"text_md": "hi"}}
        ]))
        .unwrap();
        let b = bundle(blocks);
        assert_eq!(b.children_of("s1").count(), 1);
        assert_eq!(b.blocks()[1].anchor(), "sec-t1");
    }
}
