//! Read-only views that narrow a [`ModelBundle`] to one section or series.
//!
//! Stages render one section or one series at a time. A view carries the
//! source record, its position, and the heading block emitted for it, so a
//! stage never has to search the bundle by title.

use crate::blocks::{Block, BlockKind, ModelBundle, anchor_for};
use crate::builder::slug;
use crate::types::{Section, Series};

/// One section of the catalog together with its level-1 heading block.
#[derive(Debug, Clone, Copy)]
pub struct SectionView<'a> {
    pub index: usize,
    pub section: &'a Section,
    pub heading: Option<&'a Block>,
}

impl<'a> SectionView<'a> {
    pub fn title(&self) -> &'a str {
        self.section
            .display_title()
            .or_else(|| self.heading.and_then(Block::title_text))
            .unwrap_or("Section")
    }

    /// Anchor of the heading, or a stable fallback derived from the title.
    pub fn anchor(&self) -> String {
        match self.heading {
            Some(block) => block.anchor(),
            None => anchor_for(&format!("section-{}", slug(self.title()))),
        }
    }

    /// Views over this section's series, in source order.
    pub fn series(&self, bundle: &'a ModelBundle) -> Vec<SeriesView<'a>> {
        let section = *self;
        self.section
            .series
            .iter()
            .enumerate()
            .map(|(index, series)| SeriesView {
                section,
                index,
                series,
                heading: bundle.series_heading(self.index, index),
            })
            .collect()
    }
}

/// One series with its enclosing section and level-2 heading block.
#[derive(Debug, Clone, Copy)]
pub struct SeriesView<'a> {
    pub section: SectionView<'a>,
    pub index: usize,
    pub series: &'a Series,
    pub heading: Option<&'a Block>,
}

impl<'a> SeriesView<'a> {
    pub fn title(&self) -> &'a str {
        self.series
            .display_name()
            .or_else(|| self.heading.and_then(Block::title_text))
            .unwrap_or("Series")
    }

    pub fn anchor(&self) -> String {
        match self.heading {
            Some(block) => block.anchor(),
            None => anchor_for(&format!("series-{}", slug(self.title()))),
        }
    }

    /// Blocks parented to this series' heading, in render order.
    pub fn blocks(&self, bundle: &'a ModelBundle) -> Vec<&'a Block> {
        match self.heading {
            Some(heading) => bundle.children_of(&heading.id).collect(),
            None => Vec::new(),
        }
    }

    /// Per-model `spec_table` blocks of this series.
    pub fn spec_tables(&self, bundle: &'a ModelBundle) -> Vec<&'a Block> {
        self.blocks(bundle)
            .into_iter()
            .filter(|b| b.kind == BlockKind::SpecTable)
            .collect()
    }
}

/// Views over every section, in source order.
pub fn sections(bundle: &ModelBundle) -> Vec<SectionView<'_>> {
    bundle
        .sections
        .iter()
        .enumerate()
        .map(|(index, section)| SectionView {
            index,
            section,
            heading: bundle.section_heading(index),
        })
        .collect()
}
