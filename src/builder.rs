//! Block builder: flattens a [`Catalog`] into the ordered render sequence.
//!
//! The topology is fixed: cover, TOC, then per section a level-1 heading
//! (plus an optional intro), per series a level-2 heading followed by its
//! hero, description, tables, media and model pages, and finally the back
//! cover. Ordering keys advance by [`ORDER_STEP`] per emitted block so later
//! insertions have room, and they are never reassigned.

use serde_json::{Value, json};

use crate::blocks::{Block, BlockKind, ModelBundle, Params};
use crate::types::{Catalog, MediaItem, Model, Section, Series, Settings, Table};

/// Gap between consecutive ordering keys.
pub const ORDER_STEP: i64 = 10;

/// Caller switches for block construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Emit the front `cover` block.
    pub include_cover: bool,
    /// Emit one `spec_table` page per model with a SKU.
    pub model_pages: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            include_cover: true,
            model_pages: false,
        }
    }
}

impl BuildOptions {
    /// Options implied by the catalog settings (`generate_model_pages`).
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            model_pages: settings.generate_model_pages,
            ..Self::default()
        }
    }
}

// -----------------------------------------------------------------------
// Identifiers
// -----------------------------------------------------------------------

/// Slugify for use inside block identifiers: `[A-Za-z0-9_-]` survive, every
/// other run collapses to `-`, at most 64 characters. An empty input yields
/// a random token.
pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    if out.is_empty() {
        out = random_hex(8);
    }
    out.truncate(64);
    out
}

/// `{slug(prefix-parts…)}-{6 random hex}`.
pub fn new_block_id(prefix: &str, parts: &[&str]) -> String {
    let mut base = prefix.to_string();
    for part in parts.iter().filter(|p| !p.is_empty()) {
        base.push('-');
        base.push_str(part);
    }
    format!("{}-{}", slug(&base), random_hex(6))
}

fn random_hex(len: usize) -> String {
    let mut hex = uuid::Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex
}

fn first_non_blank<'a>(candidates: &[&'a str]) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|s| !s.trim().is_empty())
        .unwrap_or("")
}

// -----------------------------------------------------------------------
// Markdown tables
// -----------------------------------------------------------------------

/// Render a table as a markdown pipe table followed by its notes.
///
/// Returns `None` when the table has no columns or no rows.
pub fn table_to_markdown(table: &Table) -> Option<String> {
    if !table.is_renderable() {
        return None;
    }

    let headers: Vec<String> = table.columns.iter().map(|c| escape_cell(c.header())).collect();
    let mut md = format!("| {} |\n", headers.join(" | "));
    let sep: Vec<&str> = headers.iter().map(|_| "---").collect();
    md.push_str(&format!("| {} |\n", sep.join(" | ")));
    for row in table.cells() {
        let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        md.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    let notes = table.notes_md.trim();
    if !notes.is_empty() {
        md.push('\n');
        md.push_str(notes);
    }
    Some(md)
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\r', '\n'], " ")
}

// -----------------------------------------------------------------------
// BlockBuilder
// -----------------------------------------------------------------------

/// Accumulates blocks and hands out ordering keys.
///
/// # Example
///
/// ```
/// use catalog_press::builder::{BlockBuilder, BuildOptions};
/// use catalog_press::blocks::BlockKind;
/// use catalog_press::types::Catalog;
///
/// let blocks = BlockBuilder::new().catalog(&Catalog::default(), BuildOptions::default()).build();
/// let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.kind).collect();
/// assert_eq!(kinds, vec![BlockKind::Cover, BlockKind::Toc, BlockKind::Backcover]);
/// ```
#[derive(Debug, Default)]
pub struct BlockBuilder {
    blocks: Vec<Block>,
    next_order: i64,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the full topology for `catalog`.
    pub fn catalog(mut self, catalog: &Catalog, options: BuildOptions) -> Self {
        if options.include_cover {
            self.cover();
        }
        self.toc();
        for (si, section) in catalog.sections.iter().enumerate() {
            let section_id = self.section(si, section);
            for (ri, series) in section.series.iter().enumerate() {
                self.series(si, ri, series, &section_id, &catalog.settings, options.model_pages);
            }
        }
        self.backcover();
        self
    }

    /// Finish and return the blocks in emission order.
    pub fn build(self) -> Vec<Block> {
        self.blocks
    }

    fn emit(&mut self, mut block: Block) -> String {
        block.order = self.next_order;
        self.next_order += ORDER_STEP;
        let id = block.id.clone();
        self.blocks.push(block);
        id
    }

    // -- Document frame ---------------------------------------------------

    fn cover(&mut self) {
        let mut block = Block::new(new_block_id("cover", &["front"]), BlockKind::Cover, 0);
        block.params = params([("page", json!("cover"))]);
        self.emit(block);
    }

    fn toc(&mut self) {
        let mut block = Block::new(new_block_id("toc", &["contents"]), BlockKind::Toc, 0);
        block.title = Some("Contents".into());
        block.params = params([("page", json!("toc")), ("page_break_before", json!(true))]);
        block.page_break_before = true;
        self.emit(block);
    }

    fn backcover(&mut self) {
        let mut block = Block::new(new_block_id("cover", &["back"]), BlockKind::Backcover, 0);
        block.title = Some("Contacts".into());
        block.params = params([("page", json!("backcover"))]);
        block.page_break_before = true;
        self.emit(block);
    }

    // -- Sections ---------------------------------------------------------

    fn section(&mut self, index: usize, section: &Section) -> String {
        let key = first_non_blank(&[section.code.as_str(), section.title.as_str()]);
        let mut heading = Block::new(new_block_id("sec", &[key]), BlockKind::SectionHeading, 0);
        heading.title = Some(section.display_title().unwrap_or("Section").to_string());
        heading.params = params([
            ("toc_level", json!(1)),
            ("section_index", json!(index)),
            ("code", json!(section.code)),
        ]);
        heading.page_break_before = true;
        heading.show_in_toc = true;
        let heading_id = self.emit(heading);

        let intro = section.intro_md.trim();
        if !intro.is_empty() {
            let mut text = Block::new(new_block_id("txt", &["intro", key]), BlockKind::TextBlock, 0);
            text.title = Some("Introduction".into());
            text.params = params([("text_md", json!(intro)), ("role", json!("intro"))]);
            text.parent_id = Some(heading_id.clone());
            self.emit(text);
        }
        heading_id
    }

    // -- Series -----------------------------------------------------------

    fn series(
        &mut self,
        section_index: usize,
        index: usize,
        series: &Series,
        section_id: &str,
        settings: &Settings,
        model_pages: bool,
    ) {
        let key = first_non_blank(&[series.code.as_str(), series.name.as_str()]);
        let name = series.display_name().unwrap_or("Series").to_string();

        let mut heading = Block::new(new_block_id("ser", &[key]), BlockKind::SectionHeading, 0);
        heading.title = Some(name.clone());
        heading.params = params([
            ("toc_level", json!(2)),
            ("section_index", json!(section_index)),
            ("series_index", json!(index)),
            ("series_code", json!(series.code)),
        ]);
        heading.page_break_before = true;
        heading.show_in_toc = true;
        heading.parent_id = Some(section_id.to_string());
        let series_id = self.emit(heading);

        let hero = series.hero.photo.trim();
        if !hero.is_empty() {
            let mut img = Block::new(new_block_id("img", &["hero", key]), BlockKind::ImageFull, 0);
            img.title = Some(name.clone());
            img.params = params([
                ("media", json!(hero)),
                ("caption", json!(name)),
                ("role", json!("hero")),
            ]);
            img.parent_id = Some(series_id.clone());
            self.emit(img);
        }

        if let Some(description) = series_description(series) {
            let mut text = Block::new(new_block_id("txt", &["series", key]), BlockKind::TextBlock, 0);
            text.title = Some("Series overview".into());
            text.params = params([("text_md", json!(description)), ("role", json!("description"))]);
            text.parent_id = Some(series_id.clone());
            self.emit(text);
        }

        for table in &series.tables {
            let Some(md) = table_to_markdown(table) else {
                continue;
            };
            let mut text = Block::new(new_block_id("tbl", &[table.kind.as_str()]), BlockKind::TextBlock, 0);
            text.title = Some(first_non_blank(&[table.title.as_str(), "Table"]).to_string());
            text.params = params([
                ("text_md", json!(md)),
                ("role", json!("table")),
                ("table_type", json!(table.kind.as_str())),
            ]);
            text.parent_id = Some(series_id.clone());
            self.emit(text);
        }

        for item in &series.media {
            if let Some(block) = media_block(item, key, &series_id) {
                self.emit(block);
            }
        }

        if model_pages {
            for model in &series.models {
                if let Some(block) = spec_table_block(model, settings, &series_id) {
                    self.emit(block);
                }
            }
        }
    }
}

fn params<const N: usize>(entries: [(&str, Value); N]) -> Params {
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn series_description(series: &Series) -> Option<String> {
    let mut parts = Vec::new();
    let summary = series.summary_md.trim();
    if !summary.is_empty() {
        parts.push(summary.to_string());
    }
    let construction = series.construction_md.trim();
    if !construction.is_empty() {
        parts.push(format!("**Construction**\n{construction}"));
    }
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

fn media_block(item: &MediaItem, series_key: &str, series_id: &str) -> Option<Block> {
    let file = item.file.trim();
    if file.is_empty() {
        return None;
    }
    let key = first_non_blank(&[item.id.as_str(), series_key]);

    let mut block = if let Some(ds) = item.curve_data() {
        let series: Vec<Value> = ds
            .series
            .iter()
            .map(|s| {
                let points: Vec<Value> = s.points.iter().map(|(x, y)| json!([x, y])).collect();
                json!({"label": s.label, "points": points})
            })
            .collect();
        let mut block = Block::new(new_block_id("curve", &[key]), BlockKind::Curve, 0);
        block.title = Some(first_non_blank(&[item.caption.as_str(), "Performance curve"]).to_string());
        block.params = params([
            (
                "dataset",
                json!({"x_unit": ds.x_unit, "y_unit": ds.y_unit, "series": series}),
            ),
            ("media", json!(file)),
            ("caption", json!(item.caption)),
            ("role", json!("media")),
        ]);
        block
    } else {
        let mut block = Block::new(new_block_id("img", &[key]), BlockKind::ImageFull, 0);
        block.title = Some(first_non_blank(&[item.caption.as_str(), "Illustration"]).to_string());
        block.params = params([
            ("media", json!(file)),
            ("caption", json!(item.caption)),
            ("role", json!("media")),
        ]);
        block
    };
    block.parent_id = Some(series_id.to_string());
    Some(block)
}

fn spec_table_block(model: &Model, settings: &Settings, series_id: &str) -> Option<Block> {
    let sku = model.sku.trim();
    if sku.is_empty() {
        return None;
    }

    let attributes: Vec<Value> = model
        .attributes
        .iter()
        .map(|g| {
            let items: Vec<Value> = g
                .items
                .iter()
                .map(|it| json!({"name": it.name, "value": it.value, "unit": it.unit}))
                .collect();
            json!({"group": g.group, "items": items})
        })
        .collect();

    let mut block = Block::new(new_block_id("spec", &[sku]), BlockKind::SpecTable, 0);
    block.title = Some(first_non_blank(&[model.name.as_str(), sku]).to_string());
    block.params = params([
        ("sku", json!(sku)),
        ("layout", json!("grid-2")),
        ("columns", json!(2)),
        ("page_break_before", json!(true)),
        ("group_headers", json!(true)),
        ("attributes", Value::Array(attributes)),
        ("image", json!(model.image)),
        ("description_md", json!(model.description_md)),
        ("price", json!(model.price)),
        (
            "currency",
            json!(model.currency.clone().unwrap_or_else(|| settings.currency.clone())),
        ),
        ("unit", json!(model.unit)),
        ("media_refs", json!(model.media_refs)),
    ]);
    block.page_break_before = true;
    block.parent_id = Some(series_id.to_string());
    Some(block)
}

/// Build the block list for `catalog`.
pub fn build_blocks(catalog: &Catalog, options: BuildOptions) -> Vec<Block> {
    BlockBuilder::new().catalog(catalog, options).build()
}

/// Build blocks and wrap everything into an indexed [`ModelBundle`].
pub fn build_model_bundle(catalog: Catalog, options: BuildOptions) -> ModelBundle {
    let blocks = build_blocks(&catalog, options);
    log::debug!(
        "built {} block(s) (cover: {}, model pages: {})",
        blocks.len(),
        options.include_cover,
        options.model_pages
    );
    ModelBundle::new(catalog.settings, catalog.sections, blocks)
}
