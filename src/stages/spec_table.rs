//! Per-model data sheet pages.

use serde::Serialize;
use serde_json::Value;

use super::{StageContext, flag_or, param_or_setting};
use crate::blocks::Block;
use crate::error::RenderError;
use crate::template::css_value;
use crate::types::cell_text;

#[derive(Debug, Serialize)]
struct ProductCard {
    sku: String,
    name: String,
    image: Option<String>,
    image_exists: bool,
    unit: Option<String>,
    price_fmt: String,
    description_md: String,
}

/// One line of the attribute table: a group header or an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeRow {
    pub is_group: bool,
    pub group: String,
    pub attr_name: String,
    pub value: String,
    pub unit: String,
}

impl AttributeRow {
    fn group(name: &str) -> Self {
        Self {
            is_group: true,
            group: name.to_string(),
            attr_name: String::new(),
            value: String::new(),
            unit: String::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SpecTableContext {
    anchor: String,
    title: String,
    page_break_before: bool,
    layout: String,
    columns: usize,
    product: ProductCard,
    rows: Vec<AttributeRow>,
    brand_color: String,
}

/// Integer part of `value` with space thousands separators.
fn group_thousands(value: f64) -> String {
    let n = value.trunc() as i64;
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Format a price for display.
///
/// With a `pattern`, `### ### ₸` and then `### ###` are replaced by the
/// grouped number. Without one the result is `"{n} {currency}"`.
pub fn price_fmt(value: Option<f64>, currency: &str, pattern: Option<&str>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return String::new();
    };
    let n = group_thousands(value);
    match pattern.filter(|p| !p.is_empty()) {
        Some(pattern) => pattern
            .replace("### ### ₸", &format!("{n} ₸"))
            .replace("### ###", &n),
        None if currency.is_empty() => n,
        None => format!("{n} {currency}"),
    }
}

/// Flatten attribute groups into table rows, order preserved.
pub fn rows_from_groups(groups: &Value, group_headers: bool) -> Vec<AttributeRow> {
    let mut rows = Vec::new();
    let Some(groups) = groups.as_array() else {
        return rows;
    };
    for group in groups {
        let name = group.get("group").map(cell_text).unwrap_or_default();
        let name = name.trim();
        if group_headers && !name.is_empty() {
            rows.push(AttributeRow::group(name));
        }
        let items = group.get("items").and_then(Value::as_array);
        for item in items.into_iter().flatten() {
            rows.push(AttributeRow {
                is_group: false,
                group: name.to_string(),
                attr_name: item.get("name").map(cell_text).unwrap_or_default().trim().to_string(),
                value: item.get("value").map(cell_text).unwrap_or_default(),
                unit: item.get("unit").map(cell_text).unwrap_or_default().trim().to_string(),
            });
        }
    }
    rows
}

/// Render one `spec_table` block.
pub fn render(cx: &StageContext<'_>, block: &Block) -> Result<String, RenderError> {
    let settings = cx.settings();
    let b = Some(block);

    let group_headers = flag_or(b, settings, "group_headers", true);
    let pattern = param_or_setting(b, settings, "price_format");
    let currency = param_or_setting(b, settings, "currency").unwrap_or_default();
    let rows = rows_from_groups(block.params.get("attributes").unwrap_or(&Value::Null), group_headers);

    let image = block.param_str("image").and_then(|r| cx.assets.resolve(&r));
    let sku = block.first_sku().unwrap_or_default();
    let product = ProductCard {
        name: block
            .title_text()
            .map(str::to_string)
            .unwrap_or_else(|| sku.clone()),
        sku,
        image_exists: image.as_ref().is_some_and(|a| a.exists),
        image: image.map(|a| a.src),
        unit: block.param_str("unit"),
        price_fmt: price_fmt(block.param_f64("price"), &currency, pattern.as_deref()),
        description_md: block.param_str("description_md").unwrap_or_default(),
    };

    let ctx = SpecTableContext {
        anchor: block.anchor(),
        title: product.name.clone(),
        page_break_before: block.page_break_before,
        layout: css_value(&block.param_str("layout").unwrap_or_else(|| "grid-2".to_string())),
        columns: block.param_usize("columns").filter(|&c| c > 0).unwrap_or(2),
        product,
        rows,
        brand_color: cx.brand(),
    };
    log::debug!("rendering spec table {}", block.id);
    cx.templates.render("spec_table", &ctx)
}
