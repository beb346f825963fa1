//! Typed catalog model: settings, sections, series, tables, media, models.
//!
//! Every field has a defined default when absent from the source document.
//! Hand-authored catalogs are full of small anomalies, so scalar fields are
//! decoded through the [`lenient`] decoders: a malformed value falls back to
//! a documented default instead of failing the whole load. Type tags
//! ([`MediaType`], [`TableKind`]) are the exception; an unknown tag is a
//! structural error and aborts loading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_THEME_COLOR: &str = "#E53935";
pub const DEFAULT_CURRENCY: &str = "₸";

// ------------------------------------------------------------------
// Lenient decoders
// ------------------------------------------------------------------

/// Per-field decoders implementing the lenient-parse contract.
///
/// | decoder       | accepts                                  | fallback   |
/// |---------------|------------------------------------------|------------|
/// | `string`      | string, number, bool                     | `""`       |
/// | `opt_string`  | string, number, bool                     | `None`     |
/// | `price`       | number, numeric string                   | `None`     |
/// | `flag`        | bool, number, yes/true/1/да, no/false/0  | `false`    |
/// | `points`      | `[x, y]` pairs of numbers/numeric strings | pair dropped |
/// | `list`        | array                                    | `[]`       |
/// | `object`      | object                                   | `Default`  |
pub mod lenient {
    use serde::de::{DeserializeOwned, Deserializer, Error as _, value::StringDeserializer};
    use serde::Deserialize;
    use serde_json::Value;

    /// Text form of a scalar JSON value.
    pub fn value_to_string(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Finite number from a JSON number or a numeric string.
    pub fn value_to_f64(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        n.is_finite().then_some(n)
    }

    /// Boolean from the spellings catalog authors actually use.
    pub fn value_to_flag(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "yes" | "true" | "1" | "да" | "on" => Some(true),
                "no" | "false" | "0" | "нет" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.as_ref().and_then(value_to_string).unwrap_or_default())
    }

    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.as_ref().and_then(value_to_string))
    }

    pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Array(items)) => items.iter().filter_map(value_to_string).collect(),
            _ => Vec::new(),
        })
    }

    pub fn price<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => {
                let parsed = value_to_f64(&v);
                if parsed.is_none() {
                    log::warn!("ignoring malformed price {v}");
                }
                parsed
            }
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value.as_ref().and_then(value_to_flag).unwrap_or(false))
    }

    pub fn points<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<(f64, f64)>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        let Some(Value::Array(raw)) = value else {
            return Ok(Vec::new());
        };
        let points: Vec<(f64, f64)> = raw
            .iter()
            .filter_map(|p| match p.as_array().map(Vec::as_slice) {
                Some([x, y]) => Some((value_to_f64(x)?, value_to_f64(y)?)),
                _ => None,
            })
            .collect();
        if points.len() < raw.len() {
            log::warn!("dropped {} malformed curve point(s)", raw.len() - points.len());
        }
        Ok(points)
    }

    /// List field: a non-array value reads as `[]`. Elements of an array
    /// must still decode, so an unknown type tag inside stays fatal.
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Value>::deserialize(d)? {
            Some(value @ Value::Array(_)) => Vec::<T>::deserialize(value).map_err(D::Error::custom),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(other) => {
                log::warn!("expected a list, got {}; using []", kind_of(&other));
                Ok(Vec::new())
            }
        }
    }

    /// Object field: a non-object value reads as `T::default()`.
    pub fn object<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        match Option::<Value>::deserialize(d)? {
            Some(value @ Value::Object(_)) => T::deserialize(value).map_err(D::Error::custom),
            None | Some(Value::Null) => Ok(T::default()),
            Some(other) => {
                log::warn!("expected an object, got {}; using defaults", kind_of(&other));
                Ok(T::default())
            }
        }
    }

    fn kind_of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "a bool",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        }
    }

    /// Closed-enumeration tag: absent or blank picks the default variant,
    /// an unrecognized spelling is an error.
    pub fn tag<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let value = Option::<Value>::deserialize(d)?;
        match value.as_ref().and_then(value_to_string) {
            Some(s) if !s.trim().is_empty() => {
                T::deserialize(StringDeserializer::<D::Error>::new(s.trim().to_lowercase()))
            }
            _ => Ok(T::default()),
        }
    }

    pub(super) fn non_empty_or<'de, D: Deserializer<'de>>(
        d: D,
        fallback: &str,
    ) -> Result<String, D::Error> {
        let s = string(d)?;
        Ok(if s.trim().is_empty() { fallback.to_string() } else { s })
    }

    pub(super) fn theme_color<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        non_empty_or(d, super::DEFAULT_THEME_COLOR)
    }

    pub(super) fn currency<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        non_empty_or(d, super::DEFAULT_CURRENCY)
    }

    pub(super) fn yes<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        non_empty_or(d, "yes")
    }
}

/// Text of a table cell or attribute value. `null` renders empty.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ------------------------------------------------------------------
// Settings
// ------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub address: String,
    #[serde(deserialize_with = "lenient::string")]
    pub contacts: String,
    #[serde(deserialize_with = "lenient::string")]
    pub site: String,
}

/// Values computed by the driver, attached once before rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeSettings {
    /// URI (usually `file://…/`) that relative asset references resolve against.
    pub assets_base: String,
    /// Whether the document is paginated client-side by Paged.js.
    pub use_pagedjs: bool,
    /// Whether a front cover precedes the numbered pages.
    pub has_cover: bool,
}

/// Global catalog configuration.
///
/// Keys the crate does not model are kept in [`Settings::extra`] and remain
/// reachable through [`Settings::get`], which is how stages pick up optional
/// tuning values such as `section_cover_pattern` or `price_format`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient::string")]
    pub year: String,
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::theme_color")]
    pub theme_color: String,
    #[serde(deserialize_with = "lenient::currency")]
    pub currency: String,
    #[serde(deserialize_with = "lenient::string")]
    pub cover_bg: String,
    #[serde(deserialize_with = "lenient::string")]
    pub cover_logo: String,
    #[serde(deserialize_with = "lenient::string")]
    pub assets_base: String,
    #[serde(deserialize_with = "lenient::yes")]
    pub use_pagedjs: String,
    #[serde(deserialize_with = "lenient::flag")]
    pub generate_model_pages: bool,
    #[serde(deserialize_with = "lenient::object")]
    pub company: Company,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
    #[serde(skip)]
    pub runtime: Option<RuntimeSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            year: String::new(),
            title: String::new(),
            theme_color: DEFAULT_THEME_COLOR.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            cover_bg: String::new(),
            cover_logo: String::new(),
            assets_base: String::new(),
            use_pagedjs: "yes".to_string(),
            generate_model_pages: false,
            company: Company::default(),
            extra: BTreeMap::new(),
            runtime: None,
        }
    }
}

impl Settings {
    /// Attach the driver-computed runtime values. Consumes `self` so the
    /// settings are frozen again once they reach the stages.
    pub fn with_runtime(mut self, runtime: RuntimeSettings) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Look up a setting by key: modelled fields first, then `extra`.
    /// Empty values read as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "year" => self.year.clone(),
            "title" => self.title.clone(),
            "theme_color" => self.theme_color.clone(),
            "currency" => self.currency.clone(),
            "cover_bg" => self.cover_bg.clone(),
            "cover_logo" => self.cover_logo.clone(),
            "assets_base" => self.assets_base().to_string(),
            "company_name" => self.company.name.clone(),
            "company_address" => self.company.address.clone(),
            "company_contacts" => self.company.contacts.clone(),
            "company_site" => self.company.site.clone(),
            _ => self.extra.get(key).and_then(lenient::value_to_string)?,
        };
        (!value.is_empty()).then_some(value)
    }

    /// Raw JSON value of an unmodelled key.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Lenient boolean lookup with a default for absent/unrecognized values.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.extra
            .get(key)
            .and_then(lenient::value_to_flag)
            .unwrap_or(default)
    }

    /// Effective asset base: the runtime value when set, else the catalog's own.
    pub fn assets_base(&self) -> &str {
        match &self.runtime {
            Some(rt) if !rt.assets_base.is_empty() => &rt.assets_base,
            _ => &self.assets_base,
        }
    }

    /// Whether the document loads the Paged.js polyfill.
    pub fn use_pagedjs(&self) -> bool {
        match &self.runtime {
            Some(rt) => rt.use_pagedjs,
            None => lenient::value_to_flag(&Value::String(self.use_pagedjs.clone())).unwrap_or(true),
        }
    }

    /// Whether a front cover precedes the numbered pages.
    pub fn has_cover(&self) -> bool {
        self.runtime.as_ref().is_none_or(|rt| rt.has_cover)
    }
}

// ------------------------------------------------------------------
// Tables
// ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Technical,
    Acoustic,
    Dimensions,
    Pricing,
    #[default]
    Custom,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Acoustic => "acoustic",
            Self::Dimensions => "dimensions",
            Self::Pricing => "pricing",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableColumn {
    #[serde(deserialize_with = "lenient::string")]
    pub key: String,
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
}

impl TableColumn {
    /// Header text: the title, or the key when no title is given.
    pub fn header(&self) -> &str {
        if self.title.is_empty() { &self.key } else { &self.title }
    }
}

/// Typed tabular data attached to a series.
///
/// Rows are kept as raw JSON. Key/value objects are the normal shape;
/// positional arrays are mapped onto columns by index; anything else is
/// ignored by [`Table::cells`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Table {
    #[serde(rename = "type", deserialize_with = "lenient::tag")]
    pub kind: TableKind,
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::list")]
    pub columns: Vec<TableColumn>,
    #[serde(deserialize_with = "lenient::list")]
    pub rows: Vec<Value>,
    #[serde(deserialize_with = "lenient::string")]
    pub notes_md: String,
}

impl Table {
    /// A table renders only when it has columns and at least one object or
    /// array row.
    pub fn is_renderable(&self) -> bool {
        !self.columns.is_empty() && self.rows.iter().any(|r| r.is_object() || r.is_array())
    }

    /// Row cells as text, in column order.
    pub fn cells(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(
                    self.columns
                        .iter()
                        .map(|c| map.get(&c.key).map(cell_text).unwrap_or_default())
                        .collect(),
                ),
                Value::Array(items) => Some(
                    (0..self.columns.len())
                        .map(|i| items.get(i).map(cell_text).unwrap_or_default())
                        .collect(),
                ),
                _ => None,
            })
            .collect()
    }
}

// ------------------------------------------------------------------
// Media
// ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Photo,
    Drawing,
    Curve,
    Video,
    Doc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveSeries {
    #[serde(deserialize_with = "lenient::string")]
    pub label: String,
    #[serde(deserialize_with = "lenient::points")]
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveDataset {
    #[serde(deserialize_with = "lenient::string")]
    pub x_unit: String,
    #[serde(deserialize_with = "lenient::string")]
    pub y_unit: String,
    #[serde(deserialize_with = "lenient::list")]
    pub series: Vec<CurveSeries>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "lenient::tag")]
    pub kind: MediaType,
    #[serde(deserialize_with = "lenient::string")]
    pub file: String,
    #[serde(deserialize_with = "lenient::string")]
    pub caption: String,
    #[serde(deserialize_with = "lenient::object")]
    pub dataset: Option<CurveDataset>,
}

impl MediaItem {
    /// The populated curve dataset, if this item is a curve that has one.
    pub fn curve_data(&self) -> Option<&CurveDataset> {
        match (&self.kind, &self.dataset) {
            (MediaType::Curve, Some(ds)) if !ds.series.is_empty() => Some(ds),
            _ => None,
        }
    }
}

// ------------------------------------------------------------------
// Models and attributes
// ------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeItem {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    pub value: Value,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeGroup {
    #[serde(deserialize_with = "lenient::string")]
    pub group: String,
    #[serde(deserialize_with = "lenient::list")]
    pub items: Vec<AttributeItem>,
}

/// A specific SKU within a series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    #[serde(deserialize_with = "lenient::string")]
    pub sku: String,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::price")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub unit: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub image: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub description_md: String,
    #[serde(deserialize_with = "lenient::list")]
    pub attributes: Vec<AttributeGroup>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub media_refs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Accessory {
    #[serde(deserialize_with = "lenient::string")]
    pub sku: String,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub image: Option<String>,
}

// ------------------------------------------------------------------
// Series / Section / Catalog
// ------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hero {
    #[serde(deserialize_with = "lenient::string")]
    pub photo: String,
    #[serde(deserialize_with = "lenient::string")]
    pub banner_md: String,
}

/// A product family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Series {
    #[serde(deserialize_with = "lenient::string")]
    pub code: String,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub summary_md: String,
    #[serde(deserialize_with = "lenient::string")]
    pub construction_md: String,
    #[serde(deserialize_with = "lenient::string")]
    pub features: String,
    #[serde(deserialize_with = "lenient::object")]
    pub hero: Hero,
    #[serde(deserialize_with = "lenient::list")]
    pub tables: Vec<Table>,
    #[serde(deserialize_with = "lenient::list")]
    pub media: Vec<MediaItem>,
    #[serde(deserialize_with = "lenient::list")]
    pub models: Vec<Model>,
    #[serde(deserialize_with = "lenient::list")]
    pub accessories: Vec<Accessory>,
}

impl Series {
    /// Display name: name, then code.
    pub fn display_name(&self) -> Option<&str> {
        [self.name.as_str(), self.code.as_str()]
            .into_iter()
            .find(|s| !s.trim().is_empty())
    }
}

/// Top-level catalog division.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    #[serde(deserialize_with = "lenient::string")]
    pub code: String,
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string")]
    pub intro_md: String,
    #[serde(deserialize_with = "lenient::list")]
    pub series: Vec<Series>,
}

impl Section {
    /// Display title: title, then code.
    pub fn display_title(&self) -> Option<&str> {
        [self.title.as_str(), self.code.as_str()]
            .into_iter()
            .find(|s| !s.trim().is_empty())
    }
}

/// The parsed source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    #[serde(deserialize_with = "lenient::object")]
    pub settings: Settings,
    #[serde(deserialize_with = "lenient::list")]
    pub sections: Vec<Section>,
}
