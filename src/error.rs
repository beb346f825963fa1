//! Error types for every stage of the pipeline.

use std::path::PathBuf;

/// Failure to turn a catalog file into a typed [`Catalog`](crate::types::Catalog).
///
/// Loading is all-or-nothing: no partial catalog is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The input path does not carry a `.json` extension.
    #[error("expected a .json catalog, got {}", path.display())]
    UnsupportedExtension { path: PathBuf },

    /// The input file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON, or a type tag is outside its
    /// closed enumeration.
    #[error("invalid catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structural violation in a block list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    /// Two blocks share an identifier.
    #[error("duplicate block id `{0}`")]
    DuplicateId(String),

    /// Orders are not strictly increasing at this block.
    #[error("block `{id}` has order {order}, not greater than the previous {previous}")]
    OrderNotIncreasing { id: String, order: i64, previous: i64 },

    /// `parent_id` names a block that does not exist.
    #[error("block `{id}` references unknown parent `{parent}`")]
    DanglingParent { id: String, parent: String },

    /// `parent_id` names a block that does not come earlier in the sequence.
    #[error("block `{id}` references parent `{parent}` that does not precede it")]
    ForwardParent { id: String, parent: String },

    /// Walking the parent chain from this block did not terminate.
    #[error("parent chain of block `{id}` exceeds {limit} steps (cycle?)")]
    ParentCycle { id: String, limit: usize },
}

/// Failure while rendering fragments or assembling the document.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A template source failed to compile.
    #[error("template `{name}` is invalid: {source}")]
    TemplateSyntax {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    /// A template failed to render against its context.
    #[error("template rendering failed: {0}")]
    Template(#[from] handlebars::RenderError),

    /// A template directory or asset could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The block list is structurally broken.
    #[error(transparent)]
    Blocks(#[from] BlockError),
}

/// Top-level error for callers driving the whole pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Blocks(#[from] BlockError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[cfg(feature = "pdf")]
    #[error(transparent)]
    Export(#[from] crate::export::ExportError),

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
