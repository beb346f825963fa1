//! `catalog-press`: product catalog pipeline.
//!
//! A JSON catalog (settings, sections, series, models) is flattened into an
//! ordered list of typed blocks, rendered stage by stage into HTML fragments
//! through handlebars templates, assembled into one paginated document and
//! optionally exported to PDF.
//!
//! # Quick start
//!
//! ```
//! use catalog_press::{AssetResolver, BuildOptions, TemplateSet};
//!
//! let catalog = catalog_press::parse_catalog(
//!     r#"{"settings": {"title": "Fans"}, "sections": [{"title": "Axial", "series": [{"name": "VR"}]}]}"#,
//! )
//! .unwrap();
//! let bundle = catalog_press::build_model_bundle(catalog, BuildOptions::default());
//! assert_eq!(bundle.toc().unwrap().len(), 1);
//!
//! let templates = TemplateSet::builtin().unwrap();
//! let html = bundle.to_html(&templates, &AssetResolver::new(".")).unwrap();
//! assert!(html.contains("<title>Fans</title>"));
//! ```

pub mod assemble;
pub mod assets;
pub mod blocks;
pub mod builder;
pub mod error;
#[cfg(feature = "pdf")]
pub mod export;
pub mod loader;
pub mod pipeline;
pub mod stages;
pub mod template;
pub mod toc;
pub mod types;
pub mod views;

pub use assets::{AssetResolver, ResolvedAsset};
pub use blocks::{Block, BlockKind, ModelBundle};
pub use builder::{BlockBuilder, BuildOptions, build_blocks, build_model_bundle};
pub use error::*;
pub use loader::{load_catalog, parse_catalog};
pub use template::TemplateSet;
pub use toc::TocEntry;
pub use types::*;

#[cfg(feature = "pdf")]
pub use export::{Engine, ExportError, ExportReport, PdfConfig};

impl ModelBundle {
    /// Two-level table of contents for this bundle.
    pub fn toc(&self) -> Result<Vec<TocEntry>, BlockError> {
        toc::resolve_toc(self)
    }

    /// Render the complete HTML document.
    pub fn to_html(&self, templates: &TemplateSet, assets: &AssetResolver) -> Result<String, RenderError> {
        pipeline::render_document(self, templates, assets)
    }

    /// Write the HTML document next to its assets and export it to PDF.
    ///
    /// Requires the `pdf` feature and, for [`Engine::Chromium`], a
    /// Chromium/Chrome installation.
    #[cfg(feature = "pdf")]
    pub async fn to_pdf(
        &self,
        templates: &TemplateSet,
        assets: &AssetResolver,
        html_path: &std::path::Path,
        out_pdf: &std::path::Path,
        engine: Engine,
        config: &PdfConfig,
    ) -> Result<ExportReport, Error> {
        let html = self.to_html(templates, assets)?;
        std::fs::write(html_path, html).map_err(|source| Error::Write {
            path: html_path.to_path_buf(),
            source,
        })?;
        Ok(export::export_pdf(html_path, out_pdf, engine, config).await?)
    }
}
