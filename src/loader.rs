//! Catalog loading from disk or text.

use std::path::Path;

use crate::error::LoadError;
use crate::types::Catalog;

/// Parse a catalog from JSON text.
///
/// # Errors
///
/// Returns [`LoadError::Json`] for unparsable JSON or an unknown type tag.
pub fn parse_catalog(source: &str) -> Result<Catalog, LoadError> {
    let catalog: Catalog = serde_json::from_str(source)?;
    let series: usize = catalog.sections.iter().map(|s| s.series.len()).sum();
    log::debug!(
        "parsed catalog: {} section(s), {} series",
        catalog.sections.len(),
        series
    );
    Ok(catalog)
}

/// Load a catalog from a `.json` file.
///
/// # Errors
///
/// Fails without producing a partial catalog when the extension is not
/// `.json`, the file cannot be read, or its content does not parse.
pub fn load_catalog(path: &Path) -> Result<Catalog, LoadError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(LoadError::UnsupportedExtension {
            path: path.to_path_buf(),
        });
    }

    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("loading catalog from {}", path.display());
    parse_catalog(&source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(content.as_bytes()).expect("write");
        (dir, path)
    }

    #[test]
    fn rejects_non_json_extension() {
        let (_dir, path) = write_temp("catalog.yaml", "{}");
        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedExtension { .. }));
    }

    #[test]
    fn accepts_uppercase_extension() {
        let (_dir, path) = write_temp("CATALOG.JSON", r#"{"sections": []}"#);
        assert!(load_catalog(&path).is_ok());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_catalog(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn invalid_json_is_fatal() {
        let (_dir, path) = write_temp("broken.json", r#"{"sections": [}"#);
        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }

    #[test]
    fn unknown_media_type_aborts_load() {
        let err = parse_catalog(
            r#"{"sections": [{"series": [{"media": [{"type": "gif", "file": "a.gif"}]}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }

    #[test]
    fn loads_nested_catalog() {
        let (_dir, path) = write_temp(
            "catalog.json",
            r#"{
                "settings": {"title": "Ventilation 2025"},
                "sections": [{"code": "fans", "title": "Fans", "series": [{"name": "VR"}]}]
            }"#,
        );
        let catalog = load_catalog(&path).expect("load");
        assert_eq!(catalog.settings.title, "Ventilation 2025");
        assert_eq!(catalog.sections[0].series[0].name, "VR");
    }
}
