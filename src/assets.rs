//! Asset path resolution against the document's asset base.
//!
//! Templates reference images by a *public* relative `src` that the browser
//! resolves through `<base href>`. Stages additionally need the absolute file
//! path to report whether the asset exists, and to inline SVG logos.

use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Characters escaped when turning a filesystem path into a `file://` URI.
pub(crate) const PATH_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A relative asset reference resolved against the asset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// Public reference for `src=` attributes (slashes normalized).
    pub src: String,
    /// Absolute filesystem location. `None` for remote URLs.
    pub abs_path: Option<PathBuf>,
    pub exists: bool,
}

impl ResolvedAsset {
    /// Absolute path as display text, empty for remote URLs.
    pub fn abs_display(&self) -> String {
        self.abs_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

/// Maps relative asset references onto the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResolver {
    root: PathBuf,
}

impl AssetResolver {
    /// Resolver rooted at an explicit directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolver for an asset base as found in settings.
    ///
    /// - `file:///abs/dir/` → `/abs/dir` (percent-decoded)
    /// - `output/` → `cwd/output`
    /// - `""` → `cwd`
    pub fn from_base(base: &str, cwd: &Path) -> Self {
        let base = base.trim();
        let root = if let Some(rest) = base.strip_prefix("file://") {
            let rest = rest.strip_prefix("localhost").unwrap_or(rest);
            PathBuf::from(percent_decode_str(rest).decode_utf8_lossy().into_owned())
        } else if base.is_empty() {
            cwd.to_path_buf()
        } else {
            cwd.join(base)
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `reference`. Blank references resolve to `None`.
    ///
    /// References carrying a URL scheme are passed through and treated as
    /// existing. A missing local file is logged, never an error.
    pub fn resolve(&self, reference: &str) -> Option<ResolvedAsset> {
        let src = normalize_url(reference);
        if src.is_empty() {
            return None;
        }
        if has_scheme(&src) {
            return Some(ResolvedAsset {
                src,
                abs_path: None,
                exists: true,
            });
        }

        let abs = normalize_path(&self.root.join(&src));
        let exists = abs.exists();
        if !exists {
            log::warn!("asset `{src}` not found at {}", abs.display());
        }
        Some(ResolvedAsset {
            src,
            abs_path: Some(abs),
            exists,
        })
    }

    /// Text of an existing local `.svg` asset, for inlining.
    pub fn read_svg(&self, asset: &ResolvedAsset) -> Option<String> {
        let path = asset.abs_path.as_ref().filter(|_| asset.exists)?;
        let is_svg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
        if !is_svg {
            return None;
        }
        match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("cannot read svg {}: {e}", path.display());
                None
            }
        }
    }
}

/// Backslashes to slashes, surrounding whitespace trimmed.
pub fn normalize_url(reference: &str) -> String {
    reference.trim().replace('\\', "/")
}

/// `file://` URI for a directory, with a trailing slash.
pub fn file_uri(dir: &Path) -> String {
    let path = dir.to_string_lossy().replace('\\', "/");
    let mut uri = String::from("file://");
    if !path.starts_with('/') {
        uri.push('/');
    }
    uri.extend(utf8_percent_encode(&path, PATH_SET));
    if !uri.ends_with('/') {
        uri.push('/');
    }
    uri
}

fn has_scheme(reference: &str) -> bool {
    if reference.starts_with("data:") {
        return true;
    }
    match reference.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Lexically remove `.` and `..` components. The file need not exist.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
