//! Resolves image assets by name. An [`AssetGlob`] is the eagerly loaded
//! mapping from resource path (e.g., `/src/assets/hero.jpg`) to the loaded
//! [`AssetModule`]; [`get_image`] and [`resolve_image_path`] look assets up in
//! it.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use url::Url;
use walkdir::WalkDir;

/// The key prefix used for globs loaded from the project's assets directory.
pub const DEFAULT_KEY_PREFIX: &str = "/src/assets";

/// CMS image fields reference assets with this public prefix (e.g.
/// `/assets/hero.jpg`).
pub const PUBLIC_ASSETS_PREFIX: &str = "/assets/";

/// File extensions [`AssetGlob::load`] treats as images.
pub const IMAGE_EXTENSIONS: &[&str] =
    &["avif", "gif", "jpeg", "jpg", "png", "svg", "webp"];

/// A loaded image: where it's served from and where it lives on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct Asset {
    /// The public URL for the asset.
    pub src: Url,

    /// The source path. For assets that weren't loaded from the assets
    /// directory this is whatever path the reference carried.
    pub path: PathBuf,
}

/// A loaded resource module. Images expose the [`Asset`] as their `default`
/// export.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetModule {
    pub default: Asset,
}

/// An ordered mapping from resource path to [`AssetModule`]. Iteration order
/// is insertion order; [`AssetGlob::load`] inserts in sorted path order, so
/// lookups that take the first match are deterministic.
#[derive(Clone, Debug)]
pub struct AssetGlob {
    prefix: String,
    modules: Vec<(String, AssetModule)>,
}

impl Default for AssetGlob {
    fn default() -> Self {
        AssetGlob::new(DEFAULT_KEY_PREFIX)
    }
}

impl AssetGlob {
    /// Creates an empty glob whose keys live under `prefix` (no trailing
    /// slash, e.g. `/src/assets`).
    pub fn new(prefix: &str) -> AssetGlob {
        AssetGlob {
            prefix: prefix.trim_end_matches('/').to_owned(),
            modules: Vec::new(),
        }
    }

    /// Walks `directory` and loads every image file (see
    /// [`IMAGE_EXTENSIONS`]) in it. Each file is keyed as
    /// `{prefix}/{relative path}` and served from `{base_url}{relative path}`.
    /// `base_url` should end in a trailing slash.
    pub fn load(directory: &Path, prefix: &str, base_url: &Url) -> Result<AssetGlob> {
        let mut glob = AssetGlob::new(prefix);
        let walk = WalkDir::new(directory)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        for result in walk {
            let entry = result?;
            if !entry.file_type().is_file() || !is_image(entry.path()) {
                continue;
            }

            // strip_prefix() should never fail since `directory` is the
            // walk root
            let relative = match entry.path().strip_prefix(directory) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            glob.insert(
                &relative,
                AssetModule {
                    default: Asset {
                        src: base_url.join(&relative)?,
                        path: entry.path().to_owned(),
                    },
                },
            );
        }
        debug!(
            directory = %directory.display(),
            assets = glob.len(),
            "loaded asset glob"
        );
        Ok(glob)
    }

    /// Adds a module under `{prefix}/{name}`. Re-inserting an existing key
    /// replaces the module but keeps its original position.
    pub fn insert(&mut self, name: &str, module: AssetModule) {
        let key = self.key(name);
        match self.modules.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = module,
            None => self.modules.push((key, module)),
        }
    }

    /// Returns the module stored under the full key `key`.
    pub fn get(&self, key: &str) -> Option<&AssetModule> {
        self.modules
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, module)| module)
    }

    /// Returns the module for a path relative to the glob's prefix.
    pub fn get_relative(&self, name: &str) -> Option<&AssetModule> {
        self.get(&self.key(name))
    }

    /// Iterates over `(key, module)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetModule)> {
        self.modules.iter().map(|(k, m)| (k.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn key(&self, name: &str) -> String {
        format!("{}/{}", self.prefix, name.trim_start_matches('/'))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Returns the first asset (in glob order) whose key contains `image_name`.
/// The match is a plain substring test, so `hero` also matches
/// `superhero.png`; callers with overlapping names should pass enough of the
/// file name to disambiguate. `folder_name` is accepted for call-site
/// compatibility and does not narrow the search.
pub fn get_image<'g>(
    image_name: &str,
    _folder_name: &str,
    glob: &'g AssetGlob,
) -> Option<&'g Asset> {
    glob.iter()
        .find(|(key, _)| key.contains(image_name))
        .map(|(_, module)| &module.default)
}

/// A reference to an image as it appears in post data: either an asset that
/// has already been resolved or a path string written by the CMS.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageRef {
    Resolved(Asset),
    Path(String),
}

impl From<String> for ImageRef {
    fn from(path: String) -> ImageRef {
        ImageRef::Path(path)
    }
}

impl From<&str> for ImageRef {
    fn from(path: &str) -> ImageRef {
        ImageRef::Path(path.to_owned())
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    /// Image fields in frontmatter are always path strings.
    fn deserialize<D>(deserializer: D) -> std::result::Result<ImageRef, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(ImageRef::Path)
    }
}

/// Resolves an [`ImageRef`] into an [`Asset`].
///
/// * [`ImageRef::Resolved`] is returned as-is.
/// * A path under [`PUBLIC_ASSETS_PREFIX`] (`/assets/hero.jpg`) is looked up
///   in `assets` by its file name. Only files directly in the assets
///   directory are reachable this way, so `/assets/team/a.jpg` misses. A miss
///   is logged and yields `None`.
/// * Any other path is passed through unmanaged, with its `src` resolved
///   against `site_root` (so absolute URLs stay as they are).
pub fn resolve_image_path(
    image: ImageRef,
    assets: &AssetGlob,
    site_root: &Url,
) -> Option<Asset> {
    let path = match image {
        ImageRef::Resolved(asset) => return Some(asset),
        ImageRef::Path(path) => path,
    };

    if let Some(name) = path.strip_prefix(PUBLIC_ASSETS_PREFIX) {
        let module = match name.contains('/') {
            true => None,
            false => assets.get_relative(name),
        };
        return match module {
            Some(module) => Some(module.default.clone()),
            None => {
                error!(path = %path, "failed to resolve image");
                None
            }
        };
    }

    match site_root.join(&path) {
        Ok(src) => Some(Asset {
            src,
            path: PathBuf::from(path),
        }),
        Err(err) => {
            error!(path = %path, error = %err, "failed to resolve image");
            None
        }
    }
}

/// The result of a fallible asset-loading operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading an [`AssetGlob`].
#[derive(Debug)]
pub enum Error {
    /// Returned when walking the assets directory fails.
    WalkDir(walkdir::Error),

    /// Returned when an asset's URL can't be built.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::WalkDir(err) => write!(f, "Loading assets: {}", err),
            Error::UrlParse(err) => write!(f, "Building asset URL: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::WalkDir(err) => Some(err),
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator while walking the assets directory.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}
