//! Loads the project configuration from a `shelf.yaml` file.

use crate::assets::DEFAULT_KEY_PREFIX;
use crate::query::DEFAULT_COLLECTION;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file [`Config::from_directory`] searches for.
pub const PROJECT_FILE: &str = "shelf.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

fn default_content_directory() -> PathBuf {
    PathBuf::from("content")
}

fn default_assets_directory() -> PathBuf {
    PathBuf::from("src/assets")
}

fn default_assets_url() -> String {
    String::from("assets/")
}

fn default_collection() -> String {
    String::from(DEFAULT_COLLECTION)
}

#[derive(Deserialize)]
struct Project {
    site_root: Url,

    #[serde(default = "default_content_directory")]
    content_directory: PathBuf,

    #[serde(default = "default_assets_directory")]
    assets_directory: PathBuf,

    #[serde(default = "default_assets_url")]
    assets_url: String,

    #[serde(default = "default_collection")]
    collection: String,

    #[serde(default)]
    page_size: PageSize,
}

/// The resolved project configuration. Directories are absolute or relative
/// to the working directory (i.e., already joined onto the project root).
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// The directory containing `shelf.yaml`.
    pub project_root: PathBuf,

    /// The site's base URL.
    pub site_root: Url,

    /// The directory holding one subdirectory per collection.
    pub content_directory: PathBuf,

    /// The directory image assets are loaded from.
    pub assets_directory: PathBuf,

    /// The key prefix for the loaded asset glob: the assets directory's path
    /// relative to the project root, with a leading slash
    /// (`/src/assets` by default).
    pub assets_key_prefix: String,

    /// The URL assets are served from. Ends in a slash.
    pub assets_url: Url,

    /// The collection posts are read from.
    pub collection: String,

    /// The number of posts per listing page.
    pub page_size: usize,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for `shelf.yaml` and
    /// loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(dir) = current {
            let path = dir.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
            current = dir.parent();
        }
        Err(Error::NotFound(dir.to_owned()))
    }

    /// Loads the project file at `path`. Relative directories in the file
    /// are resolved against the file's directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_yaml::from_reader(file).map_err(|err| Error::Parse {
            path: path.to_owned(),
            err,
        })?;
        let project_root = path.parent().unwrap_or_else(|| Path::new("")).to_owned();
        let site_root = with_trailing_slash(project.site_root);

        let assets_url = match project.assets_url.ends_with('/') {
            true => project.assets_url,
            false => format!("{}/", project.assets_url),
        };

        Ok(Config {
            content_directory: project_root.join(&project.content_directory),
            assets_directory: project_root.join(&project.assets_directory),
            assets_key_prefix: key_prefix(&project.assets_directory),
            assets_url: site_root.join(&assets_url)?,
            site_root,
            collection: project.collection,
            page_size: project.page_size.0.max(1),
            project_root,
        })
    }
}

/// Makes `url` usable as a base for joining: `https://example.org/blog`
/// becomes `https://example.org/blog/` so relative joins stay under `/blog`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Turns a project-relative directory into a glob key prefix, e.g.
/// `src/assets` into `/src/assets`. Absolute directories fall back to
/// [`DEFAULT_KEY_PREFIX`].
fn key_prefix(assets_directory: &Path) -> String {
    if assets_directory.is_absolute() {
        return DEFAULT_KEY_PREFIX.to_owned();
    }
    let components: Vec<String> = assets_directory
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    format!("/{}", components.join("/"))
}

/// The result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Config`].
#[derive(Debug)]
pub enum Error {
    /// Returned when no `shelf.yaml` exists in the directory or any of its
    /// ancestors.
    NotFound(PathBuf),

    /// Returned when the project file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid.
    Parse {
        path: PathBuf,
        err: serde_yaml::Error,
    },

    /// Returned when the assets URL can't be built from the site root.
    UrlParse(url::ParseError),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound(dir) => write!(
                f,
                "Could not find `{}` in '{}' or any parent directory",
                PROJECT_FILE,
                dir.display()
            ),
            Error::Open { path, err } => {
                write!(f, "Opening project file '{}': {}", path.display(), err)
            }
            Error::Parse { path, err } => {
                write!(f, "Loading project file '{}': {}", path.display(), err)
            }
            Error::UrlParse(err) => write!(f, "Building assets URL: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotFound(_) => None,
            Error::Open { err, .. } => Some(err),
            Error::Parse { err, .. } => Some(err),
            Error::UrlParse(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_from_directory_searches_ancestors() -> Result<()> {
        let config = Config::from_directory(Path::new("./testdata/content/blog"))?;
        assert_eq!(Path::new("./testdata"), config.project_root);
        assert_eq!(Path::new("./testdata/content"), config.content_directory);
        assert_eq!(Path::new("./testdata/assets"), config.assets_directory);
        assert_eq!("/assets", config.assets_key_prefix);
        assert_eq!("https://example.org/blog/", config.site_root.as_str());
        assert_eq!(
            "https://example.org/blog/static/img/",
            config.assets_url.as_str()
        );
        assert_eq!("blog", config.collection);
        assert_eq!(2, config.page_size);
        Ok(())
    }

    #[test]
    fn test_defaults() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(PROJECT_FILE);
        std::fs::write(&path, "site_root: https://example.com/\n")?;

        let config = Config::from_project_file(&path)?;
        assert_eq!(dir.path().join("content"), config.content_directory);
        assert_eq!(dir.path().join("src/assets"), config.assets_directory);
        assert_eq!(DEFAULT_KEY_PREFIX, config.assets_key_prefix);
        assert_eq!("https://example.com/assets/", config.assets_url.as_str());
        assert_eq!(DEFAULT_COLLECTION, config.collection);
        assert_eq!(10, config.page_size);
        Ok(())
    }

    #[test]
    fn test_not_found() {
        // A relative search stops at the working directory (the crate root),
        // which has no project file of its own.
        let dir = Path::new("no-such-project/a/b");
        match Config::from_directory(dir) {
            Err(Error::NotFound(searched)) => assert_eq!(dir, searched),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_site_root_without_trailing_slash() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(PROJECT_FILE);
        std::fs::write(&path, "site_root: https://example.org/blog\n")?;

        let config = Config::from_project_file(&path)?;
        assert_eq!("https://example.org/blog/", config.site_root.as_str());
        assert_eq!(
            "https://example.org/blog/assets/",
            config.assets_url.as_str()
        );
        Ok(())
    }

    #[test]
    fn test_invalid_project_file() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(PROJECT_FILE);
        std::fs::write(&path, "site_root: [not, a, url]\n")?;
        assert!(matches!(
            Config::from_project_file(&path),
            Err(Error::Parse { .. })
        ));
        Ok(())
    }
}
