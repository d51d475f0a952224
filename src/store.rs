//! Defines the [`ContentStore`] trait, which is the only way the rest of the
//! crate reads posts, along with two implementations: [`DirectoryStore`]
//! (Markdown files on disk) and [`MemoryStore`] (posts held in memory).

use crate::post::{Error as ParseError, Post};
use std::collections::HashMap;
use std::fmt;
use std::fs::{read_dir, DirEntry, File};
use std::path::{Path, PathBuf};
use tracing::debug;

const MARKDOWN_EXTENSION: &str = ".md";
const BUNDLE_INDEX: &str = "index.md";

/// A read-only source of posts grouped into named collections.
pub trait ContentStore {
    type Error: std::error::Error + 'static;

    /// Fetches every entry of the collection `name` for which `filter`
    /// returns `true`, in the store's fetch order.
    fn get_collection<F>(&self, name: &str, filter: F) -> Result<Vec<Post>, Self::Error>
    where
        F: FnMut(&Post) -> bool;
}

/// Reads collections from a content directory. Each collection is a
/// subdirectory; each entry is either a `{id}.md` file or a bundle directory
/// `{id}/index.md`. Entries are fetched in file name order.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    content_directory: PathBuf,
}

impl DirectoryStore {
    pub fn new(content_directory: impl Into<PathBuf>) -> DirectoryStore {
        DirectoryStore {
            content_directory: content_directory.into(),
        }
    }

    pub fn content_directory(&self) -> &Path {
        &self.content_directory
    }

    fn parse_entry(&self, entry: &DirEntry) -> Result<Option<Post>, Error> {
        let os_file_name = entry.file_name();
        let file_name = os_file_name.to_string_lossy();
        if is_bundle(entry)? {
            let post = parse_file(&file_name, &entry.path().join(BUNDLE_INDEX))?;
            Ok(Some(post))
        } else if file_name.ends_with(MARKDOWN_EXTENSION) {
            let id = file_name.trim_end_matches(MARKDOWN_EXTENSION);
            Ok(Some(parse_file(id, &entry.path())?))
        } else {
            Ok(None)
        }
    }
}

impl ContentStore for DirectoryStore {
    type Error = Error;

    fn get_collection<F>(&self, name: &str, mut filter: F) -> Result<Vec<Post>, Error>
    where
        F: FnMut(&Post) -> bool,
    {
        let directory = self.content_directory.join(name);
        let mut entries = read_dir(&directory)
            .and_then(|entries| entries.collect::<std::io::Result<Vec<_>>>())
            .map_err(|err| Error::Collection {
                name: name.to_owned(),
                path: directory.clone(),
                err,
            })?;
        entries.sort_by_key(|entry| entry.file_name());

        let mut posts = Vec::new();
        let mut seen = 0;
        for entry in &entries {
            if let Some(post) = self.parse_entry(entry)? {
                seen += 1;
                if filter(&post) {
                    posts.push(post);
                }
            }
        }
        debug!(
            collection = name,
            entries = seen,
            matched = posts.len(),
            "fetched collection"
        );
        Ok(posts)
    }
}

fn is_bundle(entry: &DirEntry) -> Result<bool, Error> {
    let file_type = entry.file_type().map_err(|err| Error::Io {
        path: entry.path(),
        err,
    })?;
    Ok(file_type.is_dir() && entry.path().join(BUNDLE_INDEX).is_file())
}

fn parse_file(id: &str, path: &Path) -> Result<Post, Error> {
    use std::io::Read;
    let mut contents = String::new();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut contents))
        .map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
    Post::parse(id, &contents).map_err(|err| Error::Parse {
        path: path.to_owned(),
        err,
    })
}

/// Holds collections in memory. Useful for tests and for embedding posts
/// that were produced elsewhere.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Adds (or replaces) the collection `name`. The order of `posts` is the
    /// fetch order.
    pub fn with_collection(mut self, name: &str, posts: Vec<Post>) -> MemoryStore {
        self.collections.insert(name.to_owned(), posts);
        self
    }
}

impl ContentStore for MemoryStore {
    type Error = Error;

    fn get_collection<F>(&self, name: &str, mut filter: F) -> Result<Vec<Post>, Error>
    where
        F: FnMut(&Post) -> bool,
    {
        match self.collections.get(name) {
            Some(posts) => Ok(posts.iter().filter(|p| filter(*p)).cloned().collect()),
            None => Err(Error::UnknownCollection(name.to_owned())),
        }
    }
}

/// Represents an error fetching a collection.
#[derive(Debug)]
pub enum Error {
    /// Returned when a collection's directory can't be listed.
    Collection {
        name: String,
        path: PathBuf,
        err: std::io::Error,
    },

    /// Returned when a [`MemoryStore`] has no collection by that name.
    UnknownCollection(String),

    /// Returned for I/O errors reading a post file.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when a post file can't be parsed.
    Parse { path: PathBuf, err: ParseError },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Collection { name, path, err } => write!(
                f,
                "Reading collection `{}` at '{}': {}",
                name,
                path.display(),
                err
            ),
            Error::UnknownCollection(name) => {
                write!(f, "Unknown collection `{}`", name)
            }
            Error::Io { path, err } => {
                write!(f, "Reading post '{}': {}", path.display(), err)
            }
            Error::Parse { path, err } => {
                write!(f, "Parsing post '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Collection { err, .. } => Some(err),
            Error::UnknownCollection(_) => None,
            Error::Io { err, .. } => Some(err),
            Error::Parse { err, .. } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::post;

    #[test]
    fn test_directory_store() -> Result<(), Error> {
        let store = DirectoryStore::new("./testdata/content");
        let posts = store.get_collection("blog", |_| true)?;
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            vec!["bundle", "draft-post", "first-post", "second-post"],
            ids
        );

        let bundle = &posts[0];
        assert_eq!("A bundled post", bundle.title);
        assert_eq!(&["Web".to_owned()], bundle.tags());
        Ok(())
    }

    #[test]
    fn test_directory_store_filter() -> Result<(), Error> {
        let store = DirectoryStore::new("./testdata/content");
        let posts = store.get_collection("blog", |p| p.draft)?;
        assert_eq!(1, posts.len());
        assert_eq!("draft-post", posts[0].id);
        Ok(())
    }

    #[test]
    fn test_directory_store_missing_collection() {
        let store = DirectoryStore::new("./testdata/content");
        match store.get_collection("nope", |_| true) {
            Err(Error::Collection { name, .. }) => assert_eq!("nope", name),
            other => panic!("expected a collection error, got {:?}", other),
        }
    }

    #[test]
    fn test_directory_store_malformed_post() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("blog"))?;
        std::fs::write(dir.path().join("blog/broken.md"), "no frontmatter")?;

        let store = DirectoryStore::new(dir.path());
        match store.get_collection("blog", |_| true) {
            Err(Error::Parse { path, err }) => {
                assert!(path.ends_with("blog/broken.md"));
                assert!(matches!(err, ParseError::FrontmatterMissingStartFence));
            }
            other => panic!("expected a parse error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_memory_store() -> Result<(), Error> {
        let store = MemoryStore::new().with_collection(
            "blog",
            vec![post("a", "2024-01-01"), post("b", "2024-01-02")],
        );
        let posts = store.get_collection("blog", |p| p.id == "b")?;
        assert_eq!(vec![post("b", "2024-01-02")], posts);
        assert!(matches!(
            store.get_collection("pages", |_| true),
            Err(Error::UnknownCollection(_))
        ));
        Ok(())
    }
}
