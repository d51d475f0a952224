//! Defines the [`Post`] type and the logic for parsing a post from a Markdown
//! source with YAML frontmatter.

use crate::assets::ImageRef;
use crate::date::parse_date;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// A blog post as read from the content store. Posts are read-only
/// snapshots; nothing in this crate modifies them after parsing.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The entry's ID: its path relative to the collection directory, less
    /// the extension (bundles use the directory name).
    pub id: String,

    pub title: String,

    pub description: Option<String>,

    /// The publication date. Posts sort by this field, most recent first.
    pub pub_date: DateTime<FixedOffset>,

    /// Drafts are never returned by the query functions.
    pub draft: bool,

    pub featured: bool,

    pub add_to_homepage_slider: bool,

    /// The post's tags (also called topics). `None` when the frontmatter has
    /// no `tags` field at all.
    pub tags: Option<Vec<String>>,

    /// The post's authors. `None` when the frontmatter has no `authors` field.
    pub authors: Option<Vec<String>>,

    pub hero_image: Option<ImageRef>,

    /// The raw Markdown following the frontmatter.
    pub body: String,
}

impl Post {
    /// Parses a [`Post`] from an `id` and an `input` string. The input must
    /// be structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with fields `title` and `pub_date`, and optionally
    ///    `description`, `draft`, `featured`, `add_to_homepage_slider`,
    ///    `tags`, `authors`, and `hero_image`
    /// 3. Terminal frontmatter fence (`---`) on its own line
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// pub_date: 2024-04-16
    /// tags: [greet]
    /// authors: [Ada Lovelace]
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    ///
    /// Null entries in `tags` and `authors` are dropped.
    pub fn parse(id: &str, input: &str) -> Result<Post> {
        fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
            const FENCE: &str = "---";
            const END_FENCE: &str = "\n---";
            if !input.starts_with(FENCE) {
                return Err(Error::FrontmatterMissingStartFence);
            }
            match input[FENCE.len()..].find(END_FENCE) {
                None => Err(Error::FrontmatterMissingEndFence),
                Some(offset) => Ok((
                    FENCE.len(),                            // yaml_start
                    FENCE.len() + offset,                   // yaml_stop
                    FENCE.len() + offset + END_FENCE.len(), // body_start
                )),
            }
        }

        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let frontmatter: Frontmatter = serde_yaml::from_str(&input[yaml_start..yaml_stop])?;
        let pub_date = parse_date(&frontmatter.pub_date)
            .ok_or_else(|| Error::InvalidDate(frontmatter.pub_date.clone()))?;

        Ok(Post {
            id: id.to_owned(),
            title: frontmatter.title,
            description: frontmatter.description,
            pub_date,
            draft: frontmatter.draft,
            featured: frontmatter.featured,
            add_to_homepage_slider: frontmatter.add_to_homepage_slider,
            tags: frontmatter.tags,
            authors: frontmatter.authors,
            hero_image: frontmatter.hero_image,
            body: input[body_start..]
                .trim_start_matches(|c: char| c == '\r' || c == '\n')
                .to_owned(),
        })
    }

    /// The post's tags, or an empty slice if it has none.
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }

    /// The post's authors, or an empty slice if it has none.
    pub fn authors(&self) -> &[String] {
        self.authors.as_deref().unwrap_or(&[])
    }
}

#[derive(Deserialize)]
struct Frontmatter {
    title: String,

    #[serde(default)]
    description: Option<String>,

    /// Kept as text here; it's parsed by [`parse_date`] so date-only values
    /// and full timestamps are both accepted.
    pub_date: String,

    #[serde(default)]
    draft: bool,

    #[serde(default)]
    featured: bool,

    #[serde(default)]
    add_to_homepage_slider: bool,

    #[serde(default, deserialize_with = "deserialize_names")]
    tags: Option<Vec<String>>,

    #[serde(default, deserialize_with = "deserialize_names")]
    authors: Option<Vec<String>>,

    #[serde(default)]
    hero_image: Option<ImageRef>,
}

/// Deserializes an optional list of names, skipping null entries (e.g.
/// `tags: [rust, ~]`).
fn deserialize_names<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let names: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(names.map(|names| names.into_iter().flatten().collect()))
}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when `pub_date` isn't a recognized date.
    InvalidDate(String),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => write!(f, "{}", err),
            Error::InvalidDate(date) => {
                write!(f, "Invalid `pub_date`: {:?}", date)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidDate(_) => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
