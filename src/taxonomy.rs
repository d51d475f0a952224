//! Tags (a.k.a. topics) and authors across the published posts: the distinct
//! values with their slugs, and how many times each one is used.

use crate::post::Post;
use crate::query::{Blog, SortedPosts};
use crate::slug::{slugify, strip_diacritics};
use crate::store::ContentStore;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// A taxonomy value as written in a post, paired with its slug.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaxonomyEntry {
    pub original: String,
    pub slug: String,
}

impl TaxonomyEntry {
    pub fn new(original: &str) -> TaxonomyEntry {
        TaxonomyEntry {
            original: original.to_owned(),
            slug: slugify(original),
        }
    }
}

impl From<&str> for TaxonomyEntry {
    fn from(original: &str) -> TaxonomyEntry {
        TaxonomyEntry::new(original)
    }
}

/// A [`TaxonomyEntry`] with the number of times its slug occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaxonomyEntryWithCount {
    pub original: String,
    pub slug: String,

    /// Always at least 1.
    pub count: usize,
}

/// Selects which of a post's lists a taxonomy reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaxonomyKind {
    /// The `tags` list, which templates also call topics.
    Tag,
    Author,
}

impl TaxonomyKind {
    pub fn values(self, post: &Post) -> &[String] {
        match self {
            TaxonomyKind::Tag => post.tags(),
            TaxonomyKind::Author => post.authors(),
        }
    }
}

/// Flattens the `kind` values of every post into entries, one per
/// occurrence, in post order. Values with an empty slug (`""`, `"  "`,
/// `"!!!"`) are dropped.
pub fn occurrences<'a>(
    posts: impl IntoIterator<Item = &'a Post>,
    kind: TaxonomyKind,
) -> Vec<TaxonomyEntry> {
    posts
        .into_iter()
        .flat_map(|post| kind.values(post))
        .map(|value| TaxonomyEntry::new(value))
        .filter(|entry| !entry.slug.is_empty())
        .collect()
}

/// Drops repeated `(original, slug)` pairs, keeping the first of each.
/// Values that differ only in spelling (`Rust` and `rust`) stay separate
/// here even though their slugs collide; the counters merge them.
pub fn distinct(entries: Vec<TaxonomyEntry>) -> Vec<TaxonomyEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.clone()))
        .collect()
}

/// Groups entries by slug and counts them, keeping the `original` of the
/// first entry seen for each slug. Output is in first-seen order.
fn count_by_slug<'a>(
    entries: impl IntoIterator<Item = &'a TaxonomyEntry>,
) -> Vec<TaxonomyEntryWithCount> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counted: Vec<TaxonomyEntryWithCount> = Vec::new();
    for entry in entries {
        match positions.get(entry.slug.as_str()) {
            Some(&i) => counted[i].count += 1,
            None => {
                positions.insert(&entry.slug, counted.len());
                counted.push(TaxonomyEntryWithCount {
                    original: entry.original.clone(),
                    slug: entry.slug.clone(),
                    count: 1,
                });
            }
        }
    }
    counted
}

/// Counts tag entries by slug and sorts the result alphabetically by
/// `original` (see [`locale_compare`]).
pub fn unique_tags_with_count(entries: &[TaxonomyEntry]) -> Vec<TaxonomyEntryWithCount> {
    let mut counted = count_by_slug(entries);
    counted.sort_by(|a, b| locale_compare(&a.original, &b.original));
    counted
}

/// Counts author entries by slug. Unlike [`unique_tags_with_count`] the
/// result is left in first-seen order.
// TODO: decide with the templates whether author listings should also be
// sorted alphabetically; until then this keeps first-seen order.
pub fn unique_authors_with_count(entries: &[TaxonomyEntry]) -> Vec<TaxonomyEntryWithCount> {
    count_by_slug(entries)
}

/// Orders strings roughly the way an `en` collator does: first ignoring
/// accents and case, then unaccented before accented, then lowercase before
/// uppercase.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let (a_base, b_base) = (strip_diacritics(a), strip_diacritics(b));
    a_base
        .to_lowercase()
        .cmp(&b_base.to_lowercase())
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

impl<'s, S: ContentStore> Blog<'s, S> {
    fn published(&self) -> Result<Vec<Post>, S::Error> {
        Ok(self.sorted_posts(SortedPosts::default())?.posts)
    }

    /// Every tag occurrence across published posts, most recent post first.
    pub fn tag_occurrences(&self) -> Result<Vec<TaxonomyEntry>, S::Error> {
        Ok(occurrences(&self.published()?, TaxonomyKind::Tag))
    }

    /// Every author occurrence across published posts, most recent post
    /// first.
    pub fn author_occurrences(&self) -> Result<Vec<TaxonomyEntry>, S::Error> {
        Ok(occurrences(&self.published()?, TaxonomyKind::Author))
    }

    /// The distinct tags across published posts.
    pub fn tags(&self) -> Result<Vec<TaxonomyEntry>, S::Error> {
        Ok(distinct(self.tag_occurrences()?))
    }

    /// Same as [`Blog::tags`].
    pub fn topics(&self) -> Result<Vec<TaxonomyEntry>, S::Error> {
        self.tags()
    }

    /// The distinct authors across published posts.
    pub fn authors(&self) -> Result<Vec<TaxonomyEntry>, S::Error> {
        Ok(distinct(self.author_occurrences()?))
    }

    /// Tags with the number of published posts using each, alphabetically.
    pub fn tags_with_count(&self) -> Result<Vec<TaxonomyEntryWithCount>, S::Error> {
        Ok(unique_tags_with_count(&self.tag_occurrences()?))
    }

    /// Authors with the number of published posts by each, in first-seen
    /// order.
    pub fn authors_with_count(&self) -> Result<Vec<TaxonomyEntryWithCount>, S::Error> {
        Ok(unique_authors_with_count(&self.author_occurrences()?))
    }
}
