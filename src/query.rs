//! The post queries used by page templates: sorted and filtered post lists,
//! previous/next siblings, and pagination. Every query re-fetches from the
//! [`ContentStore`]; nothing is cached between calls.

use crate::post::Post;
use crate::store::ContentStore;

/// The collection blog posts live in unless configured otherwise.
pub const DEFAULT_COLLECTION: &str = "blog";

/// Runs post queries against one collection of a [`ContentStore`].
pub struct Blog<'s, S> {
    store: &'s S,
    collection: &'s str,
}

/// Options for [`Blog::sorted_posts`]. The default returns every published
/// post.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortedPosts {
    /// Return at most this many posts. `None` and `Some(0)` both mean no
    /// limit.
    pub limit: Option<usize>,

    /// Only return featured posts.
    pub featured: bool,

    /// Only return posts marked for the homepage slider.
    pub homepage_slider: bool,
}

/// The result of a post query: the (possibly truncated) posts, most recent
/// first, and the number of posts that matched before truncation.
#[derive(Clone, Debug, PartialEq)]
pub struct PostQueryResult {
    pub posts: Vec<Post>,

    /// Always `>= posts.len()`.
    pub total_posts: usize,
}

/// The neighbours of a post in a list sorted most recent first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Siblings<'a> {
    /// The next older post.
    pub previous_post: Option<&'a Post>,

    /// The next newer post.
    pub next_post: Option<&'a Post>,
}

/// One page of a [`PostQueryResult`]. Pages are numbered from zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Page<'a> {
    pub posts: &'a [Post],
    pub page: usize,
    pub total_pages: usize,
}

impl Page<'_> {
    pub fn prev(&self) -> Option<usize> {
        self.page.checked_sub(1)
    }

    pub fn next(&self) -> Option<usize> {
        match self.page + 1 < self.total_pages {
            true => Some(self.page + 1),
            false => None,
        }
    }
}

impl<'s, S: ContentStore> Blog<'s, S> {
    pub fn new(store: &'s S, collection: &'s str) -> Blog<'s, S> {
        Blog { store, collection }
    }

    /// Returns published posts, most recent first, optionally restricted to
    /// featured and/or homepage-slider posts and truncated to `limit`.
    pub fn sorted_posts(&self, query: SortedPosts) -> Result<PostQueryResult, S::Error> {
        let posts = self.store.get_collection(self.collection, |post| {
            !post.draft
                && (!query.featured || post.featured)
                && (!query.homepage_slider || post.add_to_homepage_slider)
        })?;
        Ok(PostQueryResult::new(posts, query.limit))
    }

    /// Returns published posts carrying `tag` (compared case-insensitively),
    /// or every published post if `tag` is `None`.
    pub fn posts_by_tag(
        &self,
        tag: Option<&str>,
        limit: Option<usize>,
    ) -> Result<PostQueryResult, S::Error> {
        let tag = tag.map(str::to_lowercase);
        let posts = self.store.get_collection(self.collection, |post| {
            !post.draft
                && tag
                    .as_deref()
                    .map_or(true, |tag| contains_ignore_case(post.tags(), tag))
        })?;
        Ok(PostQueryResult::new(posts, limit))
    }

    /// Topics are the tag dimension under another name.
    pub fn posts_by_topic(
        &self,
        topic: Option<&str>,
        limit: Option<usize>,
    ) -> Result<PostQueryResult, S::Error> {
        self.posts_by_tag(topic, limit)
    }

    /// Returns published posts written by `author` (compared
    /// case-insensitively), or every published post if `author` is `None`.
    pub fn posts_by_author(
        &self,
        author: Option<&str>,
        limit: Option<usize>,
    ) -> Result<PostQueryResult, S::Error> {
        let author = author.map(str::to_lowercase);
        let posts = self.store.get_collection(self.collection, |post| {
            !post.draft
                && author
                    .as_deref()
                    .map_or(true, |author| contains_ignore_case(post.authors(), author))
        })?;
        Ok(PostQueryResult::new(posts, limit))
    }
}

/// `needle` must already be lowercase.
fn contains_ignore_case(haystack: &[String], needle: &str) -> bool {
    haystack.iter().any(|value| value.to_lowercase() == needle)
}

/// Returns the posts on either side of `posts[index]` in a list sorted most
/// recent first: `previous_post` is `posts[index + 1]` and `next_post` is
/// `posts[index - 1]`. Out-of-range neighbours are `None`; `index` itself is
/// not validated.
pub fn post_with_siblings(posts: &[Post], index: usize) -> Siblings<'_> {
    Siblings {
        previous_post: index.checked_add(1).and_then(|i| posts.get(i)),
        next_post: index.checked_sub(1).and_then(|i| posts.get(i)),
    }
}

impl PostQueryResult {
    /// Sorts `posts` by publication date, most recent first, then truncates
    /// to `limit`. The sort is stable so posts with the same date keep their
    /// fetch order.
    pub fn new(mut posts: Vec<Post>, limit: Option<usize>) -> PostQueryResult {
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        let total_posts = posts.len();
        if let Some(limit) = limit.filter(|limit| *limit > 0) {
            posts.truncate(limit);
        }
        PostQueryResult { posts, total_posts }
    }

    /// Splits the returned posts into pages of `page_size` and returns page
    /// number `page`, or `None` past the last page. An empty result still
    /// has a (blank) first page.
    pub fn page(&self, page: usize, page_size: usize) -> Option<Page<'_>> {
        let page_size = page_size.max(1);
        let total_pages = match self.posts.len() % page_size {
            0 => self.posts.len() / page_size,
            _ => self.posts.len() / page_size + 1,
        }
        .max(1);
        if page >= total_pages {
            return None;
        }

        let start = page * page_size;
        let end = (start + page_size).min(self.posts.len());
        Some(Page {
            posts: &self.posts[start..end],
            page,
            total_pages,
        })
    }
}
