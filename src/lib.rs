//! The library code for `shelf`, a set of utilities that a static content
//! site uses to turn a collection of blog posts into page data. The pieces
//! can be broken down as follows:
//!
//! 1. Reading posts from a content store ([`crate::store`], [`crate::post`])
//! 2. Querying them: filtering, sorting most recent first, truncating, and
//!    paginating ([`crate::query`])
//! 3. Deriving tag (a.k.a. topic) and author taxonomies with their counts
//!    ([`crate::taxonomy`])
//! 4. Presentation helpers: slugs ([`crate::slug`]) and display dates
//!    ([`crate::date`])
//!
//! Two independent leaves sit beside that pipeline: resolving image assets
//! by name ([`crate::assets`]) and restarting background autoplay videos
//! after a page is restored or shown again ([`crate::autoplay`]).

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod assets;
pub mod autoplay;
pub mod config;
pub mod date;
pub mod post;
pub mod query;
pub mod slug;
pub mod store;
pub mod taxonomy;

#[cfg(test)]
pub(crate) mod test_helpers;

#[cfg(test)]
mod test {
    use crate::assets::{resolve_image_path, AssetGlob};
    use crate::config::Config;
    use crate::date::format_date;
    use crate::query::{post_with_siblings, Blog, SortedPosts};
    use crate::store::DirectoryStore;
    use crate::test_helpers::ids;
    use std::path::Path;

    #[test]
    fn test_project_pipeline() -> Result<(), Box<dyn std::error::Error>> {
        let config = Config::from_directory(Path::new("./testdata"))?;
        let store = DirectoryStore::new(&config.content_directory);
        let blog = Blog::new(&store, &config.collection);

        let result = blog.sorted_posts(SortedPosts::default())?;
        assert_eq!(3, result.total_posts);
        assert_eq!(
            vec!["second-post", "first-post", "bundle"],
            ids(&result.posts)
        );
        assert_eq!("Mar 2, 2024", format_date(result.posts[0].pub_date));

        let page = result.page(1, config.page_size).unwrap();
        assert_eq!(vec!["bundle"], ids(page.posts));

        let siblings = post_with_siblings(&result.posts, 1);
        assert_eq!("bundle", siblings.previous_post.unwrap().id);
        assert_eq!("second-post", siblings.next_post.unwrap().id);

        let tags: Vec<(String, usize)> = blog
            .tags_with_count()?
            .into_iter()
            .map(|e| (e.original, e.count))
            .collect();
        assert_eq!(
            vec![
                ("Café Culture".to_owned(), 1),
                ("rust".to_owned(), 2),
                ("Web".to_owned(), 2),
            ],
            tags
        );

        let glob = AssetGlob::load(
            &config.assets_directory,
            &config.assets_key_prefix,
            &config.assets_url,
        )?;
        let first = &result.posts[1];
        let hero = first.hero_image.clone().unwrap();
        let hero = resolve_image_path(hero, &glob, &config.site_root).unwrap();
        assert_eq!(
            "https://example.org/blog/static/img/hero.jpg",
            hero.src.as_str()
        );
        Ok(())
    }
}
