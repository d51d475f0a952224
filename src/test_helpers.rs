//! Shared test utilities: small builders for [`Post`] fixtures.

use crate::date::parse_date;
use crate::post::Post;

/// A published, non-featured post with no tags or authors.
pub fn post(id: &str, pub_date: &str) -> Post {
    Post {
        id: id.to_owned(),
        title: id.to_owned(),
        description: None,
        pub_date: parse_date(pub_date).unwrap(),
        draft: false,
        featured: false,
        add_to_homepage_slider: false,
        tags: None,
        authors: None,
        hero_image: None,
        body: String::new(),
    }
}

pub fn draft(id: &str, pub_date: &str) -> Post {
    Post {
        draft: true,
        ..post(id, pub_date)
    }
}

pub fn tagged(post: Post, tags: &[&str]) -> Post {
    Post {
        tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        ..post
    }
}

pub fn authored(post: Post, authors: &[&str]) -> Post {
    Post {
        authors: Some(authors.iter().map(|a| a.to_string()).collect()),
        ..post
    }
}

pub fn ids(posts: &[Post]) -> Vec<&str> {
    posts.iter().map(|p| p.id.as_str()).collect()
}
