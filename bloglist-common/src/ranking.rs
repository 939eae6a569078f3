//! Ranking statistics over a collection of posts.
//!
//! Every function takes `Option<&[P]>`: `None` stands for "no collection at all" and is
//! kept distinct from an empty one. `total_likes` reports `None` for the former and `0`
//! for the latter; the other rankings have nothing to report for either.
//!
//! Ties always go to whatever was encountered first: the earliest post for
//! [`favorite_blog`], and the author whose first post appears earliest for
//! [`most_blogs`] and [`most_likes`].

use crate::model::post::Post;
use serde::Serialize;
use std::collections::HashMap;

/// The fields the rankings look at.
pub trait Rankable {
    fn title(&self) -> &str;
    fn author(&self) -> &str;
    fn likes(&self) -> u64;
}

impl Rankable for Post {
    fn title(&self) -> &str {
        &self.title
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn likes(&self) -> u64 {
        self.likes
    }
}

/// The most liked post. A lone post is returned whole; otherwise only the ranked fields.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(untagged)]
pub enum Favorite<'a, P> {
    Whole(&'a P),
    Summary(FavoriteSummary),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct FavoriteSummary {
    pub title: String,
    pub author: String,
    pub likes: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct AuthorBlogs {
    pub author: String,
    pub blogs: usize,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct AuthorLikes {
    pub author: String,
    pub likes: u64,
}

/// All four rankings at once.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary<'a, P> {
    pub total_likes: Option<u64>,
    pub favorite_blog: Option<Favorite<'a, P>>,
    pub most_blogs: Option<AuthorBlogs>,
    pub most_likes: Option<AuthorLikes>,
}

struct AuthorGroup<'a> {
    author: &'a str,
    blogs: usize,
    likes: u64,
}

/// Groups posts by author, keeping groups in order of each author's first appearance.
fn group_by_author<P: Rankable>(posts: &[P]) -> Vec<AuthorGroup<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<AuthorGroup<'_>> = Vec::new();

    for post in posts {
        let position = *index.entry(post.author()).or_insert_with(|| {
            groups.push(AuthorGroup {
                author: post.author(),
                blogs: 0,
                likes: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[position];
        group.blogs += 1;
        group.likes = group.likes.saturating_add(post.likes());
    }

    groups
}

/// First element with the strictly greatest key.
fn first_max_by_key<T, K: Ord>(
    items: impl IntoIterator<Item = T>,
    key: impl Fn(&T) -> K,
) -> Option<T> {
    items
        .into_iter()
        .reduce(|best, item| if key(&item) > key(&best) { item } else { best })
}

#[must_use]
pub fn total_likes<P: Rankable>(posts: Option<&[P]>) -> Option<u64> {
    posts.map(|posts| {
        posts
            .iter()
            .fold(0, |total: u64, post| total.saturating_add(post.likes()))
    })
}

#[must_use]
pub fn favorite_blog<P: Rankable>(posts: Option<&[P]>) -> Option<Favorite<'_, P>> {
    match posts? {
        [] => None,
        [only] => Some(Favorite::Whole(only)),
        posts => first_max_by_key(posts, |post| post.likes()).map(|post| {
            Favorite::Summary(FavoriteSummary {
                title: post.title().to_owned(),
                author: post.author().to_owned(),
                likes: post.likes(),
            })
        }),
    }
}

#[must_use]
pub fn most_blogs<P: Rankable>(posts: Option<&[P]>) -> Option<AuthorBlogs> {
    let groups = group_by_author(posts?);

    first_max_by_key(groups, |group| group.blogs).map(|group| AuthorBlogs {
        author: group.author.to_owned(),
        blogs: group.blogs,
    })
}

#[must_use]
pub fn most_likes<P: Rankable>(posts: Option<&[P]>) -> Option<AuthorLikes> {
    let groups = group_by_author(posts?);

    first_max_by_key(groups, |group| group.likes).map(|group| AuthorLikes {
        author: group.author.to_owned(),
        likes: group.likes,
    })
}

#[must_use]
pub fn summarize<P: Rankable>(posts: Option<&[P]>) -> Summary<'_, P> {
    Summary {
        total_likes: total_likes(posts),
        favorite_blog: favorite_blog(posts),
        most_blogs: most_blogs(posts),
        most_likes: most_likes(posts),
    }
}
