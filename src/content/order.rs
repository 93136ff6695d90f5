//! Post ordering and grouping for reader-facing indexes

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::Post;

/// Newest-first comparison
///
/// Posts are ordered by (date, source path) and the order is reversed, so
/// posts sharing a date list in reverse path order. The source path is unique
/// per post, which makes this a total order.
pub fn newest_first(a: &Post, b: &Post) -> Ordering {
    (b.date(), &b.source).cmp(&(a.date(), &a.source))
}

/// Sort posts in reverse-chronological order
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(newest_first);
}

/// Group posts by publication year, newest year first
///
/// Posts keep their relative order inside each year.
pub fn group_by_year(posts: &[Post]) -> Vec<(i32, Vec<&Post>)> {
    let mut years: BTreeMap<i32, Vec<&Post>> = BTreeMap::new();
    for post in posts {
        years.entry(post.name.year()).or_default().push(post);
    }
    years.into_iter().rev().collect()
}

/// Count how many posts carry each term, most used first
pub fn count_terms<'a, F>(posts: &'a [Post], terms: F) -> Vec<(String, usize)>
where
    F: Fn(&'a Post) -> &'a [String],
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for post in posts {
        for term in terms(post) {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }
    }

    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(term, count)| (term.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}
