//! Blog listing filters.
//!
//! `FilterCriteria` is what the reader picks; `compose` turns it into a `PostQuery`
//! that the content store executes. The same `PostQuery` can be evaluated in memory
//! (`matches` / `apply`) so that both store implementations agree on semantics.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

use crate::models::{BlogPost, PostSummary};

/// SortKey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SortKey {
    #[default]
    PublishDateDesc,
    ReadTimeAsc,
    ReadTimeDesc,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::PublishDateDesc => "Newest",
            SortKey::ReadTimeAsc => "Read Time (Shortest)",
            SortKey::ReadTimeDesc => "Read Time (Longest)",
        }
    }
}

/// FilterCriteria
///
/// Reader-selected listing state. Empty strings mean "no restriction". Doubles as the
/// query-string shape of `GET /blog`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
#[ts(export)]
pub struct FilterCriteria {
    /// Only posts carrying this tag.
    pub tag: String,
    /// Only posts by exactly this author.
    pub author: String,
    /// Case-insensitive substring of title or excerpt.
    #[serde(rename = "search")]
    pub search_term: String,
    #[serde(rename = "sort")]
    pub sort_key: SortKey,
}

/// A single filter condition. Conditions in a `PostQuery` are AND-ed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Published,
    /// Set membership on `tags`.
    HasTag(String),
    /// Exact equality on `author`.
    AuthorEquals(String),
    /// `title ILIKE %term% OR excerpt ILIKE %term%`.
    TitleOrExcerptContains(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    PublishDate,
    ReadTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub column: SortColumn,
    pub direction: Direction,
    pub nulls_last: bool,
}

impl From<SortKey> for Ordering {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::PublishDateDesc => Ordering {
                column: SortColumn::PublishDate,
                direction: Direction::Desc,
                nulls_last: false,
            },
            SortKey::ReadTimeAsc => Ordering {
                column: SortColumn::ReadTime,
                direction: Direction::Asc,
                nulls_last: true,
            },
            SortKey::ReadTimeDesc => Ordering {
                column: SortColumn::ReadTime,
                direction: Direction::Desc,
                nulls_last: true,
            },
        }
    }
}

/// PostQuery
///
/// One fully composed listing request: a conjunction of predicates plus an ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub predicates: Vec<Predicate>,
    pub ordering: Ordering,
}

/// compose
///
/// `Published` is always first; tag, author and search follow only when non-empty.
pub fn compose(criteria: &FilterCriteria) -> PostQuery {
    let mut predicates = vec![Predicate::Published];

    if !criteria.tag.is_empty() {
        predicates.push(Predicate::HasTag(criteria.tag.clone()));
    }
    if !criteria.author.is_empty() {
        predicates.push(Predicate::AuthorEquals(criteria.author.clone()));
    }
    if !criteria.search_term.is_empty() {
        predicates.push(Predicate::TitleOrExcerptContains(
            criteria.search_term.clone(),
        ));
    }

    PostQuery {
        predicates,
        ordering: criteria.sort_key.into(),
    }
}

impl Predicate {
    pub fn matches(&self, post: &BlogPost) -> bool {
        match self {
            Predicate::Published => post.published,
            Predicate::HasTag(tag) => post.tags.iter().any(|t| t == tag),
            Predicate::AuthorEquals(author) => post.author == *author,
            Predicate::TitleOrExcerptContains(term) => {
                let needle = term.to_lowercase();
                post.title.to_lowercase().contains(&needle)
                    || post.excerpt.to_lowercase().contains(&needle)
            }
        }
    }
}

impl Ordering {
    pub fn compare(&self, a: &PostSummary, b: &PostSummary) -> CmpOrdering {
        match self.column {
            SortColumn::PublishDate => self.directed(a.publish_date.cmp(&b.publish_date)),
            SortColumn::ReadTime => match (a.read_time, b.read_time) {
                (Some(x), Some(y)) => self.directed(x.cmp(&y)),
                (None, None) => CmpOrdering::Equal,
                (None, Some(_)) if self.nulls_last => CmpOrdering::Greater,
                (Some(_), None) if self.nulls_last => CmpOrdering::Less,
                // Postgres default: NULL sorts as the largest value.
                (None, Some(_)) => self.directed(CmpOrdering::Greater),
                (Some(_), None) => self.directed(CmpOrdering::Less),
            },
        }
    }

    fn directed(&self, ord: CmpOrdering) -> CmpOrdering {
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

impl PostQuery {
    pub fn matches(&self, post: &BlogPost) -> bool {
        self.predicates.iter().all(|p| p.matches(post))
    }

    /// Filters, projects and orders. The sort is stable so ties keep store order.
    pub fn apply<'a, I>(&self, posts: I) -> Vec<PostSummary>
    where
        I: IntoIterator<Item = &'a BlogPost>,
    {
        let mut out: Vec<PostSummary> = posts
            .into_iter()
            .filter(|post| self.matches(post))
            .map(PostSummary::from)
            .collect();
        out.sort_by(|a, b| self.ordering.compare(a, b));
        out
    }
}

/// Escapes `\`, `%` and `_` so a search term is matched literally inside `ILIKE`.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// FilterOptions
///
/// The selectable tag and author values, derived from all published posts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FilterOptions {
    pub tags: Vec<String>,
    pub authors: Vec<String>,
}

impl FilterOptions {
    /// Distinct values in order of first appearance; empty authors are skipped.
    pub fn collect<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a [String], &'a str)>,
    {
        let mut options = FilterOptions::default();
        for (tags, author) in rows {
            for tag in tags {
                if !options.tags.contains(tag) {
                    options.tags.push(tag.clone());
                }
            }
            if !author.is_empty() && !options.authors.iter().any(|a| a == author) {
                options.authors.push(author.to_string());
            }
        }
        options
    }
}
