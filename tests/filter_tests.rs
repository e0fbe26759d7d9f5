mod common;

use chrono::NaiveDate;
use common::{date, post};
use portfolio_cms::{
    filter::{
        Direction, FilterCriteria, FilterOptions, Predicate, SortColumn, SortKey, compose,
        escape_like,
    },
    models::BlogPost,
    repository::push_post_query,
};
use sqlx::{Postgres, QueryBuilder};

fn dated(mut p: BlogPost, publish_date: NaiveDate, read_time: Option<i32>) -> BlogPost {
    p.publish_date = publish_date;
    p.read_time = read_time;
    p
}

fn criteria(tag: &str, author: &str, search: &str, sort: SortKey) -> FilterCriteria {
    FilterCriteria {
        tag: tag.to_string(),
        author: author.to_string(),
        search_term: search.to_string(),
        sort_key: sort,
    }
}

fn sql_for(criteria: &FilterCriteria) -> String {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT id FROM blog_posts");
    push_post_query(&mut builder, &compose(criteria));
    builder.sql().to_string()
}

// --- compose ---

#[test]
fn test_compose_always_restricts_to_published() {
    let query = compose(&FilterCriteria::default());
    assert_eq!(query.predicates, vec![Predicate::Published]);
    assert_eq!(query.ordering.column, SortColumn::PublishDate);
    assert_eq!(query.ordering.direction, Direction::Desc);
}

#[test]
fn test_compose_includes_only_non_empty_criteria() {
    let query = compose(&criteria("rust", "", "axum", SortKey::ReadTimeAsc));

    assert_eq!(
        query.predicates,
        vec![
            Predicate::Published,
            Predicate::HasTag("rust".to_string()),
            Predicate::TitleOrExcerptContains("axum".to_string()),
        ]
    );
    assert_eq!(query.ordering.column, SortColumn::ReadTime);
    assert_eq!(query.ordering.direction, Direction::Asc);
    assert!(query.ordering.nulls_last);
}

#[test]
fn test_compose_is_deterministic() {
    let c = criteria("rust", "Ada", "web", SortKey::ReadTimeDesc);
    assert_eq!(compose(&c), compose(&c.clone()));
}

// --- in-memory evaluation ---

#[test]
fn test_listing_end_to_end() {
    let mut draft = post("Draft web", "unpublished", "Ada", &["web"]);
    draft.published = false;

    let posts = vec![
        dated(post("Axum tips", "Routing", "Ada", &["rust", "web"]), date(2024, 1, 10), Some(5)),
        dated(post("Intro", "A WEB primer", "Ada", &["web"]), date(2024, 2, 1), Some(3)),
        dated(post("Other", "Nothing", "Ada", &["web"]), date(2024, 3, 1), None),
        dated(post("Web by Bob", "web", "Bob", &["web"]), date(2024, 4, 1), Some(1)),
        draft,
    ];

    let query = compose(&criteria("web", "Ada", "web", SortKey::ReadTimeAsc));
    let titles: Vec<String> = query.apply(&posts).into_iter().map(|p| p.title).collect();

    // Unpublished, wrong-author and non-matching posts are excluded.
    assert_eq!(titles, vec!["Intro"]);
}

#[test]
fn test_search_matches_title_or_excerpt_case_insensitively() {
    let posts = vec![
        post("Learning RUST", "", "Ada", &[]),
        post("Notes", "why rust?", "Ada", &[]),
        post("Go", "gophers", "Ada", &[]),
    ];

    let query = compose(&criteria("", "", "Rust", SortKey::PublishDateDesc));
    assert_eq!(query.apply(&posts).len(), 2);
}

#[test]
fn test_tag_is_set_membership_not_substring() {
    let posts = vec![post("A", "", "Ada", &["rustacean"]), post("B", "", "Ada", &["rust"])];

    let query = compose(&criteria("rust", "", "", SortKey::PublishDateDesc));
    let titles: Vec<String> = query.apply(&posts).into_iter().map(|p| p.title).collect();
    assert_eq!(titles, vec!["B"]);
}

#[test]
fn test_read_time_sorts_put_missing_values_last() {
    let posts = vec![
        dated(post("none", "", "Ada", &[]), date(2024, 1, 1), None),
        dated(post("long", "", "Ada", &[]), date(2024, 1, 2), Some(12)),
        dated(post("short", "", "Ada", &[]), date(2024, 1, 3), Some(2)),
    ];

    let asc: Vec<String> = compose(&criteria("", "", "", SortKey::ReadTimeAsc))
        .apply(&posts)
        .into_iter()
        .map(|p| p.title)
        .collect();
    let desc: Vec<String> = compose(&criteria("", "", "", SortKey::ReadTimeDesc))
        .apply(&posts)
        .into_iter()
        .map(|p| p.title)
        .collect();
    let newest: Vec<String> = compose(&FilterCriteria::default())
        .apply(&posts)
        .into_iter()
        .map(|p| p.title)
        .collect();

    assert_eq!(asc, vec!["short", "long", "none"]);
    assert_eq!(desc, vec!["long", "short", "none"]);
    assert_eq!(newest, vec!["short", "long", "none"]);
}

// --- SQL rendering ---

#[test]
fn test_sql_for_default_criteria() {
    assert_eq!(
        sql_for(&FilterCriteria::default()),
        "SELECT id FROM blog_posts WHERE published = true ORDER BY publish_date DESC"
    );
}

#[test]
fn test_sql_binds_every_value() {
    let sql = sql_for(&criteria("rust'; DROP TABLE x;--", "Ada", "50%", SortKey::ReadTimeDesc));

    assert_eq!(
        sql,
        "SELECT id FROM blog_posts WHERE published = true \
         AND tags @> ARRAY[$1]::text[] \
         AND author = $2 \
         AND (title ILIKE $3 OR excerpt ILIKE $4) \
         ORDER BY read_time DESC NULLS LAST"
    );
    assert!(!sql.contains("DROP"));
}

#[test]
fn test_escape_like() {
    assert_eq!(escape_like("100%"), "100\\%");
    assert_eq!(escape_like("snake_case"), "snake\\_case");
    assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    assert_eq!(escape_like("plain"), "plain");
}

// --- query string ---

#[test]
fn test_criteria_query_string_names() {
    let c: FilterCriteria =
        serde_json::from_str(r#"{"tag": "rust", "search": "axum", "sort": "read_time_asc"}"#)
            .unwrap();

    assert_eq!(c.tag, "rust");
    assert_eq!(c.author, "");
    assert_eq!(c.search_term, "axum");
    assert_eq!(c.sort_key, SortKey::ReadTimeAsc);
}

// --- options ---

#[test]
fn test_filter_options_are_distinct_in_first_seen_order() {
    let tags_a = vec!["rust".to_string(), "web".to_string()];
    let tags_b = vec!["web".to_string(), "db".to_string()];
    let tags_c: Vec<String> = Vec::new();

    let options = FilterOptions::collect(vec![
        (tags_a.as_slice(), "Ada"),
        (tags_b.as_slice(), "Bob"),
        (tags_c.as_slice(), ""),
        (tags_a.as_slice(), "Ada"),
    ]);

    assert_eq!(options.tags, vec!["rust", "web", "db"]);
    assert_eq!(options.authors, vec!["Ada", "Bob"]);
}

#[test]
fn test_tech_docker_scenario() {
    let posts = vec![
        post("Containers", "Shipping with docker", "Ada", &["tech"]),
        post("Kubernetes", "Orchestration", "Ada", &["tech"]),
        post("Docker for cooks", "docker in the kitchen", "Bob", &["food"]),
        post("Travel", "Lisbon", "Ada", &["life"]),
        post("Gardening", "Tomatoes", "Bob", &["life"]),
    ];

    let query = compose(&criteria("tech", "", "docker", SortKey::PublishDateDesc));
    let found = query.apply(&posts);

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Containers");
}

#[test]
fn test_predicate_order_does_not_change_result() {
    let posts = vec![
        post("Rust web", "axum", "Ada", &["rust", "web"]),
        post("Rust cli", "clap", "Ada", &["rust"]),
        post("Web by Bob", "axum", "Bob", &["web"]),
    ];

    let mut query = compose(&criteria("rust", "Ada", "axum", SortKey::PublishDateDesc));
    let forward = query.apply(&posts);
    query.predicates.reverse();
    let reversed = query.apply(&posts);

    assert_eq!(forward, reversed);
    assert_eq!(forward.len(), 1);
}
