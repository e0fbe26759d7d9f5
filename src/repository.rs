use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder, types::Json};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::StoreError,
    filter::{Direction, FilterOptions, PostQuery, Predicate, SortColumn, escape_like},
    models::{
        About, AboutDraft, BlogPost, BlogPostDraft, Certificate, CertificateDraft, Contacts,
        ContactsDraft, Job, JobDraft, PositionUpdate, PostSummary, Profile,
    },
};

/// Repository Trait
///
/// The content store contract. Handlers only ever see `Arc<dyn Repository>`, so the
/// Postgres store and the in-memory store are interchangeable.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;

    // --- Blog (public) ---
    /// Executes a composed listing query.
    async fn query_posts(&self, query: &PostQuery) -> Result<Vec<PostSummary>, StoreError>;
    /// Distinct tags and authors across published posts.
    async fn filter_options(&self) -> Result<FilterOptions, StoreError>;
    async fn get_published_post(&self, id: Uuid) -> Result<Option<BlogPost>, StoreError>;

    // --- Blog (management) ---
    /// Every post regardless of status, newest first.
    async fn list_all_posts(&self) -> Result<Vec<BlogPost>, StoreError>;
    async fn create_post(&self, draft: BlogPostDraft, user_id: Uuid) -> Result<BlogPost, StoreError>;
    async fn update_post(&self, id: Uuid, draft: BlogPostDraft) -> Result<BlogPost, StoreError>;
    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError>;

    // --- About (single record) ---
    async fn get_about(&self) -> Result<Option<About>, StoreError>;
    async fn save_about(&self, draft: AboutDraft, user_id: Uuid) -> Result<About, StoreError>;

    // --- Jobs, ordered by position ---
    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError>;
    async fn create_job(&self, draft: JobDraft) -> Result<Job, StoreError>;
    async fn update_job(&self, id: Uuid, draft: JobDraft) -> Result<Job, StoreError>;
    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError>;
    async fn reorder_jobs(&self, updates: &[PositionUpdate]) -> Result<(), StoreError>;

    // --- Certificates, ordered by position ---
    async fn list_certificates(&self) -> Result<Vec<Certificate>, StoreError>;
    async fn create_certificate(
        &self,
        draft: CertificateDraft,
        user_id: Uuid,
    ) -> Result<Certificate, StoreError>;
    async fn update_certificate(
        &self,
        id: Uuid,
        draft: CertificateDraft,
    ) -> Result<Certificate, StoreError>;
    async fn delete_certificate(&self, id: Uuid) -> Result<(), StoreError>;
    async fn reorder_certificates(&self, updates: &[PositionUpdate]) -> Result<(), StoreError>;

    // --- Contacts (single record) ---
    async fn get_contacts(&self) -> Result<Option<Contacts>, StoreError>;
    async fn save_contacts(&self, draft: ContactsDraft, user_id: Uuid) -> Result<Contacts, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const POST_COLUMNS: &str = "id, user_id, title, excerpt, content, author, publish_date, read_time, \
     COALESCE(tags, '{}') AS tags, image_url, published, show_ads, created_at";
const SUMMARY_COLUMNS: &str =
    "id, title, excerpt, COALESCE(tags, '{}') AS tags, author, publish_date, read_time, image_url";
const ABOUT_COLUMNS: &str = "id, user_id, name, title, description, long_description, \
     COALESCE(skills, '{}') AS skills, education, location, image_url";
const JOB_COLUMNS: &str = "id, title, company, location, website, start_date, end_date, description, \
     COALESCE(technologies, '{}') AS technologies, image_url, position";
const CERTIFICATE_COLUMNS: &str =
    "id, user_id, title, issuer, issue_date, credential_url, image_url, position";
const CONTACTS_COLUMNS: &str =
    "id, user_id, email, phone, location, copyright_year, COALESCE(social_links, '[]'::jsonb) AS social_links";

/// PostgresRepository
///
/// `Repository` backed by the Supabase Postgres database. All statements are built at
/// runtime so the crate compiles without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the WHERE and ORDER BY clauses for a composed listing query. Every user
/// value is bound, never interpolated.
pub fn push_post_query(builder: &mut QueryBuilder<'_, Postgres>, query: &PostQuery) {
    builder.push(" WHERE ");
    let mut first = true;
    for predicate in &query.predicates {
        if !first {
            builder.push(" AND ");
        }
        first = false;
        match predicate {
            Predicate::Published => {
                builder.push("published = true");
            }
            Predicate::HasTag(tag) => {
                builder.push("tags @> ARRAY[");
                builder.push_bind(tag.clone());
                builder.push("]::text[]");
            }
            Predicate::AuthorEquals(author) => {
                builder.push("author = ");
                builder.push_bind(author.clone());
            }
            Predicate::TitleOrExcerptContains(term) => {
                let pattern = format!("%{}%", escape_like(term));
                builder.push("(title ILIKE ");
                builder.push_bind(pattern.clone());
                builder.push(" OR excerpt ILIKE ");
                builder.push_bind(pattern);
                builder.push(")");
            }
        }
    }
    if first {
        builder.push("true");
    }

    let ordering = query.ordering;
    builder.push(" ORDER BY ");
    builder.push(match ordering.column {
        SortColumn::PublishDate => "publish_date",
        SortColumn::ReadTime => "read_time",
    });
    builder.push(match ordering.direction {
        Direction::Asc => " ASC",
        Direction::Desc => " DESC",
    });
    if ordering.nulls_last {
        builder.push(" NULLS LAST");
    }
}

fn affected(rows: u64) -> Result<(), StoreError> {
    if rows == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT id, email, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    /// query_posts
    ///
    /// Translates the `PostQuery` with `QueryBuilder`: the published predicate is always
    /// present, the rest are appended only when composed.
    async fn query_posts(&self, query: &PostQuery) -> Result<Vec<PostSummary>, StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {SUMMARY_COLUMNS} FROM blog_posts"));
        push_post_query(&mut builder, query);

        builder
            .build_query_as::<PostSummary>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("query_posts error: {:?}", e);
                StoreError::from(e)
            })
    }

    async fn filter_options(&self) -> Result<FilterOptions, StoreError> {
        let rows: Vec<(Vec<String>, String)> = sqlx::query_as(
            "SELECT COALESCE(tags, '{}'), COALESCE(author, '') FROM blog_posts \
             WHERE published = true ORDER BY publish_date DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(FilterOptions::collect(
            rows.iter().map(|(tags, author)| (tags.as_slice(), author.as_str())),
        ))
    }

    async fn get_published_post(&self, id: Uuid) -> Result<Option<BlogPost>, StoreError> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE id = $1 AND published = true"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn list_all_posts(&self) -> Result<Vec<BlogPost>, StoreError> {
        let posts = sqlx::query_as::<_, BlogPost>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    async fn create_post(&self, draft: BlogPostDraft, user_id: Uuid) -> Result<BlogPost, StoreError> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            "INSERT INTO blog_posts (id, user_id, title, excerpt, content, author, publish_date, \
             read_time, tags, image_url, published, show_ads, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW()) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(draft.title)
        .bind(draft.excerpt)
        .bind(draft.content)
        .bind(draft.author)
        .bind(draft.publish_date)
        .bind(draft.read_time)
        .bind(draft.tags)
        .bind(draft.image_url)
        .bind(draft.published)
        .bind(draft.show_ads)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, draft: BlogPostDraft) -> Result<BlogPost, StoreError> {
        let post = sqlx::query_as::<_, BlogPost>(&format!(
            "UPDATE blog_posts SET title = $2, excerpt = $3, content = $4, author = $5, \
             publish_date = $6, read_time = $7, tags = $8, image_url = $9, published = $10, \
             show_ads = $11 WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(draft.title)
        .bind(draft.excerpt)
        .bind(draft.content)
        .bind(draft.author)
        .bind(draft.publish_date)
        .bind(draft.read_time)
        .bind(draft.tags)
        .bind(draft.image_url)
        .bind(draft.published)
        .bind(draft.show_ads)
        .fetch_optional(&self.pool)
        .await?;
        post.ok_or(StoreError::NotFound)
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM blog_posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(res.rows_affected())
    }

    async fn get_about(&self) -> Result<Option<About>, StoreError> {
        let about = sqlx::query_as::<_, About>(&format!(
            "SELECT {ABOUT_COLUMNS} FROM about ORDER BY id LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(about)
    }

    /// save_about
    ///
    /// Updates the existing record if there is one, otherwise inserts it.
    async fn save_about(&self, draft: AboutDraft, user_id: Uuid) -> Result<About, StoreError> {
        let existing = self.get_about().await?;
        let sql = match existing {
            Some(_) => format!(
                "UPDATE about SET user_id = $2, name = $3, title = $4, description = $5, \
                 long_description = $6, skills = $7, education = $8, location = $9, image_url = $10 \
                 WHERE id = $1 RETURNING {ABOUT_COLUMNS}"
            ),
            None => format!(
                "INSERT INTO about (id, user_id, name, title, description, long_description, skills, \
                 education, location, image_url) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 RETURNING {ABOUT_COLUMNS}"
            ),
        };
        let id = existing.map(|a| a.id).unwrap_or_else(Uuid::new_v4);

        let about = sqlx::query_as::<_, About>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(draft.name)
            .bind(draft.title)
            .bind(draft.description)
            .bind(draft.long_description)
            .bind(draft.skills)
            .bind(draft.education)
            .bind(draft.location)
            .bind(draft.image_url)
            .fetch_one(&self.pool)
            .await?;
        Ok(about)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs ORDER BY position ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    async fn create_job(&self, draft: JobDraft) -> Result<Job, StoreError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "INSERT INTO jobs (id, title, company, location, website, start_date, end_date, \
             description, technologies, image_url, position) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {JOB_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(draft.title)
        .bind(draft.company)
        .bind(draft.location)
        .bind(draft.website)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.description)
        .bind(draft.technologies)
        .bind(draft.image_url)
        .bind(draft.position)
        .fetch_one(&self.pool)
        .await?;
        Ok(job)
    }

    async fn update_job(&self, id: Uuid, draft: JobDraft) -> Result<Job, StoreError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "UPDATE jobs SET title = $2, company = $3, location = $4, website = $5, start_date = $6, \
             end_date = $7, description = $8, technologies = $9, image_url = $10, position = $11 \
             WHERE id = $1 RETURNING {JOB_COLUMNS}"
        ))
        .bind(id)
        .bind(draft.title)
        .bind(draft.company)
        .bind(draft.location)
        .bind(draft.website)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.description)
        .bind(draft.technologies)
        .bind(draft.image_url)
        .bind(draft.position)
        .fetch_optional(&self.pool)
        .await?;
        job.ok_or(StoreError::NotFound)
    }

    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(res.rows_affected())
    }

    /// reorder_jobs
    ///
    /// Applies every position in one transaction; an unknown id rolls the batch back.
    async fn reorder_jobs(&self, updates: &[PositionUpdate]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for update in updates {
            let res = sqlx::query("UPDATE jobs SET position = $1 WHERE id = $2")
                .bind(update.position)
                .bind(update.id)
                .execute(&mut *tx)
                .await?;
            affected(res.rows_affected())?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_certificates(&self) -> Result<Vec<Certificate>, StoreError> {
        let certs = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates ORDER BY position ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(certs)
    }

    async fn create_certificate(
        &self,
        draft: CertificateDraft,
        user_id: Uuid,
    ) -> Result<Certificate, StoreError> {
        let cert = sqlx::query_as::<_, Certificate>(&format!(
            "INSERT INTO certificates (id, user_id, title, issuer, issue_date, credential_url, \
             image_url, position) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {CERTIFICATE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(draft.title)
        .bind(draft.issuer)
        .bind(draft.issue_date)
        .bind(draft.credential_url)
        .bind(draft.image_url)
        .bind(draft.position)
        .fetch_one(&self.pool)
        .await?;
        Ok(cert)
    }

    async fn update_certificate(
        &self,
        id: Uuid,
        draft: CertificateDraft,
    ) -> Result<Certificate, StoreError> {
        let cert = sqlx::query_as::<_, Certificate>(&format!(
            "UPDATE certificates SET title = $2, issuer = $3, issue_date = $4, credential_url = $5, \
             image_url = $6, position = $7 WHERE id = $1 RETURNING {CERTIFICATE_COLUMNS}"
        ))
        .bind(id)
        .bind(draft.title)
        .bind(draft.issuer)
        .bind(draft.issue_date)
        .bind(draft.credential_url)
        .bind(draft.image_url)
        .bind(draft.position)
        .fetch_optional(&self.pool)
        .await?;
        cert.ok_or(StoreError::NotFound)
    }

    async fn delete_certificate(&self, id: Uuid) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM certificates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(res.rows_affected())
    }

    async fn reorder_certificates(&self, updates: &[PositionUpdate]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for update in updates {
            let res = sqlx::query("UPDATE certificates SET position = $1 WHERE id = $2")
                .bind(update.position)
                .bind(update.id)
                .execute(&mut *tx)
                .await?;
            affected(res.rows_affected())?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_contacts(&self) -> Result<Option<Contacts>, StoreError> {
        let contacts = sqlx::query_as::<_, Contacts>(&format!(
            "SELECT {CONTACTS_COLUMNS} FROM contacts ORDER BY id LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(contacts)
    }

    async fn save_contacts(&self, draft: ContactsDraft, user_id: Uuid) -> Result<Contacts, StoreError> {
        let existing = self.get_contacts().await?;
        let sql = match existing {
            Some(_) => format!(
                "UPDATE contacts SET user_id = $2, email = $3, phone = $4, location = $5, \
                 copyright_year = $6, social_links = $7 WHERE id = $1 RETURNING {CONTACTS_COLUMNS}"
            ),
            None => format!(
                "INSERT INTO contacts (id, user_id, email, phone, location, copyright_year, social_links) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {CONTACTS_COLUMNS}"
            ),
        };
        let id = existing.map(|c| c.id).unwrap_or_else(Uuid::new_v4);

        let contacts = sqlx::query_as::<_, Contacts>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(draft.email)
            .bind(draft.phone)
            .bind(draft.location)
            .bind(draft.copyright_year)
            .bind(Json(draft.social_links))
            .fetch_one(&self.pool)
            .await?;
        Ok(contacts)
    }
}

// --- In-memory implementation ---

#[derive(Default)]
struct MemoryTables {
    profiles: HashMap<Uuid, Profile>,
    posts: Vec<BlogPost>,
    about: Option<About>,
    jobs: Vec<Job>,
    certificates: Vec<Certificate>,
    contacts: Option<Contacts>,
}

/// MemoryRepository
///
/// A `Repository` held entirely in process memory. It evaluates listing queries with
/// `PostQuery::apply`, so it shares semantics with the Postgres translation. Used by
/// the test-suite and by local demos without a database.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<MemoryTables>,
    /// When true, every call fails with a simulated network error.
    pub should_fail: bool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.tables.write().await.profiles.insert(profile.id, profile);
    }

    pub async fn insert_post(&self, post: BlogPost) {
        self.tables.write().await.posts.push(post);
    }

    pub async fn set_contacts(&self, contacts: Contacts) {
        self.tables.write().await.contacts = Some(contacts);
    }

    /// Number of read calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of mutating calls received so far (successful or not).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<(), StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()
    }

    fn write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.should_fail {
            Err(StoreError::Network("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

fn reorder<T>(
    rows: &mut [T],
    updates: &[PositionUpdate],
    id_of: impl Fn(&T) -> Uuid,
    set: impl Fn(&mut T, i32),
) -> Result<(), StoreError> {
    if updates
        .iter()
        .any(|u| !rows.iter().any(|row| id_of(row) == u.id))
    {
        return Err(StoreError::NotFound);
    }
    for update in updates {
        if let Some(row) = rows.iter_mut().find(|row| id_of(row) == update.id) {
            set(row, update.position);
        }
    }
    Ok(())
}

fn by_position<T>(rows: &[T], position: impl Fn(&T) -> i32) -> Vec<T>
where
    T: Clone,
{
    let mut out = rows.to_vec();
    out.sort_by_key(|row| position(row));
    out
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        self.read()?;
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn query_posts(&self, query: &PostQuery) -> Result<Vec<PostSummary>, StoreError> {
        self.read()?;
        Ok(query.apply(self.tables.read().await.posts.iter()))
    }

    async fn filter_options(&self) -> Result<FilterOptions, StoreError> {
        self.read()?;
        let tables = self.tables.read().await;
        let mut published: Vec<&BlogPost> = tables.posts.iter().filter(|p| p.published).collect();
        published.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
        Ok(FilterOptions::collect(
            published
                .into_iter()
                .map(|p| (p.tags.as_slice(), p.author.as_str())),
        ))
    }

    async fn get_published_post(&self, id: Uuid) -> Result<Option<BlogPost>, StoreError> {
        self.read()?;
        Ok(self
            .tables
            .read()
            .await
            .posts
            .iter()
            .find(|p| p.id == id && p.published)
            .cloned())
    }

    async fn list_all_posts(&self) -> Result<Vec<BlogPost>, StoreError> {
        self.read()?;
        let mut posts = self.tables.read().await.posts.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn create_post(&self, draft: BlogPostDraft, user_id: Uuid) -> Result<BlogPost, StoreError> {
        self.write()?;
        let post = BlogPost {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            title: draft.title,
            excerpt: draft.excerpt,
            content: draft.content,
            author: draft.author,
            publish_date: draft.publish_date,
            read_time: draft.read_time,
            tags: draft.tags,
            image_url: draft.image_url,
            published: draft.published,
            show_ads: draft.show_ads,
            created_at: Utc::now(),
        };
        self.tables.write().await.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, draft: BlogPostDraft) -> Result<BlogPost, StoreError> {
        self.write()?;
        let mut tables = self.tables.write().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        post.title = draft.title;
        post.excerpt = draft.excerpt;
        post.content = draft.content;
        post.author = draft.author;
        post.publish_date = draft.publish_date;
        post.read_time = draft.read_time;
        post.tags = draft.tags;
        post.image_url = draft.image_url;
        post.published = draft.published;
        post.show_ads = draft.show_ads;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError> {
        self.write()?;
        let mut tables = self.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        affected((before - tables.posts.len()) as u64)
    }

    async fn get_about(&self) -> Result<Option<About>, StoreError> {
        self.read()?;
        Ok(self.tables.read().await.about.clone())
    }

    async fn save_about(&self, draft: AboutDraft, user_id: Uuid) -> Result<About, StoreError> {
        self.write()?;
        let mut tables = self.tables.write().await;
        let id = tables.about.as_ref().map(|a| a.id).unwrap_or_else(Uuid::new_v4);
        let about = About {
            id,
            user_id: Some(user_id),
            name: draft.name,
            title: draft.title,
            description: draft.description,
            long_description: draft.long_description,
            skills: draft.skills,
            education: draft.education,
            location: draft.location,
            image_url: draft.image_url,
        };
        tables.about = Some(about.clone());
        Ok(about)
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        self.read()?;
        Ok(by_position(&self.tables.read().await.jobs, |j| j.position))
    }

    async fn create_job(&self, draft: JobDraft) -> Result<Job, StoreError> {
        self.write()?;
        let job = job_from_draft(Uuid::new_v4(), draft);
        self.tables.write().await.jobs.push(job.clone());
        Ok(job)
    }

    async fn update_job(&self, id: Uuid, draft: JobDraft) -> Result<Job, StoreError> {
        self.write()?;
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(StoreError::NotFound)?;
        *job = job_from_draft(id, draft);
        Ok(job.clone())
    }

    async fn delete_job(&self, id: Uuid) -> Result<(), StoreError> {
        self.write()?;
        let mut tables = self.tables.write().await;
        let before = tables.jobs.len();
        tables.jobs.retain(|j| j.id != id);
        affected((before - tables.jobs.len()) as u64)
    }

    async fn reorder_jobs(&self, updates: &[PositionUpdate]) -> Result<(), StoreError> {
        self.write()?;
        let mut tables = self.tables.write().await;
        reorder(&mut tables.jobs, updates, |j| j.id, |j, p| j.position = p)
    }

    async fn list_certificates(&self) -> Result<Vec<Certificate>, StoreError> {
        self.read()?;
        Ok(by_position(&self.tables.read().await.certificates, |c| c.position))
    }

    async fn create_certificate(
        &self,
        draft: CertificateDraft,
        user_id: Uuid,
    ) -> Result<Certificate, StoreError> {
        self.write()?;
        let cert = certificate_from_draft(Uuid::new_v4(), Some(user_id), draft);
        self.tables.write().await.certificates.push(cert.clone());
        Ok(cert)
    }

    async fn update_certificate(
        &self,
        id: Uuid,
        draft: CertificateDraft,
    ) -> Result<Certificate, StoreError> {
        self.write()?;
        let mut tables = self.tables.write().await;
        let cert = tables
            .certificates
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound)?;
        *cert = certificate_from_draft(id, cert.user_id, draft);
        Ok(cert.clone())
    }

    async fn delete_certificate(&self, id: Uuid) -> Result<(), StoreError> {
        self.write()?;
        let mut tables = self.tables.write().await;
        let before = tables.certificates.len();
        tables.certificates.retain(|c| c.id != id);
        affected((before - tables.certificates.len()) as u64)
    }

    async fn reorder_certificates(&self, updates: &[PositionUpdate]) -> Result<(), StoreError> {
        self.write()?;
        let mut tables = self.tables.write().await;
        reorder(&mut tables.certificates, updates, |c| c.id, |c, p| c.position = p)
    }

    async fn get_contacts(&self) -> Result<Option<Contacts>, StoreError> {
        self.read()?;
        Ok(self.tables.read().await.contacts.clone())
    }

    async fn save_contacts(&self, draft: ContactsDraft, user_id: Uuid) -> Result<Contacts, StoreError> {
        self.write()?;
        let mut tables = self.tables.write().await;
        let id = tables.contacts.as_ref().map(|c| c.id).unwrap_or_else(Uuid::new_v4);
        let contacts = Contacts {
            id,
            user_id: Some(user_id),
            email: draft.email,
            phone: draft.phone,
            location: draft.location,
            copyright_year: draft.copyright_year,
            social_links: draft.social_links,
        };
        tables.contacts = Some(contacts.clone());
        Ok(contacts)
    }
}

fn job_from_draft(id: Uuid, draft: JobDraft) -> Job {
    Job {
        id,
        title: draft.title,
        company: draft.company,
        location: draft.location,
        website: draft.website,
        start_date: draft.start_date,
        end_date: draft.end_date,
        description: draft.description,
        technologies: draft.technologies,
        image_url: draft.image_url,
        position: draft.position,
    }
}

fn certificate_from_draft(id: Uuid, user_id: Option<Uuid>, draft: CertificateDraft) -> Certificate {
    Certificate {
        id,
        user_id,
        title: draft.title,
        issuer: draft.issuer,
        issue_date: draft.issue_date,
        credential_url: draft.credential_url,
        image_url: draft.image_url,
        position: draft.position,
    }
}
