//! Blog listing state.
//!
//! `QueryComposer` owns the reader's `FilterCriteria` and the currently displayed posts.
//! Every criteria change issues a sequence-numbered `FetchRequest`; only the response
//! to the most recently issued request is applied, so the listing always reflects the
//! last thing the reader asked for regardless of arrival order.
//!
//! `BlogFeed` drives a composer against a `PostSource`, running fetches on tokio tasks.

use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::task::{self, JoinError, JoinSet};

use crate::{
    error::StoreError,
    filter::{FilterCriteria, FilterOptions, PostQuery, SortKey, compose},
    models::PostSummary,
    repository::RepositoryState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
}

/// FetchRequest
///
/// One issued posts fetch. `criteria` is the snapshot the query was composed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub criteria: FilterCriteria,
    pub query: PostQuery,
}

/// What `complete` did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer request was issued after this one; the response was dropped.
    Discarded,
}

/// QueryComposer
#[derive(Debug, Default)]
pub struct QueryComposer {
    criteria: FilterCriteria,
    posts: Vec<PostSummary>,
    options: FilterOptions,
    latest_seq: u64,
    fetching: bool,
    last_error: Option<StoreError>,
}

impl QueryComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        if self.fetching {
            Phase::Fetching
        } else {
            Phase::Idle
        }
    }

    /// Error of the latest completed request, cleared by the next successful one.
    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    /// Sequence number of the most recently issued request (0 before mount).
    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// mount
    ///
    /// Issues the initial posts fetch for the current criteria. The caller fetches
    /// filter options alongside it, once, and reports them via `apply_options`.
    pub fn mount(&mut self) -> FetchRequest {
        self.issue()
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) -> Option<FetchRequest> {
        let tag = tag.into();
        if self.criteria.tag == tag {
            return None;
        }
        self.criteria.tag = tag;
        Some(self.issue())
    }

    pub fn set_author(&mut self, author: impl Into<String>) -> Option<FetchRequest> {
        let author = author.into();
        if self.criteria.author == author {
            return None;
        }
        self.criteria.author = author;
        Some(self.issue())
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) -> Option<FetchRequest> {
        let term = term.into();
        if self.criteria.search_term == term {
            return None;
        }
        self.criteria.search_term = term;
        Some(self.issue())
    }

    pub fn set_sort_key(&mut self, key: SortKey) -> Option<FetchRequest> {
        if self.criteria.sort_key == key {
            return None;
        }
        self.criteria.sort_key = key;
        Some(self.issue())
    }

    /// reset
    ///
    /// Restores every criterion to its default in a single transition. Exactly one
    /// fetch is issued, even if the criteria were already at their defaults.
    pub fn reset(&mut self) -> FetchRequest {
        self.criteria = FilterCriteria::default();
        self.issue()
    }

    /// complete
    ///
    /// Applies `result` only if `seq` is the latest issued request. A failure keeps the
    /// previously displayed posts and records the error. Either way the composer returns
    /// to `Idle` once the latest request has completed.
    pub fn complete(
        &mut self,
        seq: u64,
        result: Result<Vec<PostSummary>, StoreError>,
    ) -> Completion {
        if seq != self.latest_seq {
            tracing::debug!(seq, latest = self.latest_seq, "discarding stale posts response");
            return Completion::Discarded;
        }

        self.fetching = false;
        match result {
            Ok(posts) => {
                self.posts = posts;
                self.last_error = None;
            }
            Err(e) => {
                tracing::error!(seq, "error fetching posts: {}", e);
                self.last_error = Some(e);
            }
        }
        Completion::Applied
    }

    /// A failed options read leaves the selectors empty; the listing still works.
    pub fn apply_options(&mut self, result: Result<FilterOptions, StoreError>) {
        match result {
            Ok(options) => self.options = options,
            Err(e) => tracing::error!("error fetching filter options: {}", e),
        }
    }

    fn issue(&mut self) -> FetchRequest {
        self.latest_seq += 1;
        self.fetching = true;
        FetchRequest {
            seq: self.latest_seq,
            criteria: self.criteria.clone(),
            query: compose(&self.criteria),
        }
    }
}

/// PostSource
///
/// Anything that can answer a listing request: the content store directly, or the
/// HTTP API through `client::ApiClient`.
#[async_trait]
pub trait PostSource: Send + Sync + 'static {
    async fn fetch_posts(&self, request: &FetchRequest) -> Result<Vec<PostSummary>, StoreError>;
    async fn fetch_filter_options(&self) -> Result<FilterOptions, StoreError>;
}

#[async_trait]
impl PostSource for RepositoryState {
    async fn fetch_posts(&self, request: &FetchRequest) -> Result<Vec<PostSummary>, StoreError> {
        self.query_posts(&request.query).await
    }

    async fn fetch_filter_options(&self) -> Result<FilterOptions, StoreError> {
        self.filter_options().await
    }
}

enum Response {
    Posts {
        seq: u64,
        result: Result<Vec<PostSummary>, StoreError>,
    },
    Options(Result<FilterOptions, StoreError>),
}

/// What a running task was asked to fetch, kept so a task that dies still completes.
#[derive(Debug, Clone, Copy)]
enum Fetch {
    Posts(u64),
    Options,
}

/// BlogFeed
///
/// Async driver around a `QueryComposer`. Each issued request runs on its own task;
/// responses are fed back in arrival order, and the composer discards stale ones.
/// A task that panics or is cancelled counts as a failed fetch.
pub struct BlogFeed<S: PostSource> {
    source: Arc<S>,
    composer: QueryComposer,
    tasks: JoinSet<Response>,
    in_flight: HashMap<task::Id, Fetch>,
}

impl<S: PostSource> BlogFeed<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
            composer: QueryComposer::new(),
            tasks: JoinSet::new(),
            in_flight: HashMap::new(),
        }
    }

    pub fn composer(&self) -> &QueryComposer {
        &self.composer
    }

    /// Number of dispatched requests whose responses have not been processed yet.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn mount(&mut self) {
        let request = self.composer.mount();
        self.dispatch(request);

        let source = Arc::clone(&self.source);
        let handle = self
            .tasks
            .spawn(async move { Response::Options(source.fetch_filter_options().await) });
        self.in_flight.insert(handle.id(), Fetch::Options);
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        if let Some(request) = self.composer.set_tag(tag) {
            self.dispatch(request);
        }
    }

    pub fn set_author(&mut self, author: impl Into<String>) {
        if let Some(request) = self.composer.set_author(author) {
            self.dispatch(request);
        }
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        if let Some(request) = self.composer.set_search_term(term) {
            self.dispatch(request);
        }
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        if let Some(request) = self.composer.set_sort_key(key) {
            self.dispatch(request);
        }
    }

    pub fn reset(&mut self) {
        let request = self.composer.reset();
        self.dispatch(request);
    }

    /// Processes the next response to arrive. Returns `None` when nothing is pending.
    pub async fn next_response(&mut self) -> Option<Completion> {
        let response = match self.tasks.join_next_with_id().await? {
            Ok((id, response)) => {
                self.in_flight.remove(&id);
                response
            }
            Err(err) => return Some(self.task_failed(err)),
        };

        Some(match response {
            Response::Posts { seq, result } => self.composer.complete(seq, result),
            Response::Options(result) => {
                self.composer.apply_options(result);
                Completion::Applied
            }
        })
    }

    /// Waits for every dispatched request to come back.
    pub async fn settle(&mut self) {
        while self.next_response().await.is_some() {}
    }

    fn dispatch(&mut self, request: FetchRequest) {
        let source = Arc::clone(&self.source);
        let seq = request.seq;
        let handle = self.tasks.spawn(async move {
            let result = source.fetch_posts(&request).await;
            Response::Posts {
                seq: request.seq,
                result,
            }
        });
        self.in_flight.insert(handle.id(), Fetch::Posts(seq));
    }

    fn task_failed(&mut self, err: JoinError) -> Completion {
        let error = StoreError::Backend(format!("fetch task failed: {err}"));
        match self.in_flight.remove(&err.id()) {
            Some(Fetch::Posts(seq)) => self.composer.complete(seq, Err(error)),
            Some(Fetch::Options) => {
                self.composer.apply_options(Err(error));
                Completion::Applied
            }
            None => {
                tracing::warn!(task = %err.id(), "untracked fetch task failed: {}", err);
                Completion::Discarded
            }
        }
    }
}
