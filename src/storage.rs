use async_trait::async_trait;
use aws_sdk_s3 as s3;
use chrono::{DateTime, Utc};
use s3::{
    error::{DisplayErrorContext, SdkError},
    primitives::ByteStream,
};
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::Mutex;

use crate::{error::StoreError, models::ImageObject};

// 1. StorageService Contract
/// StorageService
///
/// The file store contract for the image library. Objects live under a per-user
/// namespace (`<user_id>/<name>`) and are served from a public URL prefix.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the `Env::Local` setup to
    /// provision the MinIO bucket. No-op in production.
    async fn ensure_bucket_exists(&self);

    /// Stores `bytes` as `<namespace>/<name>` and returns its public URL.
    async fn upload(
        &self,
        namespace: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError>;

    /// Objects directly under `<namespace>/`, newest first, at most `LIST_LIMIT`.
    async fn list(&self, namespace: &str) -> Result<Vec<ImageObject>, StoreError>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError>;
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

// Supabase keeps this marker in otherwise empty folders.
pub const FOLDER_PLACEHOLDER: &str = ".emptyFolderPlaceholder";

/// Most images a single listing returns.
pub const LIST_LIMIT: usize = 100;

/// Listing rules shared by every backend. Only direct children of `prefix` are kept,
/// the folder placeholder is hidden, and the newest `LIST_LIMIT` come first.
fn newest_first<'a, K: Ord>(
    prefix: &str,
    public_url: &str,
    objects: impl IntoIterator<Item = (&'a str, K)>,
) -> Vec<ImageObject> {
    let mut listed: Vec<(ImageObject, K)> = objects
        .into_iter()
        .filter_map(|(key, modified)| {
            let name = key.strip_prefix(prefix)?;
            if name.is_empty() || name.contains('/') || name == FOLDER_PLACEHOLDER {
                return None;
            }
            let image = ImageObject {
                name: name.to_string(),
                url: format!("{public_url}/{key}"),
            };
            Some((image, modified))
        })
        .collect();

    listed.sort_by(|(_, a), (_, b)| b.cmp(a));
    listed.truncate(LIST_LIMIT);
    listed.into_iter().map(|(image, _)| image).collect()
}

// 2. The Real Implementation (S3/MinIO/Supabase)
/// S3StorageClient
///
/// `StorageService` over the AWS SDK. Talks to MinIO locally and to the Supabase
/// Storage S3 gateway in production; both need path-style addressing.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_url: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

fn s3_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => StoreError::Network(message),
        _ => StoreError::Backend(message),
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// CreateBucket is idempotent enough for startup: an "already owned" error is ignored.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn upload(
        &self,
        namespace: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let key = object_key(namespace, name)?;

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, "upload failed");
                s3_error(e)
            })?;

        Ok(format!("{}/{}", self.public_url, key))
    }

    async fn list(&self, namespace: &str) -> Result<Vec<ImageObject>, StoreError> {
        let prefix = format!("{}/", sanitize_key(namespace));

        // Newest-first needs every key, so walk all pages before sorting.
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket_name)
            .prefix(&prefix)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(s3_error)?;
            objects.extend(page.contents().iter().filter_map(|object| {
                let modified = object
                    .last_modified()
                    .map(|at| (at.secs(), at.subsec_nanos()));
                object.key().map(|key| (key.to_string(), modified))
            }));
        }

        Ok(newest_first(
            &prefix,
            &self.public_url,
            objects.iter().map(|(key, modified)| (key.as_str(), *modified)),
        ))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        let key = object_key(namespace, name)?;

        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(s3_error)?;
        Ok(())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a user-supplied key cannot escape its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Full object key for a file in a namespace. The name must be a single segment.
fn object_key(namespace: &str, name: &str) -> Result<String, StoreError> {
    let namespace = sanitize_key(namespace);
    let name = sanitize_key(name);
    if namespace.is_empty() || name.is_empty() || name.contains('/') {
        return Err(StoreError::Constraint(format!("invalid object name {name:?}")));
    }
    Ok(format!("{namespace}/{name}"))
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory `StorageService`. Public URLs point at a fixed local prefix so tests can
/// assert on them.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    bucket: Arc<Mutex<MockBucket>>,
}

#[derive(Default)]
struct MockBucket {
    objects: BTreeMap<String, MockObject>,
    uploads: u64,
}

struct MockObject {
    bytes: Vec<u8>,
    content_type: String,
    uploaded_at: DateTime<Utc>,
    /// Upload counter; orders uploads that share a timestamp.
    upload_no: u64,
}

pub const MOCK_PUBLIC_URL: &str = "http://localhost:9000/mock-bucket";

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Content type and size of a stored object, if present.
    pub async fn object(&self, namespace: &str, name: &str) -> Option<(String, usize)> {
        let key = object_key(namespace, name).ok()?;
        self.bucket
            .lock()
            .await
            .objects
            .get(&key)
            .map(|object| (object.content_type.clone(), object.bytes.len()))
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.should_fail {
            Err(StoreError::Network(
                "Mock Storage Error: Simulation requested".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn upload(
        &self,
        namespace: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        self.check()?;
        let key = object_key(namespace, name)?;
        let mut bucket = self.bucket.lock().await;
        bucket.uploads += 1;
        let object = MockObject {
            bytes,
            content_type: content_type.to_string(),
            uploaded_at: Utc::now(),
            upload_no: bucket.uploads,
        };
        bucket.objects.insert(key.clone(), object);
        Ok(format!("{MOCK_PUBLIC_URL}/{key}"))
    }

    async fn list(&self, namespace: &str) -> Result<Vec<ImageObject>, StoreError> {
        self.check()?;
        let prefix = format!("{}/", sanitize_key(namespace));
        let bucket = self.bucket.lock().await;
        Ok(newest_first(
            &prefix,
            MOCK_PUBLIC_URL,
            bucket
                .objects
                .iter()
                .map(|(key, object)| (key.as_str(), (object.uploaded_at, object.upload_no))),
        ))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.check()?;
        let key = object_key(namespace, name)?;
        match self.bucket.lock().await.objects.remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}
