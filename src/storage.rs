use async_trait::async_trait;
use aws_sdk_s3 as s3;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// 1. BlobStore Contract
/// BlobStore
///
/// Defines the abstract contract for all interactions with the object storage
/// layer. This trait allows us to swap the concrete implementation, from the
/// real S3 client (S3BlobStore) in production to the in-memory Mock
/// (MockBlobStore) during testing, without affecting the calling handlers.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Ensures the configured bucket exists. Used primarily in the `Env::Local`
    /// setup to automatically provision the required bucket in MinIO. No-op in
    /// production.
    async fn ensure_bucket_exists(&self);

    /// Stores a blob and returns the opaque key under which it was stored.
    /// The caller supplies a filename hint; the store derives a unique key
    /// from it so uploads can never collide or overwrite each other.
    async fn put(&self, bytes: Vec<u8>, filename_hint: &str) -> Result<String, String>;

    /// Removes a blob by key. Idempotent: deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), String>;
}

/// StorageState
///
/// The concrete type used to share the blob store across the application state.
pub type StorageState = Arc<dyn BlobStore>;

/// sanitize_key
///
/// Utility function to prevent path traversal attacks by removing directory
/// navigation components (e.g., `..`, `.`) from a user-provided key segment.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// derive_key
///
/// Builds the final object key: a fresh UUID prefix plus the sanitized
/// filename hint, so two uploads of `photo.jpg` land on distinct keys.
fn derive_key(filename_hint: &str) -> String {
    format!("{}/{}", Uuid::new_v4(), sanitize_key(filename_hint))
}

// 2. The Real Implementation (S3/MinIO)
/// S3BlobStore
///
/// The concrete implementation using the AWS SDK for S3. Due to S3
/// compatibility, this client transparently handles connections to:
/// - **Local:** Dockerized MinIO instance.
/// - **Production:** any S3-compatible endpoint.
///
/// The `force_path_style(true)` is critical for MinIO compatibility.
#[derive(Clone)]
pub struct S3BlobStore {
    client: s3::Client,
    bucket_name: String,
}

impl S3BlobStore {
    /// new
    ///
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // Path-style addressing (http://endpoint/bucket/key) is required
            // by MinIO-style gateways.
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    /// ensure_bucket_exists
    ///
    /// Calls the S3 CreateBucket API. Since S3 APIs are idempotent, this only
    /// creates the bucket if it does not already exist. Safe to call at startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn put(&self, bytes: Vec<u8>, filename_hint: &str) -> Result<String, String> {
        let key = derive_key(filename_hint);
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(bytes.into())
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        // S3 DeleteObject succeeds on absent keys, which gives us idempotency
        // for free.
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockBlobStore
///
/// In-memory implementation of `BlobStore` used exclusively for testing.
/// Stored blobs are kept in a map so tests can assert on what was written
/// and that deletes actually removed it.
#[derive(Default)]
pub struct MockBlobStore {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    pub blobs: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            blobs: Mutex::new(Vec::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.blobs
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn put(&self, bytes: Vec<u8>, filename_hint: &str) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        let key = derive_key(filename_hint);
        self.blobs.lock().unwrap().push((key.clone(), bytes));
        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        self.blobs.lock().unwrap().retain(|(k, _)| k != key);
        Ok(())
    }
}
