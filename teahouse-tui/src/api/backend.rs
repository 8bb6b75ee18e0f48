use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use teahouse_types::{Bucket, User};

use super::query::{Query, Table};
use super::ApiResult;

/// Identity side of the hosted backend
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Restore a previously persisted session. `Ok(None)` when there is none.
    async fn restore_session(&self) -> ApiResult<Option<User>>;

    /// Identity of the current session, if signed in
    fn current_user(&self) -> Option<User>;

    /// Receives the current identity every time it changes
    fn subscribe(&self) -> watch::Receiver<Option<User>>;

    /// Ask the provider to send a one-time sign-in code to `email`
    async fn start_sign_in(&self, email: &str) -> ApiResult<()>;

    /// Exchange the emailed code for a session
    async fn complete_sign_in(&self, email: &str, code: &str) -> ApiResult<User>;

    async fn sign_out(&self) -> ApiResult<()>;
}

/// Relational side of the hosted backend. Rows travel as JSON and are typed
/// by the repository layer.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, table: Table, query: &Query) -> ApiResult<Vec<Value>>;

    /// Count-only query
    async fn count(&self, table: Table, query: &Query) -> ApiResult<usize>;

    /// Insert one row and return the stored representation
    async fn insert(&self, table: Table, row: Value) -> ApiResult<Vec<Value>>;

    /// Patch matching rows; returns the rows actually changed
    async fn update(&self, table: Table, query: &Query, patch: Value) -> ApiResult<Vec<Value>>;

    /// Delete matching rows; returns the rows actually removed. Rows hidden by
    /// row-level permissions are silently left alone.
    async fn delete(&self, table: Table, query: &Query) -> ApiResult<Vec<Value>>;

    /// Call a remote procedure
    async fn rpc(&self, function: &str, args: Value) -> ApiResult<Value>;
}

/// Object storage side of the hosted backend
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: Bucket,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ApiResult<()>;

    /// Public address of an object
    fn public_url(&self, bucket: Bucket, name: &str) -> String;

    async fn remove(&self, bucket: Bucket, names: &[String]) -> ApiResult<()>;

    /// Object name behind a public URL of `bucket`. `None` for URLs that do
    /// not point into the bucket, e.g. generated placeholders.
    fn object_name(&self, bucket: Bucket, url: &str) -> Option<String> {
        let prefix = self.public_url(bucket, "");
        let name = url.strip_prefix(prefix.as_str())?;
        let name = name.split(['?', '#']).next().unwrap_or(name);
        if name.is_empty() {
            return None;
        }
        urlencoding::decode(name).ok().map(|n| n.into_owned())
    }
}

/// The full hosted-backend contract
pub trait Backend: IdentityProvider + RecordStore + ObjectStore {}

impl<T> Backend for T where T: IdentityProvider + RecordStore + ObjectStore {}

pub type SharedBackend = Arc<dyn Backend>;
