use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use teahouse_types::{Bucket, User};

use super::backend::{IdentityProvider, ObjectStore, RecordStore};
use super::query::{Query, Table};
use super::{ApiError, ApiResult};
use crate::config::BackendConfig;
use crate::session::{SessionStore, StoredSession};

/// Refresh the access token when it expires within this window
const REFRESH_MARGIN_SECS: i64 = 30;

/// Token grant returned by the identity endpoints
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: IdentityUser,
}

#[derive(Debug, Deserialize)]
struct IdentityUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

impl IdentityUser {
    fn into_user(self) -> User {
        let meta = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| self.user_metadata.get(*k).and_then(Value::as_str))
                .map(str::to_string)
        };
        User {
            id: self.id,
            display_name: meta(&["full_name", "name"]),
            avatar_url: meta(&["avatar_url", "picture"]),
            email: self.email,
        }
    }
}

/// Percent-encode each segment of an object name, keeping the separators
fn encode_object_path(name: &str) -> String {
    name.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone)]
struct AuthSession {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl AuthSession {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

/// HTTP client for a Supabase-compatible backend: PostgREST records,
/// GoTrue identity and object storage.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    auth: Mutex<Option<AuthSession>>,
    identity: watch::Sender<Option<User>>,
    session_store: Option<SessionStore>,
}

impl SupabaseClient {
    pub fn new(config: &BackendConfig) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            client: Client::new(),
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            auth: Mutex::new(None),
            identity,
            session_store: None,
        }
    }

    /// Persist refresh tokens so the next launch can restore the session
    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        self.session_store = Some(store);
        self
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}", self.base_url, path)
    }

    /// Bearer token for the next request: the user's access token, refreshed
    /// if it is about to expire, or the anonymous key.
    async fn bearer(&self) -> ApiResult<String> {
        let mut auth = self.auth.lock().await;

        let refresh_token = match auth.as_ref() {
            None => return Ok(self.anon_key.clone()),
            Some(session) if !session.needs_refresh(Utc::now()) => {
                return Ok(session.access_token.clone())
            }
            Some(session) => session.refresh_token.clone(),
        };

        log::debug!("Access token near expiry, refreshing");
        match self.grant_refresh(&refresh_token).await {
            Ok(grant) => {
                let (session, _) = self.install(grant);
                let token = session.access_token.clone();
                *auth = Some(session);
                Ok(token)
            }
            Err(e) => {
                log::warn!("Token refresh failed: {}", e);
                *auth = None;
                self.forget_session();
                Err(e)
            }
        }
    }

    async fn authorized(&self, req: RequestBuilder) -> ApiResult<RequestBuilder> {
        let token = self.bearer().await?;
        Ok(req
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token)))
    }

    /// Map non-success statuses to error variants
    async fn check_status(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        // Clean up HTML error pages from proxies
        let clean_error = if error_text.contains("<html>") || error_text.contains("<!DOCTYPE") {
            format!(
                "Backend returned {} error. Please check the backend URL.",
                status.as_u16()
            )
        } else {
            error_text
        };

        match status.as_u16() {
            404 => Err(ApiError::NotFound(clean_error)),
            401 => Err(ApiError::Unauthorized(clean_error)),
            403 => Err(ApiError::Forbidden(clean_error)),
            400 | 422 => Err(ApiError::BadRequest(clean_error)),
            _ => Err(ApiError::Api(clean_error)),
        }
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn grant_refresh(&self, refresh_token: &str) -> ApiResult<TokenResponse> {
        let response = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Turn a token grant into a session, persist it and publish the user if
    /// it differs from the current one
    fn install(&self, grant: TokenResponse) -> (AuthSession, User) {
        let now = Utc::now();
        let expires_at = grant
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| now + Duration::seconds(grant.expires_in.unwrap_or(3600)));

        let user = grant.user.into_user();
        let session = AuthSession {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at,
        };

        if let Some(store) = &self.session_store {
            let stored = StoredSession {
                refresh_token: session.refresh_token.clone(),
                user_id: user.id,
                saved_at: now,
            };
            if let Err(e) = store.save(&stored) {
                log::warn!("Could not persist session: {}", e);
            }
        }

        // Token refreshes keep the same user and notify nobody
        self.identity.send_if_modified(|current| {
            let changed = current.as_ref().map(|u| u.id) != Some(user.id);
            *current = Some(user.clone());
            changed
        });
        (session, user)
    }

    fn forget_session(&self) {
        if let Some(store) = &self.session_store {
            if let Err(e) = store.delete() {
                log::warn!("Could not delete stored session: {}", e);
            }
        }
        self.identity.send_replace(None);
    }

    fn parse_content_range(header: Option<&str>) -> ApiResult<usize> {
        // "0-9/42" or "*/0"
        header
            .and_then(|range| range.rsplit('/').next())
            .and_then(|total| total.trim().parse().ok())
            .ok_or_else(|| ApiError::Api("Missing or malformed Content-Range header".to_string()))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    async fn restore_session(&self) -> ApiResult<Option<User>> {
        let Some(store) = &self.session_store else {
            return Ok(None);
        };
        let stored = match store.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(None),
            Err(e) => {
                log::warn!("Could not read stored session: {}", e);
                return Ok(None);
            }
        };

        match self.grant_refresh(&stored.refresh_token).await {
            Ok(grant) => {
                let (session, user) = self.install(grant);
                *self.auth.lock().await = Some(session);
                log::info!("Restored session for {}", user.id);
                Ok(Some(user))
            }
            Err(ApiError::Unauthorized(_)) | Err(ApiError::BadRequest(_)) => {
                log::info!("Stored session is no longer valid");
                self.forget_session();
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn current_user(&self) -> Option<User> {
        self.identity.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.identity.subscribe()
    }

    async fn start_sign_in(&self, email: &str) -> ApiResult<()> {
        let response = self
            .client
            .post(self.auth_url("otp"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "create_user": true }))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn complete_sign_in(&self, email: &str, code: &str) -> ApiResult<User> {
        let response = self
            .client
            .post(self.auth_url("verify"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "type": "email", "email": email, "token": code }))
            .send()
            .await?;
        let grant: TokenResponse = Self::handle_response(response).await?;

        let (session, user) = self.install(grant);
        *self.auth.lock().await = Some(session);
        Ok(user)
    }

    async fn sign_out(&self) -> ApiResult<()> {
        let session = self.auth.lock().await.take();

        if let Some(session) = session {
            let result = self
                .client
                .post(self.auth_url("logout"))
                .header("apikey", &self.anon_key)
                .header("Authorization", format!("Bearer {}", session.access_token))
                .send()
                .await;
            match result {
                Ok(response) => {
                    if let Err(e) = Self::check_status(response).await {
                        log::warn!("Logout request rejected: {}", e);
                    }
                }
                Err(e) => log::warn!("Logout request failed: {}", e),
            }
        }

        self.forget_session();
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn select(&self, table: Table, query: &Query) -> ApiResult<Vec<Value>> {
        let req = self
            .client
            .get(self.rest_url(table.as_str()))
            .query(&[("select", "*")])
            .query(&query.to_params());
        let response = self.authorized(req).await?.send().await?;
        Self::handle_response(response).await
    }

    async fn count(&self, table: Table, query: &Query) -> ApiResult<usize> {
        let req = self
            .client
            .head(self.rest_url(table.as_str()))
            .query(&[("select", "*")])
            .query(&query.to_params())
            .header("Prefer", "count=exact");
        let response = self.authorized(req).await?.send().await?;
        let response = Self::check_status(response).await?;

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok());
        Self::parse_content_range(range)
    }

    async fn insert(&self, table: Table, row: Value) -> ApiResult<Vec<Value>> {
        let req = self
            .client
            .post(self.rest_url(table.as_str()))
            .header("Prefer", "return=representation")
            .json(&row);
        let response = self.authorized(req).await?.send().await?;
        Self::handle_response(response).await
    }

    async fn update(&self, table: Table, query: &Query, patch: Value) -> ApiResult<Vec<Value>> {
        let req = self
            .client
            .patch(self.rest_url(table.as_str()))
            .query(&query.to_params())
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.authorized(req).await?.send().await?;
        Self::handle_response(response).await
    }

    async fn delete(&self, table: Table, query: &Query) -> ApiResult<Vec<Value>> {
        let req = self
            .client
            .delete(self.rest_url(table.as_str()))
            .query(&query.to_params())
            .header("Prefer", "return=representation");
        let response = self.authorized(req).await?.send().await?;
        Self::handle_response(response).await
    }

    async fn rpc(&self, function: &str, args: Value) -> ApiResult<Value> {
        let req = self
            .client
            .post(self.rest_url(&format!("rpc/{}", function)))
            .json(&args);
        let response = self.authorized(req).await?.send().await?;
        let response = Self::check_status(response).await?;

        // Void procedures answer with an empty body
        let body = response.text().await?;
        if body.trim().is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_str(&body)?)
        }
    }
}

#[async_trait]
impl ObjectStore for SupabaseClient {
    async fn upload(
        &self,
        bucket: Bucket,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> ApiResult<()> {
        let req = self
            .client
            .post(self.storage_url(&format!(
                "{}/{}",
                bucket.as_str(),
                encode_object_path(name)
            )))
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes);
        let response = self.authorized(req).await?.send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, name: &str) -> String {
        self.storage_url(&format!(
            "public/{}/{}",
            bucket.as_str(),
            encode_object_path(name)
        ))
    }

    async fn remove(&self, bucket: Bucket, names: &[String]) -> ApiResult<()> {
        let req = self
            .client
            .delete(self.storage_url(bucket.as_str()))
            .json(&json!({ "prefixes": names }));
        let response = self.authorized(req).await?.send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(&BackendConfig {
            url: "https://demo.supabase.test".to_string(),
            anon_key: "anon".to_string(),
        })
    }

    #[test]
    fn test_public_url_and_object_name() {
        let client = client();
        let url = client.public_url(Bucket::PostImages, "1700000000000.jpg");
        assert_eq!(
            url,
            "https://demo.supabase.test/storage/v1/object/public/tea-moments/1700000000000.jpg"
        );
        assert_eq!(
            client.object_name(Bucket::PostImages, &format!("{}?t=1", url)),
            Some("1700000000000.jpg".to_string())
        );
        assert_eq!(client.object_name(Bucket::ProfileImages, &url), None);
        assert_eq!(
            client.object_name(
                Bucket::PostImages,
                "https://ui-avatars.com/api/?name=Sara"
            ),
            None
        );
    }

    #[test]
    fn test_object_names_are_encoded_per_segment() {
        let client = client();
        let name = "5b0c6f5e/avatar 1.png";
        let url = client.public_url(Bucket::ProfileImages, name);
        assert!(url.ends_with("/avatars/5b0c6f5e/avatar%201.png"));
        assert_eq!(
            client.object_name(Bucket::ProfileImages, &url).as_deref(),
            Some(name)
        );
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(
            SupabaseClient::parse_content_range(Some("0-9/42")).unwrap(),
            42
        );
        assert_eq!(SupabaseClient::parse_content_range(Some("*/0")).unwrap(), 0);
        assert!(SupabaseClient::parse_content_range(None).is_err());
        assert!(SupabaseClient::parse_content_range(Some("0-9/*")).is_err());
    }

    #[test]
    fn test_identity_user_metadata() {
        let user: IdentityUser = serde_json::from_value(json!({
            "id": "5b0c6f5e-7a55-4a8e-8d3c-0d7a1a2f9e11",
            "email": "sara@example.com",
            "user_metadata": { "name": "Sara", "picture": "https://img.test/s.png" }
        }))
        .unwrap();
        let user = user.into_user();
        assert_eq!(user.display_name.as_deref(), Some("Sara"));
        assert_eq!(user.avatar_url.as_deref(), Some("https://img.test/s.png"));
    }

    #[test]
    fn test_needs_refresh_margin() {
        let now = Utc::now();
        let session = AuthSession {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: now + Duration::seconds(20),
        };
        assert!(session.needs_refresh(now));
        assert!(!session.needs_refresh(now - Duration::seconds(60)));
    }
}
