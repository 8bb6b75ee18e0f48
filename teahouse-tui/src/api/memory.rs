//! In-process backend. Emulates the hosted service closely enough for the
//! controllers: row-level write permissions, server-assigned ids and
//! timestamps, the `increment_likes` procedure, object storage and a
//! one-time-code sign-in.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tokio::sync::watch;
use uuid::Uuid;

use teahouse_types::{Bucket, Comment, Post, Profile, User};

use super::backend::{IdentityProvider, ObjectStore, RecordStore};
use super::query::{like_matches, Filter, Query, Table};
use super::{ApiError, ApiResult};

/// Code accepted by `complete_sign_in` unless configured otherwise
pub const DEFAULT_SIGN_IN_CODE: &str = "123456";

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Table, Vec<Value>>,
    next_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
    users: HashMap<String, User>,
    pending_codes: HashSet<String>,
    objects: BTreeMap<(Bucket, String), Vec<u8>>,
    failing: HashSet<String>,
}

impl MemoryState {
    fn rows(&mut self, table: Table) -> &mut Vec<Value> {
        self.tables.entry(table).or_default()
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps, so ordering by creation is total
    fn timestamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now
    }

    fn check_failure(&self, operation: &str) -> ApiResult<()> {
        if self.failing.contains(operation) {
            Err(ApiError::Api(format!("{} failed (simulated)", operation)))
        } else {
            Ok(())
        }
    }

    fn post_owner(&self, post_id: &Value) -> Option<String> {
        self.tables
            .get(&Table::Posts)?
            .iter()
            .find(|row| row.get("id") == Some(post_id))
            .and_then(|row| row.get("user_id"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Row-level write policy
    fn may_write(&self, table: Table, row: &Value, user: Option<&User>) -> bool {
        let Some(user) = user else {
            return false;
        };
        let uid = user.id.to_string();
        let owner_column = match table {
            Table::Profiles => "id",
            Table::Posts | Table::Comments => "user_id",
        };

        if row.get(owner_column).and_then(Value::as_str) == Some(uid.as_str()) {
            return true;
        }

        // Post owners may clear comments on their posts
        table == Table::Comments
            && row
                .get("post_id")
                .and_then(|id| self.post_owner(id))
                .as_deref()
                == Some(uid.as_str())
    }
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches(query: &Query, row: &Value) -> bool {
    query.filters.iter().all(|filter| match filter {
        Filter::Eq { column, value } => {
            row.get(*column).and_then(render).as_deref() == Some(value.as_str())
        }
        Filter::ILike { column, pattern } => row
            .get(*column)
            .and_then(Value::as_str)
            .is_some_and(|v| like_matches(pattern, v)),
    })
}

/// Non-null comparison: timestamps chronologically, numbers numerically,
/// everything else as text
fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        if let (Ok(dx), Ok(dy)) = (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
            return dx.cmp(&dy);
        }
        return x.cmp(y);
    }
    render(a).cmp(&render(b))
}

fn sort_rows(query: &Query, rows: &mut [Value]) {
    rows.sort_by(|a, b| {
        for order in &query.order {
            let x = a.get(order.column).filter(|v| !v.is_null());
            let y = b.get(order.column).filter(|v| !v.is_null());
            let ord = match (x, y) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => {
                    let ord = compare_values(x, y);
                    if order.ascending {
                        ord
                    } else {
                        ord.reverse()
                    }
                }
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn as_object(row: Value) -> ApiResult<Map<String, Value>> {
    match row {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::BadRequest(format!("Expected a JSON object, got {}", other))),
    }
}

pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    identity: watch::Sender<Option<User>>,
    sign_in_code: String,
    rpc_calls: AtomicUsize,
    select_calls: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            state: Mutex::new(MemoryState::default()),
            identity,
            sign_in_code: DEFAULT_SIGN_IN_CODE.to_string(),
            rpc_calls: AtomicUsize::new(0),
            select_calls: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of procedure calls made so far
    pub fn rpc_calls(&self) -> usize {
        self.rpc_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of select queries made so far
    pub fn select_calls(&self) -> usize {
        self.select_calls.load(AtomicOrdering::SeqCst)
    }

    /// Make every call of `operation` fail until cleared. Operation names are
    /// the trait method names (`rpc`, `remove`, `upload`, ...), optionally
    /// suffixed with the table (`insert:posts`).
    pub fn fail_on(&self, operation: &str) {
        self.state().failing.insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    fn check(&self, operation: &str, table: Option<Table>) -> ApiResult<()> {
        let state = self.state();
        state.check_failure(operation)?;
        if let Some(table) = table {
            state.check_failure(&format!("{}:{}", operation, table))?;
        }
        Ok(())
    }

    /// Register an account that can sign in by email
    pub fn register_user(&self, email: &str, display_name: Option<&str>) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            display_name: display_name.map(str::to_string),
            avatar_url: None,
        };
        self.state().users.insert(email.to_lowercase(), user.clone());
        user
    }

    /// Switch the current identity without the code exchange
    pub fn sign_in_as(&self, user: Option<&User>) {
        self.identity.send_replace(user.cloned());
    }

    pub fn seed_profile(&self, user: &User, full_name: &str) -> Profile {
        let profile = Profile {
            id: user.id,
            full_name: full_name.to_string(),
            bio: None,
            avatar_url: None,
            cover_url: None,
        };
        self.seed_row(Table::Profiles, json!(profile));
        profile
    }

    pub fn seed_post(&self, author: &Profile, image_url: &str, caption: &str, likes: i64) -> Post {
        let mut state = self.state();
        let post = Post {
            id: state.next_id(),
            user_id: author.id,
            author_name: author.full_name.clone(),
            image_url: image_url.to_string(),
            caption: Some(caption.to_string()),
            likes_count: likes,
            created_at: state.timestamp(),
        };
        state.rows(Table::Posts).push(json!(post));
        post
    }

    pub fn seed_comment(&self, post: &Post, author: &Profile, content: &str) -> Comment {
        let mut state = self.state();
        let comment = Comment {
            id: state.next_id(),
            post_id: post.id,
            user_id: author.id,
            author_name: author.full_name.clone(),
            content: content.to_string(),
            created_at: state.timestamp(),
        };
        state.rows(Table::Comments).push(json!(comment));
        comment
    }

    /// Insert a raw row, bypassing permissions and validation
    pub fn seed_row(&self, table: Table, row: Value) -> Value {
        let mut state = self.state();
        let mut map = match row {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::fill_defaults(&mut state, table, &mut map);
        let row = Value::Object(map);
        state.rows(table).push(row.clone());
        row
    }

    pub fn seed_object(&self, bucket: Bucket, name: &str, bytes: &[u8]) -> String {
        self.state()
            .objects
            .insert((bucket, name.to_string()), bytes.to_vec());
        self.public_url(bucket, name)
    }

    pub fn has_object(&self, bucket: Bucket, name: &str) -> bool {
        self.state()
            .objects
            .contains_key(&(bucket, name.to_string()))
    }

    pub fn object_names(&self, bucket: Bucket) -> Vec<String> {
        self.state()
            .objects
            .keys()
            .filter(|(b, _)| *b == bucket)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Raw rows of a table, in insertion order
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.state().rows(table).clone()
    }

    fn fill_defaults(state: &mut MemoryState, table: Table, map: &mut Map<String, Value>) {
        if table != Table::Profiles && !map.contains_key("id") {
            let id = state.next_id();
            map.insert("id".to_string(), json!(id));
        }
        if !map.contains_key("created_at") {
            let ts = state.timestamp();
            map.insert(
                "created_at".to_string(),
                json!(ts.to_rfc3339_opts(SecondsFormat::Micros, true)),
            );
        }
        if table == Table::Posts && !map.contains_key("likes_count") {
            map.insert("likes_count".to_string(), json!(0));
        }
    }

    /// Demo data for `--demo`
    pub fn demo() -> Self {
        let backend = Self::new();

        let layla = backend.register_user("layla@teahouse.test", Some("Layla"));
        let omar = backend.register_user("omar@teahouse.test", Some("Omar"));
        let sara = backend.register_user("sara@teahouse.test", Some("Sara"));

        let layla = backend.seed_profile(&layla, "Layla");
        let omar = backend.seed_profile(&omar, "Omar");
        let sara = backend.seed_profile(&sara, "Sara");

        let steam = backend.seed_object(Bucket::PostImages, "1700000000000.jpg", b"jpeg");
        let first = backend.seed_post(
            &layla,
            &steam,
            "First pour of the morning :) #tea #morning",
            12,
        );
        let second = backend.seed_post(
            &omar,
            "https://picsum.photos/seed/cardamom/800/600",
            "Cardamom or nothing <3 @Layla #coffee",
            4,
        );
        backend.seed_post(&sara, "https://picsum.photos/seed/mint/800/600", "Mint tea under the rain :rain:", 7);

        backend.seed_comment(&first, &omar, "Looks perfect :D");
        backend.seed_comment(&first, &sara, "@Omar agreed #tea");
        backend.seed_comment(&second, &layla, "Always cardamom ;)");

        backend
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn restore_session(&self) -> ApiResult<Option<User>> {
        Ok(self.current_user())
    }

    fn current_user(&self) -> Option<User> {
        self.identity.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.identity.subscribe()
    }

    async fn start_sign_in(&self, email: &str) -> ApiResult<()> {
        self.check("start_sign_in", None)?;
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(ApiError::BadRequest("Invalid email address".to_string()));
        }
        self.state().pending_codes.insert(email);
        Ok(())
    }

    async fn complete_sign_in(&self, email: &str, code: &str) -> ApiResult<User> {
        let email = email.trim().to_lowercase();
        let user = {
            let mut state = self.state();
            if code.trim() != self.sign_in_code || !state.pending_codes.remove(&email) {
                return Err(ApiError::Unauthorized(
                    "Token has expired or is invalid".to_string(),
                ));
            }
            state
                .users
                .entry(email.clone())
                .or_insert_with(|| User {
                    id: Uuid::new_v4(),
                    display_name: email.split('@').next().map(str::to_string),
                    email: Some(email.clone()),
                    avatar_url: None,
                })
                .clone()
        };
        self.identity.send_replace(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> ApiResult<()> {
        self.identity.send_replace(None);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryBackend {
    async fn select(&self, table: Table, query: &Query) -> ApiResult<Vec<Value>> {
        self.select_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.check("select", Some(table))?;

        let mut rows: Vec<Value> = self
            .state()
            .rows(table)
            .iter()
            .filter(|row| matches(query, row))
            .cloned()
            .collect();
        sort_rows(query, &mut rows);
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn count(&self, table: Table, query: &Query) -> ApiResult<usize> {
        self.check("count", Some(table))?;
        Ok(self
            .state()
            .rows(table)
            .iter()
            .filter(|row| matches(query, row))
            .count())
    }

    async fn insert(&self, table: Table, row: Value) -> ApiResult<Vec<Value>> {
        self.check("insert", Some(table))?;
        let user = self.current_user();
        let mut map = as_object(row)?;

        let mut state = self.state();
        if !state.may_write(table, &Value::Object(map.clone()), user.as_ref()) {
            return Err(ApiError::Forbidden(format!(
                "new row violates row-level security policy for table \"{}\"",
                table
            )));
        }
        if table == Table::Comments {
            let post_id = map.get("post_id").cloned().unwrap_or(Value::Null);
            if state.post_owner(&post_id).is_none() {
                return Err(ApiError::BadRequest(format!(
                    "insert or update on table \"comments\" violates foreign key constraint \"comments_post_id_fkey\" (post_id={})",
                    post_id
                )));
            }
        }
        if table == Table::Profiles {
            let exists = state
                .rows(table)
                .iter()
                .any(|r| r.get("id") == map.get("id"));
            if exists {
                return Err(ApiError::Api(
                    "duplicate key value violates unique constraint \"profiles_pkey\"".to_string(),
                ));
            }
        }

        Self::fill_defaults(&mut state, table, &mut map);
        let row = Value::Object(map);
        state.rows(table).push(row.clone());
        Ok(vec![row])
    }

    async fn update(&self, table: Table, query: &Query, patch: Value) -> ApiResult<Vec<Value>> {
        self.check("update", Some(table))?;
        let user = self.current_user();
        let patch = as_object(patch)?;

        let mut state = self.state();
        let mut rows = std::mem::take(state.rows(table));
        let mut changed = Vec::new();
        for row in rows.iter_mut() {
            if !matches(query, row) || !state.may_write(table, row, user.as_ref()) {
                continue;
            }
            if let Value::Object(map) = &mut *row {
                for (k, v) in &patch {
                    map.insert(k.clone(), v.clone());
                }
            }
            changed.push(row.clone());
        }
        *state.rows(table) = rows;
        Ok(changed)
    }

    async fn delete(&self, table: Table, query: &Query) -> ApiResult<Vec<Value>> {
        self.check("delete", Some(table))?;
        let user = self.current_user();

        let mut state = self.state();
        let all = std::mem::take(state.rows(table));
        let (removed, kept): (Vec<Value>, Vec<Value>) = all
            .into_iter()
            .partition(|row| matches(query, row) && state.may_write(table, row, user.as_ref()));
        *state.rows(table) = kept;
        Ok(removed)
    }

    async fn rpc(&self, function: &str, args: Value) -> ApiResult<Value> {
        self.rpc_calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.check("rpc", None)?;

        match function {
            "increment_likes" => {
                let post_id = args
                    .get("p_id")
                    .cloned()
                    .ok_or_else(|| ApiError::BadRequest("missing p_id".to_string()))?;
                let mut state = self.state();
                let post = state
                    .rows(Table::Posts)
                    .iter_mut()
                    .find(|row| row.get("id") == Some(&post_id));
                if let Some(Value::Object(map)) = post {
                    let likes = map.get("likes_count").and_then(Value::as_i64).unwrap_or(0);
                    map.insert("likes_count".to_string(), json!(likes + 1));
                }
                Ok(Value::Null)
            }
            other => Err(ApiError::NotFound(format!(
                "Could not find the function public.{}",
                other
            ))),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn upload(
        &self,
        bucket: Bucket,
        name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> ApiResult<()> {
        self.check("upload", None)?;
        if self.current_user().is_none() {
            return Err(ApiError::Unauthorized("sign in to upload".to_string()));
        }
        let mut state = self.state();
        let key = (bucket, name.to_string());
        if state.objects.contains_key(&key) {
            return Err(ApiError::Api("The resource already exists".to_string()));
        }
        state.objects.insert(key, bytes);
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, name: &str) -> String {
        format!("memory://storage/public/{}/{}", bucket.as_str(), name)
    }

    async fn remove(&self, bucket: Bucket, names: &[String]) -> ApiResult<()> {
        self.check("remove", None)?;
        let mut state = self.state();
        for name in names {
            state.objects.remove(&(bucket, name.clone()));
        }
        Ok(())
    }
}
