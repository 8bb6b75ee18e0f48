use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use teahouse::api::{
    ApiError, IdentityProvider, ObjectStore, Query, RecordStore, SupabaseClient, Table,
};
use teahouse::config::BackendConfig;
use teahouse_types::Bucket;

const ANON_KEY: &str = "anon-test-key";

async fn setup() -> (MockServer, SupabaseClient) {
    let server = MockServer::start().await;
    let client = SupabaseClient::new(&BackendConfig {
        url: server.uri(),
        anon_key: ANON_KEY.to_string(),
    });
    (server, client)
}

fn post_row(id: i64, likes: i64) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": Uuid::new_v4(),
        "author_name": "Layla",
        "image_url": "https://cdn.test/p.jpg",
        "caption": "steam #tea",
        "likes_count": likes,
        "created_at": "2024-05-01T10:00:00Z"
    })
}

#[tokio::test]
async fn test_select_sends_filters_ordering_and_keys() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(query_param("select", "*"))
        .and(query_param("order", "likes_count.desc.nullslast,created_at.desc.nullslast"))
        .and(header("apikey", ANON_KEY))
        .and(header("Authorization", format!("Bearer {}", ANON_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_row(1, 5), post_row(2, 1)])))
        .expect(1)
        .mount(&server)
        .await;

    let query = Query::new()
        .order("likes_count", false)
        .order("created_at", false);
    let rows = client.select(Table::Posts, &query).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["likes_count"], json!(5));
}

#[tokio::test]
async fn test_count_reads_content_range() {
    let (server, client) = setup().await;

    Mock::given(method("HEAD"))
        .and(path("/rest/v1/comments"))
        .and(query_param("post_id", "eq.7"))
        .and(header("Prefer", "count=exact"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-range", "0-2/3"))
        .expect(1)
        .mount(&server)
        .await;

    let count = client
        .count(Table::Comments, &Query::new().eq("post_id", 7))
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_insert_asks_for_the_stored_row() {
    let (server, client) = setup().await;
    let row = json!({ "post_id": 7, "content": "great! :) #coffee" });

    Mock::given(method("POST"))
        .and(path("/rest/v1/comments"))
        .and(header("Prefer", "return=representation"))
        .and(body_json(&row))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": 11, "post_id": 7 }])))
        .expect(1)
        .mount(&server)
        .await;

    let stored = client.insert(Table::Comments, row).await.unwrap();
    assert_eq!(stored[0]["id"], json!(11));
}

#[tokio::test]
async fn test_rpc_accepts_an_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/increment_likes"))
        .and(body_json(json!({ "p_id": 3 })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let value = client
        .rpc("increment_likes", json!({ "p_id": 3 }))
        .await
        .unwrap();
    assert!(value.is_null());
}

#[tokio::test]
async fn test_upload_and_public_url() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/storage/v1/object/tea-moments/1700000000000.png"))
        .and(header("Content-Type", "image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "tea-moments/1700000000000.png" })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .upload(Bucket::PostImages, "1700000000000.png", vec![1, 2, 3], "image/png")
        .await
        .unwrap();

    let url = client.public_url(Bucket::PostImages, "1700000000000.png");
    assert_eq!(
        url,
        format!("{}/storage/v1/object/public/tea-moments/1700000000000.png", server.uri())
    );
    assert_eq!(
        client.object_name(Bucket::PostImages, &url).as_deref(),
        Some("1700000000000.png")
    );
}

#[tokio::test]
async fn test_status_codes_map_to_error_kinds() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/posts"))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied for table posts"))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(401).set_body_string("JWT expired"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = client
        .delete(Table::Posts, &Query::new().eq("id", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let err = client
        .update(Table::Profiles, &Query::new().eq("id", 1), json!({ "bio": "x" }))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));

    let err = client
        .select(Table::Profiles, &Query::new())
        .await
        .unwrap_err();
    match err {
        ApiError::Api(msg) => assert!(msg.contains("500") && !msg.contains("<html>")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_code_sign_in_publishes_identity_and_uses_token() {
    let (server, client) = setup().await;
    let user_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/auth/v1/otp"))
        .and(body_json(json!({ "email": "sara@teahouse.test", "create_user": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
            "user": {
                "id": user_id,
                "email": "sara@teahouse.test",
                "user_metadata": { "full_name": "Sara Haddad" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles"))
        .and(header("Authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut identity = client.subscribe();
    client.start_sign_in("sara@teahouse.test").await.unwrap();
    let user = client
        .complete_sign_in("sara@teahouse.test", "123456")
        .await
        .unwrap();

    assert_eq!(user.id, user_id);
    assert_eq!(user.display_name.as_deref(), Some("Sara Haddad"));
    assert!(identity.has_changed().unwrap());
    assert_eq!(identity.borrow_and_update().as_ref().map(|u| u.id), Some(user_id));

    client
        .select(Table::Profiles, &Query::new().eq("id", user_id))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejected_code_is_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Token has expired or is invalid"))
        .mount(&server)
        .await;

    let err = client
        .complete_sign_in("sara@teahouse.test", "000000")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert!(client.current_user().is_none());
}

#[tokio::test]
async fn test_silent_refresh_keeps_identity_quiet() {
    let (server, client) = setup().await;
    let user_id = Uuid::new_v4();
    let grant = |access: &str, refresh: &str, expires_in: i64| {
        json!({
            "access_token": access,
            "refresh_token": refresh,
            "expires_in": expires_in,
            "user": { "id": user_id, "email": "sara@teahouse.test" }
        })
    };

    // The first token is already inside the refresh margin
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(grant("stale-token", "refresh-1", 0)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(grant("fresh-token", "refresh-2", 3600)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/posts"))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut identity = client.subscribe();
    client
        .complete_sign_in("sara@teahouse.test", "123456")
        .await
        .unwrap();
    assert!(identity.has_changed().unwrap());
    identity.borrow_and_update();

    client.select(Table::Posts, &Query::new()).await.unwrap();

    assert!(!identity.has_changed().unwrap());
    assert_eq!(client.current_user().map(|u| u.id), Some(user_id));
}
