//! HTTP tests for the server client against a mock Parseable server.

use pb_cli::client::{ClientError, QueryRequest, RolePrivilege, RoleResource, ServerClient, UserEntry};
use pb_cli::core::config::Profile;
use pb_cli::engine::ResolvedProfile;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADMIN_AUTH: &str = "Basic YWRtaW46YWRtaW4=";

fn client_for(server: &MockServer) -> ServerClient {
    let target = ResolvedProfile {
        name: "mock".to_string(),
        profile: Profile::new(server.uri(), "admin", "admin"),
    };
    ServerClient::new(&target).expect("client")
}

#[tokio::test]
async fn list_streams_sends_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/logstream"))
        .and(header("authorization", ADMIN_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "backend"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let streams = client_for(&server).list_streams().await.unwrap();

    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].name, "backend");
}

#[tokio::test]
async fn stream_stats_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/logstream/backend/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "stream": "backend",
            "time": "2024-05-01T12:00:00Z",
            "ingestion": {"count": 1200, "size": "4096 Bytes", "format": "json"},
            "storage": {"size": "1024 Bytes", "format": "parquet"}
        })))
        .mount(&server)
        .await;

    let stats = client_for(&server).stream_stats("backend").await.unwrap();

    assert_eq!(stats.ingestion.count, 1200);
    assert_eq!(stats.storage.size, "1024 Bytes");
    assert_eq!(stats.time.as_deref(), Some("2024-05-01T12:00:00Z"));
}

#[tokio::test]
async fn create_and_delete_stream() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/logstream/backend"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/logstream/backend"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.create_stream("backend").await.unwrap();
    client.delete_stream("backend").await.unwrap();
}

#[tokio::test]
async fn create_user_returns_generated_password() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/user/alice"))
        .and(body_json(serde_json::json!(["reader"])))
        .respond_with(ResponseTemplate::new(200).set_body_string("Gx9-generated\n"))
        .expect(1)
        .mount(&server)
        .await;

    let password = client_for(&server)
        .create_user("alice", &["reader".to_string()])
        .await
        .unwrap();

    assert_eq!(password, "Gx9-generated");
}

#[tokio::test]
async fn list_users_and_roles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            "admin",
            {"id": "alice", "method": "native"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/role"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            "reader", "writer"
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let users = client.list_users().await.unwrap();
    let roles = client.list_roles().await.unwrap();

    assert_eq!(users[0], UserEntry::Name("admin".to_string()));
    assert_eq!(users[1].id(), "alice");
    assert_eq!(roles, vec!["reader".to_string(), "writer".to_string()]);
}

#[tokio::test]
async fn set_user_roles_sends_role_list() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/user/alice/role"))
        .and(body_json(serde_json::json!(["reader", "writer"])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .set_user_roles("alice", &["reader".to_string(), "writer".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn create_role_puts_privileges() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/role/viewers"))
        .and(header("authorization", ADMIN_AUTH))
        .and(body_json(serde_json::json!([
            {"privilege": "reader", "resource": {"stream": "backend"}}
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .create_role(
            "viewers",
            &[RolePrivilege {
                privilege: "reader".to_string(),
                resource: Some(RoleResource {
                    stream: "backend".to_string(),
                }),
            }],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn saved_queries_listed_for_profile_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/filters/admin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "filter_id": "f1",
                "filter_name": "errors",
                "stream_name": "backend",
                "query": {"filter_type": "sql", "filter_query": "select * from backend"},
                "time_filter": {"from": "2024-05-01T11:00:00Z", "to": "2024-05-01T12:00:00Z"}
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let saved = client_for(&server).list_saved_queries().await.unwrap();

    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].filter_name, "errors");
    assert_eq!(saved[0].stream_name, "backend");
    assert_eq!(
        saved[0].query.filter_query.as_deref(),
        Some("select * from backend")
    );
}

#[tokio::test]
async fn query_posts_time_range() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query"))
        .and(body_json(serde_json::json!({
            "query": "select count(*) from backend",
            "startTime": "2024-05-01T11:00:00Z",
            "endTime": "2024-05-01T12:00:00Z"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"count": 7}
        ])))
        .mount(&server)
        .await;

    let records = client_for(&server)
        .query(&QueryRequest {
            query: "select count(*) from backend".to_string(),
            start_time: "2024-05-01T11:00:00Z".to_string(),
            end_time: "2024-05-01T12:00:00Z".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(records, vec![serde_json::json!({"count": 7})]);
}

#[tokio::test]
async fn unauthorized_maps_to_typed_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server).list_roles().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized { ref username } if username == "admin"));
}

#[tokio::test]
async fn api_error_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/role/admin"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "role is in use"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).delete_role("admin").await.unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "role is in use");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/logstream"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_streams().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let base = reqwest::Url::parse("http://127.0.0.1:1").unwrap();
    let client = ServerClient::with_base(base, "admin", "admin").unwrap();

    let err = client.list_streams().await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)));
}
