/// Tests for schema discovery against a mock REST surface
use rlsprobe::client::ProbeClient;
use rlsprobe::errors::ScanError;
use rlsprobe::models::Credential;
use rlsprobe::schema::{columns_from_definition, enumerate, test_connection};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> ProbeClient {
    ProbeClient::new(1).unwrap()
}

#[tokio::test]
async fn test_enumerate_parses_definitions_and_columns() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/"))
        .and(header("apikey", "tok"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "definitions": {
                "users": {
                    "properties": {
                        "id": {"type": "integer", "format": "int8"},
                        "email": {"type": "string"}
                    }
                },
                "notes": {}
            },
            "paths": {"/users": {}, "/users/{id}": {}}
        })))
        .mount(&server)
        .await;

    let credential = Credential::new(&server.uri(), "tok").unwrap();
    let enumerated = enumerate(&client(), &credential).await.unwrap();

    assert_eq!(enumerated.entities.len(), 2);

    let users = enumerated
        .entities
        .iter()
        .find(|e| e.name == "users")
        .expect("users enumerated");
    assert_eq!(users.columns.len(), 2);
    let id = users.columns.iter().find(|c| c.name == "id").unwrap();
    assert_eq!(id.data_type, "integer");
    assert_eq!(id.format.as_deref(), Some("int8"));

    // Definition without properties gets an empty column list
    let notes = enumerated
        .entities
        .iter()
        .find(|e| e.name == "notes")
        .expect("notes enumerated");
    assert!(notes.columns.is_empty());

    // Raw document is kept for the run
    assert!(enumerated.raw_schema.get("definitions").is_some());
}

#[tokio::test]
async fn test_enumerate_non_success_is_schema_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let credential = Credential::new(&server.uri(), "tok").unwrap();
    let result = enumerate(&client(), &credential).await;

    match result {
        Err(ScanError::SchemaUnavailable { status }) => assert_eq!(status, 404),
        other => panic!("expected SchemaUnavailable, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_connection_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let credential = Credential::new(&server.uri(), "tok").unwrap();
    let status = test_connection(&client(), &credential).await;

    assert!(status.ok);
    assert_eq!(status.status, Some(200));
}

#[tokio::test]
async fn test_connection_probe_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let credential = Credential::new(&server.uri(), "tok").unwrap();
    let status = test_connection(&client(), &credential).await;

    assert!(!status.ok);
    assert_eq!(status.status, Some(401));
}

#[test]
fn test_columns_from_missing_definition() {
    let schema = json!({"definitions": {"users": {"properties": {"id": {}}}}});
    assert!(columns_from_definition(&schema, "ghost").is_empty());

    // Property with no declared type defaults to unknown
    let columns = columns_from_definition(&schema, "users");
    assert_eq!(columns[0].data_type, "unknown");
}
