//! Tests against DynamoDB Local
//!
//! Run with a DynamoDB Local instance and
//! `SECRETSHARE_DYNAMODB_ENDPOINT=http://localhost:8000 cargo test -- --ignored`

use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_dynamodb::Client;
use secretshare_api::{create_router, key_schema, SecretRepository, SecretService};
use secretshare_core::{SystemClock, SECRET_UNAVAILABLE_MESSAGE};
use secretshare_store::{DynamoDbStore, ItemStore};
use secretshare_test::TestServer;
use std::sync::Arc;

async fn local_store() -> Option<DynamoDbStore> {
    let endpoint = std::env::var("SECRETSHARE_DYNAMODB_ENDPOINT").ok()?;

    let config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(endpoint)
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::new("test", "test", None, None, "test"))
        .load()
        .await;

    let table = format!("secrets-share-test-{}", std::process::id());
    let store = DynamoDbStore::new(Client::new(&config), table, key_schema());
    store.ensure_table(Some("ExpirationTime")).await.unwrap();
    Some(store)
}

#[tokio::test]
#[ignore = "requires DynamoDB Local"]
async fn test_write_read_against_dynamodb_local() {
    let Some(store) = local_store().await else {
        eprintln!("SECRETSHARE_DYNAMODB_ENDPOINT not set, skipping");
        return;
    };
    assert_eq!(store.name(), "dynamodb");

    // A second call accepts the existing table
    store.ensure_table(Some("ExpirationTime")).await.unwrap();

    let repository = SecretRepository::new(Arc::new(store));
    let service = Arc::new(SecretService::new(repository, Arc::new(SystemClock)));
    let server = TestServer::serve(create_router(service, false)).await.unwrap();
    let client = server.client();

    let id = client.write_secret("hello", "k1", Some("1h")).await.unwrap();
    assert_eq!(id.len(), 32);

    assert_eq!(
        client.read_secret(&id, "wrong").await.unwrap(),
        SECRET_UNAVAILABLE_MESSAGE
    );
    assert_eq!(client.read_secret(&id, "k1").await.unwrap(), "hello");
    assert_eq!(
        client.read_secret(&id, "k1").await.unwrap(),
        SECRET_UNAVAILABLE_MESSAGE
    );
}
