use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{OracleClient, OracleError};

fn test_client(base_url: &str) -> OracleClient {
    OracleClient::new(base_url, None, 5).expect("client construction should not fail")
}

#[tokio::test]
async fn fetch_usd_price_returns_quote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/price"))
        .and(query_param("symbol", "ETH"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "ETH",
                "usd": 1741.36
            })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let price = client.fetch_usd_price("ETH").await.expect("quote fetch");
    assert_eq!(price, Some(1741.36));
}

#[tokio::test]
async fn fetch_usd_price_surfaces_null_sentinel_as_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/price"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "PRIME",
                "usd": null
            })),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let price = client.fetch_usd_price("PRIME").await.expect("quote fetch");
    assert_eq!(price, None, "null quote must be a skip, not an error");
}

#[tokio::test]
async fn fetch_usd_price_errors_on_server_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/price"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.fetch_usd_price("ETH").await;
    assert!(matches!(result, Err(OracleError::Http(_))));
}

#[tokio::test]
async fn fetch_usd_price_errors_on_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/price"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let result = client.fetch_usd_price("ETH").await;
    assert!(matches!(result, Err(OracleError::Deserialize { .. })));
}

#[tokio::test]
async fn fetch_usd_price_sends_api_key_header_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/price"))
        .and(header("x-api-key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "ETH",
                "usd": 1.0
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client =
        OracleClient::new(&server.uri(), Some("test-key"), 5).expect("client construction");
    client.fetch_usd_price("ETH").await.expect("quote fetch");
}

#[test]
fn new_rejects_invalid_base_url() {
    let result = OracleClient::new("not a url", None, 5);
    assert!(matches!(result, Err(OracleError::InvalidBaseUrl { .. })));
}
