//! Integration tests for the coins price service client

use mig_yield_sdk::chain_registry::Chain;
use mig_yield_sdk::price_feeds::{LlamaPriceClient, PriceMap, PriceOracle};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WETH: &str = "0x4200000000000000000000000000000000000006";
const USDT: &str = "0x05D032ac25d322df992303dCa074EE7392C117b9";

#[tokio::test]
async fn test_keys_are_lowercased_both_ways() {
    let mut coins = serde_json::Map::new();
    coins.insert(
        format!("bob:{}", WETH),
        json!({ "price": 3120.5, "symbol": "WETH", "decimals": 18, "confidence": 0.99 }),
    );
    coins.insert(
        format!("BOB:{}", USDT),
        json!({ "price": 0.999, "symbol": "USDT", "decimals": 6 }),
    );

    // Keys are sorted and deduplicated before the request
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/prices/current/bob:{},bob:{}", USDT.to_lowercase(), WETH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "coins": coins })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LlamaPriceClient::new(server.uri(), Duration::from_secs(5)).expect("client");
    let prices = PriceMap::fetch(&client, Chain::Bob, &[WETH.to_string(), USDT.to_string(), WETH.to_string()])
        .await
        .expect("prices");

    assert_eq!(prices.len(), 2);
    assert_eq!(prices.get(WETH), Some(3120.5));
    assert_eq!(prices.get(USDT), Some(0.999));
}

#[tokio::test]
async fn test_unpriced_tokens_are_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/prices/current/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "coins": {} })))
        .mount(&server)
        .await;

    let client = LlamaPriceClient::new(server.uri(), Duration::from_secs(5)).expect("client");
    let prices = PriceMap::fetch(&client, Chain::Bob, &[USDT.to_string()]).await.expect("prices");

    assert!(prices.is_empty());
    assert_eq!(prices.get(USDT), None);
    assert_eq!(prices.price_or_symbol_fallback(USDT, "USDT"), 1.0);
}

#[tokio::test]
async fn test_http_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/prices/current/.+$"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = LlamaPriceClient::new(server.uri(), Duration::from_secs(5)).expect("client");
    assert!(client.current_prices(&[format!("bob:{}", WETH)]).await.is_err());
}

#[tokio::test]
async fn test_empty_key_set_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = LlamaPriceClient::new(server.uri(), Duration::from_secs(5)).expect("client");
    assert!(client.current_prices(&[]).await.expect("prices").is_empty());
}
