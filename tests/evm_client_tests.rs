//! Tests for the JSON-RPC node client against a mock server

use std::time::Duration;

use ethers::types::{Address, TransactionRequest, U256};
use mockito::{mock, server_url, Matcher};
use serde_json::json;
use url::Url;

use evm_agent_wallet::blockchain::{
    client::{ChainRpc, RpcConnector},
    evm_client::{EvmClient, HttpConnector},
    registry::{ChainKey, ChainRegistry},
};

fn client(path: &str) -> EvmClient {
    let url = Url::parse(&format!("{}/{}", server_url(), path)).unwrap();
    EvmClient::new(url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn balance_is_decoded_from_hex_quantity() {
    let m = mock("POST", "/rpc-balance")
        .match_body(Matcher::PartialJson(json!({"method": "eth_getBalance"})))
        .with_status(200)
        .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0xde0b6b3a7640000"}).to_string())
        .create();

    let balance = client("rpc-balance").balance(Address::zero()).await.unwrap();

    m.assert();
    assert_eq!(balance, U256::exp10(18));
}

#[tokio::test]
async fn nonce_uses_pending_block_tag() {
    let _m = mock("POST", "/rpc-nonce")
        .match_body(Matcher::PartialJson(json!({
            "method": "eth_getTransactionCount",
            "params": ["0x0000000000000000000000000000000000000000", "pending"]
        })))
        .with_status(200)
        .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0x7"}).to_string())
        .create();

    let nonce = client("rpc-nonce")
        .transaction_count(Address::zero())
        .await
        .unwrap();
    assert_eq!(nonce, U256::from(7u64));
}

#[tokio::test]
async fn node_errors_are_surfaced() {
    let _m = mock("POST", "/rpc-error")
        .with_status(200)
        .with_body(
            json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "insufficient funds for gas"}})
                .to_string(),
        )
        .create();

    let err = client("rpc-error")
        .estimate_gas(&TransactionRequest::new())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("insufficient funds"), "{err:#}");
}

#[tokio::test]
async fn chain_id_is_parsed() {
    let _m = mock("POST", "/rpc-chain")
        .with_status(200)
        .with_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0x2105"}).to_string())
        .create();

    assert_eq!(client("rpc-chain").chain_id().await.unwrap(), 8453);
}

#[test]
fn connector_rejects_non_http_endpoints() {
    let registry = ChainRegistry::builtin();
    let key = ChainKey::new("base");
    let mut descriptor = registry.resolve(&key).unwrap().clone();

    assert!(HttpConnector::default().connect(&key, &descriptor).is_ok());

    descriptor.rpc_url = Url::parse("ws://localhost:8546").unwrap();
    assert!(HttpConnector::default().connect(&key, &descriptor).is_err());
}
