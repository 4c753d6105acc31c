//! Tests for the wallet session: chain switching, balances and credentials

mod common;

use std::sync::Arc;

use ethers::types::Transaction;
use ethers::utils::rlp;
use secrecy::SecretString;

use common::{
    ether, session_with, StubAggregator, StubConnector, StubOutcome, StubRpc, RECIPIENT,
    TEST_ADDRESS,
};
use evm_agent_wallet::blockchain::{
    models::{TransferParams, WalletError},
    registry::{ChainKey, ChainRegistry},
    services::{routes::RouteOrchestrator, transactions},
    session::WalletSession,
    to_checksum, AgentWallet,
};

fn wallet(session: WalletSession) -> AgentWallet {
    let aggregator = StubAggregator::new(vec![], StubOutcome::Done("0x1".into()));
    AgentWallet::new(session, RouteOrchestrator::new(Arc::new(aggregator)))
}

fn transfer_on(chain: &str) -> TransferParams {
    TransferParams {
        from_chain: chain.into(),
        to_address: RECIPIENT.into(),
        amount: "0.1".into(),
        data: None,
    }
}

/// Chain id carried in a signed legacy envelope's `v`.
fn signed_chain_id(raw: &[u8]) -> u64 {
    let tx = rlp::decode::<Transaction>(raw).unwrap();
    (tx.v.as_u64() - 35) / 2
}

#[tokio::test]
async fn session_derives_address_and_starts_on_ethereum() {
    let session = session_with(&[Arc::new(StubRpc::new(1))]);
    assert_eq!(to_checksum(&session.address(), None), TEST_ADDRESS);
    assert_eq!(session.current_chain().await, ChainKey::new("ethereum"));
}

#[tokio::test]
async fn switch_chain_is_idempotent() {
    let session = session_with(&[Arc::new(StubRpc::new(1)), Arc::new(StubRpc::new(8453))]);
    let base = ChainKey::new("base");

    session.switch_chain(&base).await.unwrap();
    session.switch_chain(&base).await.unwrap();
    assert_eq!(session.current_chain().await, base);
}

#[tokio::test]
async fn unknown_chain_leaves_current_chain_untouched() {
    let session = session_with(&[Arc::new(StubRpc::new(1)), Arc::new(StubRpc::new(8453))]);
    session.switch_chain(&ChainKey::new("base")).await.unwrap();

    let err = session
        .switch_chain(&ChainKey::new("solana"))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::UnknownChain(_)));
    assert_eq!(session.current_chain().await, ChainKey::new("base"));
}

#[tokio::test]
async fn aliases_and_chain_ids_resolve() {
    let registry = ChainRegistry::builtin();
    assert_eq!(registry.resolve_key("8453").unwrap(), ChainKey::new("base"));
    assert_eq!(registry.resolve_key("Base Sepolia").unwrap(), ChainKey::new("base-sepolia"));
    assert!(registry.resolve_key("42").is_err());
}

#[tokio::test]
async fn balance_degrades_to_none_when_node_fails() {
    let session = session_with(&[Arc::new(StubRpc::new(1).with_balance(None))]);
    assert_eq!(session.balance().await, None);
}

#[tokio::test]
async fn balances_cover_every_configured_chain() {
    let session = session_with(&[Arc::new(StubRpc::new(1)), Arc::new(StubRpc::new(8453))]);
    let balances = session.balances().await;

    assert_eq!(balances.len(), ChainRegistry::builtin().len());
    for (key, balance) in balances {
        match key.as_str() {
            "ethereum" | "base" => assert_eq!(balance, Some(ether(10))),
            _ => assert_eq!(balance, None, "{} has no node", key),
        }
    }
}

#[tokio::test]
async fn invalid_private_key_is_rejected() {
    for bad in ["not-hex", "0x1234", ""] {
        let result = WalletSession::initialize_with(
            &SecretString::new(bad.to_string()),
            ChainRegistry::builtin(),
            &StubConnector::default(),
        );
        assert!(matches!(result, Err(WalletError::InvalidCredential(_))), "{bad}");
    }
}

#[tokio::test]
async fn unbound_chain_reports_not_connected() {
    // Only ethereum has a node; base is configured but unbound.
    let session = session_with(&[Arc::new(StubRpc::new(1))]);
    session.switch_chain(&ChainKey::new("base")).await.unwrap();
    assert!(matches!(
        session.signing_client().await,
        Err(WalletError::NotConnected(_))
    ));

    let params = TransferParams {
        from_chain: "base".into(),
        to_address: RECIPIENT.into(),
        amount: "1".into(),
        data: None,
    };
    let err = transactions::transfer(&session, &params).await.unwrap_err();
    assert_eq!(err.kind(), "not_connected");
}

#[tokio::test]
async fn balance_on_reads_the_requested_chain_despite_a_queued_switch() {
    let base = StubRpc::new(8453).with_balance(Some(ether(3)));
    let wallet = wallet(session_with(&[Arc::new(StubRpc::new(1)), Arc::new(base)]));

    let held = wallet.session().lock().await;
    let reader = wallet.clone();
    let read = tokio::spawn(async move { reader.balance_on("base").await });
    tokio::task::yield_now().await;
    let switcher = wallet.clone();
    let switch = tokio::spawn(async move { switcher.switch_chain("ethereum").await });
    tokio::task::yield_now().await;
    drop(held);

    let balance = read.await.unwrap().unwrap().unwrap();
    switch.await.unwrap().unwrap();
    assert_eq!(balance.chain, "base");
    assert_eq!(balance.chain_id, 8453);
    assert_eq!(balance.amount, ether(3).to_string());
    assert_eq!(wallet.current_chain().await, ChainKey::new("ethereum"));
}

#[tokio::test]
async fn concurrent_transfers_sign_for_their_own_chain() {
    let ethereum = Arc::new(StubRpc::new(1));
    let base = Arc::new(StubRpc::new(8453));
    let session = session_with(&[ethereum.clone(), base.clone()]);

    let base_request = transfer_on("base");
    let ethereum_request = transfer_on("ethereum");
    let (on_base, on_ethereum) = tokio::join!(
        transactions::transfer(&session, &base_request),
        transactions::transfer(&session, &ethereum_request),
    );
    assert_eq!(on_base.unwrap().chain_id, 8453);
    assert_eq!(on_ethereum.unwrap().chain_id, 1);

    let base_raw = base.broadcasts();
    let ethereum_raw = ethereum.broadcasts();
    assert_eq!(base_raw.len(), 1);
    assert_eq!(ethereum_raw.len(), 1);
    assert_eq!(signed_chain_id(&base_raw[0]), 8453);
    assert_eq!(signed_chain_id(&ethereum_raw[0]), 1);
}
