//! # Route Aggregation
//!
//! Boundary to the external route-aggregation service that discovers and
//! drives swap and bridge routes. The service never holds key material: it
//! asks for signers through the [`ExecutionSigner`] capability, which is
//! backed by the locked wallet session.

pub mod lifi;
pub mod strategy;
pub mod types;

use async_trait::async_trait;

use crate::blockchain::{client::SigningClient, models::WalletResult};

pub use lifi::{LifiClient, LifiConfig};
pub use strategy::{CheapestGasRoute, FastestRoute, FirstRoute, RouteSelector};
pub use types::{
    Process, ProcessKind, ProcessStatus, Route, RouteExecution, RoutesRequest, StepExecution,
};

/// Signer capability handed to the aggregator during route execution.
#[async_trait]
pub trait ExecutionSigner: Send + Sync {
    /// Signer for the session's current chain.
    async fn current_signer(&self) -> WalletResult<SigningClient>;

    /// Switches the session to `chain_id` and returns that chain's signer.
    async fn switch_chain(&self, chain_id: u64) -> WalletResult<SigningClient>;
}

/// Policy flags for route execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Continue without confirmation when a re-quote lowers the output.
    pub accept_exchange_rate_updates: bool,
    /// Approve `U256::MAX` instead of the exact amount.
    pub infinite_approval: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            accept_exchange_rate_updates: true,
            infinite_approval: false,
        }
    }
}

#[async_trait]
pub trait RouteAggregator: Send + Sync {
    /// Candidate routes, best first.
    async fn get_routes(&self, request: &RoutesRequest) -> anyhow::Result<Vec<Route>>;

    /// Runs every step of `route`, signing through `signer`.
    ///
    /// Step failures are reported through the returned process statuses;
    /// an `Err` means execution could not be driven at all.
    async fn execute_route(
        &self,
        route: Route,
        signer: &dyn ExecutionSigner,
        options: &ExecutionOptions,
    ) -> anyhow::Result<RouteExecution>;
}
