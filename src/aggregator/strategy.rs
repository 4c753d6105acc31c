//! # Route Selection
//!
//! Strategies for picking one route out of the aggregator's candidates.
//!
//! The aggregator already orders routes by its own recommendation, so the
//! default [`FirstRoute`] strategy simply trusts that order.

use std::cmp::Ordering;
use std::fmt;

use crate::aggregator::types::Route;

/// Trait for route selection strategies.
pub trait RouteSelector: Send + Sync + fmt::Debug {
    /// Picks a route, or `None` when no candidate is acceptable.
    fn select(&self, routes: &[Route]) -> Option<Route>;

    /// Returns the name of this strategy.
    fn name(&self) -> &'static str;
}

/// Takes the aggregator's first (recommended) route.
#[derive(Debug, Clone, Default)]
pub struct FirstRoute;

impl RouteSelector for FirstRoute {
    fn select(&self, routes: &[Route]) -> Option<Route> {
        routes.first().cloned()
    }

    fn name(&self) -> &'static str {
        "first"
    }
}

/// Prefers the shortest estimated execution time; ties keep aggregator order.
#[derive(Debug, Clone, Default)]
pub struct FastestRoute;

impl RouteSelector for FastestRoute {
    fn select(&self, routes: &[Route]) -> Option<Route> {
        routes
            .iter()
            .enumerate()
            .min_by(|(ia, a), (ib, b)| {
                a.estimated_duration()
                    .partial_cmp(&b.estimated_duration())
                    .unwrap_or(Ordering::Equal)
                    .then(ia.cmp(ib))
            })
            .map(|(_, route)| route.clone())
    }

    fn name(&self) -> &'static str {
        "fastest"
    }
}

/// Prefers the lowest USD gas cost; routes without an estimate rank last.
#[derive(Debug, Clone, Default)]
pub struct CheapestGasRoute;

impl RouteSelector for CheapestGasRoute {
    fn select(&self, routes: &[Route]) -> Option<Route> {
        routes
            .iter()
            .enumerate()
            .min_by(|(ia, a), (ib, b)| {
                let cost = |r: &Route| r.gas_cost_usd().unwrap_or(f64::INFINITY);
                cost(a)
                    .partial_cmp(&cost(b))
                    .unwrap_or(Ordering::Equal)
                    .then(ia.cmp(ib))
            })
            .map(|(_, route)| route.clone())
    }

    fn name(&self) -> &'static str {
        "cheapest_gas"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::types::{RouteStep, RouteToken, StepAction, StepEstimate};

    fn route(id: &str, duration: f64, gas_usd: Option<&str>) -> Route {
        let token = RouteToken {
            address: "0x0000000000000000000000000000000000000000".into(),
            chain_id: 1,
            symbol: "ETH".into(),
            decimals: 18,
        };
        Route {
            id: id.into(),
            from_chain_id: 1,
            to_chain_id: 1,
            from_amount: "1".into(),
            to_amount: "1".into(),
            to_amount_min: "1".into(),
            gas_cost_usd: gas_usd.map(String::from),
            tags: vec![],
            steps: vec![RouteStep {
                id: format!("{}-step", id),
                step_type: "swap".into(),
                tool: "uniswap".into(),
                action: StepAction {
                    from_chain_id: 1,
                    to_chain_id: 1,
                    from_token: token.clone(),
                    to_token: token,
                    from_amount: "1".into(),
                    from_address: None,
                    to_address: None,
                    slippage: None,
                },
                estimate: StepEstimate {
                    approval_address: "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE".into(),
                    from_amount: "1".into(),
                    to_amount: "1".into(),
                    to_amount_min: "1".into(),
                    execution_duration: duration,
                    gas_costs: vec![],
                },
                transaction_request: None,
            }],
        }
    }

    #[test]
    fn first_route_keeps_aggregator_order() {
        let routes = vec![route("a", 300.0, None), route("b", 30.0, None)];
        assert_eq!(FirstRoute.select(&routes).unwrap().id, "a");
        assert!(FirstRoute.select(&[]).is_none());
    }

    #[test]
    fn fastest_route_by_duration() {
        let routes = vec![route("a", 300.0, None), route("b", 30.0, None), route("c", 30.0, None)];
        assert_eq!(FastestRoute.select(&routes).unwrap().id, "b");
    }

    #[test]
    fn cheapest_gas_skips_unknown_costs() {
        let routes = vec![
            route("a", 10.0, None),
            route("b", 10.0, Some("1.50")),
            route("c", 10.0, Some("0.20")),
        ];
        assert_eq!(CheapestGasRoute.select(&routes).unwrap().id, "c");
        assert_eq!(CheapestGasRoute.name(), "cheapest_gas");
    }
}
