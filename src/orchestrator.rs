//! # Yield Orchestrator
//!
//! The `Orchestrator` owns the registered protocol adapters, in a fixed order,
//! and runs them on demand.
//!
//! ## Overview
//!
//! - `run(project)` runs a single adapter; its output has already passed the
//!   final gate (`pool_assembler::finalize`)
//! - `run_all()` runs every adapter concurrently and reports one result per
//!   project, so one protocol failing never hides the others' pools
//! - `from_settings` wires the production stack: one Multicall3 reader per EVM
//!   chain in use, the coins price service and the Thala API client
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mig_yield_sdk::{orchestrator::Orchestrator, settings::Settings};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::new()?;
//! let orchestrator = Orchestrator::from_settings(&settings)?;
//!
//! for (project, result) in orchestrator.run_all().await {
//!     match result {
//!         Ok(pools) => println!("{}: {} pools", project, pools.len()),
//!         Err(e) => eprintln!("{} failed: {}", project, e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::{anyhow, Result};
use ethers::prelude::{Http, Provider};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::adapters::{ironclad, segment, thalaswap, IroncladAdapter, SegmentAdapter, ThalaswapAdapter};
use crate::chain_registry::{ironclad_deployments, segment_deployment, Chain};
use crate::multicall::{MulticallReader, StateReader};
use crate::pools::YieldPool;
use crate::price_feeds::{LlamaPriceClient, PriceOracle};
use crate::settings::Settings;
use crate::yield_adapter::YieldAdapter;

/// Outcome of one adapter inside `run_all`.
pub type ProjectResult = (&'static str, Result<Vec<YieldPool>>);

pub struct Orchestrator {
    adapters: Vec<Box<dyn YieldAdapter>>,
}

impl Orchestrator {
    pub fn new(adapters: Vec<Box<dyn YieldAdapter>>) -> Self {
        Self { adapters }
    }

    /// Builds the adapters enabled in `settings.runner.projects`.
    ///
    /// Fails when an enabled EVM adapter needs a chain without an RPC endpoint.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        for project in &settings.runner.projects {
            if ![ironclad::PROJECT, segment::PROJECT, thalaswap::PROJECT].contains(&project.as_str()) {
                warn!(project = %project, "ignoring unknown project in runner settings");
            }
        }

        let ironclad_enabled = settings.project_enabled(ironclad::PROJECT);
        let segment_enabled = settings.project_enabled(segment::PROJECT);

        let mut chains = BTreeSet::new();
        if ironclad_enabled {
            chains.extend(ironclad_deployments()?.iter().map(|c| c.chain));
        }
        if segment_enabled {
            chains.insert(segment_deployment()?.chain);
        }

        let multicall_address = settings.multicall_address()?;
        let mut reader = MulticallReader::<Provider<Http>>::new();
        for chain in &chains {
            let url = settings.rpc_url(*chain)?;
            let provider = Provider::<Http>::try_from(url)
                .map_err(|e| anyhow!("Invalid RPC endpoint for {}: {}", chain, e))?;
            reader = reader.with_chain(*chain, Arc::new(provider), multicall_address, settings.multicall.batch_size);
        }
        let reader: Arc<dyn StateReader> = Arc::new(reader);
        let oracle: Arc<dyn PriceOracle> = Arc::new(LlamaPriceClient::new(
            settings.price_api.base_url.as_str(),
            Duration::from_secs(settings.price_api.timeout_seconds),
        )?);

        let mut adapters: Vec<Box<dyn YieldAdapter>> = Vec::new();
        if ironclad_enabled {
            adapters.push(Box::new(IroncladAdapter::new(reader.clone(), oracle.clone())?));
        }
        if segment_enabled {
            adapters.push(Box::new(SegmentAdapter::new(reader.clone(), oracle.clone())?));
        }
        if settings.project_enabled(thalaswap::PROJECT) {
            adapters.push(Box::new(ThalaswapAdapter::new(&settings.thala)?));
        }

        info!(
            adapters = adapters.len(),
            chains = ?chains.iter().map(Chain::as_str).collect::<Vec<_>>(),
            "orchestrator ready"
        );
        Ok(Self::new(adapters))
    }

    /// Registered projects, in run order.
    pub fn projects(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.project()).collect()
    }

    /// Runs the adapter registered for `project`.
    pub async fn run(&self, project: &str) -> Result<Vec<YieldPool>> {
        let adapter = self
            .adapters
            .iter()
            .find(|a| a.project() == project)
            .ok_or_else(|| anyhow!("No adapter registered for project {}", project))?;
        run_adapter(adapter.as_ref()).await
    }

    /// Runs every adapter concurrently; results keep registration order.
    pub async fn run_all(&self) -> Vec<ProjectResult> {
        join_all(
            self.adapters
                .iter()
                .map(|adapter| async move { (adapter.project(), run_adapter(adapter.as_ref()).await) }),
        )
        .await
    }
}

async fn run_adapter(adapter: &dyn YieldAdapter) -> Result<Vec<YieldPool>> {
    let project = adapter.project();
    let started = Instant::now();
    match adapter.apy().await {
        Ok(pools) => {
            info!(project, pools = pools.len(), elapsed_ms = started.elapsed().as_millis() as u64, "adapter finished");
            Ok(pools)
        }
        Err(e) => {
            error!(project, error = %e, "adapter failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed {
        project: &'static str,
        pools: Option<Vec<YieldPool>>,
    }

    #[async_trait]
    impl YieldAdapter for Fixed {
        fn project(&self) -> &'static str {
            self.project
        }

        async fn apy(&self) -> Result<Vec<YieldPool>> {
            self.pools.clone().ok_or_else(|| anyhow!("rpc unreachable"))
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(vec![
            Box::new(Fixed {
                project: "first",
                pools: Some(vec![YieldPool::new("0xa", "Bob", "first", "A", 1.0, 1.0)]),
            }),
            Box::new(Fixed {
                project: "broken",
                pools: None,
            }),
            Box::new(Fixed {
                project: "last",
                pools: Some(Vec::new()),
            }),
        ])
    }

    #[tokio::test]
    async fn one_failure_does_not_hide_other_projects() {
        let results = orchestrator().run_all().await;
        let projects: Vec<&str> = results.iter().map(|(p, _)| *p).collect();
        assert_eq!(projects, vec!["first", "broken", "last"]);
        assert_eq!(results[0].1.as_ref().unwrap().len(), 1);
        assert!(results[1].1.is_err());
        assert!(results[2].1.as_ref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_project_is_an_error() {
        let orchestrator = orchestrator();
        assert!(orchestrator.run("missing").await.is_err());
        assert_eq!(orchestrator.run("first").await.unwrap().len(), 1);
    }

    #[test]
    fn missing_endpoint_fails_construction() {
        let mut settings = Settings::default();
        settings.runner.projects = vec![segment::PROJECT.to_string()];
        assert!(Orchestrator::from_settings(&settings).is_err());

        settings
            .rpc
            .endpoints
            .insert("bob".to_string(), "https://rpc.gobob.xyz".to_string());
        let orchestrator = Orchestrator::from_settings(&settings).unwrap();
        assert_eq!(orchestrator.projects(), vec![segment::PROJECT]);
    }
}
