use std::sync::Arc;

use anyhow::Context;
use billing_client_instrumented::prelude::PlatformClient;
use loadcell_runner::prelude::UserValuesConstraint;

use crate::config::RunConfig;
use crate::pool::TenantPool;

/// Runner-context value for the billing platform scenarios.
///
/// Populated during global setup and read-only from the moment agents start: the configuration
/// is resolved in `main`, the client is built and the pool is frozen before the first behaviour
/// cycle. That freeze-then-share ordering is what lets every agent read the pool without locks.
#[derive(Debug, Default)]
pub struct BillingRunnerContext {
    config: Option<Arc<RunConfig>>,
    client: Option<Arc<PlatformClient>>,
    pool: Option<Arc<TenantPool>>,
}

impl BillingRunnerContext {
    pub fn new(config: Arc<RunConfig>) -> Self {
        Self {
            config: Some(config),
            client: None,
            pool: None,
        }
    }

    pub fn config(&self) -> anyhow::Result<Arc<RunConfig>> {
        self.config
            .clone()
            .context("Run configuration was not provided to the scenario")
    }

    pub fn client(&self) -> anyhow::Result<Arc<PlatformClient>> {
        self.client
            .clone()
            .context("The platform client is only available after global setup")
    }

    pub fn pool(&self) -> anyhow::Result<Arc<TenantPool>> {
        self.pool
            .clone()
            .context("The tenant pool is only available after global setup")
    }

    pub fn set_client(&mut self, client: Arc<PlatformClient>) {
        self.client = Some(client);
    }

    pub fn set_pool(&mut self, pool: TenantPool) {
        self.pool = Some(Arc::new(pool));
    }
}

impl UserValuesConstraint for BillingRunnerContext {}
