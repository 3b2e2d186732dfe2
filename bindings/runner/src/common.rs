use std::sync::Arc;

use anyhow::Context;
use billing_client_instrumented::prelude::PlatformClient;
use loadcell_runner::prelude::{HookResult, RunnerContext};

use crate::context::BillingRunnerContext;
use crate::pool::warm_up_tenant_pool;

/// Build the shared platform client from the resolved run configuration.
///
/// Call this from the global setup hook before anything issues a request:
/// ```rust,no_run
/// use billing_loadcell_runner::prelude::*;
///
/// fn setup(ctx: &mut RunnerContext<BillingRunnerContext>) -> HookResult {
///     configure_platform(ctx)?;
///     warm_up_pool(ctx)?;
///     Ok(())
/// }
/// ```
pub fn configure_platform(ctx: &mut RunnerContext<BillingRunnerContext>) -> HookResult {
    let config = ctx.get().config()?;
    let reporter = ctx.reporter();

    let client = PlatformClient::new(config.endpoints(), config.auth_token.clone(), reporter)
        .context("Failed to construct the platform client")?;
    ctx.get_mut().set_client(Arc::new(client));

    Ok(())
}

/// Provision the tenant pool before any agent starts.
///
/// The error from an underfilled pool propagates out of the setup hook and aborts the run
/// before any measured traffic is generated.
pub fn warm_up_pool(ctx: &mut RunnerContext<BillingRunnerContext>) -> HookResult {
    let config = ctx.get().config()?;
    let client = ctx.get().client()?;
    let run_seed = ctx.reporter().run_id().to_string();

    let pool = ctx.executor().execute_in_place(async move {
        warm_up_tenant_pool(client.as_ref(), &config, &run_seed).await
    })?;

    ctx.get_mut().set_pool(pool);

    Ok(())
}
