use std::sync::Arc;

use anyhow::Context;
use billing_loadcell_runner::prelude::*;

/// Exit code for a run that completed but breached an SLO target.
const SLO_BREACH_EXIT_CODE: i32 = 2;

#[derive(Debug, Default)]
struct AgentValues {}

impl UserValuesConstraint for AgentValues {}

fn setup(ctx: &mut RunnerContext<BillingRunnerContext>) -> HookResult {
    configure_platform(ctx)?;
    Ok(())
}

/// Create one tenant per iteration under a unique display name. This isolates the tenant
/// service's write path, which the platform flow scenario only exercises during warm-up.
fn agent_behaviour(ctx: &mut AgentContext<BillingRunnerContext, AgentValues>) -> HookResult {
    let client = ctx.runner_context().get().client()?;
    let reporter = ctx.runner_context().reporter();
    let keys = IterationKeys::generate(ctx.agent_index());

    ctx.runner_context().executor().execute_in_place(async move {
        let request = CreateTenantRequest {
            display_name: format!("Perf Tenant {}", keys.suffix()),
        };
        let response = client.create_tenant(&request).await;

        reporter.check(
            "tenant_create_created",
            matches!(&response, Ok(r) if r.is_status(201)),
        );
        reporter.check(
            "tenant_code_present",
            matches!(&response, Ok(r) if r.body().is_some_and(|b| b.usable_tenant_code().is_some())),
        );

        Ok(())
    })
}

fn main() -> LoadcellResult<()> {
    let cli = init();

    let config = Arc::new(RunConfig::from_env().context("Failed to resolve run configuration")?);

    let builder = ScenarioDefinitionBuilder::<BillingRunnerContext, AgentValues>::new(
        env!("CARGO_PKG_NAME"),
        cli,
    )
    .with_default_agents(config.agents)
    .with_default_duration_s(config.duration.as_secs())
    .with_slo_targets(config.slo)
    .with_runner_value(BillingRunnerContext::new(config))
    .use_setup(setup)
    .use_agent_behaviour(agent_behaviour);

    let report = run(builder)?;

    if let Some(slo) = &report.slo {
        if !slo.passed() {
            std::process::exit(SLO_BREACH_EXIT_CODE);
        }
    }

    println!("Finished with {} agents", report.agents_at_completion);

    Ok(())
}
