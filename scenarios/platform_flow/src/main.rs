mod flow;

use std::sync::Arc;

use anyhow::Context;
use billing_loadcell_runner::prelude::*;

/// Exit code for a run that completed but breached an SLO target. Distinct from the generic
/// error exit so CI can tell a slow platform from a harness that never got started.
const SLO_BREACH_EXIT_CODE: i32 = 2;

#[derive(Debug, Default)]
struct AgentValues {
    iteration: u64,
}

impl UserValuesConstraint for AgentValues {}

fn setup(ctx: &mut RunnerContext<BillingRunnerContext>) -> HookResult {
    configure_platform(ctx)?;
    warm_up_pool(ctx)?;
    Ok(())
}

fn agent_behaviour(ctx: &mut AgentContext<BillingRunnerContext, AgentValues>) -> HookResult {
    let client = ctx.runner_context().get().client()?;
    let pool = ctx.runner_context().get().pool()?;
    let reporter = ctx.runner_context().reporter();
    let agent_index = ctx.agent_index();

    let iteration = ctx.get().iteration;
    ctx.get_mut().iteration += 1;

    ctx.runner_context().executor().execute_in_place(async move {
        flow::run_iteration(client.as_ref(), &pool, &reporter, iteration, agent_index).await
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
