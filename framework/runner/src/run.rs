use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use loadcell_core::prelude::{AgentBailError, ShutdownHandle};
use loadcell_instruments::prelude::{ReportConfig, Reporter};

use crate::cli::ReporterOpt;
use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};
use crate::definition::{ScenarioDefinition, ScenarioDefinitionBuilder};
use crate::executor::Executor;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::shutdown::start_shutdown_listener;
use crate::types::RunReport;

/// Execute a scenario to completion.
///
/// An `Err` from this function is a fatal initialization failure: either the definition was
/// invalid or the global setup hook failed, and no measured traffic was generated. A completed
/// run always returns `Ok`, even when the SLO verdict in the report is a fail; callers decide
/// how to surface that distinction.
pub fn run<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<RV, V>,
) -> anyhow::Result<RunReport> {
    let definition = definition.build()?;

    log::info!(
        "Running scenario {} (run id {})",
        definition.name,
        definition.run_id
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime)?;
    let reporter = Arc::new(build_reporter(&definition, &runtime, &shutdown_handle)?);
    let executor = Arc::new(Executor::new(runtime));

    let mut runner_context = RunnerContext::new(
        executor,
        reporter.clone(),
        shutdown_handle.clone(),
        definition.runner_value,
    );

    if let Some(setup_fn) = &definition.setup_fn {
        setup_fn(&mut runner_context)?;
    }

    // Setup traffic, such as pool warm-up, stays out of the verdict. Everything recorded from
    // here on counts against the SLO targets.
    reporter.start_measurement();

    if let Some(duration) = definition.duration_s {
        if !definition.no_progress {
            start_progress(
                Duration::from_secs(duration),
                shutdown_handle.new_listener(),
            );
        }

        // Stop starting new behaviour cycles once the duration has elapsed.
        let timer_handle = shutdown_handle.clone();
        runner_context.executor().spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_secs(duration)).await;
            timer_handle.shutdown();
        });
    }

    let runner_context = Arc::new(runner_context);
    let runner_context_for_teardown = runner_context.clone();

    // Agents are about to start, watch for the harness itself eating the machine.
    start_monitor(shutdown_handle.new_listener());

    let mut handles = Vec::new();
    for (agent_index, assigned_behaviour) in definition.assigned_behaviours.iter().enumerate() {
        // Read access to the runner context for each agent.
        let runner_context = runner_context.clone();

        let setup_agent_fn = definition.setup_agent_fn;
        let agent_behaviour_fn = definition.agent_behaviour.get(assigned_behaviour).copied();
        let teardown_agent_fn = definition.teardown_agent_fn;

        // For the runner to check whether the agent should stop between behaviour cycles.
        let mut cycle_shutdown_receiver = shutdown_handle.new_listener();
        // For the behaviour implementation to observe shutdown if it wants to.
        let delegated_shutdown_listener = shutdown_handle.new_listener();

        let agent_id = format!("agent-{}", agent_index);

        handles.push(
            std::thread::Builder::new()
                .name(agent_id.clone())
                .spawn(move || {
                    let mut context = AgentContext::new(
                        agent_id.clone(),
                        agent_index,
                        runner_context,
                        delegated_shutdown_listener,
                    );

                    if let Some(setup_agent_fn) = setup_agent_fn {
                        if let Err(e) = setup_agent_fn(&mut context) {
                            log::error!("Agent setup failed for agent {}: {:?}", agent_id, e);
                            return false;
                        }
                    }

                    let mut completed = true;
                    if let Some(behaviour) = agent_behaviour_fn {
                        loop {
                            if cycle_shutdown_receiver.should_shutdown() {
                                log::debug!("Stopping agent {}", agent_id);
                                break;
                            }

                            match behaviour(&mut context) {
                                Ok(()) => {}
                                Err(e) if e.is::<AgentBailError>() => {
                                    log::warn!(
                                        "Agent {} is bailing out of the scenario: {:?}",
                                        agent_id,
                                        e
                                    );
                                    completed = false;
                                    break;
                                }
                                Err(e) => {
                                    log::error!("Agent behaviour failed: {:?}", e);
                                }
                            }
                        }
                    }

                    if let Some(teardown_agent_fn) = teardown_agent_fn {
                        if let Err(e) = teardown_agent_fn(&mut context) {
                            log::error!("Agent teardown failed for agent {}: {:?}", agent_id, e);
                        }
                    }

                    completed
                })
                .expect("Failed to spawn thread for agent"),
        );
    }

    let mut agents_at_completion = 0;
    for handle in handles {
        match handle.join() {
            Ok(true) => agents_at_completion += 1,
            Ok(false) => {}
            Err(e) => log::error!("Error joining agent thread: {:?}", e),
        }
    }

    if let Some(teardown_fn) = definition.teardown_fn {
        // Don't fail the run if the teardown fails. Reporting and the verdict still matter.
        // The hook is documented as best effort.
        if let Err(e) = teardown_fn(runner_context_for_teardown) {
            log::error!("Teardown failed: {:?}", e);
        }
    }

    // Wake up the background threads and let the influx reporter drain.
    shutdown_handle.shutdown();

    let slo = reporter.finalize();
    match &slo {
        Some(report) if report.passed() => log::info!("SLO verdict: pass ({report})"),
        Some(report) => log::error!("SLO verdict: FAIL ({report})"),
        None => {}
    }

    Ok(RunReport {
        agents_at_completion,
        slo,
    })
}

fn build_reporter<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: &ScenarioDefinition<RV, V>,
    runtime: &tokio::runtime::Runtime,
    shutdown_handle: &ShutdownHandle,
) -> anyhow::Result<Reporter> {
    let mut config = ReportConfig::new(definition.run_id.clone());
    if let Some(targets) = definition.slo_targets {
        config = config.with_slo_targets(targets);
    }

    let config = match definition.reporter {
        ReporterOpt::InMemory => config.enable_summary(),
        ReporterOpt::Noop => config,
        ReporterOpt::Influx => config.enable_influx(runtime, shutdown_handle.new_listener())?,
    };

    Ok(config.init())
}
