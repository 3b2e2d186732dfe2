use std::{fmt::Debug, sync::Arc};

use loadcell_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use loadcell_instruments::prelude::Reporter;

use crate::executor::Executor;

/// Values stored in the runner and agent contexts must satisfy this constraint so they can be
/// default-initialised and shared with agent threads.
pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

impl UserValuesConstraint for () {}

/// Run-scoped state: the executor, the reporter and a scenario-defined value.
///
/// Mutable only during global setup. By the time agents start, the context is behind an `Arc`
/// and everything in it is read-only, which is what makes lock-free sharing of the scenario
/// value (e.g. a tenant pool) safe.
#[derive(Debug)]
pub struct RunnerContext<RV: UserValuesConstraint> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    value: RV,
}

impl<RV: UserValuesConstraint> RunnerContext<RV> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        value: RV,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_handle,
            value,
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    /// End the run early, as though the configured duration had elapsed.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    pub fn get_mut(&mut self) -> &mut RV {
        &mut self.value
    }

    pub fn get(&self) -> &RV {
        &self.value
    }
}

/// Agent-scoped state: owned exclusively by one agent thread for the lifetime of the run.
pub struct AgentContext<RV: UserValuesConstraint, V: UserValuesConstraint> {
    agent_id: String,
    agent_index: usize,
    runner_context: Arc<RunnerContext<RV>>,
    shutdown_listener: DelegatedShutdownListener,
    value: V,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> AgentContext<RV, V> {
    pub(crate) fn new(
        agent_id: String,
        agent_index: usize,
        runner_context: Arc<RunnerContext<RV>>,
        shutdown_listener: DelegatedShutdownListener,
    ) -> Self {
        Self {
            agent_id,
            agent_index,
            runner_context,
            shutdown_listener,
            value: Default::default(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Stable zero-based index of this agent, usable for spreading work across a shared pool.
    pub fn agent_index(&self) -> usize {
        self.agent_index
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    pub fn shutdown_listener(&mut self) -> &mut DelegatedShutdownListener {
        &mut self.shutdown_listener
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn get(&self) -> &V {
        &self.value
    }
}
