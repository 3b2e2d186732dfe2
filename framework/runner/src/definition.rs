use std::collections::HashMap;
use std::sync::Arc;

use loadcell_instruments::prelude::SloTargets;

use crate::cli::{ReporterOpt, ScenarioCli};
use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;
pub type GlobalHook<RV> = fn(Arc<RunnerContext<RV>>) -> HookResult;
pub type AgentHookMut<RV, V> = fn(&mut AgentContext<RV, V>) -> HookResult;

/// The builder for a scenario definition.
///
/// This must be used at the start of a scenario to define what the runner should execute.
pub struct ScenarioDefinitionBuilder<RV: UserValuesConstraint, V: UserValuesConstraint> {
    /// The name of the scenario, which should be unique within the test suite.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: ScenarioCli,
    default_agents: Option<usize>,
    default_duration_s: Option<u64>,
    slo_targets: Option<SloTargets>,
    runner_value: RV,
    /// Global setup hook. Runs once, before any agent starts. An error here is fatal to the
    /// whole run: no measured traffic is generated.
    setup_fn: Option<GlobalHookMut<RV>>,
    /// Setup hook for an agent, run once per agent as it starts. An error here removes that
    /// agent from the run but does not stop the scenario.
    setup_agent_fn: Option<AgentHookMut<RV, V>>,
    /// The agent behaviours for this scenario, keyed by name. Use
    /// [ScenarioDefinitionBuilder::use_agent_behaviour] for a single behaviour shared by all
    /// agents, or [ScenarioDefinitionBuilder::use_named_agent_behaviour] together with the
    /// `--behaviour` flag to split agents across behaviours.
    agent_behaviour: HashMap<String, AgentHookMut<RV, V>>,
    /// Teardown hook for an agent, run once per agent when it stops. Best effort.
    teardown_agent_fn: Option<AgentHookMut<RV, V>>,
    /// Global teardown hook, run after all agents have stopped. Best effort.
    teardown_fn: Option<GlobalHook<RV>>,
}

pub(crate) struct ScenarioDefinition<RV: UserValuesConstraint, V: UserValuesConstraint> {
    pub(crate) name: String,
    pub(crate) run_id: String,
    pub(crate) duration_s: Option<u64>,
    pub(crate) no_progress: bool,
    pub(crate) reporter: ReporterOpt,
    pub(crate) slo_targets: Option<SloTargets>,
    pub(crate) runner_value: RV,
    pub(crate) assigned_behaviours: Vec<String>,
    pub(crate) setup_fn: Option<GlobalHookMut<RV>>,
    pub(crate) setup_agent_fn: Option<AgentHookMut<RV, V>>,
    pub(crate) agent_behaviour: HashMap<String, AgentHookMut<RV, V>>,
    pub(crate) teardown_agent_fn: Option<AgentHookMut<RV, V>>,
    pub(crate) teardown_fn: Option<GlobalHook<RV>>,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinitionBuilder<RV, V> {
    /// Initialise a new scenario definition from the scenario name and parsed command line.
    pub fn new(name: &str, cli: ScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            default_agents: None,
            default_duration_s: None,
            slo_targets: None,
            runner_value: Default::default(),
            setup_fn: None,
            setup_agent_fn: None,
            agent_behaviour: HashMap::new(),
            teardown_agent_fn: None,
            teardown_fn: None,
        }
    }

    /// Number of agents to run when `--agents` is not given on the command line.
    pub fn with_default_agents(mut self, agents: usize) -> Self {
        self.default_agents = Some(agents);
        self
    }

    /// Run duration when `--duration` is not given on the command line.
    pub fn with_default_duration_s(mut self, duration_s: u64) -> Self {
        self.default_duration_s = Some(duration_s);
        self
    }

    /// Thresholds for the pass/fail verdict over the measured phase.
    pub fn with_slo_targets(mut self, targets: SloTargets) -> Self {
        self.slo_targets = Some(targets);
        self
    }

    /// Seed the runner context with an explicitly constructed value instead of `RV::default()`.
    ///
    /// This is how run configuration resolved in `main` travels into hooks without any global
    /// lookup: construct it once, hand it to the builder, read it from the context.
    pub fn with_runner_value(mut self, value: RV) -> Self {
        self.runner_value = value;
        self
    }

    /// Set the global setup hook for this scenario.
    pub fn use_setup(mut self, setup_fn: GlobalHookMut<RV>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Set the agent setup hook for this scenario.
    pub fn use_agent_setup(mut self, setup_agent_fn: AgentHookMut<RV, V>) -> Self {
        self.setup_agent_fn = Some(setup_agent_fn);
        self
    }

    /// Set the default agent behaviour hook for this scenario.
    pub fn use_agent_behaviour(self, behaviour: AgentHookMut<RV, V>) -> Self {
        self.use_named_agent_behaviour("default", behaviour)
    }

    /// Set a named agent behaviour hook for this scenario.
    pub fn use_named_agent_behaviour(mut self, name: &str, behaviour: AgentHookMut<RV, V>) -> Self {
        let previous = self.agent_behaviour.insert(name.to_string(), behaviour);

        if previous.is_some() {
            panic!("Behaviour [{}] is already defined", name);
        }

        self
    }

    /// Set the agent teardown hook for this scenario.
    pub fn use_agent_teardown(mut self, teardown_agent_fn: AgentHookMut<RV, V>) -> Self {
        self.teardown_agent_fn = Some(teardown_agent_fn);
        self
    }

    /// Set the global teardown hook for this scenario.
    pub fn use_teardown(mut self, teardown_fn: GlobalHook<RV>) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition<RV, V>> {
        let agents = self.cli.agents.or(self.default_agents).unwrap_or(1);
        anyhow::ensure!(agents > 0, "At least one agent is required");

        let mut assigned_behaviours: Vec<String> = Vec::with_capacity(agents);
        for (name, count) in &self.cli.behaviour {
            anyhow::ensure!(
                self.agent_behaviour.contains_key(name),
                "Behaviour [{}] is not defined by this scenario",
                name
            );
            for _ in 0..*count {
                assigned_behaviours.push(name.clone());
            }
        }
        anyhow::ensure!(
            assigned_behaviours.len() <= agents,
            "Assigned {} agents to behaviours but the scenario only has {} agents",
            assigned_behaviours.len(),
            agents
        );
        assigned_behaviours.resize(agents, "default".to_string());

        let duration_s = if self.cli.soak {
            None
        } else {
            self.cli.duration.or(self.default_duration_s)
        };

        let run_id = self
            .cli
            .run_id
            .clone()
            .unwrap_or_else(|| nanoid::nanoid!(8));

        Ok(ScenarioDefinition {
            name: self.name,
            run_id,
            duration_s,
            no_progress: self.cli.no_progress,
            reporter: self.cli.reporter,
            slo_targets: self.slo_targets,
            runner_value: self.runner_value,
            assigned_behaviours,
            setup_fn: self.setup_fn,
            setup_agent_fn: self.setup_agent_fn,
            agent_behaviour: self.agent_behaviour,
            teardown_agent_fn: self.teardown_agent_fn,
            teardown_fn: self.teardown_fn,
        })
    }
}
