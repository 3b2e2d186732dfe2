/// Return this error from an agent's behaviour function to stop that agent.
///
/// Use this when an agent hits a problem that makes its own traffic meaningless but does not
/// invalidate the rest of the run. The remaining agents keep generating load and the scenario
/// completes normally with one fewer agent.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct AgentBailError {
    msg: String,
}

impl AgentBailError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl Default for AgentBailError {
    fn default() -> Self {
        Self {
            msg: "Agent is bailing".to_string(),
        }
    }
}
