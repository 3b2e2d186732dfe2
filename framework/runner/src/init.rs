use crate::cli::ScenarioCli;
use clap::Parser;

/// Initialise logging and parse the scenario command line.
///
/// Call this first in a scenario `main` and pass the result to
/// [crate::definition::ScenarioDefinitionBuilder::new].
pub fn init() -> ScenarioCli {
    env_logger::init();

    ScenarioCli::parse()
}
