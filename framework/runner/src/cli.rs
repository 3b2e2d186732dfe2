use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct ScenarioCli {
    /// The number of agents to run. Defaults to the scenario's configured concurrency.
    #[clap(long)]
    pub agents: Option<usize>,

    /// Assign a behaviour to a number of agents, in the format `behaviour:count`. For example
    /// `--behaviour=heavy_writer:5`.
    ///
    /// The count is optional and defaults to 1. The flag can be repeated for multiple
    /// behaviours. The total number of agents assigned this way must not exceed the total
    /// number of agents for the scenario; any remaining agents run the default behaviour.
    #[clap(long, short, value_parser = parse_agent_behaviour)]
    pub behaviour: Vec<(String, usize)>,

    /// The number of seconds to run the scenario for. Defaults to the scenario's configured
    /// duration.
    #[clap(long)]
    pub duration: Option<u64>,

    /// Run as a soak test: ignore any configured duration and keep running until stopped.
    #[clap(long, default_value = "false")]
    pub soak: bool,

    /// Do not show a progress bar.
    ///
    /// Recommended for CI environments where the bar only adds noise to the captured logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Where request records go during the run.
    #[clap(long, value_enum, default_value = "in-memory")]
    pub reporter: ReporterOpt,

    /// Identifier attached to every record from this run. Generated when not provided.
    #[clap(long)]
    pub run_id: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReporterOpt {
    /// Keep records in memory and print summary tables at the end of the run.
    #[default]
    InMemory,
    /// Discard records. The SLO verdict is still computed.
    Noop,
    /// Ship records to InfluxDB. Requires `INFLUX_HOST`, `INFLUX_BUCKET` and `INFLUX_TOKEN`.
    Influx,
}

fn parse_agent_behaviour(s: &str) -> anyhow::Result<(String, usize)> {
    let mut parts = s.split(':');
    let name = parts
        .next()
        .filter(|name| !name.is_empty())
        .map(|s| s.to_string())
        .ok_or(anyhow::anyhow!("No name specified for behaviour"))?;

    let count = parts.next().and_then(|s| s.parse::<usize>().ok()).unwrap_or(1);

    Ok((name, count))
}
