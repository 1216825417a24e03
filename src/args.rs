use clap::{Parser, Subcommand};

/// This is a program for election scenarios and forecast maps.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    /// (file path) A reference file containing the expected summary in JSON format. If provided, elforecast will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser, global = true)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified in the configuration.
    #[clap(short, long, value_parser, global = true)]
    pub out: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Projects a constituency from the votes of its blocs of voters.
    Project {
        /// (file path) The configuration of the projection.
        #[clap(short, long, value_parser)]
        config: String,
    },
    /// Applies new regional vote shares to a forecast run.
    Redistribute {
        /// (file path) The configuration of the scenario.
        #[clap(short, long, value_parser)]
        config: String,
    },
    /// Checks the regional adjustments of a scenario without running it.
    Validate {
        /// (file path) The configuration of the scenario.
        #[clap(short, long, value_parser)]
        config: String,
    },
    /// Builds the county map of a forecast run, with the gaps filled from the official run.
    Merge {
        /// (file path) The configuration of the runs.
        #[clap(short, long, value_parser)]
        config: String,
    },
}

impl Command {
    pub fn config(&self) -> &str {
        match self {
            Command::Project { config }
            | Command::Redistribute { config }
            | Command::Validate { config }
            | Command::Merge { config } => config.as_str(),
        }
    }
}
