use clap::{Parser, Subcommand};

/// CarbonCue CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "carboncue",
    version,
    about = "Grid carbon intensity for cloud regions and SCI scoring"
)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Current carbon intensity for a cloud region
    Check {
        /// Cloud region code (defaults to CARBONCUE_DEFAULT_REGION)
        #[arg(long, short)]
        region: Option<String>,

        /// Cloud provider: aws, azure, gcp, digitalocean
        #[arg(long, short)]
        provider: Option<String>,
    },

    /// Software Carbon Intensity score: (operational + embodied) / functional unit
    Sci {
        /// Operational emissions in gCO2eq
        #[arg(long)]
        operational: f64,

        /// Embodied emissions in gCO2eq
        #[arg(long)]
        embodied: f64,

        /// Functional unit count, must be > 0
        #[arg(long)]
        functional_unit: f64,

        /// Label for the functional unit
        #[arg(long, default_value = "requests")]
        functional_unit_type: String,

        /// Region label attached to the score
        #[arg(long, default_value = "")]
        region: String,
    },

    /// Print the resolved configuration
    Config,

    /// List supported regions and their grid zones
    Regions {
        /// Only list this provider
        #[arg(long, short)]
        provider: Option<String>,
    },
}
