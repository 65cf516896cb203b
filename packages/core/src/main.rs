use clap::Parser;
use dotenvy::dotenv;

use carboncue::cli::{Cli, Command};
use carboncue::config::CarbonConfig;
use carboncue::error::Result;
use carboncue::logging::init_logging;
use carboncue::models::{CarbonIntensity, SciScore};
use carboncue::region::{CloudProvider, RegionMapper};
use carboncue::CarbonClient;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::error!("{}", err);
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = CarbonConfig::from_env()?;

    match cli.command {
        Command::Check { region, provider } => {
            let region = region.unwrap_or_else(|| config.default_region().to_string());
            let provider = provider.unwrap_or_else(|| config.default_provider().to_string());

            let mut client = CarbonClient::new(config)?;
            client.open()?;
            let result = client.get_current_intensity(&region, &provider).await;
            client.close();

            let intensity = result?;
            if cli.json {
                print_json(&intensity)?;
            } else {
                print_intensity(&intensity, &provider);
            }
        }

        Command::Sci {
            operational,
            embodied,
            functional_unit,
            functional_unit_type,
            region,
        } => {
            let client = CarbonClient::new(config)?;
            let score = client.calculate_sci(
                operational,
                embodied,
                functional_unit,
                &functional_unit_type,
                &region,
            )?;
            if cli.json {
                print_json(&score)?;
            } else {
                print_score(&score);
            }
        }

        Command::Config => {
            if cli.json {
                print_json(&config)?;
            } else {
                println!("api_key:                 {}", if config.api_key().is_some() { "*** (set)" } else { "(not set)" });
                println!("base_url:                {}", config.base_url());
                println!("default_region:          {}", config.default_region());
                println!("default_provider:        {}", config.default_provider());
                println!("request_timeout_seconds: {}", config.request_timeout_seconds());
                println!("max_retries:             {}", config.max_retries());
                println!("cache_ttl_seconds:       {}", config.cache_ttl_seconds());
                println!("caching_enabled:         {}", config.caching_enabled());
            }
        }

        Command::Regions { provider } => {
            let providers = match provider {
                Some(name) => vec![name.parse::<CloudProvider>()?],
                None => CloudProvider::ALL.to_vec(),
            };
            for provider in providers {
                println!("{}:", provider);
                for (region, zone) in RegionMapper::all_mappings(provider) {
                    println!("  {:<26} {}", region, zone);
                }
            }
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

fn print_intensity(intensity: &CarbonIntensity, provider: &str) {
    println!("Region:           {} ({})", intensity.region(), provider.to_ascii_lowercase());
    println!("Grid zone:        {}", intensity.grid_zone());
    println!("Carbon intensity: {:.1} gCO2eq/kWh", intensity.carbon_intensity());
    if let Some(pct) = intensity.renewable_percentage() {
        println!("Renewable:        {:.1}%", pct);
    }
    if let Some(pct) = intensity.fossil_fuel_percentage() {
        println!("Fossil fuel:      {:.1}%", pct);
    }
    println!("Source:           {}", intensity.source());
    println!("Timestamp:        {}", intensity.timestamp().to_rfc3339());
}

fn print_score(score: &SciScore) {
    println!("SCI score:             {:.6} gCO2eq per {}", score.score(), score.functional_unit_type());
    println!("Operational emissions: {} gCO2eq", score.operational_emissions());
    println!("Embodied emissions:    {} gCO2eq", score.embodied_emissions());
    println!("Functional unit:       {} {}", score.functional_unit(), score.functional_unit_type());
    if !score.region().is_empty() {
        println!("Region:                {}", score.region());
    }
}

