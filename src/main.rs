use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use stackcost::analyzer::CostAnalyzer;
use stackcost::config::{self, Config};
use stackcost::pricing::cache::PriceCache;
use stackcost::pricing::client::PriceListClient;
use stackcost::pricing::pricer::ResourcePricer;
use stackcost::pricing::{PricingSource, StaticPricingSource};
use stackcost::render::print_analysis;
use stackcost::usage::UsageProfile;

#[derive(Parser)]
#[command(name = "stackcost")]
#[command(
    about = "Estimate the monthly AWS cost of an infrastructure template",
    long_about = "stackcost estimates what a CloudFormation-style template will cost per month\nbefore you deploy it, scaled by an expected usage profile.\n\nSupports:\n  - JSON and YAML templates\n  - Usage profiles from proof-of-concept (minimal) to enterprise (heavy)\n  - Live AWS Price List rates with a persistent on-disk cache\n  - A template-free baseline estimate for freshly bootstrapped accounts"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a template's estimated monthly cost
    Analyze {
        /// Template file (JSON or YAML)
        template: PathBuf,
        /// Expected usage profile
        #[arg(short, long)]
        profile: Option<UsageProfile>,
        /// AWS region code
        #[arg(short, long)]
        region: Option<String>,
        /// Use the built-in rate table instead of the Price List feed
        #[arg(long)]
        offline: bool,
    },
    /// Baseline cost estimate for bootstrapped accounts (no template needed)
    Bootstrap {
        /// Number of managed accounts
        #[arg(long, default_value = "1")]
        accounts: u32,
        /// Expected usage profile
        #[arg(short, long)]
        profile: Option<UsageProfile>,
        /// AWS region code
        #[arg(short, long)]
        region: Option<String>,
        /// Use the built-in rate table instead of the Price List feed
        #[arg(long)]
        offline: bool,
    },
    /// Manage the price cache
    Cache {
        #[command(subcommand)]
        subcommand: CacheCommands,
    },
    /// Initialize configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = ".stackcost.toml")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Remove all cached prices
    Clear,
}

fn build_analyzer(config: &Config, region: &str, offline: bool) -> Result<CostAnalyzer> {
    let cache = PriceCache::new(config.cache_dir(), config.cache_ttl());
    let source: Box<dyn PricingSource> = if offline || config.analysis.offline {
        Box::new(StaticPricingSource::builtin(region))
    } else {
        Box::new(PriceListClient::new()?)
    };
    Ok(CostAnalyzer::new(ResourcePricer::new(source, cache)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Suppress INFO by default, only show warnings and errors
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            template,
            profile,
            region,
            offline,
        } => {
            let region = region.unwrap_or_else(|| config.analysis.default_region.clone());
            let profile = profile
                .unwrap_or_else(|| UsageProfile::parse_lossy(&config.analysis.default_profile));
            let content = std::fs::read_to_string(&template)?;
            let analyzer = build_analyzer(&config, &region, offline)?;
            let analysis = analyzer.analyze_template(&content, profile, &region).await?;
            print_analysis(&analysis, &cli.output)?;
        }
        Commands::Bootstrap {
            accounts,
            profile,
            region,
            offline,
        } => {
            let region = region.unwrap_or_else(|| config.analysis.default_region.clone());
            let profile = profile
                .unwrap_or_else(|| UsageProfile::parse_lossy(&config.analysis.default_profile));
            let analyzer = build_analyzer(&config, &region, offline)?;
            let analysis = analyzer
                .analyze_bootstrap_only(profile, &region, accounts)
                .await?;
            print_analysis(&analysis, &cli.output)?;
        }
        Commands::Cache { subcommand } => match subcommand {
            CacheCommands::Clear => {
                let cache = PriceCache::new(config.cache_dir(), config.cache_ttl());
                cache.clear()?;
                println!("Price cache cleared");
            }
        },
        Commands::Init { output } => {
            config::init_config(&output)?;
        }
    }

    Ok(())
}
