use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use serverless_cost::config::{self, Config};
use serverless_cost::fetcher::{HttpPriceTableFetcher, HttpSpotPriceFetcher};
use serverless_cost::region::{RegionDirectory, SsmRegionDirectory};
use serverless_cost::utils::format_seconds;
use serverless_cost::{
    report, ContainerBilling, ContainerUsage, FargatePriceCalculator, FunctionUsage,
    LambdaPriceCalculator, OsType, ProvisionedConcurrency,
};

#[derive(Parser)]
#[command(name = "serverless-cost")]
#[command(
    about = "Cost estimates for AWS Fargate and AWS Lambda",
    long_about = "serverless-cost prices serverless workloads from the live AWS price lists.\n\nSupports:\n  - Fargate on-demand and Spot, with Spot savings per component\n  - Lambda invocations, provisioned concurrency and Lambda@Edge\n  - Free tier allowances"
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

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List AWS region codes and names
    Regions,
    /// Price AWS Fargate tasks
    Fargate {
        #[command(subcommand)]
        subcommand: FargateCommands,
    },
    /// Price AWS Lambda functions
    Lambda {
        #[command(subcommand)]
        subcommand: LambdaCommands,
    },
    /// Initialize configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = ".serverless-cost.toml")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
enum FargateCommands {
    /// Show supported task sizes
    Options,
    /// Cost of running a task
    Cost {
        #[command(flatten)]
        task: FargateArgs,
        /// Price on Fargate Spot instead of on-demand
        #[arg(long)]
        spot: bool,
    },
    /// Percentage saved by Spot against on-demand
    Savings {
        #[command(flatten)]
        task: FargateArgs,
    },
}

#[derive(Args)]
struct FargateArgs {
    /// Region code (defaults to the configured region)
    #[arg(long)]
    region: Option<String>,
    #[arg(long, value_enum, default_value = "linux-x86")]
    os: OsType,
    #[arg(long)]
    vcpu: Decimal,
    /// Memory in GB
    #[arg(long)]
    memory: Decimal,
    /// Ephemeral storage in GB
    #[arg(long, default_value = "20")]
    storage: Decimal,
    /// Run time in seconds
    #[arg(long)]
    duration: Decimal,
    /// Apply the free ephemeral storage allowance
    #[arg(long)]
    free_tier: bool,
}

impl FargateArgs {
    fn usage(&self) -> ContainerUsage {
        ContainerUsage {
            os_type: self.os,
            vcpu: self.vcpu,
            memory_gb: self.memory,
            storage_gb: self.storage,
            duration_seconds: self.duration,
            free_tier: self.free_tier,
        }
    }
}

#[derive(Subcommand)]
enum LambdaCommands {
    /// Show supported memory sizes and architectures
    Options,
    /// Cost of on-demand invocations
    Cost {
        #[command(flatten)]
        function: LambdaArgs,
    },
    /// Cost of invocations with provisioned concurrency
    Concurrent {
        #[command(flatten)]
        function: LambdaArgs,
        /// Number of provisioned execution environments
        #[arg(long)]
        concurrency: u64,
        /// Seconds provisioned concurrency stays enabled
        #[arg(long)]
        concurrency_window: Decimal,
    },
    /// Cost of Lambda@Edge invocations
    Edge {
        #[arg(long)]
        region: Option<String>,
        /// Memory in GB
        #[arg(long)]
        memory: Decimal,
        /// Run time of one invocation in seconds
        #[arg(long)]
        duration: Decimal,
        #[arg(long)]
        requests: u64,
    },
}

#[derive(Args)]
struct LambdaArgs {
    /// Region code (defaults to the configured region)
    #[arg(long)]
    region: Option<String>,
    #[arg(long, value_enum, default_value = "linux-x86")]
    os: OsType,
    /// Memory in GB
    #[arg(long)]
    memory: Decimal,
    /// Run time of one invocation in seconds
    #[arg(long)]
    duration: Decimal,
    #[arg(long)]
    requests: u64,
    /// Apply the monthly free requests and compute allowance
    #[arg(long)]
    free_tier: bool,
}

impl LambdaArgs {
    fn usage(&self) -> FunctionUsage {
        FunctionUsage {
            os_type: self.os,
            memory_gb: self.memory,
            duration_seconds: self.duration,
            requests: self.requests,
            free_tier: self.free_tier,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging - only warnings and errors unless verbose
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Regions => {
            let directory = SsmRegionDirectory::from_config(&config.aws).await;
            let spinner = spinner("Fetching regions...");
            let regions = directory.list_regions().await;
            spinner.finish_and_clear();
            let regions = regions?;
            emit(cli.output, &regions, || report::regions_table(&regions))?;
        }
        Commands::Fargate { subcommand } => {
            handle_fargate(subcommand, &config, cli.output).await?;
        }
        Commands::Lambda { subcommand } => {
            handle_lambda(subcommand, &config, cli.output).await?;
        }
        Commands::Init { output } => {
            config::init_config(&output)?;
        }
    }

    Ok(())
}

async fn handle_fargate(cmd: FargateCommands, config: &Config, output: OutputFormat) -> Result<()> {
    match cmd {
        FargateCommands::Options => {
            println!("{}", report::fargate_options_table());
        }
        FargateCommands::Cost { task, spot } => {
            let calculator = fargate_calculator(config, task.region.as_deref()).await?;
            let billing = if spot {
                ContainerBilling::Spot
            } else {
                ContainerBilling::OnDemand
            };
            let cost = calculator.calculate_cost(&task.usage(), billing)?;
            if output == OutputFormat::Text {
                println!(
                    "Fargate {:?} in {} ({}) for {}",
                    billing,
                    calculator.region_code(),
                    calculator.region_name(),
                    format_seconds(task.duration)
                );
            }
            emit(output, &cost, || {
                report::cost_table(&cost.components(), cost.total_cost)
            })?;
        }
        FargateCommands::Savings { task } => {
            let calculator = fargate_calculator(config, task.region.as_deref()).await?;
            let savings = calculator.calculate_savings(&task.usage())?;
            if output == OutputFormat::Text {
                println!(
                    "Fargate Spot savings in {} ({}), spot prices as of {}",
                    calculator.region_code(),
                    calculator.region_name(),
                    calculator
                        .spot_snapshot()
                        .fetched_at
                        .format("%Y-%m-%d %H:%M:%S UTC")
                );
            }
            emit(output, &savings, || report::savings_table(&savings))?;
        }
    }
    Ok(())
}

async fn handle_lambda(cmd: LambdaCommands, config: &Config, output: OutputFormat) -> Result<()> {
    match cmd {
        LambdaCommands::Options => {
            println!("{}", report::lambda_options_table());
        }
        LambdaCommands::Cost { function } => {
            let calculator = lambda_calculator(config, function.region.as_deref()).await?;
            let cost = calculator.calculate_simple_cost(&function.usage())?;
            emit(output, &cost, || {
                report::cost_table(&cost.components(), cost.total_cost)
            })?;
        }
        LambdaCommands::Concurrent {
            function,
            concurrency,
            concurrency_window,
        } => {
            let calculator = lambda_calculator(config, function.region.as_deref()).await?;
            let provisioned = ProvisionedConcurrency {
                concurrency,
                window_seconds: concurrency_window,
            };
            let cost = calculator.calculate_concurrent_cost(&function.usage(), &provisioned)?;
            emit(output, &cost, || {
                report::cost_table(&cost.components(), cost.total_cost)
            })?;
        }
        LambdaCommands::Edge {
            region,
            memory,
            duration,
            requests,
        } => {
            let calculator = lambda_calculator(config, region.as_deref()).await?;
            let cost = calculator.calculate_edge_cost(memory, duration, requests)?;
            emit(output, &cost, || {
                report::cost_table(&cost.components(), cost.total_cost)
            })?;
        }
    }
    Ok(())
}

async fn fargate_calculator(config: &Config, region: Option<&str>) -> Result<FargatePriceCalculator> {
    let region = region.unwrap_or(config.aws.region.as_str());
    let directory = SsmRegionDirectory::from_config(&config.aws).await;
    let prices = HttpPriceTableFetcher::new(&config.pricing)?;
    let spot = HttpSpotPriceFetcher::new(&config.pricing)?;

    let spinner = spinner("Fetching Fargate prices...");
    let calculator = FargatePriceCalculator::new(region, &directory, &prices, &spot).await;
    spinner.finish_and_clear();
    calculator.with_context(|| format!("Failed to load Fargate prices for {}", region))
}

async fn lambda_calculator(config: &Config, region: Option<&str>) -> Result<LambdaPriceCalculator> {
    let region = region.unwrap_or(config.aws.region.as_str());
    let directory = SsmRegionDirectory::from_config(&config.aws).await;
    let prices = HttpPriceTableFetcher::new(&config.pricing)?;

    let spinner = spinner("Fetching Lambda prices...");
    let calculator = LambdaPriceCalculator::new(region, &directory, &prices).await;
    spinner.finish_and_clear();
    calculator.with_context(|| format!("Failed to load Lambda prices for {}", region))
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn emit<T: Serialize>(output: OutputFormat, value: &T, table: impl FnOnce() -> Table) -> Result<()> {
    match output {
        OutputFormat::Text => println!("{}", table()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
