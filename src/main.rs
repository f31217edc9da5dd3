use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use capacity_oracle::check::{evaluate_checks, CheckError, CheckReport, CheckThresholds, EXIT_ERROR};
use capacity_oracle::config::{Config, ConfigOverrides, LogFormat};
use capacity_oracle::infrastructure::{load_inventory, HostOverride, InfrastructureAggregate};
use capacity_oracle::optimizer::sizing::sizing_options;
use capacity_oracle::optimizer::upgrades::build_recommendations;
use capacity_oracle::optimizer::RecommendationReport;
use capacity_oracle::output::csv::{
    comparison_to_csv, plans_to_csv, recommendations_to_csv, warnings_to_csv,
};
use capacity_oracle::output::json::render_json;
use capacity_oracle::output::table::{
    render_check_report, render_comparison_table, render_infrastructure_table, render_plan_table,
    render_ranking_table, render_recommendations_table,
};
use capacity_oracle::scenario::{
    AdditionalWorkload, CellConfig, PlanResult, Resource, ScenarioComparison,
};
use capacity_oracle::server::run_server;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "capacity-oracle",
    about = "What-if capacity planning for cell-based compute clusters"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Inventory file (JSON or TOML).
    #[arg(short, long)]
    inventory: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[arg(long = "overhead-pct")]
    overhead_pct: Option<f64>,
    #[arg(long = "vcpu-ratio")]
    target_vcpu_ratio: Option<f64>,
    #[command(subcommand)]
    command: Commands,
}

/// Proposed cell shape; omitted fields keep the deployed value.
#[derive(Debug, clap::Args, Clone, Default)]
struct CellArgs {
    #[arg(long = "cell-cpu")]
    cpu: Option<u32>,
    #[arg(long = "cell-memory")]
    memory_gb: Option<u32>,
    #[arg(long = "cell-disk")]
    disk_gb: Option<u32>,
    #[arg(long = "cells")]
    count: Option<u32>,
}

impl CellArgs {
    fn resolve(&self, current: CellConfig) -> CellConfig {
        CellConfig {
            cpu: self.cpu.unwrap_or(current.cpu),
            memory_gb: self.memory_gb.unwrap_or(current.memory_gb),
            disk_gb: self.disk_gb.unwrap_or(current.disk_gb),
            count: self.count.unwrap_or(current.count),
        }
    }
}

#[derive(Debug, clap::Args, Clone, Default)]
struct WorkloadArgs {
    #[arg(long = "workload-name", default_value = "additional")]
    name: String,
    #[arg(long = "workload-instances")]
    instances: Option<u32>,
    /// Memory per instance in GB.
    #[arg(long = "workload-memory")]
    memory_gb: Option<u32>,
    #[arg(long = "workload-disk")]
    disk_gb: Option<u32>,
}

impl WorkloadArgs {
    fn resolve(&self) -> Option<AdditionalWorkload> {
        let instances = self.instances?;
        Some(AdditionalWorkload {
            name: self.name.clone(),
            instances,
            memory_gb: self.memory_gb.unwrap_or(0),
            disk_gb: self.disk_gb.unwrap_or(0),
        })
    }
}

#[derive(Debug, clap::Args, Clone, Default)]
struct HostArgs {
    #[arg(long = "hosts")]
    host_count: Option<u32>,
    #[arg(long = "host-memory")]
    memory_gb_per_host: Option<u64>,
    #[arg(long = "host-cores")]
    cpu_cores_per_host: Option<u32>,
}

impl From<HostArgs> for HostOverride {
    fn from(value: HostArgs) -> Self {
        Self {
            host_count: value.host_count,
            memory_gb_per_host: value.memory_gb_per_host,
            cpu_cores_per_host: value.cpu_cores_per_host,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compare the deployed cell layout against a proposed one.
    Compare {
        #[command(flatten)]
        cell: CellArgs,
        #[arg(long = "ha-pct")]
        ha_admission_pct: Option<f64>,
        /// Comma-separated: memory,cpu,disk
        #[arg(long)]
        resources: Option<String>,
        #[arg(long = "no-throughput")]
        no_throughput: bool,
        #[command(flatten)]
        workload: WorkloadArgs,
        #[command(flatten)]
        hosts: HostArgs,
    },
    /// How many cells of a shape fit; every sizing preset when no shape is given.
    Plan {
        #[arg(long = "cell-cpu", requires = "memory_gb")]
        cpu: Option<u32>,
        #[arg(long = "cell-memory", requires = "cpu")]
        memory_gb: Option<u32>,
        #[arg(long = "cell-disk")]
        disk_gb: Option<u32>,
    },
    /// Exit non-zero when the deployed layout exceeds capacity thresholds.
    Check {
        #[arg(long = "n1-threshold", default_value_t = 85.0)]
        n1_threshold: f64,
        #[arg(long = "memory-threshold", default_value_t = 90.0)]
        memory_threshold: f64,
    },
    /// Rank resource utilization and suggest upgrade paths.
    Recommend,
    /// Print the aggregated inventory.
    Inventory,
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(config_path.as_path()))?;
    config.apply_overrides(ConfigOverrides {
        inventory_path: cli.inventory.clone(),
        overhead_pct: cli.overhead_pct,
        target_vcpu_ratio: cli.target_vcpu_ratio,
    });
    init_tracing(config.logging.format);

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if let Commands::Serve { host, port } = &cli.command {
        let host = host.clone().unwrap_or_else(|| config.server.host.clone());
        let port = port.unwrap_or(config.server.port);
        let bind = format!("{host}:{port}");
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }
    if let Commands::Check {
        n1_threshold,
        memory_threshold,
    } = &cli.command
    {
        let thresholds = CheckThresholds {
            n1_pct: *n1_threshold,
            memory_pct: *memory_threshold,
        };
        let code = match run_check(&config, &thresholds) {
            Ok(report) => {
                print_check(&report, cli.output)?;
                report.exit_code()
            }
            Err(err) => {
                eprintln!("error: {err:#}");
                EXIT_ERROR
            }
        };
        std::process::exit(code);
    }

    let infra = load_aggregate(&config)?;
    let engine = config.scenario_engine();

    match &cli.command {
        Commands::Compare {
            cell,
            ha_admission_pct,
            resources,
            no_throughput,
            workload,
            hosts,
        } => {
            let mut input = config.scenario_input(cell.resolve(infra.cell));
            if let Some(pct) = ha_admission_pct {
                input = input.with_ha_admission_pct(*pct);
            }
            if let Some(raw) = resources {
                input = input.with_resources(parse_resource_list(raw)?);
            }
            if *no_throughput {
                input = input.with_throughput_enabled(false);
            }
            if let Some(workload) = workload.resolve() {
                input = input.with_workload(workload);
            }
            let hosts = HostOverride::from(hosts.clone());
            if !hosts.is_empty() {
                input = input.with_hosts(hosts);
            }
            let result = engine.compare(&infra, &input)?;
            print_comparison(&result, cli.output)?;
        }
        Commands::Plan {
            cpu,
            memory_gb,
            disk_gb,
        } => {
            let ratio = config.engine.target_vcpu_ratio;
            let plans = match (cpu, memory_gb) {
                (Some(cpu), Some(memory_gb)) => {
                    let cell = CellConfig::new(
                        *cpu,
                        *memory_gb,
                        disk_gb.unwrap_or(infra.cell.disk_gb),
                        0,
                    );
                    vec![engine.plan(&infra, &cell, ratio)?]
                }
                _ => sizing_options(&engine, &infra, ratio)?,
            };
            print_plans(&plans, cli.output)?;
        }
        Commands::Recommend => {
            let report = build_recommendations(&infra, &config.upgrade_targets());
            print_recommendations(&report, cli.output)?;
        }
        Commands::Inventory => match cli.output {
            OutputFormat::Table => println!("{}", render_infrastructure_table(&infra)),
            OutputFormat::Json => println!("{}", render_json(&infra)?),
            OutputFormat::Csv => {
                warn!("CSV output for inventory not implemented, using JSON");
                println!("{}", render_json(&infra)?);
            }
        },
        Commands::Check { .. } => unreachable!("check command handled before dispatch"),
        Commands::Config { .. } => {}
        Commands::Serve { .. } => unreachable!("serve command handled before dispatch"),
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &Path) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn load_aggregate(config: &Config) -> Result<InfrastructureAggregate> {
    let path = config
        .resolved_inventory_path()
        .ok_or(CheckError::NoInventory)?;
    let inventory = load_inventory(&path)?;
    let infra = InfrastructureAggregate::from_inventory(&inventory);
    info!(
        path = %path.display(),
        hosts = infra.total_hosts,
        cells = infra.cell.count,
        "loaded inventory"
    );
    Ok(infra)
}

fn run_check(config: &Config, thresholds: &CheckThresholds) -> Result<CheckReport> {
    thresholds.validate()?;
    let infra = load_aggregate(config)?;
    let input = config.scenario_input(infra.cell);
    let result = config.scenario_engine().compare(&infra, &input)?;
    Ok(evaluate_checks(&result.current, thresholds))
}

fn parse_resource_list(raw: &str) -> Result<Vec<Resource>> {
    let mut out = Vec::new();
    for piece in raw.split(',') {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.push(Resource::from_str(trimmed)?);
    }
    if out.is_empty() {
        return Err(anyhow!("resource filter is empty"));
    }
    out.sort();
    out.dedup();
    Ok(out)
}

fn print_comparison(result: &ScenarioComparison, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_comparison_table(result)),
        OutputFormat::Json => println!("{}", render_json(result)?),
        OutputFormat::Csv => {
            println!("{}", comparison_to_csv(result)?);
            println!("{}", warnings_to_csv(&result.warnings)?);
        }
    }
    Ok(())
}

fn print_plans(plans: &[PlanResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_plan_table(plans)),
        OutputFormat::Json => println!("{}", render_json(plans)?),
        OutputFormat::Csv => println!("{}", plans_to_csv(plans)?),
    }
    Ok(())
}

fn print_recommendations(report: &RecommendationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", render_ranking_table(&report.ranking));
            println!("{}", render_recommendations_table(&report.recommendations));
        }
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => println!("{}", recommendations_to_csv(&report.recommendations)?),
    }
    Ok(())
}

fn print_check(report: &CheckReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_check_report(report)),
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => {
            warn!("CSV output for check not implemented, using JSON");
            println!("{}", render_json(report)?);
        }
    }
    Ok(())
}
