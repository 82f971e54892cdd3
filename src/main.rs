use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use wave_planner::error::{AppError, PlanError};
use wave_planner::fairness::TieBreak;
use wave_planner::finalize::{
    self, FinalizeSettings, Finalized, JsonFileSink, LogNotifier, PublishReport,
};
use wave_planner::http::{HttpPlanningClient, HttpPlanningConfig};
use wave_planner::model::{DriverId, RouteId};
use wave_planner::scoring;
use wave_planner::snapshot::{JsonFileSource, PlanningSnapshot};
use wave_planner::solver::{self, CycleReport, DriverSource, PlannerOptions};
use wave_planner::telemetry;
use wave_planner::traits::{PlanSink, SnapshotSource};

#[derive(Parser, Debug)]
#[command(
    name = "wave-planner",
    about = "Allocate driver pools and assign drivers and vehicles to a wave of routes",
    version
)]
struct Cli {
    /// Log level or filter used when RUST_LOG is unset
    #[arg(long, global = true, env = "WAVE_PLANNER_LOG_LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a planning cycle and print the resulting wave plan
    Plan(PlanArgs),
    /// Explain the DEP score of one driver for one route
    Score(ScoreArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Planning snapshot JSON file (takes precedence over --url)
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Base URL of the planning backend
    #[arg(long, env = "WAVE_PLANNER_URL")]
    url: Option<String>,
    /// Tenant whose snapshot is fetched from the backend
    #[arg(long, env = "WAVE_PLANNER_TENANT", default_value = "default")]
    tenant: String,
    /// Backend request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Also assign drivers and vehicles to routes after pool allocation
    #[arg(long)]
    auto_assign: bool,
    #[arg(long, value_enum, default_value_t = TieBreakArg::InputOrder)]
    tie_break: TieBreakArg,
    #[arg(long, value_enum, default_value_t = DriverSourceArg::FullRoster)]
    driver_source: DriverSourceArg,
    /// Ignore a route's vehicle when scoring drivers
    #[arg(long)]
    no_vehicle_scoring: bool,
    /// Write the finalized plan to this file; stdout then only gets the cycle report
    #[arg(long)]
    output: Option<PathBuf>,
    /// Post the plan back to the backend (requires --url)
    #[arg(long)]
    publish: bool,
    #[arg(long)]
    no_route_notices: bool,
    #[arg(long)]
    no_standby_notices: bool,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long)]
    driver: String,
    #[arg(long)]
    route: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TieBreakArg {
    InputOrder,
    DriverId,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DriverSourceArg {
    FullRoster,
    PoolMembers,
}

#[derive(Debug, Serialize)]
struct PlanOutput<'a> {
    report: &'a CycleReport,
    #[serde(flatten)]
    finalized: &'a Finalized,
    #[serde(skip_serializing_if = "Option::is_none")]
    published: Option<PublishReport>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    telemetry::init(&cli.log_level)?;

    match cli.command {
        Command::Plan(args) => run_plan(args),
        Command::Score(args) => run_score(args),
    }
}

fn http_client(source: &SourceArgs) -> Result<Option<HttpPlanningClient>, AppError> {
    let Some(base_url) = &source.url else {
        return Ok(None);
    };
    let client = HttpPlanningClient::new(HttpPlanningConfig {
        base_url: base_url.clone(),
        tenant: source.tenant.clone(),
        timeout_secs: source.timeout_secs,
    })
    .map_err(|err| AppError::Snapshot(err.into()))?;
    Ok(Some(client))
}

fn load_snapshot(
    source: &SourceArgs,
    client: Option<&HttpPlanningClient>,
) -> Result<PlanningSnapshot, AppError> {
    if let Some(path) = &source.snapshot {
        return Ok(JsonFileSource::new(path).load()?);
    }
    match client {
        Some(client) => Ok(client.load()?),
        None => Err(AppError::Usage("either --snapshot or --url is required".into())),
    }
}

fn run_plan(args: PlanArgs) -> Result<(), AppError> {
    let client = http_client(&args.source)?;
    let snapshot = load_snapshot(&args.source, client.as_ref())?;

    let options = PlannerOptions {
        tie_break: match args.tie_break {
            TieBreakArg::InputOrder => TieBreak::InputOrder,
            TieBreakArg::DriverId => TieBreak::DriverId,
        },
        driver_source: match args.driver_source {
            DriverSourceArg::FullRoster => DriverSource::FullRoster,
            DriverSourceArg::PoolMembers => DriverSource::PoolMembers,
        },
        vehicle_aware_scoring: !args.no_vehicle_scoring,
    };

    let mut state = snapshot.into_state();
    let report = solver::run_cycle(&mut state, &options, args.auto_assign);
    let finalized = finalize::finalize_plan(
        &state,
        FinalizeSettings {
            notify_routes: !args.no_route_notices,
            notify_standby: !args.no_standby_notices,
        },
    );

    let published = if args.publish {
        let client = client
            .as_ref()
            .ok_or_else(|| AppError::Usage("--publish requires --url".into()))?;
        let delivery = finalize::publish(&finalized, client, &LogNotifier)
            .map_err(|err| AppError::Snapshot(err.into()))?;
        Some(delivery)
    } else {
        None
    };

    if let Some(path) = &args.output {
        JsonFileSink::new(path)
            .persist(&finalized.plan)
            .map_err(AppError::Export)?;
        info!(path = %path.display(), "wave plan written");
        return print_json(&report);
    }

    print_json(&PlanOutput {
        report: &report,
        finalized: &finalized,
        published,
    })
}

fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let client = http_client(&args.source)?;
    let state = load_snapshot(&args.source, client.as_ref())?.into_state();

    let driver_id = DriverId::new(args.driver);
    let route_id = RouteId::new(args.route);
    let driver = state
        .driver(&driver_id)
        .ok_or_else(|| PlanError::UnknownDriver(driver_id.clone()))?;
    let route = state
        .route(&route_id)
        .ok_or_else(|| PlanError::UnknownRoute(route_id.clone()))?;

    let breakdown = scoring::explain(driver, route, route.vehicle.as_ref());
    print_json(&breakdown)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let body = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Export(io::Error::from(err)))?;
    println!("{body}");
    Ok(())
}
