//! Command-line front end: loads the feeds and configuration, replays
//! the rental log and prints the reports.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use fleet_core::billing::{BillingEngine, PricingConfig};
use fleet_core::faults::{register_declared_faults, FaultModel};
use fleet_core::feed::{load_rentals, load_vehicles};
use fleet_core::fleet::VehicleFleet;
use fleet_core::movement::{Pacing, PositionUpdate, RouteObserver};
use fleet_core::registry::RentalRegistry;
use fleet_core::reporting::{
    load_bills, DailyReport, LossAnalysis, RepairCostConfig, SummaryReport,
};
use fleet_core::scenario::SimulationParams;
use fleet_core::scheduler::SimulationScheduler;

#[derive(Debug, Parser)]
#[command(name = "fleet-sim", about = "Replay a shared-vehicle rental log")]
struct Args {
    /// Vehicle feed CSV.
    #[arg(long, env = "FLEET_VEHICLES")]
    vehicles: PathBuf,

    /// Rental feed CSV.
    #[arg(long, env = "FLEET_RENTALS")]
    rentals: PathBuf,

    /// Pricing properties file.
    #[arg(long, env = "FLEET_PRICING")]
    pricing: PathBuf,

    /// Repair coefficient properties file.
    #[arg(long, env = "FLEET_REPAIR_COSTS")]
    repair_costs: PathBuf,

    /// Directory bills are written to (must exist).
    #[arg(long, default_value = "bills")]
    bills_dir: PathBuf,

    /// Where to write the loss-analysis snapshot.
    #[arg(long, default_value = "losses.json")]
    loss_snapshot: PathBuf,

    /// Seed for the fault model; omit for a random run.
    #[arg(long)]
    seed: Option<u64>,

    /// Time scale for step pauses and throttling; 0 replays instantly.
    #[arg(long, default_value_t = 1.0)]
    pacing: f64,

    /// Cooldown between time groups, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    throttle_ms: u64,
}

/// Streams position updates to the log.
struct LogObserver;

impl RouteObserver for LogObserver {
    fn position_changed(&self, update: PositionUpdate) {
        info!(
            vehicle_id = %update.vehicle_id,
            cell = %update.cell,
            battery = update.battery_percent,
            status = ?update.status,
            "position"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    // Configuration failures are fatal: nothing can be priced without them.
    let pricing = PricingConfig::from_properties_file(&args.pricing)
        .context("loading pricing configuration")?;
    let repair_costs = RepairCostConfig::from_properties_file(&args.repair_costs)
        .context("loading repair cost configuration")?;

    let mut vehicles = load_vehicles(&args.vehicles).context("loading vehicle feed")?;
    let known: HashSet<String> = vehicles.iter().map(|v| v.id.clone()).collect();
    let mut registry: RentalRegistry =
        load_rentals(&args.rentals, &known).context("loading rental feed")?;
    info!(
        vehicles = vehicles.len(),
        rentals = registry.len(),
        "feeds loaded"
    );

    registry.assign_discounts();
    let mut fault_model = FaultModel::new(args.seed);
    register_declared_faults(&mut fault_model, &mut vehicles, &registry);

    let vehicle_index: std::collections::HashMap<_, _> = vehicles
        .iter()
        .map(|v| (v.id.clone(), v.clone()))
        .collect();
    let fleet = Arc::new(VehicleFleet::new(vehicles));
    let billing = Arc::new(BillingEngine::new(pricing, &args.bills_dir));
    let params = SimulationParams::default()
        .with_pacing(Pacing {
            multiplier: args.pacing,
        })
        .with_throttle(std::time::Duration::from_millis(args.throttle_ms));
    let scheduler = SimulationScheduler::new(
        Arc::new(registry),
        fleet,
        billing,
        Arc::new(LogObserver),
        params,
    );

    let summary = scheduler.run(CancellationToken::new()).await?;
    info!(?summary, "replay complete");

    let bills = load_bills(&args.bills_dir).context("reading bills back")?;
    let daily = DailyReport::generate(&bills, &vehicle_index, &repair_costs);
    for day in &daily.days {
        println!(
            "{}: {} rentals, {} faulted, income {:.2} (narrow {:.2} / wide {:.2}), repairs {:.2}",
            day.day,
            day.totals.rentals,
            day.totals.faulted,
            day.totals.income,
            day.totals.narrow_income,
            day.totals.wide_income,
            day.totals.repairs
        );
    }
    let report = SummaryReport::generate(&bills, &vehicle_index, &repair_costs);
    println!(
        "income {:.2}  maintenance {:.2}  repairs {:.2}  expenses {:.2}  tax {:.2}  profit {:.2}",
        report.totals.income,
        report.totals.maintenance,
        report.totals.repairs,
        report.expenses,
        report.tax,
        report.profit()
    );

    let analysis = LossAnalysis::generate(&bills, &vehicle_index, &repair_costs);
    analysis
        .write_snapshot(&args.loss_snapshot)
        .context("writing loss snapshot")?;
    info!(path = %args.loss_snapshot.display(), "loss snapshot written");
    Ok(())
}
