//! Contact Planning CLI
//!
//! Runs the best-fit allocation pass over a scenario file and writes the
//! per-resource occupancy report.
//!
//! Usage:
//!   plan-contacts --scenario data/mission_week.json \
//!                 --output data/occupancy_report.txt

use anyhow::Result;
use clap::Parser;
use contact_allocator::bestfit::DEFAULT_SWITCH_THRESHOLD;
use contact_allocator::{conjunction, loader, report, BestFit};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "plan-contacts",
    about = "Allocate capacity channels over a mission timeline"
)]
struct Args {
    /// Path to the scenario JSON file
    #[arg(short, long)]
    scenario: PathBuf,

    /// Output report file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Idle steps tolerated before a channel is released for reassignment
    #[arg(long, default_value_t = DEFAULT_SWITCH_THRESHOLD)]
    switch_threshold: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("Mission Contact Planner");
    info!("{}", "=".repeat(60));

    let scenario = loader::load_scenario(&args.scenario)?;
    let registry = &scenario.registry;

    let mut timeline = capacity_timeline::CapacityTimeline::new(registry);
    let bestfit = BestFit::new(args.switch_threshold);

    let mut total_assigned = 0usize;
    let mut total_rejected = 0usize;
    for resource in registry.resources() {
        if resource.config.capacity == 0 {
            continue;
        }
        let pass = bestfit.allocate(registry, resource.id, &mut timeline)?;
        total_assigned += pass.assigned;
        total_rejected += pass.rejected.len();
    }

    // Post-pass validation: conjunctions and hand-off overlaps are
    // run-level warnings, never errors
    let conjunctions = conjunction::detect_conjunctions(registry, &timeline);
    if !conjunctions.is_empty() {
        warn!("{} wideband conjunction(s) in committed schedule", conjunctions.len());
    }
    for pair in &scenario.pairs {
        let overlap: Vec<usize> = (0..registry.window.steps)
            .filter(|&step| pair.is_conducting_make_before_break(registry, &timeline, step))
            .collect();
        let lead = registry.resource(pair.lead).designator();
        let trail = registry.resource(pair.trail).designator();
        match (overlap.first(), overlap.last()) {
            (Some(first), Some(last)) => info!(
                "hand-off {} -> {}: overlap steps {}..={}",
                lead, trail, first, last
            ),
            _ => warn!("hand-off {} -> {}: no make-before-break overlap", lead, trail),
        }
    }

    let rendered = report::render(registry, &timeline);
    match &args.output {
        Some(path) => {
            info!("Writing report to {:?}", path);
            fs::write(path, rendered)?;
        }
        None => println!("{}", rendered),
    }

    info!("{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Active cells committed: {}", total_assigned);
    info!("Candidates rejected:    {}", total_rejected);
    info!("Conjunction warnings:   {}", conjunctions.len());

    Ok(())
}
