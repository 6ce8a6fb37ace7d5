use anyhow::Result;
use bid_tracker::{simulation, Amount, BidTracker};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run concurrent bidders against an in-memory bid tracker
#[derive(Parser)]
#[command(name = "bid-tracker")]
struct Opts {
    /// Number of items up for auction
    #[arg(long, default_value_t = 3)]
    items: usize,

    /// Number of concurrent bidders
    #[arg(long, default_value_t = 4)]
    bidders: usize,

    /// Bids each bidder attempts
    #[arg(long, default_value_t = 100)]
    rounds: usize,

    /// Base raise over the current winning bid
    #[arg(long, default_value = "1.00", value_parser = parse_increment)]
    increment: Amount,
}

fn parse_increment(s: &str) -> Result<Amount, String> {
    let increment: Amount = s.parse().map_err(|e| format!("{e}"))?;
    if increment <= Amount::ZERO {
        return Err(format!("must be positive, got {increment}"));
    }
    Ok(increment)
}

impl From<Opts> for simulation::Config {
    fn from(opts: Opts) -> Self {
        Self {
            items: opts.items,
            bidders: opts.bidders,
            rounds: opts.rounds,
            increment: opts.increment,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bid_tracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = simulation::Config::from(Opts::parse());
    let svc_ctl = simulation::ServiceControl::new();

    ctrlc::set_handler({
        let svc_ctl = svc_ctl.clone();
        move || {
            eprintln!("Stopping all bidders...");
            svc_ctl.stop_all();
        }
    })?;

    let report = simulation::run(&config, &svc_ctl)?;

    for item_id in report.tracker.item_ids() {
        let bids = report.tracker.bids_for_item(item_id)?.unwrap_or_default();
        match report.tracker.item_winning_bid(item_id)? {
            Some(winning) => println!("{item_id}: {winning} ({} bids)", bids.len()),
            None => println!("{item_id}: no bids"),
        }
    }
    for user_id in &report.bidders {
        let accepted = report
            .tracker
            .items_with_user_bid(*user_id)
            .map(|items| items.len())
            .unwrap_or(0);
        println!("{user_id}: {accepted} accepted bids");
    }

    Ok(())
}
