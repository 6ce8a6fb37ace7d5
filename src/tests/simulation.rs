use super::*;
use crate::{
    simulation::{self, Config, LoopService, ServiceControl},
    BidTracker, InMemoryBidTracker, SharedBidTracker,
};
use anyhow::bail;
use rust_decimal_macros::dec;
use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

fn assert_consistent(tracker: &SharedBidTracker, users: &[UserId]) -> Result<()> {
    let mut accepted = 0;

    for item_id in tracker.item_ids() {
        let history = tracker.bids_for_item(item_id)?.unwrap_or_default();
        assert!(history.windows(2).all(|w| w[0].amount() < w[1].amount()));
        assert_eq!(tracker.item_winning_bid(item_id)?, history.last().copied());

        for user in users {
            let in_history = history.iter().filter(|b| b.user_id() == *user).count();
            let in_index = tracker
                .items_with_user_bid(*user)
                .unwrap_or_default()
                .into_iter()
                .filter(|i| *i == item_id)
                .count();
            assert_eq!(in_history, in_index);
        }
        accepted += history.len();
    }

    let indexed: usize = users
        .iter()
        .map(|u| tracker.items_with_user_bid(*u).map(|i| i.len()).unwrap_or(0))
        .sum();
    assert_eq!(accepted, indexed);

    Ok(())
}

#[test]
fn concurrent_bidders_keep_histories_increasing() -> Result<()> {
    let config = Config {
        items: 3,
        bidders: 8,
        rounds: 200,
        increment: dec!(0.50),
    };

    let report = simulation::run(&config, &ServiceControl::new())?;

    assert_eq!(report.tracker.item_ids().len(), 3);
    assert_eq!(report.bidders.len(), 8);
    for item_id in report.tracker.item_ids() {
        assert!(report.tracker.item_winning_bid(item_id)?.is_some());
    }
    assert_consistent(&report.tracker, &report.bidders)
}

#[test]
fn racing_on_a_single_item_accepts_each_amount_once() -> Result<()> {
    let ids = new_ids(1);
    let x = ids[0];
    let tracker = InMemoryBidTracker::new_shared(ids)?;
    let users: Vec<_> = (0..4).map(|_| new_user()).collect();

    // every user tries every amount; exactly one of them wins each step
    let threads: Vec<_> = users
        .iter()
        .map(|user| {
            let tracker = tracker.clone();
            let user = *user;
            thread::spawn(move || -> Result<usize> {
                let mut accepted = 0;
                for cents in 1..=500i64 {
                    let amount = Decimal::new(cents, 2);
                    if tracker.record_user_bid(Bid::new(user, amount)?, x)? {
                        accepted += 1;
                    }
                }
                Ok(accepted)
            })
        })
        .collect();

    let mut accepted = 0;
    for t in threads {
        accepted += t.join().map_err(|_| anyhow::format_err!("bidder panicked"))??;
    }

    let history = tracker.bids_for_item(x)?.unwrap_or_default();
    assert_eq!(history.len(), accepted);
    assert!(history.len() <= 500);
    assert_eq!(
        tracker.item_winning_bid(x)?.map(|b| b.amount()),
        Some(dec!(5.00))
    );
    assert_consistent(&tracker, &users)
}

#[test]
fn no_items_means_nothing_to_bid_on() -> Result<()> {
    let config = Config {
        items: 0,
        ..Config::default()
    };

    let report = simulation::run(&config, &ServiceControl::new())?;

    assert!(report.tracker.item_ids().is_empty());
    for user in &report.bidders {
        assert_eq!(report.tracker.items_with_user_bid(*user), None);
    }

    Ok(())
}

#[test]
fn oversized_increment_is_an_error_not_a_panic() {
    let config = Config {
        items: 1,
        bidders: 2,
        rounds: 2,
        increment: Decimal::MAX,
    };

    let err = simulation::run(&config, &ServiceControl::new())
        .err()
        .expect("run to fail");

    assert_eq!(err.to_string(), "increment of bidder 2 overflowed");
}

#[test]
fn bidder_stops_once_the_winning_bid_cannot_be_raised() -> Result<()> {
    let config = Config {
        items: 1,
        bidders: 1,
        rounds: 5,
        increment: Decimal::MAX,
    };

    let report = simulation::run(&config, &ServiceControl::new())?;

    let item_id = report.tracker.item_ids()[0];
    assert_eq!(
        report.tracker.bids_for_item(item_id)?,
        Some(vec![Bid::new(report.bidders[0], Decimal::MAX)?])
    );

    Ok(())
}

#[test]
fn non_positive_increment_is_rejected() {
    for increment in [dec!(0), dec!(0.00), dec!(-1)] {
        let config = Config {
            increment,
            ..Config::default()
        };

        let err = simulation::run(&config, &ServiceControl::new())
            .err()
            .expect("run to fail");
        assert!(err.to_string().starts_with("increment must be positive"));
    }
}

struct Counter(Arc<AtomicUsize>);

impl LoopService for Counter {
    fn run_iteration(&mut self) -> Result<ControlFlow<()>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        thread::yield_now();
        Ok(ControlFlow::Continue(()))
    }
}

struct Failing;

impl LoopService for Failing {
    fn run_iteration(&mut self) -> Result<ControlFlow<()>> {
        bail!("bidder blew up")
    }
}

struct Panicking;

impl LoopService for Panicking {
    fn run_iteration(&mut self) -> Result<ControlFlow<()>> {
        panic!("bidder panicked")
    }
}

#[test]
fn stop_all_stops_running_services() -> Result<()> {
    let svc_ctl = ServiceControl::new();
    let count = Arc::new(AtomicUsize::new(0));

    let handle = svc_ctl.spawn_loop(Counter(count.clone()));
    while count.load(Ordering::SeqCst) == 0 {
        thread::yield_now();
    }
    svc_ctl.stop_all();

    handle.join()?;
    assert!(svc_ctl.is_stopped());

    Ok(())
}

#[test]
fn failing_service_stops_the_others() -> Result<()> {
    let svc_ctl = ServiceControl::new();

    let counter = svc_ctl.spawn_loop(Counter(Arc::new(AtomicUsize::new(0))));
    let failing = svc_ctl.spawn_loop(Failing);

    let err = failing.join().unwrap_err();
    assert_eq!(err.to_string(), "bidder blew up");

    counter.join()?;
    assert!(svc_ctl.is_stopped());

    Ok(())
}

#[test]
fn panicking_service_is_reported() {
    let svc_ctl = ServiceControl::new();

    let err = svc_ctl.spawn_loop(Panicking).join().unwrap_err();

    assert_eq!(err.to_string(), "service panicked");
    assert!(svc_ctl.is_stopped());
}

#[test]
fn stopped_control_aborts_a_simulation_early() -> Result<()> {
    let svc_ctl = ServiceControl::new();
    svc_ctl.stop_all();

    let report = simulation::run(&Config::default(), &svc_ctl)?;

    for item_id in report.tracker.item_ids() {
        assert_eq!(report.tracker.bids_for_item(item_id)?, None);
    }

    Ok(())
}

#[test]
fn shared_tracker_is_usable_as_a_trait_object() -> Result<()> {
    let ids = new_ids(2);
    let tracker: SharedBidTracker = InMemoryBidTracker::new_shared(ids.clone())?;
    let user = new_user();

    assert!(tracker.record_user_bid(bid(user, dec!(3))?, ids[1])?);
    assert_eq!(tracker.items_with_user_bid(user), Some(vec![ids[1]]));

    Ok(())
}
