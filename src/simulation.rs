//! Concurrent bidding simulation
//!
//! Drives a shared [`BidTracker`] from many threads at once, each thread
//! being a [`Bidder`] that keeps trying to outbid whoever currently holds
//! an item. Used by the binary and by the concurrency tests.
use crate::{
    auction::{Amount, Bid, ItemId, UserId},
    tracker::{BidTracker, InMemoryBidTracker, SharedBidTracker},
};
use anyhow::{bail, format_err, Context, Result};
use rust_decimal::Decimal;
use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct Config {
    /// Number of items put up for auction
    pub items: usize,
    /// Number of concurrent bidder threads
    pub bidders: usize,
    /// Bids each bidder attempts before stopping
    pub rounds: usize,
    /// How much the first bidder raises the winning bid by; bidder `n`
    /// raises by `n + 1` times this. Must be positive.
    pub increment: Amount,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            items: 3,
            bidders: 4,
            rounds: 100,
            increment: Decimal::ONE,
        }
    }
}

/// A service that is a loop that does something
pub trait LoopService: Send {
    fn run_iteration(&mut self) -> Result<ControlFlow<()>>;
}

/// Service execution control instance
///
/// Every service is a loop. Any of them failing or panicking, or a call to
/// [`ServiceControl::stop_all`], gracefully stops all the others.
#[derive(Clone, Default)]
pub struct ServiceControl {
    stop_all: Arc<AtomicBool>,
}

impl ServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_all(&self) {
        self.stop_all.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_all.load(Ordering::SeqCst)
    }

    pub fn spawn_loop(&self, mut service: impl LoopService + 'static) -> JoinHandle {
        self.spawn_loop_raw(move || service.run_iteration())
    }

    /// Start a new service as a loop, with a certain body
    ///
    /// This will take care of checking termination condition and
    /// handling any errors returned by `f`
    fn spawn_loop_raw<F>(&self, mut f: F) -> JoinHandle
    where
        F: FnMut() -> Result<ControlFlow<()>> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));

        JoinHandle::new(
            stop.clone(),
            thread::spawn({
                let stop_all = self.stop_all.clone();
                move || match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    while !stop.load(Ordering::SeqCst) && !stop_all.load(Ordering::SeqCst) {
                        match f() {
                            Ok(ControlFlow::Continue(())) => {}
                            Ok(ControlFlow::Break(())) => break,
                            Err(e) => {
                                stop_all.store(true, Ordering::SeqCst);
                                return Err(e);
                            }
                        }
                    }
                    Ok(())
                })) {
                    Err(_e) => {
                        stop_all.store(true, Ordering::SeqCst);
                        bail!("service panicked");
                    }
                    Ok(res) => res,
                }
            }),
        )
    }
}

/// Simple thread join wrapper that stops and joins the thread on drop
pub struct JoinHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl JoinHandle {
    fn new(stop: Arc<AtomicBool>, handle: thread::JoinHandle<Result<()>>) -> Self {
        JoinHandle {
            stop,
            thread: Some(handle),
        }
    }

    fn join_mut(&mut self) -> Result<()> {
        if let Some(h) = self.thread.take() {
            h.join().map_err(|e| format_err!("join failed: {:?}", e))?
        } else {
            Ok(())
        }
    }

    pub fn join(mut self) -> Result<()> {
        self.join_mut()
    }
}

impl Drop for JoinHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = self.join_mut() {
            error!(error = %e, "service failed");
        }
    }
}

/// A simulated user repeatedly outbidding the current winner
pub struct Bidder {
    user_id: UserId,
    tracker: SharedBidTracker,
    items: Vec<ItemId>,
    increment: Amount,
    rounds_left: usize,
    next_item: usize,
    accepted: usize,
}

impl Bidder {
    pub fn new(
        user_id: UserId,
        tracker: SharedBidTracker,
        increment: Amount,
        rounds: usize,
        first_item: usize,
    ) -> Self {
        let items = tracker.item_ids();
        Self {
            user_id,
            tracker,
            items,
            increment,
            rounds_left: rounds,
            next_item: first_item,
            accepted: 0,
        }
    }

    /// `None` once the winning bid is too high to be raised any further
    fn next_amount(&self, item_id: ItemId) -> Result<Option<Amount>> {
        Ok(match self.tracker.item_winning_bid(item_id)? {
            Some(winning) => winning.amount().checked_add(self.increment),
            None => Some(self.increment),
        })
    }
}

impl LoopService for Bidder {
    fn run_iteration(&mut self) -> Result<ControlFlow<()>> {
        if self.rounds_left == 0 || self.items.is_empty() {
            debug!(user_id = ?self.user_id, accepted = self.accepted, "bidder done");
            return Ok(ControlFlow::Break(()));
        }
        self.rounds_left -= 1;

        let item_id = self.items[self.next_item % self.items.len()];
        self.next_item += 1;

        let Some(amount) = self.next_amount(item_id)? else {
            debug!(user_id = ?self.user_id, ?item_id, "winning bid can't be raised");
            return Ok(ControlFlow::Break(()));
        };
        // Someone else may get in between the read and the write; the
        // tracker then simply rejects our bid.
        let bid = Bid::new(self.user_id, amount)?;
        if self.tracker.record_user_bid(bid, item_id)? {
            self.accepted += 1;
        }

        Ok(ControlFlow::Continue(()))
    }
}

/// Outcome of a simulation run
pub struct Report {
    pub tracker: SharedBidTracker,
    pub bidders: Vec<UserId>,
}

/// Run a whole simulation to completion, or until `svc_ctl` is stopped
pub fn run(config: &Config, svc_ctl: &ServiceControl) -> Result<Report> {
    if config.increment <= Decimal::ZERO {
        bail!("increment must be positive, got {}", config.increment);
    }
    let increments = (1..=config.bidders)
        .map(|n| {
            config
                .increment
                .checked_mul(Decimal::from(n))
                .ok_or_else(|| format_err!("increment of bidder {n} overflowed"))
        })
        .collect::<Result<Vec<Amount>>>()?;

    let tracker = InMemoryBidTracker::new_shared((0..config.items).map(|_| Uuid::new_v4()))
        .context("failed to create the bid tracker")?;

    info!(
        items = config.items,
        bidders = config.bidders,
        rounds = config.rounds,
        increment = %config.increment,
        "starting simulation"
    );

    let bidders: Vec<UserId> = (0..config.bidders).map(|_| Uuid::new_v4()).collect();
    let handles: Vec<JoinHandle> = bidders
        .iter()
        .zip(increments)
        .enumerate()
        .map(|(i, (user_id, increment))| {
            svc_ctl.spawn_loop(Bidder::new(
                *user_id,
                tracker.clone(),
                increment,
                config.rounds,
                i,
            ))
        })
        .collect();

    let mut res = Ok(());
    for handle in handles {
        let joined = handle.join();
        if res.is_ok() {
            res = joined;
        }
    }
    res.context("bidder failed")?;

    Ok(Report { tracker, bidders })
}
