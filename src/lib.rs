//! In-memory auction bid tracker
//!
//! A [`BidTracker`] holds a fixed set of items and accepts a bid on an item
//! only when it is strictly higher than the item's current winning bid.
//! Accepted bids are never removed, so every item's history is strictly
//! increasing and its last bid is the winner.
//!
//! [`InMemoryBidTracker`] keeps the whole ledger behind a single lock, making
//! each operation atomic with respect to all the others.
mod auction;
mod error;
pub mod simulation;
mod tracker;

pub use self::{
    auction::{Amount, Bid, ItemId, UserId},
    error::Error,
    tracker::{BidTracker, InMemoryBidTracker, SharedBidTracker},
};
