mod in_memory;

pub use self::in_memory::*;

use crate::{
    auction::{Bid, ItemId, UserId},
    error::Error,
};
use std::sync::Arc;

/// Registry of bids over a fixed set of items
///
/// Every call is an atomic transaction with respect to all the others.
pub trait BidTracker {
    /// Record `bid` on `item_id` if it beats the current winner
    ///
    /// Returns `Ok(false)` when the bid is not strictly higher than the
    /// current winning bid. The first bid on an item always wins.
    fn record_user_bid(&self, bid: Bid, item_id: ItemId) -> Result<bool, Error>;

    /// The highest bid on `item_id`, if any
    fn item_winning_bid(&self, item_id: ItemId) -> Result<Option<Bid>, Error>;

    /// All accepted bids on `item_id` in the order they were placed
    ///
    /// `None` if nobody has bid on the item yet.
    fn bids_for_item(&self, item_id: ItemId) -> Result<Option<Vec<Bid>>, Error>;

    /// Items `user_id` has placed an accepted bid on
    ///
    /// An item shows up once per accepted bid. `None` if the user never had
    /// a bid accepted.
    fn items_with_user_bid(&self, user_id: UserId) -> Option<Vec<ItemId>>;

    /// The fixed set of items, sorted
    fn item_ids(&self) -> Vec<ItemId>;
}

pub type SharedBidTracker = Arc<dyn BidTracker + Send + Sync + 'static>;
