use parking_lot::{Mutex, MutexGuard};
use std::collections::{hash_map::Entry, HashMap};
use tracing::{debug, info};

use super::*;

/// Bid history of a single item, strictly increasing in amount
#[derive(Debug, Default)]
struct Item {
    bids: Vec<Bid>,
}

impl Item {
    fn winning_bid(&self) -> Option<&Bid> {
        self.bids.last()
    }

    fn add_bid(&mut self, bid: Bid) -> bool {
        if self
            .winning_bid()
            .map_or(true, |highest| highest.is_outbid_by(bid.amount()))
        {
            self.bids.push(bid);
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct Ledger {
    items: HashMap<ItemId, Item>,
    user_bids: HashMap<UserId, Vec<ItemId>>,
}

impl Ledger {
    fn item(&self, item_id: ItemId) -> Result<&Item, Error> {
        self.items
            .get(&item_id)
            .ok_or(Error::UnknownItem(item_id))
    }

    fn item_mut(&mut self, item_id: ItemId) -> Result<&mut Item, Error> {
        self.items
            .get_mut(&item_id)
            .ok_or(Error::UnknownItem(item_id))
    }
}

/// Bid tracker keeping everything in memory behind a single lock
#[derive(Debug)]
pub struct InMemoryBidTracker {
    ledger: Mutex<Ledger>,
}

impl InMemoryBidTracker {
    /// Create a tracker over `item_ids`
    ///
    /// Fails on a nil or repeated item id.
    pub fn new(item_ids: impl IntoIterator<Item = ItemId>) -> Result<Self, Error> {
        let mut items = HashMap::new();

        for item_id in item_ids {
            if item_id.is_nil() {
                return Err(Error::NilItemId);
            }
            match items.entry(item_id) {
                Entry::Occupied(_) => return Err(Error::DuplicateItem(item_id)),
                Entry::Vacant(entry) => {
                    entry.insert(Item::default());
                }
            }
        }

        info!(items = items.len(), "bid tracker created");

        Ok(Self {
            ledger: Mutex::new(Ledger {
                items,
                user_bids: HashMap::new(),
            }),
        })
    }

    pub fn new_shared(
        item_ids: impl IntoIterator<Item = ItemId>,
    ) -> Result<SharedBidTracker, Error> {
        Ok(Arc::new(Self::new(item_ids)?))
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock()
    }
}

impl BidTracker for InMemoryBidTracker {
    fn record_user_bid(&self, bid: Bid, item_id: ItemId) -> Result<bool, Error> {
        let mut ledger = self.lock();

        if !ledger.item_mut(item_id)?.add_bid(bid) {
            debug!(?item_id, user_id = ?bid.user_id(), amount = %bid.amount(), "bid rejected");
            return Ok(false);
        }

        ledger
            .user_bids
            .entry(bid.user_id())
            .or_default()
            .push(item_id);

        debug!(?item_id, user_id = ?bid.user_id(), amount = %bid.amount(), "bid accepted");
        Ok(true)
    }

    fn item_winning_bid(&self, item_id: ItemId) -> Result<Option<Bid>, Error> {
        Ok(self.lock().item(item_id)?.winning_bid().copied())
    }

    fn bids_for_item(&self, item_id: ItemId) -> Result<Option<Vec<Bid>>, Error> {
        let ledger = self.lock();
        let item = ledger.item(item_id)?;

        Ok(if item.bids.is_empty() {
            None
        } else {
            Some(item.bids.clone())
        })
    }

    fn items_with_user_bid(&self, user_id: UserId) -> Option<Vec<ItemId>> {
        self.lock().user_bids.get(&user_id).cloned()
    }

    fn item_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<_> = self.lock().items.keys().copied().collect();
        ids.sort();
        ids
    }
}
