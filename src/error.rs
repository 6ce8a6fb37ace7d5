use crate::auction::ItemId;
use thiserror::Error;

/// Faults surfaced by the tracker
///
/// Every variant is an invalid argument supplied by the caller. A bid that
/// merely fails to beat the current winner is not an error: see
/// [`crate::BidTracker::record_user_bid`].
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("user id must not be nil")]
    NilUserId,
    #[error("item id must not be nil")]
    NilItemId,
    #[error("duplicate item: {0}")]
    DuplicateItem(ItemId),
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),
}
