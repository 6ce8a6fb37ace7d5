use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::Error;

pub type ItemId = Uuid;
pub type UserId = Uuid;
pub type Amount = Decimal;

/// A user's offer on an item
///
/// Immutable once built. The amount is an exact decimal so comparisons
/// between bids never suffer from rounding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    user_id: UserId,
    amount: Amount,
}

impl Bid {
    /// Create a bid
    ///
    /// The nil uuid is treated as an unset user id and rejected.
    pub fn new(user_id: UserId, amount: Amount) -> Result<Self, Error> {
        if user_id.is_nil() {
            return Err(Error::NilUserId);
        }
        Ok(Self { user_id, amount })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Would a bid of `other` beat this one?
    ///
    /// Only a strictly higher amount wins; ties go to the bid already held.
    pub fn is_outbid_by(&self, other: Amount) -> bool {
        self.amount < other
    }
}

impl fmt::Display for Bid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.amount, self.user_id)
    }
}
