use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::AccountId;
use super::category::CategoryId;
use super::date::CompactDate;
use super::money::Money;

/// Payee name the ledger gives to the opening-balance entry of an account.
pub const STARTING_BALANCE_PAYEE: &str = "Starting Balance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub payee: String,
    pub amount: Money,
    pub date: CompactDate,
    pub notes: Option<String>,
    pub category: Option<CategoryId>,
}

impl Transaction {
    pub fn is_starting_balance(&self) -> bool {
        self.payee == STARTING_BALANCE_PAYEE
    }

    pub fn is_categorized(&self) -> bool {
        self.category.is_some()
    }

    /// Why the run loop should leave this transaction alone, if it should.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        if self.is_starting_balance() {
            Some(SkipReason::StartingBalance)
        } else if self.amount.is_zero() {
            Some(SkipReason::ZeroAmount)
        } else if self.is_categorized() {
            Some(SkipReason::AlreadyCategorized)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    StartingBalance,
    ZeroAmount,
    AlreadyCategorized,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::StartingBalance => write!(f, "starting balance"),
            SkipReason::ZeroAmount => write!(f, "zero amount"),
            SkipReason::AlreadyCategorized => write!(f, "already categorized"),
        }
    }
}
