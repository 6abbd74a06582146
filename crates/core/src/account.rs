use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    /// Tracking accounts live outside the budget and are never categorized.
    pub offbudget: bool,
}

impl Account {
    pub fn new(id: AccountId, name: &str) -> Self {
        Account {
            id,
            name: name.to_string(),
            offbudget: false,
        }
    }

    pub fn off_budget(mut self) -> Self {
        self.offbudget = true;
        self
    }
}
